use std::env;

use dotenvy::dotenv;
use redis::{Client, Commands, Connection, FromRedisValue, RedisResult, ToRedisArgs};

pub struct Redis {}

impl Redis {
    pub fn connect() -> RedisResult<Connection> {
        dotenv().ok();

        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        Client::open(redis_url)?.get_connection()
    }

    pub fn set_data<K: ToRedisArgs, D: ToRedisArgs>(
        conn: &mut Connection,
        key: K,
        data: D,
    ) -> RedisResult<()> {
        conn.set(key, data)
    }

    /// atomic insert-if-absent. true when the key was written, false
    /// when another writer already owns it.
    pub fn set_data_if_absent<K: ToRedisArgs, D: ToRedisArgs>(
        conn: &mut Connection,
        key: K,
        data: D,
    ) -> RedisResult<bool> {
        conn.set_nx(key, data)
    }

    pub fn get_data<K: ToRedisArgs, D: FromRedisValue>(
        conn: &mut Connection,
        key: K,
    ) -> RedisResult<D> {
        conn.get(key)
    }

    pub fn has_data<K: ToRedisArgs>(conn: &mut Connection, key: K) -> RedisResult<bool> {
        conn.exists(key)
    }

    pub fn get_keys(conn: &mut Connection, pattern: &str) -> RedisResult<Vec<String>> {
        conn.keys(pattern)
    }
}
