use log::{error, warn};
use redis::Connection;

use crate::errors::{CustomResult, Error};
use crate::modules::models::lap_record::{LedgerReference, PersistedLapRecord, StorageTier};
use crate::modules::persistence::store::{LapStore, PutOutcome};
use crate::modules::redis::Redis;

/// # the secondary store tier
/// one redis key per lap holding the serialized record. `SET NX` gives
/// the atomic insert-if-absent, so a race between two writers resolves
/// to one winner the same way the primary tier does.
pub struct RedisStore {
    conn: Option<Connection>,
    offline_reason: String,
}

impl RedisStore {
    pub fn connect() -> RedisStore {
        match Redis::connect() {
            Ok(conn) => RedisStore {
                conn: Some(conn),
                offline_reason: String::new(),
            },
            Err(err) => {
                warn!(target: "persistence/redis_store:connect", "secondary store offline: {}", err);
                RedisStore {
                    conn: None,
                    offline_reason: err.to_string(),
                }
            }
        }
    }

    fn key(lap_number: i32) -> String {
        format!("lap_record:{}", lap_number)
    }

    fn unreachable(reason: String) -> Error {
        Error::StoreUnreachableError {
            tier: StorageTier::Secondary,
            reason,
        }
    }
}

impl LapStore for RedisStore {
    fn tier(&self) -> StorageTier {
        StorageTier::Secondary
    }

    fn put(&mut self, record: &PersistedLapRecord) -> PutOutcome {
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return PutOutcome::Unavailable(self.offline_reason.clone()),
        };

        let document = match serde_json::to_string(record) {
            Ok(document) => document,
            Err(err) => return PutOutcome::Unavailable(format!("serialize record: {}", err)),
        };

        match Redis::set_data_if_absent(conn, RedisStore::key(record.lap_number), document) {
            Ok(true) => PutOutcome::Stored,
            Ok(false) => PutOutcome::Conflict,
            Err(err) => {
                error!(target: "persistence/redis_store:put", "write failed for lap {}: {}", record.lap_number, err);
                PutOutcome::Unavailable(err.to_string())
            }
        }
    }

    fn get(&mut self, lap_number: i32) -> CustomResult<Option<PersistedLapRecord>> {
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return Err(RedisStore::unreachable(self.offline_reason.clone())),
        };

        let document: Option<String> = Redis::get_data(conn, RedisStore::key(lap_number))
            .map_err(|err| RedisStore::unreachable(err.to_string()))?;

        match document {
            Some(document) => {
                let parsed = serde_json::from_str(&document)
                    .map_err(|err| RedisStore::unreachable(format!("corrupt record: {}", err)))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    fn exists(&mut self, lap_number: i32) -> CustomResult<bool> {
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return Err(RedisStore::unreachable(self.offline_reason.clone())),
        };

        Redis::has_data(conn, RedisStore::key(lap_number))
            .map_err(|err| RedisStore::unreachable(err.to_string()))
    }

    fn list(&mut self) -> CustomResult<Vec<PersistedLapRecord>> {
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return Err(RedisStore::unreachable(self.offline_reason.clone())),
        };

        let keys = Redis::get_keys(conn, "lap_record:*")
            .map_err(|err| RedisStore::unreachable(err.to_string()))?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let document: Option<String> = Redis::get_data(conn, key)
                .map_err(|err| RedisStore::unreachable(err.to_string()))?;
            // a key expired between KEYS and GET is skipped
            if let Some(document) = document {
                let parsed: PersistedLapRecord = serde_json::from_str(&document)
                    .map_err(|err| RedisStore::unreachable(format!("corrupt record: {}", err)))?;
                records.push(parsed);
            }
        }

        records.sort_by_key(|record| record.lap_number);
        Ok(records)
    }

    fn attach_ledger(&mut self, lap_number: i32, reference: &LedgerReference) -> CustomResult<()> {
        let mut stored = match self.get(lap_number)? {
            Some(stored) => stored,
            None => return Err(Error::NotFoundError { lap_number }),
        };
        stored.ledger = Some(reference.clone());

        let document = serde_json::to_string(&stored)
            .map_err(|err| RedisStore::unreachable(format!("serialize record: {}", err)))?;

        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return Err(RedisStore::unreachable(self.offline_reason.clone())),
        };

        Redis::set_data(conn, RedisStore::key(lap_number), document)
            .map_err(|err| RedisStore::unreachable(err.to_string()))
    }
}
