use chrono::NaiveDateTime;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::{error, warn};
use serde_json::Value;

use crate::errors::{CustomResult, Error};
use crate::modules::models::general::establish_connection;
use crate::modules::models::lap_record::{LedgerReference, PersistedLapRecord, StorageTier};
use crate::modules::persistence::store::{LapStore, PutOutcome};
use crate::schema::lap_records;

#[derive(Insertable, Debug)]
#[diesel(table_name = lap_records)]
struct NewLapRecordRow {
    lap_number: i32,
    record: Value,
    created_at: NaiveDateTime,
}

#[derive(Queryable, Debug)]
struct LapRecordRow {
    #[allow(dead_code)]
    lap_number: i32,
    record: Value,
    #[allow(dead_code)]
    created_at: NaiveDateTime,
}

/// # the primary store tier
/// one row per lap in the `lap_records` table, the full record as a
/// jsonb document. `ON CONFLICT DO NOTHING` on the lap number primary
/// key gives the atomic insert-if-absent the fallback chain relies on.
///
/// a failed connection at construction time is folded into the
/// unavailable state so the orchestrator can degrade to the secondary
/// tier instead of aborting.
pub struct PostgresStore {
    conn: Option<PgConnection>,
    offline_reason: String,
}

impl PostgresStore {
    pub fn connect() -> PostgresStore {
        match establish_connection() {
            Ok(conn) => PostgresStore {
                conn: Some(conn),
                offline_reason: String::new(),
            },
            Err(reason) => {
                warn!(target: "persistence/postgres:connect", "primary store offline: {}", reason);
                PostgresStore {
                    conn: None,
                    offline_reason: reason,
                }
            }
        }
    }

    fn unreachable(&self, reason: String) -> Error {
        Error::StoreUnreachableError {
            tier: StorageTier::Primary,
            reason,
        }
    }
}

impl LapStore for PostgresStore {
    fn tier(&self) -> StorageTier {
        StorageTier::Primary
    }

    fn put(&mut self, record: &PersistedLapRecord) -> PutOutcome {
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return PutOutcome::Unavailable(self.offline_reason.clone()),
        };

        let document = match serde_json::to_value(record) {
            Ok(document) => document,
            Err(err) => return PutOutcome::Unavailable(format!("serialize record: {}", err)),
        };

        let row = NewLapRecordRow {
            lap_number: record.lap_number,
            record: document,
            created_at: chrono::Utc::now().naive_utc(),
        };

        match diesel::insert_into(lap_records::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(conn)
        {
            Ok(0) => PutOutcome::Conflict,
            Ok(_) => PutOutcome::Stored,
            Err(err) => {
                error!(target: "persistence/postgres:put", "insert failed for lap {}: {}", record.lap_number, err);
                PutOutcome::Unavailable(err.to_string())
            }
        }
    }

    fn get(&mut self, lap: i32) -> CustomResult<Option<PersistedLapRecord>> {
        use crate::schema::lap_records::dsl::*;

        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => {
                let reason = self.offline_reason.clone();
                return Err(self.unreachable(reason));
            }
        };

        match lap_records
            .filter(lap_number.eq(lap))
            .first::<LapRecordRow>(conn)
        {
            Ok(row) => {
                let parsed = serde_json::from_value(row.record)
                    .map_err(|err| self.unreachable(format!("corrupt record: {}", err)))?;
                Ok(Some(parsed))
            }
            Err(diesel::NotFound) => Ok(None),
            Err(err) => Err(self.unreachable(err.to_string())),
        }
    }

    fn exists(&mut self, lap: i32) -> CustomResult<bool> {
        use crate::schema::lap_records::dsl::*;
        use diesel::dsl::exists;
        use diesel::select;

        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => {
                let reason = self.offline_reason.clone();
                return Err(self.unreachable(reason));
            }
        };

        select(exists(lap_records.filter(lap_number.eq(lap))))
            .get_result(conn)
            .map_err(|err| Error::StoreUnreachableError {
                tier: StorageTier::Primary,
                reason: err.to_string(),
            })
    }

    fn list(&mut self) -> CustomResult<Vec<PersistedLapRecord>> {
        use crate::schema::lap_records::dsl::*;

        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => {
                let reason = self.offline_reason.clone();
                return Err(self.unreachable(reason));
            }
        };

        let rows = lap_records
            .order(lap_number.asc())
            .load::<LapRecordRow>(conn)
            .map_err(|err| Error::StoreUnreachableError {
                tier: StorageTier::Primary,
                reason: err.to_string(),
            })?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row.record)
                    .map_err(|err| self.unreachable(format!("corrupt record: {}", err)))
            })
            .collect()
    }

    fn attach_ledger(&mut self, lap: i32, reference: &LedgerReference) -> CustomResult<()> {
        use crate::schema::lap_records::dsl::*;

        let mut stored = match self.get(lap)? {
            Some(stored) => stored,
            None => return Err(Error::NotFoundError { lap_number: lap }),
        };
        stored.ledger = Some(reference.clone());

        let document = serde_json::to_value(&stored)
            .map_err(|err| self.unreachable(format!("serialize record: {}", err)))?;

        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => {
                let reason = self.offline_reason.clone();
                return Err(self.unreachable(reason));
            }
        };

        diesel::update(lap_records.filter(lap_number.eq(lap)))
            .set(record.eq(document))
            .execute(conn)
            .map_err(|err| Error::StoreUnreachableError {
                tier: StorageTier::Primary,
                reason: err.to_string(),
            })?;

        Ok(())
    }
}
