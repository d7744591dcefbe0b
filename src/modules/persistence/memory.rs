use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{CustomResult, Error};
use crate::modules::models::lap_record::{LedgerReference, PersistedLapRecord, StorageTier};
use crate::modules::persistence::store::{LapStore, PutOutcome};

/// # in-memory store tier
/// backs the test suite. clones share the
/// same map, so two orchestrators built from clones contend on the same
/// records the way two processes contend on one database. the mutex
/// makes `put` the required atomic insert-if-absent.
#[derive(Clone)]
pub struct MemoryStore {
    tier: StorageTier,
    laps: Arc<Mutex<HashMap<i32, PersistedLapRecord>>>,
    available: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new(tier: StorageTier) -> MemoryStore {
        MemoryStore {
            tier,
            laps: Arc::new(Mutex::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// failure injection for tests: an unavailable store refuses every
    /// operation the way an unreachable database would.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> CustomResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::StoreUnreachableError {
                tier: self.tier,
                reason: "store marked unavailable".to_string(),
            })
        }
    }
}

impl LapStore for MemoryStore {
    fn tier(&self) -> StorageTier {
        self.tier
    }

    fn put(&mut self, record: &PersistedLapRecord) -> PutOutcome {
        if !self.available.load(Ordering::SeqCst) {
            return PutOutcome::Unavailable("store marked unavailable".to_string());
        }

        let mut laps = self.laps.lock().unwrap();
        match laps.entry(record.lap_number) {
            Entry::Occupied(_) => PutOutcome::Conflict,
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                PutOutcome::Stored
            }
        }
    }

    fn get(&mut self, lap_number: i32) -> CustomResult<Option<PersistedLapRecord>> {
        self.check_available()?;
        Ok(self.laps.lock().unwrap().get(&lap_number).cloned())
    }

    fn exists(&mut self, lap_number: i32) -> CustomResult<bool> {
        self.check_available()?;
        Ok(self.laps.lock().unwrap().contains_key(&lap_number))
    }

    fn list(&mut self) -> CustomResult<Vec<PersistedLapRecord>> {
        self.check_available()?;

        let mut records: Vec<PersistedLapRecord> =
            self.laps.lock().unwrap().values().cloned().collect();
        records.sort_by_key(|record| record.lap_number);
        Ok(records)
    }

    fn attach_ledger(&mut self, lap_number: i32, reference: &LedgerReference) -> CustomResult<()> {
        self.check_available()?;

        let mut laps = self.laps.lock().unwrap();
        match laps.get_mut(&lap_number) {
            Some(record) => {
                record.ledger = Some(reference.clone());
                Ok(())
            }
            None => Err(Error::NotFoundError { lap_number }),
        }
    }
}
