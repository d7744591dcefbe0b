use crate::errors::CustomResult;
use crate::modules::models::lap_record::{LedgerReference, PersistedLapRecord, StorageTier};

/// # outcome of a store write
/// the fallback chain branches on these tags instead of catching
/// errors: `Conflict` means another writer owns the lap, `Unavailable`
/// means the tier itself is down and the next tier should be tried.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    Stored,
    Conflict,
    Unavailable(String),
}

/// # a storage tier in the fallback chain
/// `put` must be an atomic insert-if-absent: when two writers race past
/// the uniqueness pre-check, exactly one may win and the loser must see
/// `Conflict`, never an overwrite.
pub trait LapStore {
    fn tier(&self) -> StorageTier;

    fn put(&mut self, record: &PersistedLapRecord) -> PutOutcome;

    fn get(&mut self, lap_number: i32) -> CustomResult<Option<PersistedLapRecord>>;

    fn exists(&mut self, lap_number: i32) -> CustomResult<bool>;

    /// every stored record, ordered by lap number.
    fn list(&mut self) -> CustomResult<Vec<PersistedLapRecord>>;

    /// attach ledger references to an already stored record. best-effort
    /// follow-up after a successful ledger write.
    fn attach_ledger(&mut self, lap_number: i32, reference: &LedgerReference) -> CustomResult<()>;
}
