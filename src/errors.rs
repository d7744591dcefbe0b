use snafu::Snafu;

use crate::modules::models::lap_record::StorageTier;

pub type CustomResult<T> = Result<T, Error>;

/// # error taxonomy for the analysis and persistence pipeline
/// every orchestration level failure is an explicit variant so callers
/// can branch on the kind instead of parsing messages.
///
/// detector and scoring code is infallible by construction, inputs are
/// validated before they reach the core.
#[derive(Debug, Snafu, Clone, PartialEq)]
#[snafu(visibility(pub))]
pub enum Error {
    /// a sample was malformed or out of range. rejected before the core runs.
    #[snafu(display("invalid telemetry for lap {lap_number}: {reason}"))]
    ValidationError { lap_number: i32, reason: String },

    /// no samples or no stored record for the requested lap.
    #[snafu(display("no data found for lap {lap_number}"))]
    NotFoundError { lap_number: i32 },

    /// the sample set is closed but no sample carries the terminal lap time.
    #[snafu(display("lap {lap_number} has no terminal lap time"))]
    IncompleteLapError { lap_number: i32 },

    /// lap identity is write once. a second persist for the same lap fails.
    #[snafu(display("lap {lap_number} is already persisted"))]
    DuplicateLapError { lap_number: i32 },

    /// both store tiers refused the write. fatal, the caller may retry.
    #[snafu(display("no storage tier available (primary: {primary}, secondary: {secondary})"))]
    StorageUnavailableError { primary: String, secondary: String },

    /// a single tier could not be reached for a read or an exists check.
    /// the persistence orchestrator downgrades this to a warning.
    #[snafu(display("{tier} store unreachable: {reason}"))]
    StoreUnreachableError { tier: StorageTier, reason: String },

    /// ledger or content store failure. never fatal to a persist call.
    #[snafu(display("ledger operation failed: {reason}"))]
    LedgerError { reason: String },

    /// the predictor collaborator failed. triggers the heuristic fallback.
    #[snafu(display("predictor unavailable: {reason}"))]
    PredictorUnavailableError { reason: String },
}
