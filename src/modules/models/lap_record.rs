use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::modules::models::mistake::MistakeRecord;
use crate::modules::models::sample::TelemetrySample;

/// a storage backend in the fallback chain.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    Primary,
    Secondary,
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageTier::Primary => write!(f, "primary"),
            StorageTier::Secondary => write!(f, "secondary"),
        }
    }
}

/// # the full analysis of one closed lap
/// one result per lap number. recomputing from the same samples and the
/// same predictor output yields an identical result modulo `created_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub lap_number: i32,
    pub predicted_time: f64,
    pub actual_time: f64,
    pub delta: f64,
    pub performance_score: f64,
    pub mistakes: Vec<MistakeRecord>,
    pub sector_times: HashMap<i32, f64>,
    pub feedback: Vec<String>,
    pub created_at: NaiveDateTime,
}

/// references into the verification ledger. the content reference is
/// obtained first, the transaction reference only once the ledger
/// confirmed within the timeout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LedgerReference {
    pub content_reference: String,
    pub transaction_reference: Option<String>,
}

/// # the document persisted per lap
/// one JSON document holding the samples, the analysis and where the
/// record ended up. `ledger` stays None until a ledger write confirmed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PersistedLapRecord {
    pub lap_number: i32,
    pub samples: Vec<TelemetrySample>,
    pub analysis: AnalysisResult,
    pub storage_tier: StorageTier,
    pub ledger: Option<LedgerReference>,
}

/// # outcome of a persist call
/// reports which tiers succeeded. `warnings` carries every degradation
/// that happened along the chain, in order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PersistenceReceipt {
    pub lap_number: i32,
    pub tier_used: StorageTier,
    pub ledger_verified: bool,
    pub content_reference: Option<String>,
    pub transaction_reference: Option<String>,
    pub warnings: Vec<String>,
}

/// where a retrieved record was served from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Ledger,
    Primary,
    Secondary,
}

impl From<StorageTier> for RecordSource {
    fn from(tier: StorageTier) -> RecordSource {
        match tier {
            StorageTier::Primary => RecordSource::Primary,
            StorageTier::Secondary => RecordSource::Secondary,
        }
    }
}

/// a stored record together with the tier or ledger that served it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RetrievedLap {
    pub record: PersistedLapRecord,
    pub source: RecordSource,
}
