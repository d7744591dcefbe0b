use serde::{Deserialize, Serialize};

/// how badly a mistake hurts lap time, used for score penalties.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn penalty(&self) -> f64 {
        match self {
            Severity::High => 10.0,
            Severity::Medium => 5.0,
            Severity::Low => 2.0,
        }
    }
}

/// the detector family that produced a record.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MistakeCategory {
    Braking,
    Throttle,
    Cornering,
    TireDegradation,
}

/// the specific issue a detector flagged. closed so that every consumer
/// is forced to handle new kinds at compile time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MistakeKind {
    LateBraking,
    ThrottleInconsistency,
    ThrottleLift,
    LowCornerSpeed,
    TireDegradation,
}

impl MistakeKind {
    pub fn category(&self) -> MistakeCategory {
        match self {
            MistakeKind::LateBraking => MistakeCategory::Braking,
            MistakeKind::ThrottleInconsistency | MistakeKind::ThrottleLift => {
                MistakeCategory::Throttle
            }
            MistakeKind::LowCornerSpeed => MistakeCategory::Cornering,
            MistakeKind::TireDegradation => MistakeCategory::TireDegradation,
        }
    }
}

/// # a detected driving mistake
/// produced by exactly one detector invocation and never mutated after.
/// `sector` is None for lap wide issues (tire degradation), `timestamp`
/// is only set when a detector can pin the issue to a moment in the lap.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MistakeRecord {
    pub category: MistakeCategory,
    pub kind: MistakeKind,
    pub sector: Option<i32>,
    pub severity: Severity,
    pub description: String,
    pub time_lost: f64,
    pub timestamp: Option<f64>,
}

impl MistakeRecord {
    pub fn new(
        kind: MistakeKind,
        sector: Option<i32>,
        severity: Severity,
        description: String,
        time_lost: f64,
    ) -> MistakeRecord {
        MistakeRecord {
            category: kind.category(),
            kind,
            sector,
            severity,
            description,
            time_lost,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> MistakeRecord {
        self.timestamp = Some(timestamp);
        self
    }
}
