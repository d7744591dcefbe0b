use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};
use crate::modules::helpers::math::Math;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TireCompound {
    Soft,
    Medium,
    Hard,
}

impl TireCompound {
    /// wear percentage above which the compound is considered degraded.
    /// softs degrade fastest, hards are the most durable.
    pub fn wear_threshold(&self) -> f64 {
        match self {
            TireCompound::Soft => 40.0,
            TireCompound::Medium => 60.0,
            TireCompound::Hard => 75.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TireCompound::Soft => "soft",
            TireCompound::Medium => "medium",
            TireCompound::Hard => "hard",
        }
    }
}

/// # a single telemetry sample from the car's sensors
/// immutable once validated. all sensor readings must be within
/// realistic F1 parameters, see `validate`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub lap_number: i32,
    pub sector: i32,
    pub timestamp: f64,
    pub speed: f64,
    pub throttle: f64,
    pub brake: f64,
    pub steering_angle: f64,
    pub gear: i32,
    pub tire_compound: TireCompound,
    pub tire_wear: f64,
    pub track_temperature: f64,
    pub lap_time: Option<f64>,
}

impl TelemetrySample {
    /// # validate a sample against sensor ranges
    /// rejects readings a real car cannot produce before they reach
    /// the analysis engine.
    ///
    /// ## Returns
    /// * `()` - when the sample is in range
    /// * `Error::ValidationError` - naming the offending field otherwise
    pub fn validate(&self) -> CustomResult<()> {
        if self.lap_number < 1 {
            return Err(self.invalid("lap_number must be >= 1"));
        }
        if !(1..=3).contains(&self.sector) {
            return Err(self.invalid("sector must be 1, 2 or 3"));
        }
        // negated comparison so NaN fails the check too
        if !(self.timestamp >= 0.0) {
            return Err(self.invalid("timestamp must be >= 0"));
        }
        if !(0.0..=400.0).contains(&self.speed) {
            return Err(self.invalid("speed must be within 0..=400 km/h"));
        }
        if !(0.0..=100.0).contains(&self.throttle) {
            return Err(self.invalid("throttle must be within 0..=100 %"));
        }
        if !(0.0..=100.0).contains(&self.brake) {
            return Err(self.invalid("brake must be within 0..=100 %"));
        }
        if !(-540.0..=540.0).contains(&self.steering_angle) {
            return Err(self.invalid("steering_angle must be within -540..=540 degrees"));
        }
        if !(0..=8).contains(&self.gear) {
            return Err(self.invalid("gear must be within 0..=8"));
        }
        if !(0.0..=100.0).contains(&self.tire_wear) {
            return Err(self.invalid("tire_wear must be within 0..=100 %"));
        }
        if !(0.0..=60.0).contains(&self.track_temperature) {
            return Err(self.invalid("track_temperature must be within 0..=60 celsius"));
        }
        if let Some(lap_time) = self.lap_time {
            if !(lap_time >= 0.0) {
                return Err(self.invalid("lap_time must be >= 0"));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> Error {
        Error::ValidationError {
            lap_number: self.lap_number,
            reason: reason.to_string(),
        }
    }
}

/// # the closed, ordered sample set of one lap
/// samples are validated on construction and kept sorted by timestamp.
/// sector interleaving is tolerated, detectors filter by sector.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SampleSet {
    lap_number: i32,
    samples: Vec<TelemetrySample>,
}

impl SampleSet {
    /// # build a sample set for one lap
    /// validates every sample, rejects samples belonging to another lap
    /// and orders the set by timestamp. an empty set is allowed, the
    /// analysis orchestrator reports it as `NotFoundError`.
    ///
    /// ## Arguments
    /// * `lap_number` - the lap the set belongs to
    /// * `samples` - the raw samples to validate and order
    pub fn new(lap_number: i32, mut samples: Vec<TelemetrySample>) -> CustomResult<SampleSet> {
        if lap_number < 1 {
            return Err(Error::ValidationError {
                lap_number,
                reason: "lap_number must be >= 1".to_string(),
            });
        }

        for sample in &samples {
            sample.validate()?;
            if sample.lap_number != lap_number {
                return Err(Error::ValidationError {
                    lap_number,
                    reason: format!(
                        "sample for lap {} mixed into lap {}",
                        sample.lap_number, lap_number
                    ),
                });
            }
        }

        samples.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap());

        Ok(SampleSet { lap_number, samples })
    }

    pub fn lap_number(&self) -> i32 {
        self.lap_number
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// all samples recorded in the given sector, in timestamp order.
    pub fn sector(&self, sector: i32) -> Vec<&TelemetrySample> {
        self.samples
            .iter()
            .filter(|sample| sample.sector == sector)
            .collect()
    }

    /// # the terminal lap time of the set
    /// only the terminal sample carries a lap time. scanning from the
    /// back tolerates producers that stamp it early.
    pub fn terminal_lap_time(&self) -> Option<f64> {
        self.samples.iter().rev().find_map(|sample| sample.lap_time)
    }

    /// # per sector durations
    /// `max(timestamp) - min(timestamp)` within each sector that has
    /// samples, rounded to 3 decimals.
    pub fn sector_times(&self) -> HashMap<i32, f64> {
        let mut sector_times = HashMap::new();

        for sector in 1..=3 {
            let timestamps: Vec<f64> = self
                .sector(sector)
                .iter()
                .map(|sample| sample.timestamp)
                .collect();

            if timestamps.is_empty() {
                continue;
            }

            let first = timestamps.iter().cloned().fold(f64::MAX, f64::min);
            let last = timestamps.iter().cloned().fold(f64::MIN, f64::max);
            sector_times.insert(sector, Math::round_float_to_n_decimals(last - first, 3));
        }

        sector_times
    }
}
