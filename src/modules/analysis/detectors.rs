use crate::modules::helpers::math::Math;
use crate::modules::models::mistake::{MistakeKind, MistakeRecord, Severity};
use crate::modules::models::sample::SampleSet;

/// # a stateless mistake rule
/// each detector is a pure function over a closed sample set. per sector
/// detectors receive `Some(sector)`, lap wide detectors ignore it and
/// leave the record's sector as None. side effect free so detectors can
/// run in any order and be tested in isolation with synthetic samples.
pub trait MistakeDetector {
    fn evaluate(&self, samples: &SampleSet, sector: Option<i32>) -> Option<MistakeRecord>;
}

/// # late braking detection
/// braking consistency and timing are critical for lap time. heavy brake
/// applications still carrying high speed indicate a missed brake point.
///
/// filter chain: brake > 10% (application), then brake > 80% (heavy),
/// then speed > 250 km/h. any empty stage means no issue.
pub struct BrakingDetector;

impl MistakeDetector for BrakingDetector {
    fn evaluate(&self, samples: &SampleSet, sector: Option<i32>) -> Option<MistakeRecord> {
        let sector = sector?;
        let sector_data = samples.sector(sector);

        if sector_data.is_empty() {
            return None;
        }

        let brake_points: Vec<_> = sector_data
            .iter()
            .filter(|sample| sample.brake > 10.0)
            .collect();
        if brake_points.is_empty() {
            return None;
        }

        let heavy_braking: Vec<_> = brake_points
            .iter()
            .filter(|sample| sample.brake > 80.0)
            .collect();
        if heavy_braking.is_empty() {
            return None;
        }

        let high_speed_braking: Vec<_> = heavy_braking
            .iter()
            .filter(|sample| sample.speed > 250.0)
            .collect();
        if high_speed_braking.is_empty() {
            return None;
        }

        let timestamps: Vec<f64> = high_speed_braking
            .iter()
            .map(|sample| sample.timestamp)
            .collect();

        Some(
            MistakeRecord::new(
                MistakeKind::LateBraking,
                Some(sector),
                Severity::Medium,
                format!(
                    "Late braking detected in Sector {} - braking from high speed",
                    sector
                ),
                0.2,
            )
            .with_timestamp(Math::mean(&timestamps)),
        )
    }
}

/// # throttle application detection
/// optimal driving needs smooth, progressive throttle through corner
/// exits. repeated sudden lifts cost momentum, never reaching near full
/// throttle costs straight line speed. only the first matching condition
/// is reported per sector.
pub struct ThrottleDetector;

impl MistakeDetector for ThrottleDetector {
    fn evaluate(&self, samples: &SampleSet, sector: Option<i32>) -> Option<MistakeRecord> {
        let sector = sector?;
        let sector_data = samples.sector(sector);

        if sector_data.is_empty() {
            return None;
        }

        let throttle_values: Vec<f64> = sector_data.iter().map(|sample| sample.throttle).collect();

        // consecutive sample deltas, a drop of more than 30 points is a sudden lift
        let sudden_lifts = throttle_values
            .windows(2)
            .filter(|pair| pair[1] - pair[0] < -30.0)
            .count();

        if sudden_lifts > 2 {
            return Some(MistakeRecord::new(
                MistakeKind::ThrottleInconsistency,
                Some(sector),
                Severity::Medium,
                format!(
                    "Throttle inconsistency in Sector {} - multiple sudden lifts detected",
                    sector
                ),
                0.15,
            ));
        }

        let max_throttle = throttle_values.iter().cloned().fold(f64::MIN, f64::max);
        if max_throttle < 85.0 {
            return Some(MistakeRecord::new(
                MistakeKind::ThrottleLift,
                Some(sector),
                Severity::Low,
                format!(
                    "Throttle lift too early in Sector {} - not reaching full throttle",
                    sector
                ),
                0.1,
            ));
        }

        None
    }
}

/// # corner speed detection
/// low minimum speed through a sector indicates poor line choice or a
/// lack of confidence. the expected minimums encode the track layout:
/// sector 1 slow corners, sector 2 tight chicane, sector 3 fast corners.
pub struct CorneringDetector;

impl CorneringDetector {
    fn expected_min_speed(sector: i32) -> f64 {
        match sector {
            1 => 120.0,
            2 => 100.0,
            3 => 140.0,
            _ => 120.0,
        }
    }
}

impl MistakeDetector for CorneringDetector {
    fn evaluate(&self, samples: &SampleSet, sector: Option<i32>) -> Option<MistakeRecord> {
        let sector = sector?;
        let sector_data = samples.sector(sector);

        if sector_data.is_empty() {
            return None;
        }

        let min_speed = sector_data
            .iter()
            .map(|sample| sample.speed)
            .fold(f64::MAX, f64::min);

        let expected = CorneringDetector::expected_min_speed(sector);
        if min_speed >= expected - 15.0 {
            return None;
        }

        Some(MistakeRecord::new(
            MistakeKind::LowCornerSpeed,
            Some(sector),
            Severity::Medium,
            format!(
                "Low corner speed in Sector {} ({:.1} km/h vs expected {:.0} km/h)",
                sector, min_speed, expected
            ),
            0.18,
        ))
    }
}

/// # tire degradation detection
/// lap wide, not per sector. as tires wear, grip drops and both corner
/// speed and braking suffer. engineers use this to time the pit stop.
/// severity escalates to high once wear is 15 points past the compound
/// threshold.
pub struct TireDegradationDetector;

impl MistakeDetector for TireDegradationDetector {
    fn evaluate(&self, samples: &SampleSet, _sector: Option<i32>) -> Option<MistakeRecord> {
        let all = samples.samples();
        if all.is_empty() {
            return None;
        }

        let wear_values: Vec<f64> = all.iter().map(|sample| sample.tire_wear).collect();
        let avg_tire_wear = Math::mean(&wear_values);
        let compound = all[0].tire_compound;

        let threshold = compound.wear_threshold();
        if avg_tire_wear <= threshold {
            return None;
        }

        let (severity, time_lost) = if avg_tire_wear > threshold + 15.0 {
            (Severity::High, 0.3)
        } else {
            (Severity::Medium, 0.15)
        };

        Some(MistakeRecord::new(
            MistakeKind::TireDegradation,
            None,
            severity,
            format!(
                "Significant tire degradation ({:.1}% wear on {} compound)",
                avg_tire_wear,
                compound.as_str()
            ),
            time_lost,
        ))
    }
}
