use log::warn;

use crate::errors::{CustomResult, Error};
use crate::modules::analysis::detectors::{
    BrakingDetector, CorneringDetector, MistakeDetector, ThrottleDetector, TireDegradationDetector,
};
use crate::modules::analysis::feedback::FeedbackGenerator;
use crate::modules::analysis::scoring::ScoringEngine;
use crate::modules::models::lap_record::AnalysisResult;
use crate::modules::models::sample::SampleSet;
use crate::modules::predictor::Predictor;

/// # the lap analysis engine
/// runs every detector across every sector plus the lap wide tire check,
/// asks the predictor for the optimal time and folds everything into one
/// `AnalysisResult`. pure given its inputs: the same samples and the
/// same predictor output produce an identical result modulo `created_at`.
pub struct LapAnalysisOrchestrator<'a> {
    predictor: &'a dyn Predictor,
}

impl<'a> LapAnalysisOrchestrator<'a> {
    pub fn new(predictor: &'a dyn Predictor) -> LapAnalysisOrchestrator<'a> {
        LapAnalysisOrchestrator { predictor }
    }

    /// # analyze one closed lap
    ///
    /// ## Arguments
    /// * `samples` - the validated, closed sample set of the lap
    ///
    /// ## Returns
    /// * `AnalysisResult` - score, mistakes, sector times and feedback
    /// * `Error::NotFoundError` - the set holds no samples
    /// * `Error::IncompleteLapError` - no sample carries the lap time
    pub fn analyze(&self, samples: &SampleSet) -> CustomResult<AnalysisResult> {
        let lap_number = samples.lap_number();

        if samples.is_empty() {
            return Err(Error::NotFoundError { lap_number });
        }

        let actual_time = samples
            .terminal_lap_time()
            .ok_or(Error::IncompleteLapError { lap_number })?;

        let predicted_time = match self.predictor.predict(samples) {
            Ok(predicted) => predicted,
            Err(error) => {
                warn!(
                    target: "analysis/orchestrator:analyze",
                    "predictor failed for lap {}, falling back to heuristic: {}",
                    lap_number, error
                );
                // assume half a second of improvement is always possible
                actual_time - 0.5
            }
        };

        let per_sector: [&dyn MistakeDetector; 3] =
            [&BrakingDetector, &ThrottleDetector, &CorneringDetector];

        let mut mistakes = Vec::new();
        for sector in 1..=3 {
            for detector in per_sector {
                if let Some(record) = detector.evaluate(samples, Some(sector)) {
                    mistakes.push(record);
                }
            }
        }

        let tire_info = TireDegradationDetector.evaluate(samples, None);
        if let Some(tire) = &tire_info {
            mistakes.push(tire.clone());
        }

        let sector_times = samples.sector_times();
        let performance_score = ScoringEngine::score(actual_time, predicted_time, &mistakes);
        let delta = actual_time - predicted_time;
        let feedback = FeedbackGenerator::feedback(&mistakes, tire_info.as_ref(), delta);

        Ok(AnalysisResult {
            lap_number,
            predicted_time,
            actual_time,
            delta,
            performance_score,
            mistakes,
            sector_times,
            feedback,
            created_at: chrono::Utc::now().naive_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::models::mistake::{MistakeKind, Severity};
    use crate::modules::models::sample::{TelemetrySample, TireCompound};
    use crate::modules::predictor::NullPredictor;

    struct StubPredictor(f64);

    impl Predictor for StubPredictor {
        fn predict(&self, _samples: &SampleSet) -> CustomResult<f64> {
            Ok(self.0)
        }
    }

    fn sample(sector: i32, timestamp: f64) -> TelemetrySample {
        TelemetrySample {
            lap_number: 7,
            sector,
            timestamp,
            speed: 205.0,
            throttle: 96.0,
            brake: 0.0,
            steering_angle: 4.0,
            gear: 7,
            tire_compound: TireCompound::Hard,
            tire_wear: 10.0,
            track_temperature: 41.0,
            lap_time: None,
        }
    }

    fn closed_lap() -> SampleSet {
        let mut samples: Vec<TelemetrySample> = (0..30)
            .map(|i| sample(1 + (i / 10) as i32, i as f64 * 3.0))
            .collect();
        samples.last_mut().unwrap().lap_time = Some(89.5);
        SampleSet::new(7, samples).unwrap()
    }

    #[test]
    fn clean_lap_yields_zero_mistakes() {
        let samples = closed_lap();
        let predictor = StubPredictor(89.0);

        let result = LapAnalysisOrchestrator::new(&predictor)
            .analyze(&samples)
            .unwrap();

        assert!(result.mistakes.is_empty());
        assert_eq!(result.actual_time, 89.5);
        assert_eq!(result.predicted_time, 89.0);
        assert_eq!(result.delta, 0.5);
        assert_eq!(result.sector_times.len(), 3);
    }

    #[test]
    fn empty_sample_set_is_not_found() {
        let samples = SampleSet::new(3, vec![]).unwrap();
        let predictor = StubPredictor(88.0);

        let result = LapAnalysisOrchestrator::new(&predictor).analyze(&samples);
        assert_eq!(result, Err(Error::NotFoundError { lap_number: 3 }));
    }

    #[test]
    fn lap_without_terminal_time_is_incomplete() {
        let samples = SampleSet::new(7, vec![sample(1, 0.0), sample(2, 30.0)]).unwrap();
        let predictor = StubPredictor(88.0);

        let result = LapAnalysisOrchestrator::new(&predictor).analyze(&samples);
        assert_eq!(result, Err(Error::IncompleteLapError { lap_number: 7 }));
    }

    #[test]
    fn predictor_failure_falls_back_to_heuristic() {
        let samples = closed_lap();

        let result = LapAnalysisOrchestrator::new(&NullPredictor)
            .analyze(&samples)
            .unwrap();

        assert_eq!(result.predicted_time, 89.0);
        assert_eq!(result.delta, 0.5);
    }

    #[test]
    fn throttle_inconsistency_scenario_in_sector_two() {
        // lap 7, sector 2, three consecutive throttle drops > 30 points
        let throttle_trace = [95.0, 60.0, 95.0, 55.0, 90.0, 45.0];
        let mut samples: Vec<TelemetrySample> = vec![sample(1, 0.0)];
        samples.extend(throttle_trace.iter().enumerate().map(|(i, &throttle)| {
            let mut s = sample(2, 10.0 + i as f64);
            s.throttle = throttle;
            s
        }));
        samples.push(sample(3, 60.0));
        samples.last_mut().unwrap().lap_time = Some(90.0);

        let samples = SampleSet::new(7, samples).unwrap();
        let predictor = StubPredictor(89.4);

        let result = LapAnalysisOrchestrator::new(&predictor)
            .analyze(&samples)
            .unwrap();

        let record = result
            .mistakes
            .iter()
            .find(|m| m.kind == MistakeKind::ThrottleInconsistency)
            .expect("throttle inconsistency not detected");
        assert_eq!(record.sector, Some(2));
        assert_eq!(record.severity, Severity::Medium);
        assert_eq!(record.time_lost, 0.15);
    }

    #[test]
    fn recomputation_is_idempotent_modulo_created_at() {
        let samples = closed_lap();
        let predictor = StubPredictor(89.1);
        let orchestrator = LapAnalysisOrchestrator::new(&predictor);

        let first = orchestrator.analyze(&samples).unwrap();
        let mut second = orchestrator.analyze(&samples).unwrap();

        second.created_at = first.created_at;
        assert_eq!(first, second);
    }
}
