use crate::modules::helpers::math::Math;
use crate::modules::models::mistake::MistakeRecord;

pub struct ScoringEngine {}

impl ScoringEngine {
    /// # score a lap between 0 and 100
    /// the base score penalizes the relative time loss against the
    /// predicted optimal, then every mistake costs a flat 5 points plus
    /// its severity penalty. the result is clamped to 0..=100 and
    /// rounded to one decimal.
    ///
    /// non increasing in the time delta, in the mistake count and in
    /// the severity mix.
    ///
    /// ## Arguments
    /// * `actual_time` - the driven lap time in seconds
    /// * `predicted_time` - the predicted optimal lap time in seconds
    /// * `mistakes` - the mistakes detected on the lap
    pub fn score(actual_time: f64, predicted_time: f64, mistakes: &[MistakeRecord]) -> f64 {
        let delta_percent = ((actual_time - predicted_time) / predicted_time) * 100.0;
        let time_score = (100.0 - delta_percent * 20.0).max(0.0);

        let mistake_penalty = mistakes.len() as f64 * 5.0;
        let severity_penalty: f64 = mistakes
            .iter()
            .map(|mistake| mistake.severity.penalty())
            .sum();

        let final_score = (time_score - mistake_penalty - severity_penalty).clamp(0.0, 100.0);

        Math::round_float_to_n_decimals(final_score, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::models::mistake::{MistakeKind, Severity};

    fn mistake(severity: Severity) -> MistakeRecord {
        MistakeRecord::new(
            MistakeKind::LateBraking,
            Some(1),
            severity,
            "test".to_string(),
            0.2,
        )
    }

    #[test]
    fn clean_lap_score_follows_the_time_delta() {
        let actual: f64 = 89.234;
        let predicted: f64 = 88.456;

        let expected_delta_pct = (actual - predicted) / predicted * 100.0;
        let expected = Math::round_float_to_n_decimals(
            (100.0 - expected_delta_pct * 20.0).max(0.0),
            1,
        );

        assert_eq!(ScoringEngine::score(actual, predicted, &[]), expected);
    }

    #[test]
    fn score_is_non_increasing_in_mistake_count() {
        let one = ScoringEngine::score(90.0, 89.5, &[mistake(Severity::Low)]);
        let two = ScoringEngine::score(
            90.0,
            89.5,
            &[mistake(Severity::Low), mistake(Severity::Low)],
        );

        assert!(two < one);
    }

    #[test]
    fn score_is_non_increasing_in_severity() {
        let low = ScoringEngine::score(90.0, 89.5, &[mistake(Severity::Low)]);
        let medium = ScoringEngine::score(90.0, 89.5, &[mistake(Severity::Medium)]);
        let high = ScoringEngine::score(90.0, 89.5, &[mistake(Severity::High)]);

        assert!(medium < low);
        assert!(high < medium);
    }

    #[test]
    fn score_is_non_increasing_in_delta() {
        let close = ScoringEngine::score(89.0, 88.9, &[]);
        let far = ScoringEngine::score(91.0, 88.9, &[]);

        assert!(far < close);
    }

    #[test]
    fn score_never_leaves_the_unit_range() {
        // a disaster lap bottoms out at zero
        let floor = ScoringEngine::score(
            120.0,
            88.0,
            &[mistake(Severity::High), mistake(Severity::High)],
        );
        assert_eq!(floor, 0.0);

        // a lap faster than the prediction is capped at 100
        let ceiling = ScoringEngine::score(87.0, 88.0, &[]);
        assert_eq!(ceiling, 100.0);
    }
}
