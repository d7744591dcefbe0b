use crate::modules::models::mistake::MistakeRecord;

pub struct FeedbackGenerator {}

impl FeedbackGenerator {
    /// # render the engineer facing feedback lines
    /// concise and actionable, suitable for radio communication or a
    /// post session debrief. the order is the display order: the time
    /// delta summary first, then one line per detected mistake, then
    /// the tire state with a pit suggestion when degradation fired.
    ///
    /// ## Arguments
    /// * `mistakes` - all detected mistakes, in detection order
    /// * `tire_info` - the lap wide tire degradation record, if any
    /// * `delta` - actual minus predicted lap time in seconds
    pub fn feedback(
        mistakes: &[MistakeRecord],
        tire_info: Option<&MistakeRecord>,
        delta: f64,
    ) -> Vec<String> {
        let mut feedback = Vec::new();

        if delta < 0.2 {
            feedback.push("Excellent lap - very close to optimal time".to_string());
        } else if delta < 0.5 {
            feedback.push("Good lap - minor improvements possible".to_string());
        } else {
            feedback.push(format!(
                "Time loss detected: {:.3}s slower than predicted optimal",
                delta
            ));
        }

        for mistake in mistakes {
            feedback.push(mistake.description.clone());
        }

        if let Some(tire) = tire_info {
            feedback.push(tire.description.clone());
            feedback.push("Consider pitting for fresh tires".to_string());
        }

        feedback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::models::mistake::{MistakeKind, Severity};

    fn mistake(kind: MistakeKind, description: &str) -> MistakeRecord {
        MistakeRecord::new(kind, Some(1), Severity::Medium, description.to_string(), 0.2)
    }

    #[test]
    fn delta_summary_thresholds() {
        assert_eq!(
            FeedbackGenerator::feedback(&[], None, 0.1)[0],
            "Excellent lap - very close to optimal time"
        );
        assert_eq!(
            FeedbackGenerator::feedback(&[], None, 0.35)[0],
            "Good lap - minor improvements possible"
        );
        assert_eq!(
            FeedbackGenerator::feedback(&[], None, 0.778)[0],
            "Time loss detected: 0.778s slower than predicted optimal"
        );
    }

    #[test]
    fn mistakes_keep_detection_order() {
        let first = mistake(MistakeKind::LateBraking, "late braking");
        let second = mistake(MistakeKind::LowCornerSpeed, "slow apex");

        let lines = FeedbackGenerator::feedback(&[first, second], None, 0.6);
        assert_eq!(lines[1], "late braking");
        assert_eq!(lines[2], "slow apex");
    }

    #[test]
    fn tire_degradation_appends_description_and_pit_call() {
        let tire = mistake(MistakeKind::TireDegradation, "tires are gone");

        let lines = FeedbackGenerator::feedback(std::slice::from_ref(&tire), Some(&tire), 0.6);
        assert_eq!(
            lines,
            vec![
                "Time loss detected: 0.600s slower than predicted optimal".to_string(),
                "tires are gone".to_string(),
                "tires are gone".to_string(),
                "Consider pitting for fresh tires".to_string(),
            ]
        );
    }
}
