use tutor_core::AppState;
use tutor_core::model::Mistake;

/// Fixed reply for lessons with a clean record.
pub const NO_ERRORS_SENTINEL: &str = "No errors recorded for this lesson yet.";

/// How many recent mistakes a summary mentions.
const SUMMARY_LIMIT: usize = 3;

/// Aggregated view of overall progress, useful for shells and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressOverview {
    pub percent_complete: f64,
    pub lessons_completed: usize,
    pub total_score: u64,
    pub current_streak: u32,
    pub total_time_spent: u64,
}

impl ProgressOverview {
    #[must_use]
    pub fn from_state(state: &AppState, total_lessons: usize) -> Self {
        let lessons_completed = state.progress.completed_lessons.len();
        let percent_complete = if total_lessons == 0 {
            0.0
        } else {
            lessons_completed as f64 / total_lessons as f64 * 100.0
        };
        Self {
            percent_complete,
            lessons_completed,
            total_score: state.progress.total_score,
            current_streak: state.progress.current_streak,
            total_time_spent: state.progress.total_time_spent,
        }
    }
}

/// Human-readable summary of the most recent mistakes, newest last.
#[must_use]
pub fn past_errors_summary(mistakes: &[Mistake]) -> String {
    if mistakes.is_empty() {
        return NO_ERRORS_SENTINEL.to_string();
    }

    let recent = &mistakes[mistakes.len().saturating_sub(SUMMARY_LIMIT)..];
    let mut summary = String::from("Recent mistakes:");
    for mistake in recent {
        summary.push_str("\n- ");
        summary.push_str(&mistake.question);
        summary.push_str(": ");
        summary.push_str(&mistake.error_description);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::time::fixed_now;

    fn mistake(question: &str) -> Mistake {
        Mistake::new(question, "slipped", fixed_now())
    }

    #[test]
    fn empty_history_uses_the_sentinel() {
        assert_eq!(past_errors_summary(&[]), NO_ERRORS_SENTINEL);
    }

    #[test]
    fn summary_keeps_only_the_most_recent_three() {
        let mistakes = vec![mistake("q1"), mistake("q2"), mistake("q3"), mistake("q4")];
        let summary = past_errors_summary(&mistakes);

        assert!(!summary.contains("q1"));
        assert!(summary.contains("q2"));
        assert!(summary.contains("q4"));
    }

    #[test]
    fn overview_of_the_initial_state_is_zeroed() {
        let overview = ProgressOverview::from_state(&AppState::initial(), 10);
        assert_eq!(overview.percent_complete, 0.0);
        assert_eq!(overview.lessons_completed, 0);
        assert_eq!(overview.total_score, 0);
    }
}
