use chrono::{DateTime, Utc};

use crate::model::{
    LessonId, LessonProgress, Mistake, ProgressPatch, SettingsPatch, UiPatch, UserProgress,
};
use crate::state::AppState;
use crate::time::local_date;

//
// ─── ACTIONS ───────────────────────────────────────────────────────────────────
//

/// Every mutation the store can express.
///
/// Time-sensitive actions carry their timestamp so the reducer stays pure;
/// the accessor layer stamps `at` from its injected clock.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Toggle the startup-loading flag. No progress effect.
    SetLoading(bool),
    /// Set or clear the user-visible error message. No progress effect.
    SetError(Option<String>),
    /// Shallow-merge a partial `UserProgress`. Used for bulk rehydration
    /// from storage and for accessor-level upserts.
    UpdateProgress(ProgressPatch),
    /// Record a full lesson completion: marks the lesson completed, adds
    /// to the aggregate score/time, and advances the activity streak.
    CompleteLesson {
        lesson_id: LessonId,
        score: u32,
        time_spent: u32,
        at: DateTime<Utc>,
    },
    /// Append a mistake record to the lesson, creating the lesson entry
    /// if it does not exist yet.
    AddMistake {
        lesson_id: LessonId,
        question: String,
        error_description: String,
        at: DateTime<Utc>,
    },
    /// Add points to the lesson-local score. Does not touch
    /// `total_score`; only `CompleteLesson` does.
    UpdateScore {
        lesson_id: LessonId,
        points: u32,
        at: DateTime<Utc>,
    },
    /// Lightweight completion path for lessons scored incrementally via
    /// `UpdateScore`: flags completion without touching score or time.
    MarkAsCompleted {
        lesson_id: LessonId,
        at: DateTime<Utc>,
    },
    SetCurrentLesson(Option<LessonId>),
    UpdateSettings(SettingsPatch),
    UpdateUi(UiPatch),
    /// Replace the entire state with the initial value.
    ResetApp,
}

//
// ─── REDUCER ───────────────────────────────────────────────────────────────────
//

/// The single place state transitions are expressed.
///
/// Total, pure and synchronous: every arm returns a value, nothing panics,
/// nothing performs I/O. Counters use saturating arithmetic so malformed
/// inputs degrade instead of aborting.
#[must_use]
pub fn reduce(state: &AppState, action: AppAction) -> AppState {
    let mut next = state.clone();
    match action {
        AppAction::SetLoading(loading) => {
            next.is_loading = loading;
        }
        AppAction::SetError(error) => {
            next.error = error;
        }
        AppAction::UpdateProgress(patch) => {
            patch.apply_to(&mut next.progress);
        }
        AppAction::CompleteLesson {
            lesson_id,
            score,
            time_spent,
            at,
        } => {
            let progress = &mut next.progress;
            let streak = bumped_streak(progress, at);
            progress.current_streak = streak;
            progress.completed_lessons.insert(lesson_id.clone());
            progress.total_score = progress.total_score.saturating_add(u64::from(score));
            progress.total_time_spent =
                progress.total_time_spent.saturating_add(u64::from(time_spent));
            progress.last_activity = Some(at);

            // Upsert keeps existing mistakes and answers; score/time are the
            // caller-reported lesson totals for this completion.
            let lesson = lesson_entry(progress, &lesson_id, at);
            lesson.is_completed = true;
            lesson.score = score;
            lesson.time_spent = time_spent;
            lesson.last_accessed = at;
        }
        AppAction::AddMistake {
            lesson_id,
            question,
            error_description,
            at,
        } => {
            let lesson = lesson_entry(&mut next.progress, &lesson_id, at);
            lesson
                .mistakes
                .push(Mistake::new(question, error_description, at));
            lesson.last_accessed = at;
        }
        AppAction::UpdateScore {
            lesson_id,
            points,
            at,
        } => {
            let lesson = lesson_entry(&mut next.progress, &lesson_id, at);
            lesson.score = lesson.score.saturating_add(points);
            lesson.last_accessed = at;
        }
        AppAction::MarkAsCompleted { lesson_id, at } => {
            next.progress.completed_lessons.insert(lesson_id.clone());
            let lesson = lesson_entry(&mut next.progress, &lesson_id, at);
            lesson.is_completed = true;
            lesson.last_accessed = at;
        }
        AppAction::SetCurrentLesson(lesson_id) => {
            next.current_lesson = lesson_id;
        }
        AppAction::UpdateSettings(patch) => {
            patch.apply_to(&mut next.settings);
        }
        AppAction::UpdateUi(patch) => {
            patch.apply_to(&mut next.ui);
        }
        AppAction::ResetApp => {
            next = AppState::initial();
        }
    }
    next
}

/// The streak value after a completion at `at`.
///
/// A streak counts distinct active local days: a completion on the same
/// local date as the previous one leaves it unchanged, any other date adds
/// one. There is no gap detection; a missed day does not reset the count.
fn bumped_streak(progress: &UserProgress, at: DateTime<Utc>) -> u32 {
    let same_day = progress
        .last_activity
        .is_some_and(|prev| local_date(prev) == local_date(at));
    if same_day {
        progress.current_streak
    } else {
        progress.current_streak.saturating_add(1)
    }
}

fn lesson_entry<'a>(
    progress: &'a mut UserProgress,
    lesson_id: &LessonId,
    at: DateTime<Utc>,
) -> &'a mut LessonProgress {
    progress
        .lesson_progress
        .entry(lesson_id.clone())
        .or_insert_with(|| LessonProgress::new(lesson_id.clone(), at))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerValue, QuestionId, Theme};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn complete(lesson: &str, score: u32, time_spent: u32, at: DateTime<Utc>) -> AppAction {
        AppAction::CompleteLesson {
            lesson_id: LessonId::new(lesson),
            score,
            time_spent,
            at,
        }
    }

    fn mistake(lesson: &str, question: &str, description: &str, at: DateTime<Utc>) -> AppAction {
        AppAction::AddMistake {
            lesson_id: LessonId::new(lesson),
            question: question.to_string(),
            error_description: description.to_string(),
            at,
        }
    }

    #[test]
    fn set_loading_and_error_touch_only_flags() {
        let state = AppState::initial();

        let state = reduce(&state, AppAction::SetLoading(false));
        assert!(!state.is_loading);
        assert_eq!(state.progress, UserProgress::initial());

        let state = reduce(&state, AppAction::SetError(Some("storage offline".into())));
        assert_eq!(state.error.as_deref(), Some("storage offline"));

        let state = reduce(&state, AppAction::SetError(None));
        assert_eq!(state.error, None);
    }

    #[test]
    fn complete_lesson_records_everything() {
        // Scenario A from the acceptance list.
        let state = AppState::initial();
        assert_eq!(state.progress.completed_lessons.len(), 0);

        let state = reduce(&state, complete("fractions", 30, 120, fixed_now()));

        let progress = &state.progress;
        assert!(progress.completed_lessons.contains(&LessonId::new("fractions")));
        assert_eq!(progress.total_score, 30);
        assert_eq!(progress.total_time_spent, 120);
        assert_eq!(progress.current_streak, 1);
        assert_eq!(progress.last_activity, Some(fixed_now()));

        let lesson = &progress.lesson_progress[&LessonId::new("fractions")];
        assert!(lesson.is_completed);
        assert_eq!(lesson.score, 30);
        assert_eq!(lesson.time_spent, 120);
    }

    #[test]
    fn same_day_completions_keep_streak() {
        let start = fixed_now();
        let state = AppState::initial();

        let state = reduce(&state, complete("fractions", 30, 120, start));
        assert_eq!(state.progress.current_streak, 1);

        let later_same_day = start + Duration::minutes(1);
        let state = reduce(&state, complete("patterns", 20, 90, later_same_day));
        assert_eq!(state.progress.current_streak, 1);
    }

    #[test]
    fn next_day_completion_increments_streak() {
        let start = fixed_now();
        let state = reduce(&AppState::initial(), complete("fractions", 30, 120, start));

        let next_day = start + Duration::days(1);
        let state = reduce(&state, complete("patterns", 20, 90, next_day));
        assert_eq!(state.progress.current_streak, 2);
    }

    #[test]
    fn missed_days_do_not_reset_streak() {
        let start = fixed_now();
        let state = reduce(&AppState::initial(), complete("fractions", 30, 120, start));

        // A completion a week later still only adds one active day.
        let much_later = start + Duration::days(7);
        let state = reduce(&state, complete("patterns", 20, 90, much_later));
        assert_eq!(state.progress.current_streak, 2);
    }

    #[test]
    fn complete_lesson_preserves_mistakes_and_answers() {
        let now = fixed_now();
        let state = reduce(
            &AppState::initial(),
            mistake("algebra", "2x = 6", "solved for the wrong variable", now),
        );
        let answers = {
            let mut patch = crate::model::LessonPatch::new();
            let mut map = std::collections::BTreeMap::new();
            map.insert(QuestionId::new("algebra-q1"), AnswerValue::from(3));
            patch.answers = Some(map);
            patch
        };
        let mut lessons = state.progress.lesson_progress.clone();
        answers.apply_to(lessons.get_mut(&LessonId::new("algebra")).unwrap(), now);
        let state = reduce(
            &state,
            AppAction::UpdateProgress(ProgressPatch {
                lesson_progress: Some(lessons),
                ..ProgressPatch::new()
            }),
        );

        let state = reduce(&state, complete("algebra", 50, 300, now));

        let lesson = &state.progress.lesson_progress[&LessonId::new("algebra")];
        assert!(lesson.is_completed);
        assert_eq!(lesson.mistakes.len(), 1);
        assert_eq!(lesson.answers.len(), 1);
    }

    #[test]
    fn mistakes_append_in_call_order() {
        let now = fixed_now();
        let state = reduce(
            &AppState::initial(),
            mistake("algebra", "2x = 6", "divided by 3 instead of 2", now),
        );
        let state = reduce(
            &state,
            mistake("algebra", "x + 4 = 9", "forgot to subtract", now),
        );

        let lesson = &state.progress.lesson_progress[&LessonId::new("algebra")];
        assert_eq!(lesson.mistakes.len(), 2);
        assert_eq!(lesson.mistakes[0].question, "2x = 6");
        assert_eq!(lesson.mistakes[1].question, "x + 4 = 9");
    }

    #[test]
    fn add_mistake_creates_the_lesson_entry() {
        let now = fixed_now();
        let state = reduce(
            &AppState::initial(),
            mistake("geometry", "area of a circle", "used diameter", now),
        );

        let lesson = &state.progress.lesson_progress[&LessonId::new("geometry")];
        assert!(!lesson.is_completed);
        assert_eq!(lesson.last_accessed, now);
        assert_eq!(lesson.score, 0);
    }

    #[test]
    fn update_score_leaves_total_score_alone() {
        // Scenario B: the two scoring tracks are independent on purpose.
        // Per-lesson score accumulates via UpdateScore while total_score
        // moves only on CompleteLesson; no reconciliation ties them.
        let state = reduce(
            &AppState::initial(),
            AppAction::UpdateScore {
                lesson_id: LessonId::new("patterns"),
                points: 10,
                at: fixed_now(),
            },
        );

        assert_eq!(
            state.progress.lesson_progress[&LessonId::new("patterns")].score,
            10
        );
        assert_eq!(state.progress.total_score, 0);
    }

    #[test]
    fn update_score_accumulates() {
        let at = fixed_now();
        let action = |points| AppAction::UpdateScore {
            lesson_id: LessonId::new("patterns"),
            points,
            at,
        };
        let state = reduce(&AppState::initial(), action(10));
        let state = reduce(&state, action(15));

        assert_eq!(
            state.progress.lesson_progress[&LessonId::new("patterns")].score,
            25
        );
    }

    #[test]
    fn mark_as_completed_leaves_score_and_time() {
        let now = fixed_now();
        let state = reduce(
            &AppState::initial(),
            AppAction::UpdateScore {
                lesson_id: LessonId::new("patterns"),
                points: 40,
                at: now,
            },
        );
        let state = reduce(
            &state,
            AppAction::MarkAsCompleted {
                lesson_id: LessonId::new("patterns"),
                at: now,
            },
        );

        let progress = &state.progress;
        assert!(progress.completed_lessons.contains(&LessonId::new("patterns")));
        let lesson = &progress.lesson_progress[&LessonId::new("patterns")];
        assert!(lesson.is_completed);
        assert_eq!(lesson.score, 40);
        assert_eq!(lesson.time_spent, 0);
        assert_eq!(progress.total_score, 0);
        assert_eq!(progress.total_time_spent, 0);
    }

    #[test]
    fn orthogonal_merges_do_not_touch_progress() {
        let state = reduce(
            &AppState::initial(),
            AppAction::SetCurrentLesson(Some(LessonId::new("fractions"))),
        );
        let state = reduce(
            &state,
            AppAction::UpdateSettings(SettingsPatch {
                theme: Some(Theme::Dark),
                ..SettingsPatch::new()
            }),
        );
        let state = reduce(
            &state,
            AppAction::UpdateUi(UiPatch {
                sidebar_open: Some(true),
                ..UiPatch::new()
            }),
        );

        assert_eq!(state.current_lesson, Some(LessonId::new("fractions")));
        assert_eq!(state.settings.theme, Theme::Dark);
        assert!(state.ui.sidebar_open);
        assert_eq!(state.progress, UserProgress::initial());
    }

    #[test]
    fn reset_is_idempotent() {
        let state = reduce(&AppState::initial(), complete("fractions", 30, 120, fixed_now()));

        let once = reduce(&state, AppAction::ResetApp);
        let twice = reduce(&once, AppAction::ResetApp);

        assert_eq!(once, AppState::initial());
        assert_eq!(once, twice);
    }

    #[test]
    fn counters_never_decrease_over_a_session() {
        let start = fixed_now();
        let mut state = AppState::initial();
        let actions = vec![
            AppAction::UpdateScore {
                lesson_id: LessonId::new("patterns"),
                points: 5,
                at: start,
            },
            mistake("patterns", "continue 2, 4, 8", "added instead of doubling", start),
            complete("patterns", 25, 60, start),
            complete("fractions", 30, 120, start + Duration::days(1)),
            AppAction::UpdateScore {
                lesson_id: LessonId::new("geometry"),
                points: 10,
                at: start + Duration::days(1),
            },
            AppAction::MarkAsCompleted {
                lesson_id: LessonId::new("geometry"),
                at: start + Duration::days(1),
            },
        ];

        for action in actions {
            let before = state.progress.clone();
            state = reduce(&state, action);
            let after = &state.progress;

            assert!(after.total_score >= before.total_score);
            assert!(after.total_time_spent >= before.total_time_spent);
            assert!(after.completed_lessons.is_superset(&before.completed_lessons));
            for (id, lesson) in &before.lesson_progress {
                assert!(after.lesson_progress[id].score >= lesson.score);
                assert!(after.lesson_progress[id].time_spent >= lesson.time_spent);
                assert!(after.lesson_progress[id].mistakes.len() >= lesson.mistakes.len());
            }
        }
    }
}
