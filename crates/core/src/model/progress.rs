use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::answer::AnswerValue;
use crate::model::ids::{AchievementId, LessonId, QuestionId};

//
// ─── MISTAKE ───────────────────────────────────────────────────────────────────
//

/// A recorded first-incorrect-attempt event for a question within a lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct Mistake {
    pub question: String,
    pub error_description: String,
    pub recorded_at: DateTime<Utc>,
}

impl Mistake {
    #[must_use]
    pub fn new(
        question: impl Into<String>,
        error_description: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question: question.into(),
            error_description: error_description.into(),
            recorded_at,
        }
    }
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Per-lesson progress record, created lazily on first interaction.
///
/// `lesson_id` must equal the entry's key in `UserProgress::lesson_progress`;
/// the reducer and the storage codec both maintain that invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonProgress {
    pub lesson_id: LessonId,
    pub current_section: u32,
    pub completed_sections: BTreeSet<u32>,
    pub answers: BTreeMap<QuestionId, AnswerValue>,
    pub score: u32,
    pub time_spent: u32,
    pub is_completed: bool,
    pub mistakes: Vec<Mistake>,
    pub last_accessed: DateTime<Utc>,
}

impl LessonProgress {
    /// A fresh record for a lesson touched for the first time at `at`.
    #[must_use]
    pub fn new(lesson_id: LessonId, at: DateTime<Utc>) -> Self {
        Self {
            lesson_id,
            current_section: 0,
            completed_sections: BTreeSet::new(),
            answers: BTreeMap::new(),
            score: 0,
            time_spent: 0,
            is_completed: false,
            mistakes: Vec::new(),
            last_accessed: at,
        }
    }
}

//
// ─── USER PROGRESS ─────────────────────────────────────────────────────────────
//

/// Root progress aggregate, one instance per learner profile.
///
/// `completed_lessons` only grows, `total_score` and `total_time_spent` are
/// monotone, and `current_streak` counts distinct active calendar days (a
/// missed day does not reset it).
#[derive(Debug, Clone, PartialEq)]
pub struct UserProgress {
    pub completed_lessons: BTreeSet<LessonId>,
    pub lesson_progress: BTreeMap<LessonId, LessonProgress>,
    pub current_streak: u32,
    pub total_time_spent: u64,
    pub achievements: BTreeSet<AchievementId>,
    pub total_score: u64,
    /// Most recent completion time; `None` until the first completion so
    /// that a fresh profile's first completion starts the streak.
    pub last_activity: Option<DateTime<Utc>>,
}

impl UserProgress {
    /// The hard-coded initial value used before any persisted state exists.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            completed_lessons: BTreeSet::new(),
            lesson_progress: BTreeMap::new(),
            current_streak: 0,
            total_time_spent: 0,
            achievements: BTreeSet::new(),
            total_score: 0,
            last_activity: None,
        }
    }
}

impl Default for UserProgress {
    fn default() -> Self {
        Self::initial()
    }
}

/// Partial `UserProgress` for shallow merges (bulk rehydration from storage
/// and accessor-level upserts).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressPatch {
    pub completed_lessons: Option<BTreeSet<LessonId>>,
    pub lesson_progress: Option<BTreeMap<LessonId, LessonProgress>>,
    pub current_streak: Option<u32>,
    pub total_time_spent: Option<u64>,
    pub achievements: Option<BTreeSet<AchievementId>>,
    pub total_score: Option<u64>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ProgressPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch that replaces every field, used when seeding from storage.
    #[must_use]
    pub fn from_full(progress: UserProgress) -> Self {
        Self {
            completed_lessons: Some(progress.completed_lessons),
            lesson_progress: Some(progress.lesson_progress),
            current_streak: Some(progress.current_streak),
            total_time_spent: Some(progress.total_time_spent),
            achievements: Some(progress.achievements),
            total_score: Some(progress.total_score),
            last_activity: progress.last_activity,
        }
    }

    /// Shallow-merge this patch into `progress`, field by field.
    pub fn apply_to(self, progress: &mut UserProgress) {
        if let Some(completed) = self.completed_lessons {
            progress.completed_lessons = completed;
        }
        if let Some(lessons) = self.lesson_progress {
            progress.lesson_progress = lessons;
        }
        if let Some(streak) = self.current_streak {
            progress.current_streak = streak;
        }
        if let Some(time) = self.total_time_spent {
            progress.total_time_spent = time;
        }
        if let Some(achievements) = self.achievements {
            progress.achievements = achievements;
        }
        if let Some(score) = self.total_score {
            progress.total_score = score;
        }
        if let Some(at) = self.last_activity {
            progress.last_activity = Some(at);
        }
    }
}

/// Partial `LessonProgress` for accessor-level upserts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonPatch {
    pub current_section: Option<u32>,
    pub completed_sections: Option<BTreeSet<u32>>,
    pub answers: Option<BTreeMap<QuestionId, AnswerValue>>,
    pub score: Option<u32>,
    pub time_spent: Option<u32>,
    pub is_completed: Option<bool>,
}

impl LessonPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow-merge into an existing record. `is_completed` never reverts
    /// to false and mistakes are untouched (append-only, reducer-owned).
    pub fn apply_to(self, lesson: &mut LessonProgress, at: DateTime<Utc>) {
        if let Some(section) = self.current_section {
            lesson.current_section = section;
        }
        if let Some(sections) = self.completed_sections {
            lesson.completed_sections = sections;
        }
        if let Some(answers) = self.answers {
            lesson.answers.extend(answers);
        }
        if let Some(score) = self.score {
            lesson.score = score;
        }
        if let Some(time) = self.time_spent {
            lesson.time_spent = time;
        }
        if let Some(true) = self.is_completed {
            lesson.is_completed = true;
        }
        lesson.last_accessed = at;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn initial_progress_is_empty() {
        let progress = UserProgress::initial();
        assert!(progress.completed_lessons.is_empty());
        assert!(progress.lesson_progress.is_empty());
        assert_eq!(progress.current_streak, 0);
        assert_eq!(progress.total_score, 0);
        assert_eq!(progress.last_activity, None);
    }

    #[test]
    fn full_patch_replaces_everything() {
        let mut target = UserProgress::initial();
        let mut source = UserProgress::initial();
        source.completed_lessons.insert(LessonId::new("fractions"));
        source.current_streak = 4;
        source.total_score = 120;
        source.last_activity = Some(fixed_now());

        ProgressPatch::from_full(source.clone()).apply_to(&mut target);
        assert_eq!(target, source);
    }

    #[test]
    fn empty_patch_is_identity() {
        let mut progress = UserProgress::initial();
        progress.total_score = 55;
        let before = progress.clone();

        ProgressPatch::new().apply_to(&mut progress);
        assert_eq!(progress, before);
    }

    #[test]
    fn lesson_patch_never_reverts_completion() {
        let now = fixed_now();
        let mut lesson = LessonProgress::new(LessonId::new("algebra"), now);
        lesson.is_completed = true;

        let patch = LessonPatch {
            is_completed: Some(false),
            ..LessonPatch::new()
        };
        patch.apply_to(&mut lesson, now);
        assert!(lesson.is_completed);
    }

    #[test]
    fn lesson_patch_merges_answers() {
        let now = fixed_now();
        let mut lesson = LessonProgress::new(LessonId::new("algebra"), now);
        lesson
            .answers
            .insert(QuestionId::new("q1"), AnswerValue::from(3));

        let mut incoming = BTreeMap::new();
        incoming.insert(QuestionId::new("q2"), AnswerValue::text("x=2"));
        let patch = LessonPatch {
            answers: Some(incoming),
            ..LessonPatch::new()
        };
        patch.apply_to(&mut lesson, now);

        assert_eq!(lesson.answers.len(), 2);
    }
}
