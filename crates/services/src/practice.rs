use std::collections::BTreeMap;
use std::sync::Arc;

use tutor_core::model::{AnswerValue, LessonId, LessonPatch, Question};

use crate::store::ProgressStore;

/// Outcome of grading one submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Correct { points_awarded: u32 },
    Incorrect { mistake_recorded: bool },
}

/// Walks a lesson's question set, enforcing the practice protocol: at most
/// one recorded mistake per question per attempt cycle, points on the
/// eventual correct answer, and an explicit completion at the end.
///
/// The flow only tracks the *current* attempt cycle; moving to the next
/// question resets the mistake flag.
pub struct PracticeFlow {
    store: Arc<ProgressStore>,
    lesson_id: LessonId,
    has_made_mistake: bool,
}

impl PracticeFlow {
    #[must_use]
    pub fn new(store: Arc<ProgressStore>, lesson_id: LessonId) -> Self {
        Self {
            store,
            lesson_id,
            has_made_mistake: false,
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    /// Grade a submitted answer against the catalog question.
    ///
    /// The submitted answer is always recorded (latest wins). A wrong
    /// answer records a mistake only on the first try of this cycle; a
    /// correct answer awards the question's points and starts the next
    /// cycle.
    pub fn submit(&mut self, question: &Question, answer: AnswerValue) -> SubmitOutcome {
        let mut answers = BTreeMap::new();
        answers.insert(question.id.clone(), answer.clone());
        self.store.update_lesson_progress(
            self.lesson_id.clone(),
            LessonPatch {
                answers: Some(answers),
                ..LessonPatch::new()
            },
        );

        if answer.matches(&question.answer) {
            self.store
                .update_score(self.lesson_id.clone(), question.points);
            self.has_made_mistake = false;
            return SubmitOutcome::Correct {
                points_awarded: question.points,
            };
        }

        let mistake_recorded = !self.has_made_mistake;
        if mistake_recorded {
            self.store.add_mistake(
                self.lesson_id.clone(),
                question.prompt.clone(),
                format!("submitted {answer}"),
            );
            self.has_made_mistake = true;
        }
        SubmitOutcome::Incorrect { mistake_recorded }
    }

    /// Move on without a correct answer (skip), starting a new attempt
    /// cycle.
    pub fn next_question(&mut self) {
        self.has_made_mistake = false;
    }

    /// Exhausted the question set: flag the lesson completed. Scoring has
    /// already accumulated through `update_score`.
    pub fn finish(self) {
        self.store.mark_as_completed(self.lesson_id);
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
