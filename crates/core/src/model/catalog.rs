use thiserror::Error;

use crate::model::answer::AnswerValue;
use crate::model::ids::{LessonId, QuestionId};

//
// ─── CATALOG SHAPES ────────────────────────────────────────────────────────────
//

/// One page of lesson content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    Visualization,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub kind: SectionKind,
}

impl Section {
    #[must_use]
    pub fn text(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: SectionKind::Text,
        }
    }

    #[must_use]
    pub fn visualization(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: SectionKind::Visualization,
        }
    }
}

/// A practice question. The progress core only ever reads `id`, `answer`
/// and `points`; prompt text is carried for the shell.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub answer: AnswerValue,
    pub points: u32,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        answer: AnswerValue,
        points: u32,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            answer,
            points,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("lesson id must not be empty")]
    EmptyLessonId,

    #[error("lesson '{0}' has no sections")]
    NoSections(LessonId),
}

/// A static, ordered sequence of content sections plus a question set.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    sections: Vec<Section>,
    questions: Vec<Question>,
}

impl Lesson {
    /// Build a lesson, validating its identity and shape.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyLessonId` for a blank id and
    /// `CatalogError::NoSections` for a lesson without content.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        sections: Vec<Section>,
        questions: Vec<Question>,
    ) -> Result<Self, CatalogError> {
        if id.as_str().trim().is_empty() {
            return Err(CatalogError::EmptyLessonId);
        }
        if sections.is_empty() {
            return Err(CatalogError::NoSections(id));
        }
        Ok(Self {
            id,
            title: title.into(),
            sections,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

/// Lookup over the static lesson catalog. Only the denominator for
/// progress percentages and the expected answers ever flow into the core.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    lessons: Vec<Lesson>,
}

impl Catalog {
    #[must_use]
    pub fn new(lessons: Vec<Lesson>) -> Self {
        Self { lessons }
    }

    #[must_use]
    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.id() == id)
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}
