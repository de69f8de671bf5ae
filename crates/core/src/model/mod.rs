mod answer;
mod catalog;
mod ids;
mod progress;
mod settings;

pub use answer::AnswerValue;
pub use catalog::{Catalog, CatalogError, Lesson, Question, Section, SectionKind};
pub use ids::{AchievementId, LessonId, QuestionId};

pub use progress::{LessonPatch, LessonProgress, Mistake, ProgressPatch, UserProgress};
pub use settings::{AppSettings, SettingsPatch, Theme, UiPatch, UiState};
