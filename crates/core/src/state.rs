use crate::model::{AppSettings, LessonId, UiState, UserProgress};

/// The whole application state owned by the progress store.
///
/// Only `progress`, `settings` and `ui` are persisted; `current_lesson`,
/// `is_loading` and `error` are transient bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub progress: UserProgress,
    pub settings: AppSettings,
    pub ui: UiState,
    pub current_lesson: Option<LessonId>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl AppState {
    /// The hard-coded initial value: empty progress, default settings,
    /// and `is_loading` set until the startup load has been attempted.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            progress: UserProgress::initial(),
            settings: AppSettings::initial(),
            ui: UiState::initial(),
            current_lesson: None,
            is_loading: true,
            error: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::initial()
    }
}
