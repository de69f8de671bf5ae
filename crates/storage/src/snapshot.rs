//! Persisted snapshot shapes and the conversions to and from the
//! in-memory model.
//!
//! The wire format keeps the original client's conventions: camelCase
//! keys, sets as arrays, datetimes as RFC 3339 strings, and mistake
//! timestamps as epoch milliseconds. Decoding is tolerant: persisted data
//! may predate a schema change, so every missing field falls back to a
//! default instead of failing. Only a blob that is not
//! JSON at all is a hard error, and callers treat that as "no saved
//! state".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use tutor_core::AppState;
use tutor_core::model::{
    AchievementId, AnswerValue, AppSettings, LessonId, LessonProgress, Mistake, QuestionId, Theme,
    UiState, UserProgress,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

//
// ─── WIRE SHAPES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSnapshot {
    pub progress: ProgressSnapshot,
    pub settings: SettingsSnapshot,
    pub ui: UiSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressSnapshot {
    pub completed_lessons: Vec<LessonId>,
    pub lesson_progress: BTreeMap<LessonId, LessonSnapshot>,
    pub current_streak: u32,
    pub total_time_spent: u64,
    pub achievements: Vec<AchievementId>,
    pub total_score: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonSnapshot {
    pub lesson_id: Option<LessonId>,
    pub current_section: u32,
    pub completed_sections: Vec<u32>,
    pub answers: BTreeMap<QuestionId, AnswerValue>,
    pub score: u32,
    pub time_spent: u32,
    pub is_completed: bool,
    pub mistakes: Vec<MistakeSnapshot>,
    pub last_accessed: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MistakeSnapshot {
    pub question: String,
    pub error_description: String,
    /// Epoch milliseconds, matching the original client's `Date.now()`.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsSnapshot {
    pub theme: Theme,
    pub language: String,
    pub sound_enabled: bool,
    pub animations_enabled: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self::from_settings(&AppSettings::initial())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiSnapshot {
    pub sidebar_open: bool,
    pub current_view: String,
}

impl Default for UiSnapshot {
    fn default() -> Self {
        Self::from_ui(&UiState::initial())
    }
}

//
// ─── ENCODE / DECODE ───────────────────────────────────────────────────────────
//

/// Encode the persistable slice of the state as a JSON string.
///
/// # Errors
///
/// Returns `CodecError` if JSON serialization fails.
pub fn encode_state(state: &AppState) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&AppSnapshot::from_state(state))?)
}

/// Decode a raw persisted blob.
///
/// # Errors
///
/// Returns `CodecError` only when the blob is not parseable JSON; missing
/// or partial fields decode to defaults.
pub fn decode_str(raw: &str) -> Result<AppSnapshot, CodecError> {
    Ok(serde_json::from_str(raw)?)
}

impl AppSnapshot {
    #[must_use]
    pub fn from_state(state: &AppState) -> Self {
        Self {
            progress: ProgressSnapshot::from_progress(&state.progress),
            settings: SettingsSnapshot::from_settings(&state.settings),
            ui: UiSnapshot::from_ui(&state.ui),
        }
    }

    /// Convert back into model parts. Infallible: anything the snapshot
    /// is missing or cannot represent degrades to the initial value for
    /// that field.
    #[must_use]
    pub fn into_parts(self) -> (UserProgress, AppSettings, UiState) {
        (
            self.progress.into_progress(),
            self.settings.into_settings(),
            self.ui.into_ui(),
        )
    }
}

impl ProgressSnapshot {
    #[must_use]
    pub fn from_progress(progress: &UserProgress) -> Self {
        Self {
            completed_lessons: progress.completed_lessons.iter().cloned().collect(),
            lesson_progress: progress
                .lesson_progress
                .iter()
                .map(|(id, lesson)| (id.clone(), LessonSnapshot::from_lesson(lesson)))
                .collect(),
            current_streak: progress.current_streak,
            total_time_spent: progress.total_time_spent,
            achievements: progress.achievements.iter().cloned().collect(),
            total_score: progress.total_score,
            last_activity: progress.last_activity.map(encode_time),
        }
    }

    #[must_use]
    pub fn into_progress(self) -> UserProgress {
        UserProgress {
            completed_lessons: self.completed_lessons.into_iter().collect(),
            lesson_progress: self
                .lesson_progress
                .into_iter()
                .map(|(id, lesson)| {
                    let lesson = lesson.into_lesson(id.clone());
                    (id, lesson)
                })
                .collect(),
            current_streak: self.current_streak,
            total_time_spent: self.total_time_spent,
            achievements: self.achievements.into_iter().collect(),
            total_score: self.total_score,
            last_activity: self.last_activity.as_deref().and_then(decode_time),
        }
    }
}

impl LessonSnapshot {
    #[must_use]
    pub fn from_lesson(lesson: &LessonProgress) -> Self {
        Self {
            lesson_id: Some(lesson.lesson_id.clone()),
            current_section: lesson.current_section,
            completed_sections: lesson.completed_sections.iter().copied().collect(),
            answers: lesson.answers.clone(),
            score: lesson.score,
            time_spent: lesson.time_spent,
            is_completed: lesson.is_completed,
            mistakes: lesson.mistakes.iter().map(MistakeSnapshot::from_mistake).collect(),
            last_accessed: Some(encode_time(lesson.last_accessed)),
        }
    }

    /// Rehydrate, normalizing `lesson_id` to the parent map key so the
    /// key/field invariant holds even for hand-edited or stale data.
    #[must_use]
    pub fn into_lesson(self, key: LessonId) -> LessonProgress {
        LessonProgress {
            lesson_id: key,
            current_section: self.current_section,
            completed_sections: self.completed_sections.into_iter().collect(),
            answers: self.answers,
            score: self.score,
            time_spent: self.time_spent,
            is_completed: self.is_completed,
            mistakes: self
                .mistakes
                .into_iter()
                .map(MistakeSnapshot::into_mistake)
                .collect(),
            last_accessed: self
                .last_accessed
                .as_deref()
                .and_then(decode_time)
                .unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}

impl MistakeSnapshot {
    #[must_use]
    pub fn from_mistake(mistake: &Mistake) -> Self {
        Self {
            question: mistake.question.clone(),
            error_description: mistake.error_description.clone(),
            timestamp: mistake.recorded_at.timestamp_millis(),
        }
    }

    #[must_use]
    pub fn into_mistake(self) -> Mistake {
        Mistake {
            question: self.question,
            error_description: self.error_description,
            recorded_at: DateTime::from_timestamp_millis(self.timestamp)
                .unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}

impl SettingsSnapshot {
    #[must_use]
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            theme: settings.theme,
            language: settings.language.clone(),
            sound_enabled: settings.sound_enabled,
            animations_enabled: settings.animations_enabled,
        }
    }

    #[must_use]
    pub fn into_settings(self) -> AppSettings {
        AppSettings {
            theme: self.theme,
            language: self.language,
            sound_enabled: self.sound_enabled,
            animations_enabled: self.animations_enabled,
        }
    }
}

impl UiSnapshot {
    #[must_use]
    pub fn from_ui(ui: &UiState) -> Self {
        Self {
            sidebar_open: ui.sidebar_open,
            current_view: ui.current_view.clone(),
        }
    }

    #[must_use]
    pub fn into_ui(self) -> UiState {
        UiState {
            sidebar_open: self.sidebar_open,
            current_view: self.current_view,
        }
    }
}

fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn decode_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
