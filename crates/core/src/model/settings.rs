use serde::{Deserialize, Serialize};

/// Visual theme selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Learner-facing application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub theme: Theme,
    pub language: String,
    pub sound_enabled: bool,
    pub animations_enabled: bool,
}

impl AppSettings {
    #[must_use]
    pub fn initial() -> Self {
        Self {
            theme: Theme::Light,
            language: "en".to_string(),
            sound_enabled: true,
            animations_enabled: true,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::initial()
    }
}

/// Partial settings update, merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub sound_enabled: Option<bool>,
    pub animations_enabled: Option<bool>,
}

impl SettingsPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_full(settings: AppSettings) -> Self {
        Self {
            theme: Some(settings.theme),
            language: Some(settings.language),
            sound_enabled: Some(settings.sound_enabled),
            animations_enabled: Some(settings.animations_enabled),
        }
    }

    pub fn apply_to(self, settings: &mut AppSettings) {
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(sound) = self.sound_enabled {
            settings.sound_enabled = sound;
        }
        if let Some(animations) = self.animations_enabled {
            settings.animations_enabled = animations;
        }
    }
}

/// Transient page-shell state. `current_view` stays a free-form string so
/// persisted values from older builds keep decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub sidebar_open: bool,
    pub current_view: String,
}

impl UiState {
    #[must_use]
    pub fn initial() -> Self {
        Self {
            sidebar_open: false,
            current_view: "home".to_string(),
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Partial UI-state update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiPatch {
    pub sidebar_open: Option<bool>,
    pub current_view: Option<String>,
}

impl UiPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_full(ui: UiState) -> Self {
        Self {
            sidebar_open: Some(ui.sidebar_open),
            current_view: Some(ui.current_view),
        }
    }

    pub fn apply_to(self, ui: &mut UiState) {
        if let Some(open) = self.sidebar_open {
            ui.sidebar_open = open;
        }
        if let Some(view) = self.current_view {
            ui.current_view = view;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_patch_merges_only_present_fields() {
        let mut settings = AppSettings::initial();
        let patch = SettingsPatch {
            theme: Some(Theme::Dark),
            ..SettingsPatch::new()
        };
        patch.apply_to(&mut settings);

        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.language, "en");
        assert!(settings.sound_enabled);
    }

    #[test]
    fn ui_patch_merges_only_present_fields() {
        let mut ui = UiState::initial();
        let patch = UiPatch {
            sidebar_open: Some(true),
            ..UiPatch::new()
        };
        patch.apply_to(&mut ui);

        assert!(ui.sidebar_open);
        assert_eq!(ui.current_view, "home");
    }
}
