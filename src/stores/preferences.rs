use crate::stores::storage::{keys, Storage};
use crate::sync::bus::{AppEvent, EventBus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const SUPPORTED_LANGUAGES: &[&str] = &["en"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// UI settings blob; unknown keys are preserved
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Language, UI settings and the session verification flag
pub struct Preferences {
    storage: Arc<dyn Storage>,
    /// Cleared when the process exits, like a browser session
    session: Arc<dyn Storage>,
    events: EventBus<AppEvent>,
}

impl Preferences {
    pub fn new(storage: Arc<dyn Storage>, session: Arc<dyn Storage>, events: EventBus<AppEvent>) -> Self {
        Self { storage, session, events }
    }

    pub fn language(&self) -> String {
        self.storage
            .get(keys::LANGUAGE)
            .filter(|lang| SUPPORTED_LANGUAGES.contains(&lang.as_str()))
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    /// Returns false for unsupported languages
    pub fn set_language(&self, language: &str) -> bool {
        if !SUPPORTED_LANGUAGES.contains(&language) {
            return false;
        }

        self.storage.set(keys::LANGUAGE, language);
        self.events.publish(AppEvent::LanguageChanged {
            language: language.to_string(),
        });
        true
    }

    pub fn settings(&self) -> UserSettings {
        self.storage
            .get(keys::USER_SETTINGS)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn theme(&self) -> Theme {
        self.settings().theme
    }

    pub fn set_settings(&self, settings: &UserSettings) {
        if let Ok(json) = serde_json::to_string(settings) {
            self.storage.set(keys::USER_SETTINGS, &json);
        }
        self.events.publish(AppEvent::SettingsChanged { theme: settings.theme });
    }

    pub fn set_theme(&self, theme: Theme) {
        let mut settings = self.settings();
        settings.theme = theme;
        self.set_settings(&settings);
    }

    pub fn session_verified(&self) -> bool {
        self.session.get(keys::SESSION_VERIFIED).as_deref() == Some("true")
    }

    pub fn mark_session_verified(&self) {
        self.session.set(keys::SESSION_VERIFIED, "true");
    }

}
