use crate::models::user::{User, PASSWORD_FIELD};
use crate::stores::storage::{keys, Storage};
use crate::sync::bus::{AppEvent, EventBus};
use crate::utils::time::current_timestamp_millis;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Owner of the cached logged-in user record
pub struct UserStore {
    storage: Arc<dyn Storage>,
    events: EventBus<AppEvent>,
}

impl UserStore {
    /// Create the store and purge the legacy plaintext user list if present
    pub fn new(storage: Arc<dyn Storage>, events: EventBus<AppEvent>) -> Self {
        if storage.get(keys::LEGACY_USERS).is_some() {
            warn!("Removing insecure user data from storage");
            storage.remove(keys::LEGACY_USERS);
        }

        Self { storage, events }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn events(&self) -> &EventBus<AppEvent> {
        &self.events
    }

    /// Read the cached user.
    ///
    /// A password that somehow reached storage is stripped here and the
    /// cleaned record written back.
    pub fn get_current_user(&self) -> Option<User> {
        let raw = self.storage.get(keys::CURRENT_USER)?;

        let mut value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Cached user record is not valid JSON");
                return None;
            }
        };

        let had_password = value
            .as_object_mut()
            .map(|record| record.remove(PASSWORD_FIELD).is_some())
            .unwrap_or(false);

        let user: User = match serde_json::from_value(value) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Cached user record has an unexpected shape");
                return None;
            }
        };

        if had_password {
            warn!(user_id = user.id, "Password found in cached user record, removing it");
            self.set_current_user(Some(&user));
        }

        Some(user)
    }

    /// Write a sanitized copy, or clear the cache with `None`.
    ///
    /// Always publishes `CurrentUserChanged`.
    pub fn set_current_user(&self, user: Option<&User>) {
        match user {
            Some(user) => {
                let safe = user.sanitized();
                match serde_json::to_string(&safe) {
                    Ok(json) => self.storage.set(keys::CURRENT_USER, &json),
                    Err(e) => warn!(user_id = user.id, error = %e, "Failed to serialize user record"),
                }
            }
            None => self.storage.remove(keys::CURRENT_USER),
        }

        self.events.publish(AppEvent::CurrentUserChanged {
            user_id: user.map(|u| u.id),
        });
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Last cross-instance update marker
    pub fn update_trigger(&self) -> Option<i64> {
        self.storage.get(keys::UPDATE_TRIGGER).and_then(|raw| raw.parse().ok())
    }

    /// Write a marker strictly greater than the previous one and return it
    pub fn bump_update_trigger(&self) -> i64 {
        let now = current_timestamp_millis();
        let next = match self.update_trigger() {
            Some(previous) if previous >= now => previous + 1,
            _ => now,
        };
        self.storage.set(keys::UPDATE_TRIGGER, &next.to_string());
        next
    }
}
