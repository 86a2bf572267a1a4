use crate::api::client::ApiClient;
use crate::api::response::ApiResponse;
use crate::core::error::ValidationError;
use crate::models::catalog::{
    ClientVersion, ClientVersionPatch, Incident, IncidentStatus, LicenseKey, NewClientVersion, NewIncident,
};
use crate::models::user::{SubscriptionTier, User};
use crate::stores::storage::{keys, Storage};
use crate::utils::time::current_timestamp_millis;
use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const KEY_GROUPS: usize = 4;
const KEY_GROUP_LEN: usize = 4;

/// Random license key such as `7KQ2-M9XD-AB3F-ZP8W`
pub fn generate_key() -> String {
    let mut rng = rand::rng();

    (0..KEY_GROUPS)
        .map(|_| {
            (0..KEY_GROUP_LEN)
                .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Batch of fresh, unused keys for `product`
pub fn new_keys(product: &str, duration: u32, count: usize) -> Vec<LicenseKey> {
    let created_at = Utc::now().to_rfc3339();
    let base = current_timestamp_millis();

    (0..count)
        .map(|i| LicenseKey {
            id: format!("{}-{}", base, i),
            key: generate_key(),
            product: product.to_string(),
            duration,
            is_used: false,
            used_by: None,
            created_by: None,
            created_at: Some(created_at.clone()),
        })
        .collect()
}

/// Key list as last loaded, with where it came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyList {
    pub keys: Vec<LicenseKey>,
    /// Served from the local fallback because the API was unavailable
    pub offline: bool,
}

/// Operations behind the admin panel
pub struct AdminService {
    api: ApiClient,
    storage: Arc<dyn Storage>,
    admin_id: u64,
    keys: RwLock<KeyList>,
    versions: RwLock<Vec<ClientVersion>>,
}

impl AdminService {
    pub fn new(api: ApiClient, storage: Arc<dyn Storage>, admin_id: u64) -> Self {
        Self {
            api,
            storage,
            admin_id,
            keys: RwLock::new(KeyList::default()),
            versions: RwLock::new(Vec::new()),
        }
    }

    /// Build the service for a signed-in admin
    pub fn for_user(api: ApiClient, storage: Arc<dyn Storage>, user: &User) -> Option<Self> {
        user.is_admin.then(|| Self::new(api, storage, user.id))
    }

    // Users

    /// All users, or an empty list when the API is unavailable
    pub async fn users(&self) -> Vec<User> {
        let response = self.api.get_all_users().await;
        if !response.success {
            warn!(message = ?response.message, "API unavailable, cannot load users");
        }
        response.into_data().unwrap_or_default()
    }

    pub async fn delete_user(&self, user_id: u64) -> ApiResponse<Value> {
        let response = self.api.delete_user(user_id).await;
        if response.success {
            info!(admin_id = self.admin_id, user_id, "User deleted");
        }
        response
    }

    pub async fn change_subscription(&self, user_id: u64, tier: SubscriptionTier) -> ApiResponse<Value> {
        let response = self.api.change_user_subscription(user_id, tier).await;
        if response.success {
            info!(admin_id = self.admin_id, user_id, tier = tier.as_str(), "Subscription changed");
        }
        response
    }

    // License keys

    pub async fn keys(&self) -> KeyList {
        self.keys.read().await.clone()
    }

    /// Load keys from the API, falling back to the locally saved list
    pub async fn load_keys(&self) -> KeyList {
        let response = self.api.list_keys().await;

        let list = match response.data {
            Some(keys) if response.success => KeyList { keys, offline: false },
            _ => {
                debug!("Key API unavailable, using local key list");
                KeyList {
                    keys: self.offline_keys(),
                    offline: true,
                }
            }
        };

        *self.keys.write().await = list.clone();
        list
    }

    /// Create keys stamped with the admin's id.
    ///
    /// When the API rejects or cannot be reached, the keys are prepended to
    /// the local list instead so the panel stays usable.
    pub async fn create_keys(&self, new_keys: Vec<LicenseKey>) -> KeyList {
        let stamped: Vec<LicenseKey> = new_keys
            .into_iter()
            .map(|key| LicenseKey {
                created_by: Some(self.admin_id),
                ..key
            })
            .collect();

        let response = self.api.create_keys(&stamped).await;
        if response.success {
            info!(admin_id = self.admin_id, count = stamped.len(), "License keys created");
            return self.load_keys().await;
        }

        warn!(message = ?response.message, "Key API unavailable, saving keys locally");
        let mut keys = stamped;
        keys.extend(self.offline_keys());
        self.save_offline_keys(&keys);

        let list = KeyList { keys, offline: true };
        *self.keys.write().await = list.clone();
        list
    }

    pub async fn delete_key(&self, key_id: &str) -> KeyList {
        let response = self.api.delete_key(key_id).await;
        if response.success {
            return self.load_keys().await;
        }

        warn!(key_id, message = ?response.message, "Key API unavailable, deleting locally");
        let keys: Vec<LicenseKey> = self.offline_keys().into_iter().filter(|k| k.id != key_id).collect();
        self.save_offline_keys(&keys);

        let list = KeyList { keys, offline: true };
        *self.keys.write().await = list.clone();
        list
    }

    fn offline_keys(&self) -> Vec<LicenseKey> {
        self.storage
            .get(keys::OFFLINE_LICENSE_KEYS)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn save_offline_keys(&self, list: &[LicenseKey]) {
        match serde_json::to_string(list) {
            Ok(json) => self.storage.set(keys::OFFLINE_LICENSE_KEYS, &json),
            Err(e) => warn!(error = %e, "Failed to serialize local key list"),
        }
    }

    // Client versions

    pub async fn versions(&self) -> Vec<ClientVersion> {
        self.versions.read().await.clone()
    }

    pub async fn load_versions(&self) -> Vec<ClientVersion> {
        let response = self.api.list_versions().await;
        if !response.success {
            warn!(message = ?response.message, "Failed to load client versions");
        }

        let versions = response.into_data().unwrap_or_default();
        *self.versions.write().await = versions.clone();
        versions
    }

    pub async fn create_version(&self, version: &NewClientVersion) -> ApiResponse<ClientVersion> {
        let response = self.api.create_version(version).await;
        if response.success {
            self.load_versions().await;
        }
        response
    }

    pub async fn update_version(&self, id: u64, patch: &ClientVersionPatch) -> ApiResponse<ClientVersion> {
        let response = self.api.update_version(id, patch).await;
        if response.success {
            self.load_versions().await;
        }
        response
    }

    pub async fn delete_version(&self, id: u64) -> ApiResponse<Value> {
        let response = self.api.delete_version(id).await;
        if response.success {
            self.load_versions().await;
        }
        response
    }

    // Incidents

    pub async fn incidents(&self) -> Vec<Incident> {
        self.api.list_incidents().await.into_data().unwrap_or_default()
    }

    pub async fn create_incident(&self, incident: NewIncident) -> Result<ApiResponse<Incident>, ValidationError> {
        if incident.title.trim().is_empty() {
            return Err(ValidationError::EmptyIncidentTitle);
        }

        Ok(self.api.create_incident(self.admin_id, &incident).await)
    }

    pub async fn add_incident_update(
        &self,
        incident_id: &str,
        status: IncidentStatus,
        message: &str,
    ) -> Result<ApiResponse<Value>, ValidationError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyIncidentMessage);
        }

        Ok(self.api.add_incident_update(self.admin_id, incident_id, status, message).await)
    }

    pub async fn delete_incident(&self, incident_id: &str) -> ApiResponse<Value> {
        self.api.delete_incident(self.admin_id, incident_id).await
    }
}
