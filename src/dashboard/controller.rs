use crate::api::client::{ApiClient, UserSource};
use crate::core::config::AvatarConfig;
use crate::core::error::ValidationError;
use crate::dashboard::navigation::Route;
use crate::dashboard::notifications::NotificationCenter;
use crate::media::compressor::{compress_image, file_to_data_uri, needs_compression, CompressOptions};
use crate::models::catalog::KeyActivation;
use crate::models::user::{User, UserProfile};
use crate::stores::user_store::UserStore;
use crate::sync::manager::{Subscription, UserSyncManager};
use crate::sync::merge::merge_user;
use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of opening the dashboard
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Ready(User),
    Redirect(Route),
}

/// Actions available on the user dashboard
pub struct Dashboard<S: UserSource> {
    api: ApiClient,
    store: Arc<UserStore>,
    sync: UserSyncManager<S>,
    avatar: AvatarConfig,
    notifications: NotificationCenter,
}

impl<S: UserSource> Dashboard<S> {
    pub fn new(
        api: ApiClient,
        store: Arc<UserStore>,
        sync: UserSyncManager<S>,
        avatar: AvatarConfig,
        notifications: NotificationCenter,
    ) -> Self {
        Self {
            api,
            store,
            sync,
            avatar,
            notifications,
        }
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn current_user(&self) -> Option<User> {
        self.store.get_current_user()
    }

    /// Show the dashboard, starting live sync for the signed-in user
    pub fn open(&self) -> DashboardView {
        match self.store.get_current_user() {
            Some(user) => {
                self.sync.init(user.id);
                DashboardView::Ready(user)
            }
            None => DashboardView::Redirect(Route::Auth),
        }
    }

    /// Receive every record the sync manager delivers while open
    pub fn on_user_update(&self, listener: impl Fn(&User) -> Result<()> + Send + Sync + 'static) -> Subscription {
        self.sync.subscribe(listener)
    }

    /// Leave the dashboard and stop syncing
    pub fn close(&self) {
        self.sync.destroy();
    }

    /// Apply an edit locally right away, then persist it to the server.
    ///
    /// The returned task resolves to the merged server record, or `None`
    /// when the request failed or a newer local edit superseded this one.
    pub fn update_user_data(&self, user: User) -> JoinHandle<Option<User>> {
        let mut user = user;
        user.bump_revision();

        self.store.set_current_user(Some(&user));
        self.sync.notify_local_update(&user);

        let api = self.api.clone();
        let store = Arc::clone(&self.store);
        let sync = self.sync.clone();

        tokio::spawn(async move {
            let updates = json!({
                "avatar": user.avatar,
                "subscription": user.subscription,
                "settings": user.settings,
            });

            let response = api.update_user(user.id, &updates).await;
            if !response.success {
                warn!(user_id = user.id, message = ?response.message, "Failed to persist user update");
                sync.confirm_local_update(user.revision);
                return None;
            }

            let current_revision = store.get_current_user().and_then(|u| u.revision);
            if current_revision > user.revision {
                debug!(user_id = user.id, "Newer local edit exists, dropping server response");
                sync.confirm_local_update(user.revision);
                return None;
            }

            let merged = response.into_data().and_then(|server| merge_user(Some(&user), &server));
            if let Some(merged) = &merged {
                store.set_current_user(Some(merged));
                sync.notify_local_update(merged);
            }
            sync.confirm_local_update(user.revision);
            merged
        })
    }

    pub fn save_profile(&self, display_name: &str) -> Result<JoinHandle<Option<User>>, ValidationError> {
        let mut user = self.store.get_current_user().ok_or(ValidationError::NotSignedIn)?;

        let display_name = display_name.trim();
        if display_name.is_empty() {
            self.notifications.error(ValidationError::BlankDisplayName.to_string());
            return Err(ValidationError::BlankDisplayName);
        }

        user.profile = Some(UserProfile {
            display_name: Some(display_name.to_string()),
        });

        let task = self.update_user_data(user);
        self.notifications.success("Profile saved");
        Ok(task)
    }

    /// Replace the avatar with an uploaded file.
    ///
    /// Files over the size budget are downscaled and re-encoded first.
    pub async fn change_avatar(&self, bytes: Vec<u8>, mime: &str) -> Result<JoinHandle<Option<User>>> {
        let result = self.prepare_avatar(bytes, mime).await;

        let (user, avatar) = match result {
            Ok(prepared) => prepared,
            Err(e) => {
                self.notifications.error(e.to_string());
                return Err(e);
            }
        };

        let task = self.update_user_data(User {
            avatar: Some(avatar),
            ..user
        });
        self.notifications.success("Avatar updated");
        Ok(task)
    }

    async fn prepare_avatar(&self, bytes: Vec<u8>, mime: &str) -> Result<(User, String)> {
        let user = self.store.get_current_user().ok_or(ValidationError::NotSignedIn)?;

        let size = bytes.len() as u64;
        let max = self.avatar.max_upload_mb * 1024 * 1024;
        if size > max {
            return Err(ValidationError::FileTooLarge { size, max }.into());
        }

        let avatar = if needs_compression(size, self.avatar.max_size_kb) {
            let options = CompressOptions::from(&self.avatar);
            tokio::task::spawn_blocking(move || compress_image(&bytes, &options))
                .await
                .context("Avatar compression task failed")??
        } else {
            file_to_data_uri(&bytes, mime)
        };

        Ok((user, avatar))
    }

    /// Redeem a license key for the signed-in user
    pub async fn activate_key(&self, input: &str) -> Result<KeyActivation> {
        let key = input.trim().to_uppercase();
        if key.is_empty() {
            self.notifications.error(ValidationError::EmptyLicenseKey.to_string());
            bail!(ValidationError::EmptyLicenseKey);
        }

        let user = self.store.get_current_user().ok_or(ValidationError::NotSignedIn)?;

        let response = self.api.activate_key(&key, user.id).await;
        if !response.success {
            let message = response.message_or("Key activation failed").to_string();
            self.notifications.error(message.clone());
            return Err(anyhow!(message));
        }

        let activation = response
            .into_data()
            .ok_or_else(|| anyhow!("Key activation returned no data"))?;

        let subscription_end_date = activation
            .subscription_end_date
            .clone()
            .or_else(|| user.subscription_end_date.clone());

        self.update_user_data(User {
            subscription: activation.new_subscription,
            subscription_end_date,
            ..user
        });

        info!(product = %activation.product, duration = activation.duration, "License key activated");
        self.notifications.success(format!(
            "Key activated: {} {}",
            activation.product_name(),
            activation.duration_text()
        ));

        Ok(activation)
    }

    /// Download URL of the newest active client build
    pub async fn download_link(&self) -> Result<String> {
        let response = self.api.list_versions().await;
        let versions = response.data.unwrap_or_default();

        let latest = versions
            .into_iter()
            .filter(|v| v.is_active && !v.download_url.trim().is_empty())
            .max_by_key(|v| v.id);

        match latest {
            Some(version) => Ok(version.download_url),
            None => {
                let err = ValidationError::FeatureUnavailable("the client".to_string());
                self.notifications.error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Sign out and stop syncing
    pub fn logout(&self) -> Route {
        self.store.set_current_user(None);
        self.sync.destroy();
        Route::Auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SyncConfig;
    use crate::dashboard::notifications::NotificationKind;
    use crate::models::user::SubscriptionTier;
    use crate::stores::storage::MemoryStorage;
    use crate::sync::bus::{EventBus, SyncChannel};
    use crate::test_support::{client_for, unreachable_client};
    use axum::{
        extract::{Path, State},
        routing::{get, patch, post},
        Json, Router,
    };
    use serde_json::Value;
    use std::sync::Mutex;

    fn dashboard(api: ApiClient) -> (Dashboard<ApiClient>, Arc<UserStore>) {
        let store = Arc::new(UserStore::new(Arc::new(MemoryStorage::new()), EventBus::new()));
        let sync = UserSyncManager::new(api.clone(), store.clone(), SyncChannel::new(), SyncConfig::default());
        let dashboard = Dashboard::new(
            api,
            store.clone(),
            sync,
            AvatarConfig::default(),
            NotificationCenter::new(None),
        );
        (dashboard, store)
    }

    fn signed_in(store: &UserStore) -> User {
        let mut user = User::new(1, "alex", "alex@example.com");
        user.settings = Some(r#"{"theme":"dark"}"#.to_string());
        user.registered_at = Some("2024-01-01".to_string());
        store.set_current_user(Some(&user));
        user
    }

    #[tokio::test]
    async fn test_open_redirects_when_signed_out() {
        let (dashboard, _) = dashboard(unreachable_client());
        assert_eq!(dashboard.open(), DashboardView::Redirect(Route::Auth));
    }

    #[tokio::test]
    async fn test_open_starts_sync() {
        let (dashboard, store) = dashboard(unreachable_client());
        let user = signed_in(&store);

        assert_eq!(dashboard.open(), DashboardView::Ready(user));
        assert_eq!(dashboard.sync.active_user(), Some(1));

        dashboard.close();
        assert!(!dashboard.sync.is_active());
    }

    #[tokio::test]
    async fn test_update_user_data_merges_server_response() {
        let sent: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let router = Router::new()
            .route(
                "/users/{id}",
                patch(
                    |Path(id): Path<u64>, State(sent): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                        *sent.lock().unwrap() = Some(body);
                        Json(json!({ "success": true, "data": { "id": id, "subscription": "premium", "settings": null } }))
                    },
                ),
            )
            .with_state(sent.clone());

        let (dashboard, store) = dashboard(client_for(router).await);
        let user = signed_in(&store);

        let edited = User {
            avatar: Some("data:image/png;base64,AAAA".to_string()),
            ..user
        };
        let merged = dashboard.update_user_data(edited).await.unwrap().unwrap();
        assert_eq!(dashboard.sync.pending_revision(), None);

        assert_eq!(merged.subscription, SubscriptionTier::Premium);
        assert_eq!(merged.settings.as_deref(), Some(r#"{"theme":"dark"}"#));
        assert_eq!(merged.avatar.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(store.get_current_user(), Some(merged));

        let body = sent.lock().unwrap().clone().unwrap();
        assert_eq!(body["avatar"], json!("data:image/png;base64,AAAA"));
        assert_eq!(body["subscription"], json!("free"));
    }

    #[tokio::test]
    async fn test_update_user_data_is_optimistic() {
        let (dashboard, store) = dashboard(unreachable_client());
        let user = signed_in(&store);

        let task = dashboard.update_user_data(User {
            username: "renamed".to_string(),
            ..user
        });

        // Written before the request completes
        assert_eq!(store.get_current_user().unwrap().username, "renamed");
        assert!(store.update_trigger().is_some());
        assert_eq!(dashboard.sync.pending_revision(), Some(1));

        // Failed request leaves the local edit in place and resumes polling
        assert!(task.await.unwrap().is_none());
        assert_eq!(dashboard.sync.pending_revision(), None);
        assert_eq!(store.get_current_user().unwrap().username, "renamed");
        assert_eq!(store.get_current_user().unwrap().revision, Some(1));
    }

    #[tokio::test]
    async fn test_save_profile_validation() {
        let (dashboard, store) = dashboard(unreachable_client());
        assert_eq!(dashboard.save_profile("Alex").unwrap_err(), ValidationError::NotSignedIn);

        signed_in(&store);
        assert_eq!(dashboard.save_profile("   ").unwrap_err(), ValidationError::BlankDisplayName);

        let task = dashboard.save_profile(" Alex R ").unwrap();
        assert_eq!(store.get_current_user().unwrap().display_name(), "Alex R");
        task.abort();

        let kinds: Vec<NotificationKind> = dashboard.notifications().active().iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Error, NotificationKind::Success]);
    }

    #[tokio::test]
    async fn test_change_avatar_rejects_oversized_file() {
        let (dashboard, store) = dashboard(unreachable_client());
        signed_in(&store);

        let bytes = vec![0u8; 15 * 1024 * 1024 + 1];
        let err = dashboard.change_avatar(bytes, "image/png").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::FileTooLarge { .. })
        ));
        assert_eq!(store.get_current_user().unwrap().avatar, None);
    }

    #[tokio::test]
    async fn test_change_avatar_small_file_passes_through() {
        let (dashboard, store) = dashboard(unreachable_client());
        signed_in(&store);

        let task = dashboard.change_avatar(b"tiny".to_vec(), "image/png").await.unwrap();
        assert_eq!(
            store.get_current_user().unwrap().avatar.as_deref(),
            Some("data:image/png;base64,dGlueQ==")
        );
        task.abort();
    }

    #[tokio::test]
    async fn test_activate_key_applies_subscription() {
        let router = Router::new().route(
            "/keys/activate",
            post(|Json(body): Json<Value>| async move {
                if body["key"] == json!("ABCD-EFGH") && body["userId"] == json!("1") {
                    Json(json!({ "success": true, "data": {
                        "newSubscription": "alpha",
                        "subscriptionEndDate": "2030-01-01T00:00:00Z",
                        "product": "alpha",
                        "duration": 30
                    }}))
                } else {
                    Json(json!({ "success": false, "message": "Invalid key" }))
                }
            }),
        );

        let (dashboard, store) = dashboard(client_for(router).await);
        signed_in(&store);

        let activation = dashboard.activate_key("  abcd-efgh ").await.unwrap();
        assert_eq!(activation.new_subscription, SubscriptionTier::Alpha);

        let user = store.get_current_user().unwrap();
        assert_eq!(user.subscription, SubscriptionTier::Alpha);
        assert_eq!(user.subscription_end_date.as_deref(), Some("2030-01-01T00:00:00Z"));
        assert_eq!(
            dashboard.notifications().active().last().unwrap().message,
            "Key activated: Alpha for 30 days"
        );

        let err = dashboard.activate_key("WRONG").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid key");
    }

    #[tokio::test]
    async fn test_activate_key_requires_input() {
        let (dashboard, store) = dashboard(unreachable_client());
        signed_in(&store);

        let err = dashboard.activate_key("   ").await.unwrap_err();
        assert_eq!(err.downcast_ref::<ValidationError>(), Some(&ValidationError::EmptyLicenseKey));
    }

    #[tokio::test]
    async fn test_download_link_picks_newest_active_build() {
        let router = Router::new().route(
            "/versions",
            get(|| async {
                Json(json!({ "success": true, "data": [
                    { "id": 1, "version": "1.0.0", "downloadUrl": "https://cdn.example.com/1.0.0.jar", "isActive": true },
                    { "id": 3, "version": "1.2.0", "downloadUrl": "https://cdn.example.com/1.2.0.jar", "isActive": false },
                    { "id": 2, "version": "1.1.0", "downloadUrl": "https://cdn.example.com/1.1.0.jar", "isActive": true }
                ]}))
            }),
        );

        let (dashboard, _) = dashboard(client_for(router).await);
        assert_eq!(dashboard.download_link().await.unwrap(), "https://cdn.example.com/1.1.0.jar");
    }

    #[tokio::test]
    async fn test_download_link_unavailable() {
        let (dashboard, _) = dashboard(unreachable_client());

        let err = dashboard.download_link().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::FeatureUnavailable(_))
        ));
        assert_eq!(dashboard.notifications().active()[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn test_logout_clears_user() {
        let (dashboard, store) = dashboard(unreachable_client());
        signed_in(&store);
        dashboard.open();

        assert_eq!(dashboard.logout(), Route::Auth);
        assert!(store.get_current_user().is_none());
        assert!(!dashboard.sync.is_active());
    }
}
