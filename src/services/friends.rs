use crate::api::client::ApiClient;
use crate::api::response::ApiResponse;
use crate::core::error::ValidationError;
use crate::models::friend::{Friend, FriendsSnapshot, RequestDirection};
use crate::stores::storage::{keys, Storage};
use crate::utils::time::current_timestamp_millis;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Friends list of one user, cached in storage between fetches
#[derive(Clone)]
pub struct FriendsService {
    api: ApiClient,
    storage: Arc<dyn Storage>,
    user_id: u64,
}

/// Background refresh that stops when dropped
pub struct RefreshHandle(JoinHandle<()>);

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl FriendsService {
    pub fn new(api: ApiClient, storage: Arc<dyn Storage>, user_id: u64) -> Self {
        Self { api, storage, user_id }
    }

    /// Last cached snapshot; empty when missing or malformed
    pub fn cached(&self) -> FriendsSnapshot {
        self.storage
            .get(keys::FRIENDS_CACHE)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    /// Fetch the list and replace the cache. Failures keep the previous snapshot.
    pub async fn refresh(&self) -> bool {
        let response = self.api.list_friends(self.user_id).await;

        if !response.success {
            debug!(user_id = self.user_id, message = ?response.message, "Friends refresh failed");
            return false;
        }

        let snapshot = FriendsSnapshot::new(response.into_data().unwrap_or_default(), current_timestamp_millis());
        match serde_json::to_string(&snapshot) {
            Ok(json) => self.storage.set(keys::FRIENDS_CACHE, &json),
            Err(e) => warn!(error = %e, "Failed to serialize friends cache"),
        }

        debug!(user_id = self.user_id, friends = snapshot.count, "Friends cache refreshed");
        true
    }

    pub async fn add(&self, username: &str) -> Result<ApiResponse<Value>, ValidationError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::EmptyFriendUsername);
        }

        let response = self.api.add_friend(self.user_id, username).await;
        Ok(self.refresh_after(response).await)
    }

    pub async fn accept(&self, friendship_id: u64) -> ApiResponse<Value> {
        let response = self.api.accept_friend(self.user_id, friendship_id).await;
        self.refresh_after(response).await
    }

    pub async fn reject(&self, friendship_id: u64) -> ApiResponse<Value> {
        let response = self.api.reject_friend(self.user_id, friendship_id).await;
        self.refresh_after(response).await
    }

    pub async fn remove(&self, friendship_id: u64) -> ApiResponse<Value> {
        let response = self.api.remove_friend(self.user_id, friendship_id).await;
        self.refresh_after(response).await
    }

    pub fn accepted(&self) -> Vec<Friend> {
        self.cached().data.into_iter().filter(Friend::is_accepted).collect()
    }

    pub fn incoming(&self) -> Vec<Friend> {
        self.pending(RequestDirection::Incoming)
    }

    pub fn outgoing(&self) -> Vec<Friend> {
        self.pending(RequestDirection::Outgoing)
    }

    /// Refresh on a fixed period, starting immediately
    pub fn spawn_refresh(&self, period: Duration) -> RefreshHandle {
        let service = self.clone();

        RefreshHandle(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now(), period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                service.refresh().await;
            }
        }))
    }

    fn pending(&self, direction: RequestDirection) -> Vec<Friend> {
        self.cached()
            .data
            .into_iter()
            .filter(|f| f.is_pending(direction))
            .collect()
    }

    async fn refresh_after(&self, response: ApiResponse<Value>) -> ApiResponse<Value> {
        if response.success {
            self.refresh().await;
        }
        response
    }
}
