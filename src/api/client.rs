use crate::api::response::ApiResponse;
use crate::core::config::ApiConfig;
use crate::core::error::ApiError;
use crate::models::catalog::{
    ClientVersion, ClientVersionPatch, Incident, IncidentStatus, KeyActivation, LicenseKey,
    NewClientVersion, NewIncident, OrderStatus, Product,
};
use crate::models::friend::Friend;
use crate::models::user::{SubscriptionTier, User};
use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the shared secret on privileged routes
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Source of the canonical user record, polled by the sync manager
pub trait UserSource: Send + Sync + 'static {
    fn fetch_user(&self, user_id: u64) -> impl Future<Output = ApiResponse<Value>> + Send;
}

/// Which header set a route needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// auth, health, incidents, friends
    Public,
    /// users, keys, versions, products, payments
    Protected,
}

/// API client for the portal backend
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    read_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        if config.api_key.is_none() {
            warn!("API key not set, protected API routes will fail");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            read_timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, access: Access) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        match (access, &self.api_key) {
            (Access::Protected, Some(key)) => builder.header(API_KEY_HEADER, key),
            _ => builder,
        }
    }

    /// GET with the abort-on-timeout guard used for read-oriented calls
    fn read(&self, path: &str, access: Access) -> RequestBuilder {
        self.request(Method::GET, path, access).timeout(self.read_timeout)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResponse<T> {
        match builder.send().await {
            Ok(response) => Self::parse(response).await,
            Err(e) => {
                let err = ApiError::from(e);
                debug!(error = ?err, "API request failed");
                ApiResponse::failure(err.to_string())
            }
        }
    }

    /// Normalize a response into the uniform envelope
    async fn parse<T: DeserializeOwned>(response: Response) -> ApiResponse<T> {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ApiResponse::failure(ApiError::from(e).to_string()),
        };

        if !status.is_success() {
            debug!(status = status.as_u16(), "API returned error status");
            // Prefer the backend's own message when it sent an envelope
            let message = serde_json::from_str::<ApiResponse<Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| ApiError::Status(status.as_u16()).to_string());
            return ApiResponse::failure(message);
        }

        if body.trim().is_empty() {
            return ApiResponse::empty();
        }

        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = ApiError::InvalidJson(e);
                debug!(error = ?err, "API returned unparsable body");
                ApiResponse::failure(err.to_string())
            }
        }
    }

    // Auth

    pub async fn login(&self, email_or_username: &str, password: &str) -> ApiResponse<User> {
        let body = json!({ "login": email_or_username, "password": password });
        self.send(self.request(Method::POST, "/auth/login", Access::Public).json(&body)).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> ApiResponse<User> {
        let body = json!({ "username": username, "email": email, "password": password });
        self.send(self.request(Method::POST, "/auth/register", Access::Public).json(&body)).await
    }

    pub async fn admin_login(
        &self,
        admin_key: &str,
        password: &str,
        turnstile_token: Option<&str>,
    ) -> ApiResponse<User> {
        let body = json!({
            "adminKey": admin_key,
            "password": password,
            "turnstileToken": turnstile_token,
        });
        self.send(self.request(Method::POST, "/auth/admin-login", Access::Public).json(&body)).await
    }

    pub async fn verify_email_code(&self, user_id: u64, code: &str) -> ApiResponse<User> {
        let body = json!({ "userId": user_id, "code": code });
        self.send(self.request(Method::POST, "/auth/verify-code", Access::Public).json(&body)).await
    }

    pub async fn resend_verification_code(&self, user_id: u64) -> ApiResponse<Value> {
        let body = json!({ "userId": user_id });
        self.send(self.request(Method::POST, "/auth/resend-code", Access::Public).json(&body)).await
    }

    // Users

    /// Canonical record as raw JSON, so absent fields stay distinguishable from nulls
    pub async fn get_user_info(&self, user_id: u64) -> ApiResponse<Value> {
        self.send(self.read(&format!("/users/{}", user_id), Access::Protected)).await
    }

    pub async fn get_all_users(&self) -> ApiResponse<Vec<User>> {
        self.send(self.read("/users", Access::Protected)).await
    }

    pub async fn update_user(&self, user_id: u64, updates: &Value) -> ApiResponse<Value> {
        let path = format!("/users/{}", user_id);
        self.send(self.request(Method::PATCH, &path, Access::Protected).json(updates)).await
    }

    pub async fn change_user_subscription(&self, user_id: u64, tier: SubscriptionTier) -> ApiResponse<Value> {
        self.update_user(user_id, &json!({ "subscription": tier })).await
    }

    pub async fn upload_avatar(&self, user_id: u64, avatar: &str) -> ApiResponse<Value> {
        self.update_user(user_id, &json!({ "avatar": avatar })).await
    }

    pub async fn delete_avatar(&self, user_id: u64) -> ApiResponse<Value> {
        self.update_user(user_id, &json!({ "avatar": null })).await
    }

    pub async fn delete_user(&self, user_id: u64) -> ApiResponse<Value> {
        let path = format!("/users/{}", user_id);
        self.send(self.request(Method::DELETE, &path, Access::Protected)).await
    }

    // Friends

    pub async fn list_friends(&self, user_id: u64) -> ApiResponse<Vec<Friend>> {
        let builder = self.read("/friends", Access::Public).query(&[("userId", user_id)]);
        self.send(builder).await
    }

    pub async fn add_friend(&self, user_id: u64, friend_username: &str) -> ApiResponse<Value> {
        let body = json!({ "userId": user_id, "friendUsername": friend_username });
        self.send(self.request(Method::POST, "/friends", Access::Public).json(&body)).await
    }

    pub async fn accept_friend(&self, user_id: u64, friendship_id: u64) -> ApiResponse<Value> {
        self.friend_action(user_id, friendship_id, "accept").await
    }

    pub async fn reject_friend(&self, user_id: u64, friendship_id: u64) -> ApiResponse<Value> {
        self.friend_action(user_id, friendship_id, "reject").await
    }

    async fn friend_action(&self, user_id: u64, friendship_id: u64, action: &str) -> ApiResponse<Value> {
        let body = json!({ "userId": user_id, "action": action, "friendshipId": friendship_id });
        self.send(self.request(Method::POST, "/friends", Access::Public).json(&body)).await
    }

    pub async fn remove_friend(&self, user_id: u64, friendship_id: u64) -> ApiResponse<Value> {
        let body = json!({ "friendshipId": friendship_id, "userId": user_id });
        self.send(self.request(Method::DELETE, "/friends", Access::Public).json(&body)).await
    }

    // License keys

    pub async fn list_keys(&self) -> ApiResponse<Vec<LicenseKey>> {
        self.send(self.read("/keys", Access::Protected)).await
    }

    pub async fn create_keys(&self, keys: &[LicenseKey]) -> ApiResponse<Value> {
        let body = json!({ "keys": keys });
        self.send(self.request(Method::POST, "/keys", Access::Protected).json(&body)).await
    }

    pub async fn activate_key(&self, key: &str, user_id: u64) -> ApiResponse<KeyActivation> {
        let body = json!({ "key": key, "userId": user_id.to_string() });
        self.send(self.request(Method::POST, "/keys/activate", Access::Protected).json(&body)).await
    }

    pub async fn delete_key(&self, key_id: &str) -> ApiResponse<Value> {
        let builder = self.request(Method::DELETE, "/keys", Access::Protected).query(&[("id", key_id)]);
        self.send(builder).await
    }

    // Client versions

    pub async fn list_versions(&self) -> ApiResponse<Vec<ClientVersion>> {
        self.send(self.read("/versions", Access::Protected)).await
    }

    pub async fn create_version(&self, version: &NewClientVersion) -> ApiResponse<ClientVersion> {
        self.send(self.request(Method::POST, "/versions", Access::Protected).json(version)).await
    }

    pub async fn update_version(&self, id: u64, patch: &ClientVersionPatch) -> ApiResponse<ClientVersion> {
        let builder = self
            .request(Method::PATCH, "/versions", Access::Protected)
            .query(&[("id", id)])
            .json(patch);
        self.send(builder).await
    }

    pub async fn delete_version(&self, id: u64) -> ApiResponse<Value> {
        let builder = self.request(Method::DELETE, "/versions", Access::Protected).query(&[("id", id)]);
        self.send(builder).await
    }

    // Incidents

    pub async fn list_incidents(&self) -> ApiResponse<Vec<Incident>> {
        self.send(self.read("/incidents", Access::Public)).await
    }

    pub async fn create_incident(&self, user_id: u64, incident: &NewIncident) -> ApiResponse<Incident> {
        let builder = self
            .request(Method::POST, "/incidents", Access::Public)
            .query(&[("userId", user_id)])
            .json(incident);
        self.send(builder).await
    }

    pub async fn add_incident_update(
        &self,
        user_id: u64,
        incident_id: &str,
        status: IncidentStatus,
        message: &str,
    ) -> ApiResponse<Value> {
        let body = json!({ "incidentId": incident_id, "status": status, "message": message });
        let builder = self
            .request(Method::POST, "/incidents/update", Access::Public)
            .query(&[("userId", user_id)])
            .json(&body);
        self.send(builder).await
    }

    pub async fn delete_incident(&self, user_id: u64, incident_id: &str) -> ApiResponse<Value> {
        let builder = self
            .request(Method::DELETE, &format!("/incidents/{}", incident_id), Access::Public)
            .query(&[("userId", user_id)]);
        self.send(builder).await
    }

    // Products and payments

    /// Products from the API, or the offline catalog when it cannot be reached
    pub async fn list_products(&self) -> Vec<Product> {
        let response: ApiResponse<Vec<Product>> = self.send(self.read("/products", Access::Protected)).await;
        match response.into_data() {
            Some(products) => products,
            None => {
                debug!("Product API unavailable, using fallback catalog");
                Product::fallback_catalog()
            }
        }
    }

    pub async fn get_product(&self, id: &str) -> Option<Product> {
        let builder = self.read("/products", Access::Protected).query(&[("id", id)]);
        let response: ApiResponse<Product> = self.send(builder).await;
        response.into_data()
    }

    pub async fn order_status(&self, order_id: &str) -> ApiResponse<OrderStatus> {
        let path = format!("/payments/order-status/{}", order_id);
        self.send(self.read(&path, Access::Protected)).await
    }

    // Health

    pub async fn check_health(&self) -> bool {
        match self.read("/health", Access::Public).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

impl UserSource for ApiClient {
    fn fetch_user(&self, user_id: u64) -> impl Future<Output = ApiResponse<Value>> + Send {
        self.get_user_info(user_id)
    }
}
