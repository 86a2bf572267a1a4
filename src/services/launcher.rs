use crate::api::client::ApiClient;
use crate::models::user::User;
use crate::stores::user_store::UserStore;
use crate::validation::launcher::LauncherParams;
use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the launcher sign-in page sends the browser next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    /// Signed in: hand the user record to the launcher's local server
    Callback { url: String },
    /// Not signed in: log in first, then come back
    Login { url: String },
}

impl Handoff {
    pub fn url(&self) -> &str {
        match self {
            Handoff::Callback { url } | Handoff::Login { url } => url,
        }
    }
}

/// `http://127.0.0.1:<port>/callback?user=<url-encoded JSON>`
pub fn callback_url(port: u16, user: &User) -> Result<String> {
    let payload = serde_json::to_string(&user.sanitized()).context("Failed to serialize user for launcher")?;
    let query = serde_urlencoded::to_string([("user", payload)]).context("Failed to encode launcher callback")?;
    Ok(format!("http://127.0.0.1:{}/callback?{}", port, query))
}

/// `/auth?redirect=launcher`, carrying the hwid along when present
pub fn login_redirect(hwid: Option<&str>) -> String {
    let mut pairs = vec![("redirect", "launcher")];
    if let Some(hwid) = hwid {
        pairs.push(("hwid", hwid));
    }

    match serde_urlencoded::to_string(&pairs) {
        Ok(query) => format!("/auth?{}", query),
        Err(_) => "/auth?redirect=launcher".to_string(),
    }
}

/// Third-party sign-in offered on the auth page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Discord,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Discord => "discord",
        }
    }
}

/// `<api>/oauth/<provider>`, forwarding `redirect` and `hwid` so a launcher
/// sign-in survives the round trip through the provider
pub fn oauth_url(api_base: &str, provider: OAuthProvider, redirect: Option<&str>, hwid: Option<&str>) -> String {
    let url = format!("{}/oauth/{}", api_base.trim_end_matches('/'), provider.as_str());

    let pairs: Vec<(&str, &str)> = [("redirect", redirect), ("hwid", hwid)]
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect();

    if pairs.is_empty() {
        return url;
    }

    match serde_urlencoded::to_string(&pairs) {
        Ok(query) => format!("{}?{}", url, query),
        Err(_) => url,
    }
}

/// Sign-in handoff between the portal and the desktop launcher
pub struct LauncherHandoff {
    store: Arc<UserStore>,
    api: ApiClient,
}

impl LauncherHandoff {
    pub fn new(store: Arc<UserStore>, api: ApiClient) -> Self {
        Self { store, api }
    }

    /// Decide where to send the browser.
    ///
    /// A signed-in user whose hwid differs from the one the launcher reported
    /// gets it updated on the server first; the new value is only used when
    /// that update succeeds.
    pub async fn resolve(&self, params: &LauncherParams) -> Result<Handoff> {
        let Some(mut user) = self.store.get_current_user() else {
            debug!("Launcher sign-in without a session, redirecting to login");
            return Ok(Handoff::Login {
                url: login_redirect(params.hwid.as_deref()),
            });
        };

        if let Some(hwid) = params.hwid.as_deref() {
            if user.hwid.as_deref() != Some(hwid) {
                let response = self.api.update_user(user.id, &json!({ "hwid": hwid })).await;
                if response.success && response.data.is_some() {
                    info!(user_id = user.id, "Hardware id updated from launcher");
                    user.hwid = Some(hwid.to_string());
                    self.store.set_current_user(Some(&user));
                } else {
                    warn!(user_id = user.id, message = ?response.message, "Failed to update hardware id");
                }
            }
        }

        Ok(Handoff::Callback {
            url: callback_url(params.port, &user)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::PASSWORD_FIELD;
    use crate::stores::storage::MemoryStorage;
    use crate::sync::bus::EventBus;
    use crate::test_support::{client_for, unreachable_client};
    use axum::{extract::Path, routing::patch, Json, Router};
    use serde_json::Value;
    use std::collections::HashMap;

    fn store() -> Arc<UserStore> {
        Arc::new(UserStore::new(Arc::new(MemoryStorage::new()), EventBus::new()))
    }

    fn decode_callback(url: &str) -> Value {
        let query = url.split_once('?').unwrap().1;
        let pairs: HashMap<String, String> = serde_urlencoded::from_str(query).unwrap();
        serde_json::from_str(&pairs["user"]).unwrap()
    }

    #[test]
    fn test_login_redirect() {
        assert_eq!(login_redirect(None), "/auth?redirect=launcher");
        assert_eq!(login_redirect(Some("PC-01")), "/auth?redirect=launcher&hwid=PC-01");
    }

    #[test]
    fn test_oauth_url() {
        let api = "https://api.booleanclient.online/";

        assert_eq!(
            oauth_url(api, OAuthProvider::Google, None, None),
            "https://api.booleanclient.online/oauth/google"
        );
        assert_eq!(
            oauth_url(api, OAuthProvider::Discord, Some("launcher"), None),
            "https://api.booleanclient.online/oauth/discord?redirect=launcher"
        );
        assert_eq!(
            oauth_url(api, OAuthProvider::Google, None, Some("PC-01")),
            "https://api.booleanclient.online/oauth/google?hwid=PC-01"
        );
        assert_eq!(
            oauth_url(api, OAuthProvider::Discord, Some("launcher"), Some("PC-01")),
            "https://api.booleanclient.online/oauth/discord?redirect=launcher&hwid=PC-01"
        );
        assert_eq!(
            oauth_url(api, OAuthProvider::Google, Some(""), Some("")),
            "https://api.booleanclient.online/oauth/google"
        );
        assert_eq!(
            oauth_url(api, OAuthProvider::Google, Some("/dashboard?tab=keys"), None),
            "https://api.booleanclient.online/oauth/google?redirect=%2Fdashboard%3Ftab%3Dkeys"
        );
    }

    #[test]
    fn test_callback_url_round_trips_user() {
        let mut user = User::new(3, "alex", "alex@example.com");
        user.extra.insert(PASSWORD_FIELD.to_string(), json!("hunter2"));

        let url = callback_url(41234, &user).unwrap();
        assert!(url.starts_with("http://127.0.0.1:41234/callback?user="));

        let decoded = decode_callback(&url);
        assert_eq!(decoded["username"], json!("alex"));
        assert!(decoded.get(PASSWORD_FIELD).is_none());
    }

    #[tokio::test]
    async fn test_signed_out_goes_to_login() {
        let handoff = LauncherHandoff::new(store(), unreachable_client());
        let params = LauncherParams::from_query("?port=5000&hwid=PC-01");

        assert_eq!(
            handoff.resolve(&params).await.unwrap(),
            Handoff::Login {
                url: "/auth?redirect=launcher&hwid=PC-01".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_hwid_updated_when_different() {
        let router = Router::new().route(
            "/users/{id}",
            patch(|Path(id): Path<u64>, Json(body): Json<Value>| async move {
                Json(json!({ "success": true, "data": { "id": id, "hwid": body["hwid"] } }))
            }),
        );

        let store = store();
        store.set_current_user(Some(&User::new(3, "alex", "alex@example.com")));
        let handoff = LauncherHandoff::new(store.clone(), client_for(router).await);

        let result = handoff
            .resolve(&LauncherParams::from_query("port=5000&hwid=PC-02"))
            .await
            .unwrap();

        assert!(result.url().starts_with("http://127.0.0.1:5000/callback?user="));
        assert_eq!(decode_callback(result.url())["hwid"], json!("PC-02"));
        assert_eq!(store.get_current_user().unwrap().hwid.as_deref(), Some("PC-02"));
    }

    #[tokio::test]
    async fn test_failed_hwid_update_keeps_old_value() {
        let store = store();
        let mut user = User::new(3, "alex", "alex@example.com");
        user.hwid = Some("PC-01".to_string());
        store.set_current_user(Some(&user));

        let handoff = LauncherHandoff::new(store.clone(), unreachable_client());
        let result = handoff
            .resolve(&LauncherParams::from_query("hwid=PC-02"))
            .await
            .unwrap();

        assert!(result.url().starts_with("http://127.0.0.1:3000/callback"));
        assert_eq!(decode_callback(result.url())["hwid"], json!("PC-01"));
    }
}
