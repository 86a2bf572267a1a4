// Helpers shared by the in-module tests

use crate::api::client::ApiClient;
use crate::core::config::ApiConfig;
use axum::Router;
use tokio::net::TcpListener;

pub const TEST_API_KEY: &str = "test-api-key";

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        api_key: Some(TEST_API_KEY.to_string()),
        request_timeout_secs: 2,
    }
}

pub async fn client_for(router: Router) -> ApiClient {
    let base_url = spawn_backend(router).await;
    ApiClient::new(&api_config(&base_url)).unwrap()
}

/// Client pointed at a port nothing listens on
pub fn unreachable_client() -> ApiClient {
    ApiClient::new(&api_config("http://127.0.0.1:9")).unwrap()
}
