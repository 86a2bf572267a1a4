// Centralized error handling for the portal

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures inside the remote API client.
///
/// These never leave the client: every wrapper folds them into an
/// `ApiResponse` with `success == false` and the error's message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Server connection error")]
    Connection(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Invalid JSON response from server")]
    InvalidJson(#[source] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Connection(err)
        }
    }
}

/// Errors raised while downscaling and re-encoding an image
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Failed to load image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage contents are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Client-side form checks, surfaced inline before any request is sent
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Enter a key to activate")]
    EmptyLicenseKey,

    #[error("Display name must not be blank")]
    BlankDisplayName,

    #[error("Enter a username")]
    EmptyFriendUsername,

    #[error("Enter an incident title")]
    EmptyIncidentTitle,

    #[error("Enter an update message")]
    EmptyIncidentMessage,

    #[error("File is too large: {size} bytes exceeds {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Download link is not available for {0}")]
    FeatureUnavailable(String),
}

/// Errors returned by the static file server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Entry point not found")]
    EntryPointMissing,

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::EntryPointMissing => StatusCode::NOT_FOUND,
            ServerError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_messages() {
        assert_eq!(ApiError::Timeout.to_string(), "Request timed out");
        assert_eq!(ApiError::Status(502).to_string(), "HTTP 502");

        let json_err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        assert_eq!(
            ApiError::InvalidJson(json_err).to_string(),
            "Invalid JSON response from server"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::FileTooLarge { size: 20, max: 10 };
        assert_eq!(err.to_string(), "File is too large: 20 bytes exceeds 10 bytes");
        assert_eq!(ValidationError::EmptyLicenseKey.to_string(), "Enter a key to activate");
    }

    #[test]
    fn test_server_error_status() {
        let response = ServerError::EntryPointMissing.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ServerError::InternalError("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
