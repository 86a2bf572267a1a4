use serde::{Deserialize, Serialize};

/// Uniform envelope returned by every API wrapper.
///
/// The backend already answers in this shape; transport errors, bad statuses
/// and unparsable bodies are folded into it too, so callers only ever look at
/// `success` and `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Set by `/auth/login` and `/auth/register` when an email code is pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_verification: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            requires_verification: None,
            user_id: None,
        }
    }

    /// Successful response without a payload (empty 2xx body)
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            requires_verification: None,
            user_id: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            requires_verification: None,
            user_id: None,
        }
    }

    /// Payload of a successful response
    pub fn into_data(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }

    pub fn data_ref(&self) -> Option<&T> {
        if self.success {
            self.data.as_ref()
        } else {
            None
        }
    }

    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message.as_deref().unwrap_or(fallback)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            requires_verification: self.requires_verification,
            user_id: self.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_parse_backend_envelope() {
        let response: ApiResponse<Value> = serde_json::from_value(json!({
            "success": false,
            "message": "Email not verified",
            "requiresVerification": true,
            "userId": 12
        }))
        .unwrap();

        assert!(!response.success);
        assert_eq!(response.message_or("fallback"), "Email not verified");
        assert_eq!(response.requires_verification, Some(true));
        assert_eq!(response.user_id, Some(12));
        assert!(response.into_data().is_none());
    }

    #[test]
    fn test_missing_success_is_failure() {
        let response: ApiResponse<Value> = serde_json::from_value(json!({ "data": 1 })).unwrap();
        assert!(!response.success);
        assert!(response.data_ref().is_none());
    }

    #[test]
    fn test_failure_shape() {
        let response: ApiResponse<()> = ApiResponse::failure("Network error");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "success": false, "message": "Network error" })
        );
    }

    #[test]
    fn test_map_keeps_envelope() {
        let response = ApiResponse::ok(vec![1, 2, 3]).map(|v| v.len());
        assert!(response.success);
        assert_eq!(response.into_data(), Some(3));
    }
}
