use crate::utils::time::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Field that must never reach local storage
pub const PASSWORD_FIELD: &str = "password";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Premium,
    Alpha,
    /// Also what unknown tiers decode to
    #[default]
    #[serde(other)]
    Free,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Alpha => "alpha",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// The logged-in user's record as cached locally and returned by `/users/:id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_admin: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_banned: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub email_verified: bool,
    #[serde(default, deserialize_with = "tier_or_free")]
    pub subscription: SubscriptionTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    /// Data URI or URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Hardware binding reported by the launcher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hwid: Option<String>,
    /// Opaque serialized settings blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<String>,
    /// Monotonic update counter, bumped on every local edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    /// Fields the portal does not interpret but must round-trip
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts `true`/`false`, `0`/`1` and `null` (SQL-backed APIs emit all three)
fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}

/// `null` reads as an empty string
fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn tier_or_free<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SubscriptionTier, D::Error> {
    Ok(Option::<SubscriptionTier>::deserialize(deserializer)?.unwrap_or_default())
}

impl User {
    pub fn new(id: u64, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Profile display name, falling back to the username
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.display_name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }

    pub fn subscription_end(&self) -> Option<DateTime<Utc>> {
        self.subscription_end_date.as_deref().and_then(parse_timestamp)
    }

    pub fn registered(&self) -> Option<DateTime<Utc>> {
        self.registered_at.as_deref().and_then(parse_timestamp)
    }

    /// Copy without any password field
    pub fn sanitized(&self) -> Self {
        let mut user = self.clone();
        user.extra.remove(PASSWORD_FIELD);
        user
    }

    /// Next revision for a local edit
    pub fn bump_revision(&mut self) {
        self.revision = Some(self.revision.map_or(1, |r| r + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_deserialize_camel_case_record() {
        let user: User = serde_json::from_value(json!({
            "id": 42,
            "username": "steve",
            "email": "steve@example.com",
            "isAdmin": true,
            "emailVerified": true,
            "subscription": "premium",
            "subscriptionEndDate": "2030-01-01T00:00:00Z",
            "profile": { "displayName": "Steve" },
            "hwid": "ABC-123",
            "registeredAt": "2024-05-01 10:00:00",
            "lastActive": "2026-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(user.id, 42);
        assert!(user.is_admin);
        assert!(!user.is_banned);
        assert_eq!(user.subscription, SubscriptionTier::Premium);
        assert_eq!(user.display_name(), "Steve");
        assert_eq!(
            user.subscription_end(),
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
        );
        assert!(user.registered().is_some());
        assert_eq!(user.extra.get("lastActive"), Some(&json!("2026-01-01T00:00:00Z")));
    }

    #[test]
    fn test_unknown_tier_is_free() {
        let user: User = serde_json::from_value(json!({ "id": 1, "subscription": "inside-client" })).unwrap();
        assert_eq!(user.subscription, SubscriptionTier::Free);

        let tier: SubscriptionTier = serde_json::from_value(json!("gold")).unwrap();
        assert_eq!(tier, SubscriptionTier::Free);
        assert_eq!(serde_json::to_value(SubscriptionTier::Alpha).unwrap(), json!("alpha"));
        assert_eq!(serde_json::to_value(SubscriptionTier::Free).unwrap(), json!("free"));
    }

    #[test]
    fn test_null_username_and_email() {
        let user: User = serde_json::from_value(json!({
            "id": 1,
            "username": null,
            "email": null,
            "avatar": "data:new"
        }))
        .unwrap();

        assert_eq!(user.username, "");
        assert_eq!(user.email, "");
        assert_eq!(user.avatar.as_deref(), Some("data:new"));
    }

    #[test]
    fn test_numeric_flags_and_null_tier() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "isAdmin": 1,
            "isBanned": 0,
            "emailVerified": null,
            "subscription": null
        }))
        .unwrap();

        assert!(user.is_admin);
        assert!(!user.is_banned);
        assert!(!user.email_verified);
        assert_eq!(user.subscription, SubscriptionTier::Free);
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = User::new(1, "alex", "alex@example.com");
        assert_eq!(user.display_name(), "alex");

        user.profile = Some(UserProfile { display_name: Some("  ".to_string()) });
        assert_eq!(user.display_name(), "alex");
    }

    #[test]
    fn test_sanitized_drops_password() {
        let mut user = User::new(1, "alex", "alex@example.com");
        user.extra.insert(PASSWORD_FIELD.to_string(), json!("hunter2"));

        let clean = user.sanitized();
        assert!(!clean.extra.contains_key(PASSWORD_FIELD));

        let serialized = serde_json::to_value(&clean).unwrap();
        assert!(serialized.get(PASSWORD_FIELD).is_none());
    }

    #[test]
    fn test_bump_revision() {
        let mut user = User::new(1, "alex", "alex@example.com");
        user.bump_revision();
        assert_eq!(user.revision, Some(1));
        user.bump_revision();
        assert_eq!(user.revision, Some(2));
    }
}
