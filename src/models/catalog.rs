// Records managed through the admin panel and the pricing page

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::user::SubscriptionTier;

/// Ids arrive as numbers from some endpoints and strings from others
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected id, got {}", other))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseKey {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub key: String,
    /// Product code, e.g. `premium` or `alpha`
    pub product: String,
    /// Days of access; 0 means forever
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Payload of a successful `/keys/activate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyActivation {
    pub new_subscription: SubscriptionTier,
    #[serde(default)]
    pub subscription_end_date: Option<String>,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub duration: u32,
}

impl KeyActivation {
    pub fn product_name(&self) -> &str {
        match self.product.as_str() {
            "premium" => "Premium",
            "alpha" => "Alpha",
            "inside-client" => "Shakedown Client",
            "inside-spoofer" => "Shakedown Spoofer",
            "inside-cleaner" => "Shakedown Cleaner",
            other => other,
        }
    }

    pub fn duration_text(&self) -> String {
        if self.duration == 0 {
            "forever".to_string()
        } else {
            format!("for {} days", self.duration)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentUpdate {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub status: IncidentStatus,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: IncidentStatus,
    pub severity: Severity,
    #[serde(default)]
    pub affected_services: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
    #[serde(default)]
    pub updates: Vec<IncidentUpdate>,
}

impl Incident {
    pub fn is_active(&self) -> bool {
        self.status != IncidentStatus::Resolved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub affected_services: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVersion {
    pub id: u64,
    pub version: String,
    pub download_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClientVersion {
    pub version: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVersionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: u32,
    /// Days; -1 for lifetime, absent for one-off services
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub discount: Option<u32>,
    #[serde(default)]
    pub original_price: Option<u32>,
}

impl Product {
    fn offline(id: &str, name: &str, price: u32, duration: Option<i32>, description: &str, features: &[&str], popular: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            duration,
            description: description.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
            popular,
            discount: None,
            original_price: None,
        }
    }

    /// Catalog shown when `/products` is unreachable
    pub fn fallback_catalog() -> Vec<Product> {
        let standard = ["Full functionality", "Updates", "Support"];
        vec![
            Self::offline("client-30", "30 Days Access", 199, Some(30), "Access to the client for 30 days", &standard, false),
            Self::offline("client-90", "90 Days Access", 449, Some(90), "Access to the client for 90 days", &standard, true),
            Self::offline(
                "client-lifetime",
                "Lifetime Access",
                999,
                Some(-1),
                "Lifetime access to the client",
                &["Full functionality", "All updates", "Priority support"],
                false,
            ),
            Self::offline("hwid-reset", "HWID Reset", 99, None, "Reset hardware ID binding", &["Instant reset", "New binding"], false),
            Self::offline(
                "alpha",
                "ALPHA 1.21.4",
                599,
                Some(-1),
                "Client for version 1.21.4",
                &["Unique features", "Updates", "Support"],
                false,
            ),
            Self::offline(
                "premium-30",
                "Premium 30D",
                299,
                Some(30),
                "Premium status for 30 days",
                &["Exclusive features", "Queue priority", "Priority support"],
                false,
            ),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub status: String,
}

impl OrderStatus {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}
