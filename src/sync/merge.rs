use crate::models::user::{User, PASSWORD_FIELD};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Fields that keep the local value when the server leaves them out
const STICKY_FIELDS: &[&str] = &["registeredAt", "settings"];

const REVISION_FIELD: &str = "revision";

/// Overlay a server user record onto the local one.
///
/// Every field the server sends wins, except `registeredAt` and `settings`,
/// which fall back to the local value when the server omits them or sends
/// null or an empty string. Returns `None` when the server record is not an
/// object, does not describe a user, or is older than the local copy (both
/// sides carry a `revision` and the server's is lower).
pub fn merge_user(local: Option<&User>, server: &Value) -> Option<User> {
    let server = match server.as_object() {
        Some(record) => record,
        None => {
            debug!("Server user record is not an object, ignoring");
            return None;
        }
    };

    if is_stale(local, server) {
        debug!("Server user record is older than the local copy, ignoring");
        return None;
    }

    let mut merged = match local.map(serde_json::to_value) {
        Some(Ok(Value::Object(record))) => record,
        _ => Map::new(),
    };

    for (key, value) in server {
        if key == PASSWORD_FIELD {
            continue;
        }
        if STICKY_FIELDS.contains(&key.as_str()) && is_blank(value) {
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }

    match serde_json::from_value::<User>(Value::Object(merged)) {
        Ok(user) => Some(user.sanitized()),
        Err(e) => {
            warn!(error = %e, "Merged user record is invalid");
            None
        }
    }
}

fn is_stale(local: Option<&User>, server: &Map<String, Value>) -> bool {
    let local_revision = local.and_then(|user| user.revision);
    let server_revision = server.get(REVISION_FIELD).and_then(Value::as_u64);

    matches!((local_revision, server_revision), (Some(local), Some(server)) if server < local)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
