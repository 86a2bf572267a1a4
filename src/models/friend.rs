use crate::utils::time::{is_within, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A counterpart counts as online when active within this window
pub const ONLINE_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
}

/// Direction of a pending request relative to the viewing user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    /// Friendship id, used by accept/reject/remove
    pub id: u64,
    pub status: FriendStatus,
    pub friend_user_id: u64,
    pub friend_username: String,
    #[serde(default)]
    pub friend_avatar: Option<String>,
    #[serde(default)]
    pub friend_last_active: Option<String>,
    pub request_direction: RequestDirection,
}

impl Friend {
    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.friend_last_active.as_deref().and_then(parse_timestamp)
    }

    pub fn is_online_at(&self, now: DateTime<Utc>) -> bool {
        self.last_active()
            .is_some_and(|at| is_within(at, ONLINE_WINDOW_SECS, now))
    }

    pub fn is_online(&self) -> bool {
        self.is_online_at(Utc::now())
    }

    pub fn is_accepted(&self) -> bool {
        self.status == FriendStatus::Accepted
    }

    pub fn is_pending(&self, direction: RequestDirection) -> bool {
        self.status == FriendStatus::Pending && self.request_direction == direction
    }
}

/// Cached friends list, soft state replaced by every successful fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FriendsSnapshot {
    /// Number of accepted friends
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub data: Vec<Friend>,
    /// Epoch milliseconds
    #[serde(default)]
    pub timestamp: i64,
}

impl FriendsSnapshot {
    pub fn new(data: Vec<Friend>, timestamp: i64) -> Self {
        let count = data.iter().filter(|f| f.is_accepted()).count();
        Self { count, data, timestamp }
    }
}
