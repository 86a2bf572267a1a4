use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const AUTO_DISMISS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
}

/// Toast queue; each entry disappears on its own after a fixed delay
#[derive(Clone)]
pub struct NotificationCenter {
    items: Arc<DashMap<u64, Notification>>,
    next_id: Arc<AtomicU64>,
    auto_dismiss: Option<Duration>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(Some(AUTO_DISMISS))
    }
}

impl NotificationCenter {
    /// `None` keeps notifications until dismissed
    pub fn new(auto_dismiss: Option<Duration>) -> Self {
        Self {
            items: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            auto_dismiss,
        }
    }

    pub fn push(&self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = message.into();
        debug!(id, ?kind, message = %message, "Notification shown");

        self.items.insert(id, Notification { id, message, kind });

        // Outside a runtime the entry simply stays until dismissed
        if let (Some(delay), Ok(runtime)) = (self.auto_dismiss, tokio::runtime::Handle::try_current()) {
            let items = Arc::clone(&self.items);
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                items.remove(&id);
            });
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(message, NotificationKind::Error)
    }

    pub fn dismiss(&self, id: u64) {
        self.items.remove(&id);
    }

    pub fn clear(&self) {
        self.items.clear();
    }

    /// Visible notifications, oldest first
    pub fn active(&self) -> Vec<Notification> {
        let mut items: Vec<Notification> = self.items.iter().map(|entry| entry.value().clone()).collect();
        items.sort_by_key(|n| n.id);
        items
    }
}
