use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::stores::preferences::Theme;

const DEFAULT_CAPACITY: usize = 64;

/// Events published inside one application instance
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The cached current user was written or cleared
    CurrentUserChanged { user_id: Option<u64> },
    SettingsChanged { theme: Theme },
    LanguageChanged { language: String },
}

/// Typed in-process publish/subscribe channel.
///
/// Cloning yields another handle to the same channel. Publishing with no
/// subscribers is not an error; slow subscribers may observe `Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns how many subscribers received the event
    pub fn publish(&self, event: T) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Message exchanged between instances sharing one storage profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    #[serde(rename_all = "camelCase")]
    UserUpdated { user_id: u64, timestamp: i64 },
}

/// A `SyncMessage` tagged with the instance that sent it
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: u64,
    pub message: SyncMessage,
}

/// Cross-instance channel (the equivalent of a browser broadcast channel).
///
/// Carries only the notification; the record itself is re-read from storage
/// by whoever receives it.
pub type SyncChannel = EventBus<Envelope>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus: EventBus<AppEvent> = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let delivered = bus.publish(AppEvent::CurrentUserChanged { user_id: Some(1) });
        assert_eq!(delivered, 2);

        assert_eq!(first.recv().await.unwrap(), AppEvent::CurrentUserChanged { user_id: Some(1) });
        assert_eq!(second.recv().await.unwrap(), AppEvent::CurrentUserChanged { user_id: Some(1) });
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus: EventBus<AppEvent> = EventBus::new();
        assert_eq!(bus.publish(AppEvent::CurrentUserChanged { user_id: None }), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_sync_message_schema() {
        let message = SyncMessage::UserUpdated { user_id: 7, timestamp: 1_700_000_000_000 };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "type": "user-updated", "userId": 7, "timestamp": 1_700_000_000_000i64 })
        );

        let parsed: SyncMessage = serde_json::from_value(json!({
            "type": "user-updated",
            "userId": 3,
            "timestamp": 5
        }))
        .unwrap();
        assert_eq!(parsed, SyncMessage::UserUpdated { user_id: 3, timestamp: 5 });
    }
}
