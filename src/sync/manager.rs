use crate::api::client::UserSource;
use crate::core::config::SyncConfig;
use crate::models::user::User;
use crate::stores::user_store::UserStore;
use crate::sync::bus::{Envelope, SyncChannel, SyncMessage};
use crate::sync::hash::optional_avatar_hash;
use crate::sync::merge::merge_user;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest poll period; a zero period would panic the timer
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Callback invoked with the latest user record
pub type Listener = Arc<dyn Fn(&User) -> anyhow::Result<()> + Send + Sync>;

type Listeners = Arc<DashMap<u64, Listener>>;

/// Handle returned by [`UserSyncManager::subscribe`]
pub struct Subscription {
    id: u64,
    listeners: Listeners,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.listeners.remove(&self.id);
    }
}

#[derive(Default)]
struct SyncState {
    user_id: Option<u64>,
    last_avatar_hash: String,
    /// Newest local edit the server has not confirmed yet
    pending_revision: Option<u64>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncState {
    fn stop_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

struct Inner<S> {
    source: S,
    store: Arc<UserStore>,
    channel: SyncChannel,
    config: SyncConfig,
    /// Identifies this instance on the shared channel
    origin: u64,
    state: Mutex<SyncState>,
    listeners: Listeners,
    next_listener_id: AtomicU64,
}

impl<S> Drop for Inner<S> {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.stop_tasks();
    }
}

/// Keeps the locally cached user in step with the server and with other
/// instances sharing the same storage.
///
/// While active it polls the server on a fixed interval and listens on the
/// sync channel. Cloning yields another handle to the same manager.
pub struct UserSyncManager<S: UserSource> {
    inner: Arc<Inner<S>>,
}

impl<S: UserSource> Clone for UserSyncManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: UserSource> UserSyncManager<S> {
    pub fn new(source: S, store: Arc<UserStore>, channel: SyncChannel, config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                channel,
                config,
                origin: rand::random(),
                state: Mutex::new(SyncState::default()),
                listeners: Arc::new(DashMap::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    /// Start syncing `user_id`.
    ///
    /// A no-op when already active for the same user; switching users
    /// restarts the timer and listener. Must be called within a Tokio runtime.
    pub fn init(&self, user_id: u64) {
        let mut state = self.inner.lock_state();

        if state.user_id == Some(user_id) && !state.tasks.is_empty() {
            debug!(user_id, "Sync already active");
            return;
        }

        state.stop_tasks();
        state.user_id = Some(user_id);
        state.last_avatar_hash = self.inner.stored_avatar_hash();
        state.pending_revision = None;

        // Subscribe before returning so no message published afterwards is missed
        let receiver = self.inner.channel.subscribe();
        state.tasks.push(spawn_listener(Arc::downgrade(&self.inner), user_id, receiver));
        state.tasks.push(spawn_poller(
            Arc::downgrade(&self.inner),
            user_id,
            self.inner.config.poll_interval(),
        ));

        info!(
            user_id,
            poll_interval_ms = self.inner.config.poll_interval_ms,
            "User sync started"
        );
    }

    /// Stop syncing, drop every subscriber and reset to the initial state
    pub fn destroy(&self) {
        let mut state = self.inner.lock_state();
        state.stop_tasks();
        state.user_id = None;
        state.last_avatar_hash.clear();
        state.pending_revision = None;
        drop(state);

        self.inner.listeners.clear();
        debug!("User sync stopped");
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock_state().user_id.is_some()
    }

    pub fn active_user(&self) -> Option<u64> {
        self.inner.lock_state().user_id
    }

    pub fn subscribe(&self, listener: impl Fn(&User) -> anyhow::Result<()> + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, Arc::new(listener));

        Subscription {
            id,
            listeners: Arc::clone(&self.inner.listeners),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Fetch, merge, persist and notify regardless of the avatar hash.
    ///
    /// Returns the merged record, or `None` when inactive or the fetch failed.
    pub async fn force_refresh(&self) -> Option<User> {
        let user_id = self.active_user()?;
        let response = self.inner.source.fetch_user(user_id).await;

        if !response.success {
            debug!(user_id, message = ?response.message, "Forced refresh failed");
            return None;
        }

        let server = response.into_data()?;
        self.inner.apply(user_id, &server)
    }

    /// Announce a local edit to other instances sharing the storage.
    ///
    /// A record carrying a `revision` stays pending until
    /// [`confirm_local_update`](Self::confirm_local_update) reaches it; polls
    /// do not overwrite the store meanwhile.
    pub fn notify_local_update(&self, user: &User) {
        let timestamp = self.inner.store.bump_update_trigger();

        let mut state = self.inner.lock_state();
        // No avatar keeps the previous hash
        if let Some(avatar) = user.avatar.as_deref() {
            state.last_avatar_hash = optional_avatar_hash(Some(avatar), self.inner.config.hash_window);
        }
        if let Some(revision) = user.revision {
            state.pending_revision = state.pending_revision.max(Some(revision));
        }
        drop(state);

        let delivered = self.inner.channel.publish(Envelope {
            origin: self.inner.origin,
            message: SyncMessage::UserUpdated {
                user_id: user.id,
                timestamp,
            },
        });

        debug!(user_id = user.id, timestamp, receivers = delivered, "Local user update announced");
    }

    /// The server has settled the local edit with `revision`, whether it
    /// accepted it or not. Polling resumes once no newer edit is pending.
    pub fn confirm_local_update(&self, revision: Option<u64>) {
        let mut state = self.inner.lock_state();
        if state.pending_revision <= revision {
            state.pending_revision = None;
        }
    }

    /// Revision of the newest unconfirmed local edit
    pub fn pending_revision(&self) -> Option<u64> {
        self.inner.lock_state().pending_revision
    }
}

impl<S: UserSource> Inner<S> {
    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn stored_avatar_hash(&self) -> String {
        let user = self.store.get_current_user();
        optional_avatar_hash(
            user.as_ref().and_then(|u| u.avatar.as_deref()),
            self.config.hash_window,
        )
    }

    async fn poll(&self, user_id: u64) {
        let response = self.source.fetch_user(user_id).await;

        if !response.success {
            debug!(user_id, message = ?response.message, "Sync poll failed");
            return;
        }

        let Some(server) = response.into_data() else {
            return;
        };

        if let Some(revision) = self.lock_state().pending_revision {
            debug!(user_id, revision, "Local edit in flight, skipping poll result");
            return;
        }

        let server_hash = optional_avatar_hash(
            server.get("avatar").and_then(Value::as_str),
            self.config.hash_window,
        );
        if server_hash == self.lock_state().last_avatar_hash {
            return;
        }

        if self.apply(user_id, &server).is_some() {
            debug!(user_id, "Avatar change picked up from server");
        }
    }

    /// Merge a server record into the store and notify subscribers
    fn apply(&self, user_id: u64, server: &Value) -> Option<User> {
        let mut state = self.lock_state();
        if state.user_id != Some(user_id) {
            // Destroyed or switched users while the request was in flight
            return None;
        }

        let local = self.store.get_current_user();
        let merged = merge_user(local.as_ref(), server)?;

        self.store.set_current_user(Some(&merged));
        state.last_avatar_hash = optional_avatar_hash(merged.avatar.as_deref(), self.config.hash_window);
        drop(state);

        self.notify(&merged);
        Some(merged)
    }

    fn on_message(&self, user_id: u64, envelope: Envelope) {
        if envelope.origin == self.origin {
            return;
        }

        match envelope.message {
            SyncMessage::UserUpdated { user_id: updated, timestamp } if updated == user_id => {
                debug!(user_id, timestamp, "User updated by another instance");
                if let Some(user) = self.store.get_current_user() {
                    self.lock_state().last_avatar_hash =
                        optional_avatar_hash(user.avatar.as_deref(), self.config.hash_window);
                    self.notify(&user);
                }
            }
            _ => {}
        }
    }

    fn notify(&self, user: &User) {
        let listeners: Vec<Listener> = self.listeners.iter().map(|entry| Arc::clone(entry.value())).collect();

        for listener in listeners {
            if let Err(e) = listener(user) {
                warn!(user_id = user.id, error = %e, "Sync subscriber failed");
            }
        }
    }
}

fn spawn_poller<S: UserSource>(inner: Weak<Inner<S>>, user_id: u64, period: Duration) -> JoinHandle<()> {
    let period = period.max(MIN_POLL_INTERVAL);

    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.poll(user_id).await;
        }
    })
}

fn spawn_listener<S: UserSource>(
    inner: Weak<Inner<S>>,
    user_id: u64,
    mut receiver: tokio::sync::broadcast::Receiver<Envelope>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(envelope) => {
                    let Some(inner) = inner.upgrade() else {
                        break;
                    };
                    inner.on_message(user_id, envelope);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id, skipped, "Sync channel lagged, some updates were missed");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
