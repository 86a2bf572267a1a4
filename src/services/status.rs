use crate::api::client::ApiClient;
use crate::models::catalog::Incident;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Keeps the incident list fresh for the status banner.
///
/// Runs on its own timer, independent of user sync. The refresh task stops
/// when the monitor is dropped.
pub struct StatusMonitor {
    incidents: watch::Receiver<Vec<Incident>>,
    task: JoinHandle<()>,
}

impl StatusMonitor {
    /// Start refreshing immediately and then every `period`
    pub fn spawn(api: ApiClient, period: Duration) -> Self {
        let (tx, rx) = watch::channel(Vec::new());

        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now(), period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let response = api.list_incidents().await;
                match response.data {
                    Some(incidents) if response.success => {
                        debug!(incidents = incidents.len(), "Incident list refreshed");
                        if tx.send(incidents).is_err() {
                            break;
                        }
                    }
                    // Keep showing the last known list
                    _ => debug!(message = ?response.message, "Incident refresh failed"),
                }
            }
        });

        Self { incidents: rx, task }
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents.borrow().clone()
    }

    pub fn active_incidents(&self) -> Vec<Incident> {
        self.incidents.borrow().iter().filter(|i| i.is_active()).cloned().collect()
    }

    pub fn has_active_incident(&self) -> bool {
        self.incidents.borrow().iter().any(Incident::is_active)
    }

    /// Receiver that wakes on every successful refresh
    pub fn watch(&self) -> watch::Receiver<Vec<Incident>> {
        self.incidents.clone()
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
