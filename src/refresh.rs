use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Periodic news-dashboard refresh, at most one timer per channel.
#[derive(Default)]
pub struct AutoRefresh {
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl AutoRefresh {
    /// Run `tick` every `every`, starting one interval from now. Replaces any
    /// timer already running for the channel.
    pub async fn start<F, Fut>(&self, channel: u64, every: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                debug!(channel, "Auto-refresh tick");
                tick().await;
            }
        });

        if let Some(previous) = self.tasks.lock().await.insert(channel, handle) {
            previous.abort();
        }
        info!(channel, every_secs = every.as_secs(), "Auto-refresh started");
    }

    /// Stop the channel's timer. Returns whether one was running.
    pub async fn cancel(&self, channel: u64) -> bool {
        match self.tasks.lock().await.remove(&channel) {
            Some(handle) => {
                handle.abort();
                info!(channel, "Auto-refresh cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn is_active(&self, channel: u64) -> bool {
        self.tasks
            .lock()
            .await
            .get(&channel)
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.get_mut().drain() {
            handle.abort();
        }
    }
}
