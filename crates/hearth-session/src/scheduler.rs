//! Periodic sweeping on a tokio timer.
//!
//! Providers never schedule their own sweeps. Frameworks that want one on a
//! fixed interval can use [`spawn_sweeper`] instead of writing the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::provider::SessionProvider;

/// Handle to a running background sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    evicted: Arc<AtomicU64>,
}

impl SweeperHandle {
    /// Total sessions evicted by this sweeper so far.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Whether the sweep task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the sweeper and wait for the task to exit. Returns the total
    /// number of sessions it evicted.
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Session sweeper task failed");
        }
        self.evicted.load(Ordering::Relaxed)
    }
}

/// Spawn a task that calls [`SessionProvider::sweep`] every `interval`,
/// evicting sessions idle for at least `lifetime`.
///
/// The first sweep runs one `interval` after spawning. A zero `interval` is
/// raised to one millisecond. Must be called from within a tokio runtime.
pub fn spawn_sweeper(
    provider: Arc<dyn SessionProvider>,
    lifetime: Duration,
    interval: Duration,
) -> SweeperHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let evicted = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&evicted);
    let lifetime_secs = whole_secs_ceil(lifetime);
    let interval = interval.max(Duration::from_millis(1));

    info!(
        provider = provider.name(),
        lifetime_secs,
        interval_ms = interval.as_millis() as u64,
        "Session sweeper started"
    );

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let count = provider.sweep(lifetime_secs);
                    if count > 0 {
                        counter.fetch_add(count as u64, Ordering::Relaxed);
                        debug!(count, remaining = provider.count(), "Sweeper evicted sessions");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            evicted = counter.load(Ordering::Relaxed),
            "Session sweeper stopped"
        );
    });

    SweeperHandle {
        shutdown,
        task,
        evicted,
    }
}

/// Lifetime in whole seconds, rounded up so a partial second never shortens it.
fn whole_secs_ceil(lifetime: Duration) -> i64 {
    let secs = lifetime
        .as_secs()
        .saturating_add(u64::from(lifetime.subsec_nanos() > 0));
    i64::try_from(secs).unwrap_or(i64::MAX)
}
