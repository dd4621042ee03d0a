//! Managed periodic background tasks.
//!
//! Each sweep is owned by the process through a handle whose `stop` is
//! deterministic, so shutdown never leaves a loop running. The sweep
//! bodies themselves live on the stores and can be called synchronously
//! by tests.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to a running sweeper. Dropping it without `stop` aborts the
/// task on runtime shutdown; `stop` resolves once the loop has exited.
pub struct SweepHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
        info!(name = self.name, "sweeper stopped");
    }
}

/// Spawn a periodic task running `sweep` every `period` until stopped.
pub fn spawn_sweeper<F, Fut>(name: &'static str, period: Duration, mut sweep: F) -> SweepHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let (shutdown, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the first
        // sweep happens one full period after startup
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!(name, "running sweep");
                    sweep().await;
                }
                _ = stopped.changed() => break,
            }
        }
    });

    info!(name, period_secs = period.as_secs(), "sweeper started");
    SweepHandle {
        name,
        shutdown,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_sweeper_runs_periodically() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let handle = spawn_sweeper("test", Duration::from_millis(20), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        sleep(Duration::from_millis(110)).await;
        handle.stop().await;

        let swept = count.load(Ordering::SeqCst);
        assert!(swept >= 2, "expected at least 2 sweeps, got {}", swept);
    }

    #[tokio::test]
    async fn test_stop_is_deterministic() {
        let handle = spawn_sweeper("idle", Duration::from_secs(3600), || async {});
        // Returns without waiting out the hour-long period
        handle.stop().await;
    }
}
