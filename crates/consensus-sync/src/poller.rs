//! Polling scheduler.
//!
//! Owns every periodic pull task as a mapping from task id to a
//! cancellable timer handle, so teardown and rescheduling are
//! deterministic: no timer outlives a cancel, a symbol switch, or
//! shutdown. Tasks run independently: a slow or failing task never
//! delays another task's schedule.

use crate::error::SyncResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Identity of a pull task. Respawning an id replaces its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollTask {
    Portfolio,
    Trades,
    Candles,
}

impl std::fmt::Display for PollTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Portfolio => write!(f, "portfolio"),
            Self::Trades => write!(f, "trades"),
            Self::Candles => write!(f, "candles"),
        }
    }
}

struct TaskHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    fn stop(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// Scheduler for independently paced periodic pull tasks.
#[derive(Default)]
pub struct PollingScheduler {
    tasks: Mutex<HashMap<PollTask, TaskHandle>>,
}

impl PollingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `poll` every `interval`, optionally running once right
    /// away. A task already scheduled under the same id is cancelled
    /// first, superseding any in-flight fetch.
    ///
    /// A failing tick is logged and the previous state slice stays
    /// untouched; the task remains on its cadence (implicit retry, no
    /// backoff).
    pub fn spawn<F, Fut>(&self, task: PollTask, interval: Duration, immediate: bool, poll: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SyncResult<()>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut skip_first = !immediate;

            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if skip_first {
                            skip_first = false;
                            continue;
                        }
                        // The fetch itself is cancellation-aware too, so
                        // a cancel mid-flight drops the response.
                        tokio::select! {
                            () = child.cancelled() => break,
                            result = poll() => {
                                if let Err(e) = result {
                                    warn!(task = %task, error = %e, "poll failed, keeping previous data");
                                }
                            }
                        }
                    }
                }
            }
            debug!(task = %task, "poll task stopped");
        });

        let replaced = self.tasks.lock().insert(task, TaskHandle { token, handle });
        if let Some(old) = replaced {
            debug!(task = %task, "replacing scheduled poll task");
            old.stop();
        }
    }

    /// Cancel one task. Returns whether it was scheduled.
    pub fn cancel(&self, task: PollTask) -> bool {
        match self.tasks.lock().remove(&task) {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, task: PollTask) -> bool {
        self.tasks.lock().contains_key(&task)
    }

    /// Cancel every task. Called on view teardown; afterwards no timer
    /// or in-flight fetch survives.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock();
        for (task, handle) in tasks.drain() {
            debug!(task = %task, "cancelling poll task");
            handle.stop();
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_api::ApiError;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[tokio::test]
    async fn test_task_runs_on_cadence() {
        let scheduler = PollingScheduler::new();
        let count = counter();
        let c = count.clone();

        scheduler.spawn(PollTask::Portfolio, Duration::from_millis(20), true, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(count.load(Ordering::SeqCst) >= 3);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_failing_task_stays_scheduled() {
        let scheduler = PollingScheduler::new();
        let count = counter();
        let c = count.clone();

        scheduler.spawn(PollTask::Trades, Duration::from_millis(20), true, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::Api(ApiError::Http("backend down".to_string())))
            }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        // Still ticking despite every tick failing.
        assert!(count.load(Ordering::SeqCst) >= 3);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_slow_task_does_not_block_others() {
        let scheduler = PollingScheduler::new();
        let slow_count = counter();
        let fast_count = counter();

        let sc = slow_count.clone();
        scheduler.spawn(PollTask::Candles, Duration::from_millis(10), true, move || {
            let sc = sc.clone();
            async move {
                sc.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            }
        });

        let fc = fast_count.clone();
        scheduler.spawn(PollTask::Portfolio, Duration::from_millis(10), true, move || {
            let fc = fc.clone();
            async move {
                fc.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(slow_count.load(Ordering::SeqCst), 1, "slow task stuck in flight");
        assert!(
            fast_count.load(Ordering::SeqCst) >= 5,
            "fast task must keep its own schedule"
        );
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_stops_task() {
        let scheduler = PollingScheduler::new();
        let count = counter();
        let c = count.clone();

        scheduler.spawn(PollTask::Candles, Duration::from_millis(10), true, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.cancel(PollTask::Candles));
        assert!(!scheduler.is_scheduled(PollTask::Candles));

        let after_cancel = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_respawn_replaces_previous_task() {
        let scheduler = PollingScheduler::new();
        let first = counter();
        let second = counter();

        let f = first.clone();
        scheduler.spawn(PollTask::Candles, Duration::from_millis(10), true, move || {
            let f = f.clone();
            async move {
                f.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let s = second.clone();
        scheduler.spawn(PollTask::Candles, Duration::from_millis(10), true, move || {
            let s = s.clone();
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let first_after_respawn = first.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Old task is dead, new one ticking.
        assert!(first.load(Ordering::SeqCst) <= first_after_respawn + 1);
        assert!(second.load(Ordering::SeqCst) >= 5);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_everything() {
        let scheduler = PollingScheduler::new();
        let count = counter();

        for task in [PollTask::Portfolio, PollTask::Trades, PollTask::Candles] {
            let c = count.clone();
            scheduler.spawn(task, Duration::from_millis(10), true, move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown();

        for task in [PollTask::Portfolio, PollTask::Trades, PollTask::Candles] {
            assert!(!scheduler.is_scheduled(task));
        }

        let after_shutdown = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_shutdown);
    }
}
