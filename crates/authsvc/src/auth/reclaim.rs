// ============================
// crates/authsvc/src/auth/reclaim.rs
// ============================
//! Periodic background reclamation of expired state.
use crate::error::AuthError;
use crate::metrics::{SWEEP_FAILED, SWEEP_RUN};
use metrics::counter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Default sweep period (2 hours)
pub const DEFAULT_RECLAIM_PERIOD: Duration = Duration::from_secs(2 * 60 * 60);

/// Anything holding state that goes stale and can be swept in one pass
pub trait Reclaim: Send + Sync {
    /// Name used in logs and metric labels
    fn name(&self) -> &str;

    /// Drop stale entries; returns how many were removed
    fn reclaim(&self) -> usize;
}

struct RunningTask {
    /// Cleared by `stop`; checked right before each sweep begins
    active: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Fixed-period background task running every registered reclaimer
pub struct ReclamationScheduler {
    period: Duration,
    reclaimers: Vec<Arc<dyn Reclaim>>,
    running: Mutex<Option<RunningTask>>,
}

impl ReclamationScheduler {
    /// Create a stopped scheduler with the given period
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            reclaimers: Vec::new(),
            running: Mutex::new(None),
        }
    }

    /// Register a reclaimer; takes effect on the next `start`
    pub fn with_reclaimer(mut self, reclaimer: Arc<dyn Reclaim>) -> Self {
        self.reclaimers.push(reclaimer);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Begin the periodic schedule on the current tokio runtime.
    ///
    /// The first sweep runs one full period after start. Calling `start` on a
    /// running scheduler does nothing. A zero period is rejected.
    pub fn start(&self) -> Result<(), AuthError> {
        if self.period.is_zero() {
            return Err(AuthError::Scheduler(
                "reclamation period must be positive".into(),
            ));
        }
        let runtime = Handle::try_current()
            .map_err(|e| AuthError::Scheduler(format!("no tokio runtime: {e}")))?;

        let mut running = self.running.lock();
        if running
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
        {
            return Ok(());
        }

        let active = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_schedule(
            self.period,
            self.reclaimers.clone(),
            Arc::clone(&active),
            shutdown_rx,
        ));

        info!(
            period_ms = self.period.as_millis() as u64,
            reclaimers = self.reclaimers.len(),
            "Reclamation scheduler started"
        );
        *running = Some(RunningTask {
            active,
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Cancel future sweeps.
    ///
    /// Does not wait for a sweep already in progress; no new sweep begins
    /// once this returns.
    pub fn stop(&self) {
        let Some(task) = self.running.lock().take() else {
            return;
        };

        task.active.store(false, Ordering::SeqCst);
        let _ = task.shutdown_tx.send(true);
        task.handle.abort();
        info!("Reclamation scheduler stopped");
    }

    /// Run every reclaimer once on the calling thread
    pub fn run_once(&self) -> usize {
        self.reclaimers
            .iter()
            .map(|reclaimer| {
                let removed = reclaimer.reclaim();
                counter!(SWEEP_RUN, "reclaimer" => reclaimer.name().to_string()).increment(1);
                removed
            })
            .sum()
    }
}

impl Drop for ReclamationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_schedule(
    period: Duration,
    reclaimers: Vec<Arc<dyn Reclaim>>,
    active: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                debug!("Reclamation task shutting down");
                break;
            }
            _ = ticker.tick() => {
                for reclaimer in &reclaimers {
                    sweep_one(reclaimer, &active).await;
                }
            }
        }
    }
}

// Sweeps run on the blocking pool; a panic comes back as a JoinError and the
// schedule carries on with the next reclaimer and the next period.
async fn sweep_one(reclaimer: &Arc<dyn Reclaim>, active: &Arc<AtomicBool>) {
    let name = reclaimer.name().to_string();
    let task_reclaimer = Arc::clone(reclaimer);
    let task_active = Arc::clone(active);

    let outcome = tokio::task::spawn_blocking(move || {
        if !task_active.load(Ordering::SeqCst) {
            return None;
        }
        Some(task_reclaimer.reclaim())
    })
    .await;

    match outcome {
        Ok(Some(removed)) => {
            counter!(SWEEP_RUN, "reclaimer" => name.clone()).increment(1);
            if removed > 0 {
                info!(reclaimer = %name, removed, "Reclaimed expired entries");
            } else {
                debug!(reclaimer = %name, "Nothing to reclaim");
            }
        },
        Ok(None) => {},
        Err(err) => {
            counter!(SWEEP_FAILED, "reclaimer" => name.clone()).increment(1);
            error!(reclaimer = %name, error = %err, "Reclamation sweep failed");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::registry::TokenRegistry;
    use crate::store::Principal;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingReclaimer {
        calls: AtomicUsize,
        panic_on_first: bool,
    }

    impl Reclaim for CountingReclaimer {
        fn name(&self) -> &str {
            "counting"
        }

        fn reclaim(&self) -> usize {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_first && call == 0 {
                panic!("sweep blew up");
            }
            0
        }
    }

    impl CountingReclaimer {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_scheduler_sweeps_expired_tokens() {
        let registry = Arc::new(TokenRegistry::new(Duration::from_millis(10)));
        registry.issue(Arc::new(Principal::new("Jack", "hash")));

        let scheduler = ReclamationScheduler::new(Duration::from_millis(30))
            .with_reclaimer(registry.clone());
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(200)).await;
        // nobody called validate; the sweep removed it
        assert!(registry.is_empty());
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_stop_prevents_new_sweeps() {
        let counter = Arc::new(CountingReclaimer::default());
        let scheduler = ReclamationScheduler::new(Duration::from_millis(10))
            .with_reclaimer(counter.clone());

        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop();
        assert!(!scheduler.is_running());

        // let a sweep that was already past its start check finish
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_stop = counter.calls();
        assert!(after_stop > 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.calls(), after_stop);
    }

    #[tokio::test]
    async fn test_failed_sweep_does_not_end_schedule() {
        let flaky = Arc::new(CountingReclaimer {
            panic_on_first: true,
            ..CountingReclaimer::default()
        });
        let steady = Arc::new(CountingReclaimer::default());
        let scheduler = ReclamationScheduler::new(Duration::from_millis(10))
            .with_reclaimer(flaky.clone())
            .with_reclaimer(steady.clone());

        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(scheduler.is_running());
        assert!(flaky.calls() >= 2);
        // the panic in the first reclaimer did not skip the second one
        assert!(steady.calls() >= 2);
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_start_twice_keeps_one_task() {
        let counter = Arc::new(CountingReclaimer::default());
        let scheduler = ReclamationScheduler::new(Duration::from_secs(3600))
            .with_reclaimer(counter.clone());

        scheduler.start().unwrap();
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        // first tick is a full period away
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(counter.calls(), 0);

        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());

        // restartable after stop
        scheduler.start().unwrap();
        assert!(scheduler.is_running());
    }

    #[tokio::test]
    async fn test_drop_stops_the_task() {
        let counter = Arc::new(CountingReclaimer::default());
        let scheduler = ReclamationScheduler::new(Duration::from_millis(10))
            .with_reclaimer(counter.clone());
        scheduler.start().unwrap();
        drop(scheduler);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let calls = counter.calls();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.calls(), calls);
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let scheduler = ReclamationScheduler::new(DEFAULT_RECLAIM_PERIOD);
        assert!(matches!(scheduler.start(), Err(AuthError::Scheduler(_))));
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let counter = Arc::new(CountingReclaimer::default());
        let scheduler = ReclamationScheduler::new(Duration::ZERO).with_reclaimer(counter.clone());

        assert!(matches!(scheduler.start(), Err(AuthError::Scheduler(_))));
        assert!(!scheduler.is_running());
        // nothing was spawned that could still tick
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(counter.calls(), 0);
    }

    #[test]
    fn test_run_once_runs_every_reclaimer() {
        let registry = Arc::new(TokenRegistry::new(Duration::ZERO));
        registry.issue(Arc::new(Principal::new("a", "hash")));
        let counter = Arc::new(CountingReclaimer::default());

        let scheduler = ReclamationScheduler::new(DEFAULT_RECLAIM_PERIOD)
            .with_reclaimer(registry.clone())
            .with_reclaimer(counter.clone());

        assert_eq!(scheduler.run_once(), 1);
        assert_eq!(counter.calls(), 1);
        assert!(registry.is_empty());
    }
}
