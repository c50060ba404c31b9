use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::interfaces::scheduler::ScheduledJob;

/// Runs each registered job on its own interval until [`Scheduler::stop`].
///
/// A job is either idle (waiting for its next tick) or running one pass. A failed
/// pass is logged and the job waits for the next tick; nothing a job returns ends
/// its loop.
pub struct Scheduler {
    jobs: Vec<Arc<dyn ScheduledJob>>,
    handles: Vec<JoinHandle<()>>,
    stop: Option<watch::Sender<bool>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            handles: Vec::new(),
            stop: None,
        }
    }

    pub fn register_job(&mut self, job: Arc<dyn ScheduledJob>) {
        self.jobs.push(job);
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_some()
    }

    pub fn start(&mut self) {
        if self.stop.is_some() {
            return;
        }
        let (tx, rx) = watch::channel(false);
        self.stop = Some(tx);

        for job in &self.jobs {
            let job = Arc::clone(job);
            let mut tick = tokio::time::interval(job.interval().max(Duration::from_secs(1)));
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut rx = rx.clone();
            tracing::info!(job = job.name(), interval = ?job.interval(), "Scheduling job");
            let handle = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            let span = tracing::debug_span!("job_run", job = job.name());
                            if let Err(err) = job.run().instrument(span).await {
                                tracing::error!(job = job.name(), error = %err, "Job run failed; retrying next tick");
                            }
                        }
                        changed = rx.changed() => {
                            if changed.is_err() || *rx.borrow() {
                                break;
                            }
                        }
                    }
                }
                tracing::debug!(job = job.name(), "Job loop stopped");
            });
            self.handles.push(handle);
        }
    }

    /// Signals every job loop and waits for them. A pass already in flight runs to
    /// completion first.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(true);
        }
        let handles = std::mem::take(&mut self.handles);
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn seconds(n: u64) -> Duration {
    Duration::from_secs(n)
}
