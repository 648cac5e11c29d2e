//! Actor-based job scheduler.
//!
//! Jobs are registered on a [`SchedulerBuilder`]; `start` spawns the actor and
//! one timer per periodic job. Each tick asks the actor to run the job, which
//! it skips while a previous run is still in flight. Jobs that are not
//! periodic only run through `trigger`.

mod actor;
mod datasync_job;
mod fetch_totvs_job;
mod token_cleanup_job;
mod traits;

use std::sync::Arc;
use tokio::sync::mpsc;

use actor::{SchedulerActor, SchedulerHandle, SchedulerMessage};

pub use actor::{JobStatus, SchedulerError};
pub use datasync_job::{in_sync_window, DatasyncJob};
pub use fetch_totvs_job::{FetchTotvsJob, FETCH_TOTVS_JOB};
pub use token_cleanup_job::TokenCleanupJob;
pub use traits::{JobResult, SchedulerJob};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Default)]
pub struct SchedulerBuilder {
    jobs: Vec<Arc<dyn SchedulerJob>>,
}

impl SchedulerBuilder {
    pub fn with_job(self, job: impl SchedulerJob + 'static) -> Self {
        self.with_arc_job(Arc::new(job))
    }

    pub fn with_arc_job(mut self, job: Arc<dyn SchedulerJob>) -> Self {
        self.jobs.push(job);
        self
    }

    /// Spawn the actor and its timers. Must be called inside a tokio runtime.
    pub fn start(self) -> SchedulerService {
        let (sender, receiver) = mpsc::channel::<SchedulerMessage>(CHANNEL_CAPACITY);
        let handle = SchedulerHandle::new(sender);

        let actor = SchedulerActor::new(self.jobs, receiver, handle.clone());
        actor.spawn_timers();
        tokio::spawn(actor.run());

        SchedulerService { handle }
    }
}

/// Running scheduler
pub struct SchedulerService {
    handle: SchedulerHandle,
}

impl SchedulerService {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::default()
    }

    pub async fn trigger(&self, job_name: &str) -> Result<(), SchedulerError> {
        tracing::info!("Manually triggering job '{}'", job_name);
        self.handle.trigger(job_name).await
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobStatus>, SchedulerError> {
        self.handle.list_jobs().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Counts runs and blocks until released
    struct GatedJob {
        runs: Arc<AtomicUsize>,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl SchedulerJob for GatedJob {
        fn name(&self) -> &'static str {
            "Gated"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(3600)
        }

        async fn execute(&self) -> JobResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(())
        }
    }

    async fn wait_idle(scheduler: &SchedulerService) {
        for _ in 0..100 {
            let jobs = scheduler.list_jobs().await.unwrap();
            if !jobs[0].is_running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job never finished");
    }

    #[tokio::test]
    async fn test_trigger_skips_running_job() {
        let runs = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let scheduler = SchedulerService::builder()
            .with_job(GatedJob {
                runs: Arc::clone(&runs),
                gate: Arc::clone(&gate),
            })
            .start();

        // The first timer tick starts the job immediately
        for _ in 0..100 {
            if runs.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let jobs = scheduler.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "Gated");
        assert_eq!(jobs[0].interval_secs, 3600);
        assert!(jobs[0].is_running);

        assert_eq!(
            scheduler.trigger("Gated").await,
            Err(SchedulerError::JobAlreadyRunning("Gated".to_string()))
        );

        gate.notify_one();
        wait_idle(&scheduler).await;

        scheduler.trigger("Gated").await.unwrap();
        gate.notify_one();
        wait_idle(&scheduler).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    /// Counts runs, never ticks on its own
    struct ManualJob {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SchedulerJob for ManualJob {
        fn name(&self) -> &'static str {
            "Manual"
        }

        fn interval(&self) -> Duration {
            Duration::ZERO
        }

        fn periodic(&self) -> bool {
            false
        }

        async fn execute(&self) -> JobResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_manual_job_runs_only_when_triggered() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = SchedulerService::builder()
            .with_job(ManualJob {
                runs: Arc::clone(&runs),
            })
            .start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        scheduler.trigger("Manual").await.unwrap();
        wait_idle(&scheduler).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trigger_unknown_job() {
        let scheduler = SchedulerService::builder().start();
        assert_eq!(
            scheduler.trigger("Missing").await,
            Err(SchedulerError::JobNotFound("Missing".to_string()))
        );
        assert!(scheduler.list_jobs().await.unwrap().is_empty());
    }
}
