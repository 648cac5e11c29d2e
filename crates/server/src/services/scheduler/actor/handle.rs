use tokio::sync::{mpsc, oneshot};

use super::messages::{JobStatus, SchedulerError, SchedulerMessage};

/// Cloneable sender side of the scheduler actor
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerMessage>,
}

impl SchedulerHandle {
    pub(in crate::services::scheduler) fn new(sender: mpsc::Sender<SchedulerMessage>) -> Self {
        Self { sender }
    }

    /// Run a job now, unless it is already running.
    pub async fn trigger(&self, job_name: &str) -> Result<(), SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(SchedulerMessage::TriggerJob {
                job_name: job_name.to_string(),
                reply,
            })
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        rx.await.map_err(|_| SchedulerError::Stopped)?
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobStatus>, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(SchedulerMessage::ListJobs { reply })
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        rx.await.map_err(|_| SchedulerError::Stopped)
    }

    /// False once the actor is gone
    pub(super) async fn send_timer_tick(&self, job_name: &'static str) -> bool {
        self.sender
            .send(SchedulerMessage::TimerTick { job_name })
            .await
            .is_ok()
    }

    pub(super) async fn send_job_completed(&self, job_name: &'static str, success: bool) {
        if self
            .sender
            .send(SchedulerMessage::JobCompleted { job_name, success })
            .await
            .is_err()
        {
            tracing::debug!("Scheduler stopped before '{}' reported back", job_name);
        }
    }
}
