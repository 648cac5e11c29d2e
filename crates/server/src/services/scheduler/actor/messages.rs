use serde::Serialize;
use tokio::sync::oneshot;
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Job '{0}' is already running")]
    JobAlreadyRunning(String),

    #[error("Job '{0}' not found")]
    JobNotFound(String),

    #[error("Scheduler is not running")]
    Stopped,
}

/// Snapshot of one registered job
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub name: &'static str,
    pub interval_secs: u64,
    pub is_running: bool,
}

pub enum SchedulerMessage {
    TriggerJob {
        job_name: String,
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    ListJobs {
        reply: oneshot::Sender<Vec<JobStatus>>,
    },
    TimerTick {
        job_name: &'static str,
    },
    JobCompleted {
        job_name: &'static str,
        success: bool,
    },
}
