use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::handle::SchedulerHandle;
use super::messages::{JobStatus, SchedulerError, SchedulerMessage};
use crate::services::scheduler::traits::SchedulerJob;

struct JobEntry {
    job: Arc<dyn SchedulerJob>,
    is_running: bool,
}

/// Owns the job table. Jobs run on their own tasks and report back with
/// `JobCompleted`, so the loop stays responsive while they execute.
pub struct SchedulerActor {
    jobs: HashMap<&'static str, JobEntry>,
    receiver: mpsc::Receiver<SchedulerMessage>,
    handle: SchedulerHandle,
}

impl SchedulerActor {
    pub fn new(
        jobs: Vec<Arc<dyn SchedulerJob>>,
        receiver: mpsc::Receiver<SchedulerMessage>,
        handle: SchedulerHandle,
    ) -> Self {
        let jobs = jobs
            .into_iter()
            .map(|job| {
                (
                    job.name(),
                    JobEntry {
                        job,
                        is_running: false,
                    },
                )
            })
            .collect();

        Self {
            jobs,
            receiver,
            handle,
        }
    }

    /// One ticking task per job
    pub fn spawn_timers(&self) {
        for (name, entry) in &self.jobs {
            if !entry.job.periodic() {
                continue;
            }
            let handle = self.handle.clone();
            let interval = entry.job.interval();
            let job_name = *name;

            tokio::spawn(async move {
                let mut timer = tokio::time::interval(interval);
                timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

                loop {
                    timer.tick().await;
                    if !handle.send_timer_tick(job_name).await {
                        break;
                    }
                }
            });
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Scheduler actor started with {} jobs", self.jobs.len());

        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg);
        }

        tracing::info!("Scheduler actor stopped");
    }

    fn handle_message(&mut self, msg: SchedulerMessage) {
        match msg {
            SchedulerMessage::TriggerJob { job_name, reply } => {
                let result = self.trigger_job_by_name(&job_name);
                let _ = reply.send(result);
            }

            SchedulerMessage::ListJobs { reply } => {
                let _ = reply.send(self.job_statuses());
            }

            SchedulerMessage::TimerTick { job_name } => {
                self.spawn_job(job_name);
            }

            SchedulerMessage::JobCompleted { job_name, success } => {
                self.handle_job_completed(job_name, success);
            }
        }
    }

    fn handle_job_completed(&mut self, job_name: &'static str, success: bool) {
        if let Some(entry) = self.jobs.get_mut(job_name) {
            entry.is_running = false;
        }

        if success {
            tracing::debug!("Job '{}' completed successfully", job_name);
        } else {
            tracing::error!("Job '{}' failed", job_name);
        }
    }

    fn trigger_job_by_name(&mut self, job_name: &str) -> Result<(), SchedulerError> {
        let Some((name, entry)) = self.jobs.get_key_value(job_name) else {
            return Err(SchedulerError::JobNotFound(job_name.to_string()));
        };

        if entry.is_running {
            return Err(SchedulerError::JobAlreadyRunning(job_name.to_string()));
        }

        let name = *name;
        self.spawn_job(name);
        Ok(())
    }

    /// Start a job unless it is still running from an earlier tick
    fn spawn_job(&mut self, name: &'static str) {
        let Some(entry) = self.jobs.get_mut(name) else {
            return;
        };

        if entry.is_running {
            tracing::debug!("Job '{}' is already running, skipping this trigger", name);
            return;
        }

        entry.is_running = true;
        let job = Arc::clone(&entry.job);
        let handle = self.handle.clone();

        tokio::spawn(async move {
            let result = job.execute().await;
            if let Err(e) = &result {
                tracing::error!("Job '{}' execution error: {}", name, e);
            }
            handle.send_job_completed(name, result.is_ok()).await;
        });
    }

    fn job_statuses(&self) -> Vec<JobStatus> {
        let mut statuses: Vec<JobStatus> = self
            .jobs
            .iter()
            .map(|(name, entry)| JobStatus {
                name: *name,
                interval_secs: entry.job.interval().as_secs(),
                is_running: entry.is_running,
            })
            .collect();
        statuses.sort_by_key(|status| status.name);
        statuses
    }
}
