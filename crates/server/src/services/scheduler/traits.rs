use async_trait::async_trait;
use std::time::Duration;

/// Result type for scheduler job execution.
pub type JobResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A periodically executed job.
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use std::time::Duration;
/// use crate::services::{JobResult, SchedulerJob};
///
/// pub struct MyJob;
///
/// #[async_trait]
/// impl SchedulerJob for MyJob {
///     fn name(&self) -> &'static str {
///         "MyJob"
///     }
///
///     fn interval(&self) -> Duration {
///         Duration::from_secs(60)
///     }
///
///     async fn execute(&self) -> JobResult {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait SchedulerJob: Send + Sync {
    /// Unique name, used to trigger the job and in logs.
    fn name(&self) -> &'static str;

    /// Time between two timer ticks.
    fn interval(&self) -> Duration;

    /// Jobs that are not periodic only run when triggered.
    fn periodic(&self) -> bool {
        true
    }

    /// Run the job once. Errors are logged and the next tick runs again.
    async fn execute(&self) -> JobResult;
}
