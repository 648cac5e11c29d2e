use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::traits::{JobResult, SchedulerJob};
use crate::services::DatasyncService;

pub const FETCH_TOTVS_JOB: &str = "FetchTotvs";

/// On-demand ERP sync. It has no timer and ignores the business-hours window.
pub struct FetchTotvsJob {
    datasync: Arc<DatasyncService>,
}

impl FetchTotvsJob {
    pub fn new(datasync: Arc<DatasyncService>) -> Self {
        Self { datasync }
    }
}

#[async_trait]
impl SchedulerJob for FetchTotvsJob {
    fn name(&self) -> &'static str {
        FETCH_TOTVS_JOB
    }

    fn interval(&self) -> Duration {
        Duration::ZERO
    }

    fn periodic(&self) -> bool {
        false
    }

    async fn execute(&self) -> JobResult {
        let report = self.datasync.run().await?;
        if !report.is_success() {
            tracing::warn!("ERP sync finished with failed kinds: {:?}", report.failed);
        }
        Ok(())
    }
}
