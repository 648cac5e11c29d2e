use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::traits::{JobResult, SchedulerJob};
use crate::services::AuthService;

/// Removes token rows whose refresh token can no longer be used.
pub struct TokenCleanupJob {
    auth: Arc<AuthService>,
}

impl TokenCleanupJob {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl SchedulerJob for TokenCleanupJob {
    fn name(&self) -> &'static str {
        "TokenCleanup"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(3600)
    }

    async fn execute(&self) -> JobResult {
        match self.auth.purge_expired_tokens().await {
            Ok(0) => tracing::debug!("Token cleanup completed: nothing to delete"),
            Ok(deleted) => tracing::info!("Token cleanup completed: {} tokens deleted", deleted),
            Err(e) => tracing::error!("Token cleanup failed: {}", e),
        }
        Ok(())
    }
}
