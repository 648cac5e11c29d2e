use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::{Log, LogFilter, Operation, Page, PageParams};
use crate::repositories::LogRepository;

/// Audit trail of write operations
pub struct AuditService {
    db: SqlitePool,
}

impl AuditService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record an operation. Failures are logged and swallowed.
    pub async fn record(
        &self,
        user_id: Option<i64>,
        module: &str,
        model: &str,
        operation: Operation,
        identifier: Option<i64>,
    ) {
        if let Err(e) =
            LogRepository::insert(&self.db, user_id, module, model, operation, identifier).await
        {
            tracing::error!(
                "Failed to record {} {}.{} log for {:?}: {}",
                operation.as_str(),
                module,
                model,
                identifier,
                e
            );
        }
    }

    pub async fn list(&self, filter: &LogFilter, page: PageParams) -> AppResult<Page<Log>> {
        page.validate()?;
        let (items, total) = LogRepository::list(&self.db, filter.search.as_deref(), page).await?;
        Ok(Page::new(items, total, page))
    }
}
