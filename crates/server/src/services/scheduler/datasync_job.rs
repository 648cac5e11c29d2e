use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;

use super::traits::{JobResult, SchedulerJob};
use crate::services::DatasyncService;

/// First and last local hour a sync may start in
const WINDOW_HOURS: (u32, u32) = (12, 18);

/// Hourly ERP sync, restricted to weekday business hours.
pub struct DatasyncJob {
    datasync: Arc<DatasyncService>,
    timezone: Tz,
}

impl DatasyncJob {
    pub fn new(datasync: Arc<DatasyncService>, timezone: Tz) -> Self {
        Self { datasync, timezone }
    }
}

/// Monday to Friday, 12h to 18h in `timezone`
pub fn in_sync_window(now: DateTime<Utc>, timezone: Tz) -> bool {
    let local = now.with_timezone(&timezone);
    let weekday = !matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
    let (start, end) = WINDOW_HOURS;
    weekday && (start..=end).contains(&local.hour())
}

#[async_trait]
impl SchedulerJob for DatasyncJob {
    fn name(&self) -> &'static str {
        "Datasync"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(3600)
    }

    async fn execute(&self) -> JobResult {
        if !in_sync_window(Utc::now(), self.timezone) {
            tracing::debug!("Outside the sync window, skipping ERP sync");
            return Ok(());
        }

        let report = self.datasync.run().await?;
        if !report.is_success() {
            tracing::warn!("ERP sync finished with failed kinds: {:?}", report.failed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sync_window() {
        let tz = chrono_tz::America::Bahia;
        // Bahia is UTC-3
        let wednesday_noon = Utc.with_ymd_and_hms(2024, 5, 15, 15, 0, 0).unwrap();
        let wednesday_late = Utc.with_ymd_and_hms(2024, 5, 15, 21, 59, 0).unwrap();
        let wednesday_evening = Utc.with_ymd_and_hms(2024, 5, 15, 22, 0, 0).unwrap();
        let wednesday_morning = Utc.with_ymd_and_hms(2024, 5, 15, 14, 59, 0).unwrap();
        let saturday_noon = Utc.with_ymd_and_hms(2024, 5, 18, 15, 0, 0).unwrap();

        assert!(in_sync_window(wednesday_noon, tz));
        assert!(in_sync_window(wednesday_late, tz));
        assert!(!in_sync_window(wednesday_evening, tz));
        assert!(!in_sync_window(wednesday_morning, tz));
        assert!(!in_sync_window(saturday_noon, tz));
    }
}
