use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{MessageResponse, SyncRecord};
use crate::services::{JobStatus, FETCH_TOTVS_JOB};
use crate::state::AppState;

/// Records returned by the sync history
const RECORDS_LIMIT: i64 = 50;

/// Start an ERP sync through the scheduler
#[utoipa::path(
    post,
    path = "/api/v1/fetch-totvs/",
    tag = "datasync",
    responses(
        (status = 200, description = "Sync started", body = MessageResponse),
        (status = 400, description = "No ERP connection configured or a sync is running")
    )
)]
pub async fn fetch_totvs(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<MessageResponse>> {
    if state.datasync.is_none() {
        return Err(totvs::TotvsError::NotConfigured.into());
    }
    tracing::info!("ERP sync requested by '{}'", user.account.username);

    state.scheduler.trigger(FETCH_TOTVS_JOB).await?;

    Ok(Json(MessageResponse::new("Sent fetch data")))
}

/// Registered scheduler jobs and whether each is running
#[utoipa::path(
    get,
    path = "/api/v1/scheduler/jobs/",
    tag = "datasync",
    responses((status = 200, description = "Scheduler jobs", body = [JobStatus]))
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<JobStatus>>> {
    Ok(Json(state.scheduler.list_jobs().await?))
}

/// Latest sync runs per kind, newest first
#[utoipa::path(
    get,
    path = "/api/v1/fetch-totvs/records/",
    tag = "datasync",
    responses((status = 200, description = "Sync records", body = [SyncRecord]))
)]
pub async fn list_sync_records(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<SyncRecord>>> {
    let records = match &state.datasync {
        Some(datasync) => datasync.latest_records(RECORDS_LIMIT).await?,
        None => crate::repositories::SyncRepository::latest_records(&state.db, RECORDS_LIMIT).await?,
    };
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use async_trait::async_trait;
    use std::sync::Arc;
    use totvs::{
        AssetGroupRecord, AssetRecord, CodeDescriptionRecord, CostCenterRecord, EmployeeRecord,
        RoleRecord, TotvsSource,
    };

    use crate::api::create_router;
    use crate::api::handlers::test_support::{app, login, send};
    use crate::config::Config;
    use crate::state::AppState;
    use crate::testing::{test_pool, Fixtures};

    #[tokio::test]
    async fn test_fetch_without_erp() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "TI", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        let token = login(&app, "ana").await;

        let (status, body) = send(&app, "POST", "/api/v1/fetch-totvs/", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!("ERP source is not configured"));

        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/fetch-totvs/records/",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = send(&app, "POST", "/api/v1/fetch-totvs/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&app, "GET", "/api/v1/scheduler/jobs/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|job| job["name"].as_str().unwrap())
            .collect();
        assert!(!names.contains(&"FetchTotvs"));
    }

    /// ERP with nothing in it
    struct EmptySource;

    #[async_trait]
    impl TotvsSource for EmptySource {
        async fn version(&self) -> totvs::Result<String> {
            Ok("empty".into())
        }
        async fn asset_groups(&self) -> totvs::Result<Vec<AssetGroupRecord>> {
            Ok(vec![])
        }
        async fn marital_statuses(&self) -> totvs::Result<Vec<CodeDescriptionRecord>> {
            Ok(vec![])
        }
        async fn genders(&self) -> totvs::Result<Vec<CodeDescriptionRecord>> {
            Ok(vec![])
        }
        async fn nationalities(&self) -> totvs::Result<Vec<CodeDescriptionRecord>> {
            Ok(vec![])
        }
        async fn cost_centers(&self) -> totvs::Result<Vec<CostCenterRecord>> {
            Ok(vec![])
        }
        async fn roles(&self) -> totvs::Result<Vec<RoleRecord>> {
            Ok(vec![])
        }
        async fn educational_levels(&self) -> totvs::Result<Vec<CodeDescriptionRecord>> {
            Ok(vec![])
        }
        async fn assets(&self) -> totvs::Result<Vec<AssetRecord>> {
            Ok(vec![])
        }
        async fn employees(&self) -> totvs::Result<Vec<EmployeeRecord>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_fetch_runs_through_scheduler() {
        let pool = test_pool().await;
        let config = Config::new("sqlite::memory:".to_string());
        let state = AppState::new(pool, config, Some(Arc::new(EmptySource)));
        let app = create_router(state.clone());
        let group = Fixtures::group(&state.db, "TI", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        let token = login(&app, "ana").await;

        let (status, body) = send(&app, "POST", "/api/v1/fetch-totvs/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Sent fetch data");

        let jobs = state.scheduler.list_jobs().await.unwrap();
        let job = jobs.iter().find(|job| job.name == "FetchTotvs").unwrap();
        assert_eq!(job.interval_secs, 0);
    }
}
