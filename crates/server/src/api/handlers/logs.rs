use axum::{
    extract::{Query, State},
    Json,
};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{Action, Log, LogFilter, Page, PageParams, Perm};
use crate::state::AppState;

/// Audit trail, newest first
#[utoipa::path(
    get,
    path = "/api/v1/logs/",
    tag = "logs",
    params(LogFilter, PageParams),
    responses((status = 200, description = "Audit log entries", body = inline(Page<Log>)))
)]
pub async fn list_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<LogFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Log>>> {
    user.require(&[Perm::new("logs", "log", Action::View)])?;
    Ok(Json(state.audit.list(&filter, page).await?))
}
