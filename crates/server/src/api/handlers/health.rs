use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::{OpenApi, ToSchema};

use crate::openapi::ApiDoc;
use crate::state::AppState;

const DOCS_PAGE: &str = r#"<!doctype html>
<html>
  <head>
    <title>Agile API</title>
    <meta charset="utf-8" />
  </head>
  <body>
    <redoc spec-url="/openapi.json"></redoc>
    <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
  </body>
</html>
"#;

#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseHealth {
    pub version: String,
    pub server: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErpHealth {
    pub status: String,
    pub version: String,
}

/// Database connectivity
#[utoipa::path(
    get,
    path = "/health/",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable"),
        (status = 500, description = "Database disconnected")
    )
)]
pub async fn health(State(state): State<AppState>) -> Response {
    match crate::db::version(&state.db).await {
        Ok(version) => Json(json!({
            "status": "ok",
            "database": DatabaseHealth {
                version,
                server: "SQLite".to_string(),
            },
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "not ok", "database": "Database disconnected"})),
            )
                .into_response()
        }
    }
}

/// ERP database connectivity
#[utoipa::path(
    get,
    path = "/sqlserver/check/",
    tag = "health",
    responses(
        (status = 200, description = "ERP reachable", body = ErpHealth),
        (status = 500, description = "ERP not connected")
    )
)]
pub async fn sqlserver_check(State(state): State<AppState>) -> Response {
    let Some(source) = &state.totvs else {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json("Not connected")).into_response();
    };

    match source.version().await {
        Ok(version) => Json(ErpHealth {
            status: "ok".to_string(),
            version,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("ERP check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json("Not connected")).into_response()
        }
    }
}

pub async fn root() -> Redirect {
    Redirect::temporary("/docs")
}

pub async fn docs() -> Html<&'static str> {
    Html(DOCS_PAGE)
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
