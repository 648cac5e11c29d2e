pub(crate) mod assets;
pub(crate) mod auth;
pub(crate) mod datasync;
pub(crate) mod documents;
pub(crate) mod health;
pub(crate) mod invoices;
pub(crate) mod lendings;
pub(crate) mod logs;
pub(crate) mod maintenances;
pub(crate) mod people;
pub(crate) mod terms;
pub(crate) mod verifications;

use axum::extract::multipart::Field;

use crate::error::{AppError, AppResult};

// Re-export all handlers
pub use assets::{
    bulk_create_assets, create_asset, disposal_reasons, dispose_asset, export_assets, fix_status,
    get_asset, get_asset_history, inactivate_asset, list_asset_statuses, list_asset_types,
    list_assets, update_asset,
};
pub use auth::{
    change_password, create_group, create_user, get_group, get_user, list_groups,
    list_permissions, list_users, login, logout, refresh_token, send_new_password, update_group,
    update_user,
};
pub use datasync::{fetch_totvs, list_jobs, list_sync_records};
pub use documents::{
    create_contract, create_revoke_contract, create_revoke_term, create_term_document,
    create_verification_document, download_document, list_documents, upload_contract,
    upload_revoke_contract, upload_revoke_term, upload_term,
};
pub use health::{docs, health, openapi_json, root, sqlserver_check};
pub use invoices::{create_invoice, delete_invoice, get_invoice, list_invoices, update_invoice};
pub use lendings::{
    create_lending, create_witness, delete_lending, get_lending, list_lending_statuses,
    list_lendings, list_witnesses, list_workloads, update_lending,
};
pub use logs::list_logs;
pub use maintenances::{
    create_maintenance, create_upgrade, get_maintenance, get_upgrade, list_maintenance_actions,
    list_maintenance_statuses, list_maintenances, list_upgrades, update_maintenance,
    update_upgrade,
};
pub use people::{
    create_employee, employee_lending_history, employees_select, get_employee,
    list_cost_centers, list_educational_levels, list_employees, list_genders,
    list_marital_statuses, list_nationalities, list_roles, update_employee,
};
pub use terms::{
    create_term, get_term, list_term_statuses, list_term_types, list_terms, update_term,
};
pub use verifications::{create_answers, create_verification, list_answers, list_verifications};

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::bad_request(format!("Invalid multipart form: {}", e))
}

async fn field_text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(multipart_error)
}

async fn field_bytes(field: Field<'_>) -> AppResult<Vec<u8>> {
    Ok(field.bytes().await.map_err(multipart_error)?.to_vec())
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::api::create_router;
    use crate::config::Config;
    use crate::state::AppState;
    use crate::testing::{test_pool, FIXTURE_PASSWORD};

    /// Router over a fresh database, plus the pool behind it
    pub async fn app() -> (Router, AppState) {
        let pool = test_pool().await;
        let mut config = Config::new("sqlite::memory:".to_string());
        let dir = std::env::temp_dir().join(format!("agile-test-{}", rand::random::<u64>()));
        config.storage_dir = dir;
        let state = AppState::new(pool, config, None);
        (create_router(state.clone()), state)
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };
        (status, value)
    }

    /// Access token of `username`, who must exist with the fixture password
    pub async fn login(app: &Router, username: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/v1/auth/login/",
            None,
            Some(serde_json::json!({"username": username, "password": FIXTURE_PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["accessToken"].as_str().unwrap().to_string()
    }
}
