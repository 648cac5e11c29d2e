use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers;

/// CORS from the configured origins; an empty list or `*` allows any origin.
fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

fn api_routes() -> Router<AppState> {
    use axum::routing::{get, patch, post};

    Router::new()
        // Auth endpoints
        .route("/auth/login/", post(handlers::login))
        .route("/auth/refresh-token/", post(handlers::refresh_token))
        .route("/auth/logout/", post(handlers::logout))
        .route(
            "/auth/users/",
            post(handlers::create_user).get(handlers::list_users),
        )
        .route(
            "/auth/users/{id}/",
            get(handlers::get_user).patch(handlers::update_user),
        )
        .route("/auth/users/me/password/", patch(handlers::change_password))
        .route("/auth/send-new-password/", post(handlers::send_new_password))
        .route(
            "/auth/groups/",
            post(handlers::create_group).get(handlers::list_groups),
        )
        .route(
            "/auth/groups/{id}/",
            get(handlers::get_group).patch(handlers::update_group),
        )
        .route("/auth/permissions/", get(handlers::list_permissions))
        // People endpoints
        .route(
            "/people/employees/",
            post(handlers::create_employee).get(handlers::list_employees),
        )
        .route(
            "/people/employees/{id}/",
            get(handlers::get_employee).patch(handlers::update_employee),
        )
        .route("/people/employees-select/", get(handlers::employees_select))
        .route(
            "/people/employees/history/lending/{id}/",
            get(handlers::employee_lending_history),
        )
        .route("/people/nationalities/", get(handlers::list_nationalities))
        .route("/people/marital-status/", get(handlers::list_marital_statuses))
        .route("/people/center-cost/", get(handlers::list_cost_centers))
        .route("/people/genders/", get(handlers::list_genders))
        .route("/people/roles/", get(handlers::list_roles))
        .route(
            "/people/educational-level/",
            get(handlers::list_educational_levels),
        )
        // Asset endpoints
        .route(
            "/assets/",
            post(handlers::create_asset).get(handlers::list_assets),
        )
        .route(
            "/assets/{id}/",
            get(handlers::get_asset).patch(handlers::update_asset),
        )
        .route("/assets/inactivate/{id}/", patch(handlers::inactivate_asset))
        .route("/assets/disposal/{id}/", patch(handlers::dispose_asset))
        .route("/assets/history/{id}/", get(handlers::get_asset_history))
        .route("/assets/disposal-reasons/", get(handlers::disposal_reasons))
        .route("/assets/bulk-create/", post(handlers::bulk_create_assets))
        .route("/assets/export/", get(handlers::export_assets))
        .route("/assets/run/fix-status/", get(handlers::fix_status))
        .route("/assets-types/", get(handlers::list_asset_types))
        .route("/assets-status/", get(handlers::list_asset_statuses))
        // Lending endpoints
        .route(
            "/lendings/",
            post(handlers::create_lending).get(handlers::list_lendings),
        )
        .route(
            "/lendings/{id}/",
            get(handlers::get_lending)
                .patch(handlers::update_lending)
                .delete(handlers::delete_lending),
        )
        .route("/lendings-workloads/", get(handlers::list_workloads))
        .route("/lendings-status/", get(handlers::list_lending_statuses))
        .route(
            "/lendings-witness/",
            post(handlers::create_witness).get(handlers::list_witnesses),
        )
        // Maintenance endpoints
        .route(
            "/maintenances/",
            post(handlers::create_maintenance).get(handlers::list_maintenances),
        )
        .route(
            "/maintenances/{id}/",
            get(handlers::get_maintenance).patch(handlers::update_maintenance),
        )
        .route(
            "/maintenances-actions/",
            get(handlers::list_maintenance_actions),
        )
        .route(
            "/maintenances-status/",
            get(handlers::list_maintenance_statuses),
        )
        .route(
            "/maintenances-upgrade/",
            post(handlers::create_upgrade).get(handlers::list_upgrades),
        )
        .route(
            "/maintenances-upgrade/{id}/",
            get(handlers::get_upgrade).patch(handlers::update_upgrade),
        )
        // Invoice endpoints
        .route(
            "/invoice/invoices/",
            post(handlers::create_invoice).get(handlers::list_invoices),
        )
        .route(
            "/invoice/invoices/{id}/",
            get(handlers::get_invoice)
                .patch(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        // Terms
        .route("/terms/", post(handlers::create_term).get(handlers::list_terms))
        .route(
            "/terms/{id}/",
            get(handlers::get_term).patch(handlers::update_term),
        )
        .route("/terms-status/", get(handlers::list_term_statuses))
        .route("/terms-types/", get(handlers::list_term_types))
        // Documents
        .route(
            "/documents/contracts/create/",
            post(handlers::create_contract),
        )
        .route(
            "/documents/contracts/upload/",
            post(handlers::upload_contract),
        )
        .route(
            "/documents/contracts/revoke/create/",
            post(handlers::create_revoke_contract),
        )
        .route(
            "/documents/contracts/revoke/upload/",
            post(handlers::upload_revoke_contract),
        )
        .route("/documents/terms/create/", post(handlers::create_term_document))
        .route("/documents/terms/upload/", post(handlers::upload_term))
        .route(
            "/documents/terms/revoke/create/",
            post(handlers::create_revoke_term),
        )
        .route(
            "/documents/terms/revoke/upload/",
            post(handlers::upload_revoke_term),
        )
        .route(
            "/documents/verification/{lending_id}/",
            post(handlers::create_verification_document),
        )
        .route("/documents/list/", get(handlers::list_documents))
        .route("/documents/download/{id}/", get(handlers::download_document))
        // Checklists
        .route("/verifications/", post(handlers::create_verification))
        .route(
            "/verifications/{asset_type_id}/",
            get(handlers::list_verifications),
        )
        .route("/verifications/answer/", post(handlers::create_answers))
        .route(
            "/verifications/answer/{lending_id}/",
            get(handlers::list_answers),
        )
        // Audit log
        .route("/logs/", get(handlers::list_logs))
        // ERP sync
        .route("/fetch-totvs/", post(handlers::fetch_totvs))
        .route("/fetch-totvs/records/", get(handlers::list_sync_records))
        .route("/scheduler/jobs/", get(handlers::list_jobs))
}

pub fn create_router(state: AppState) -> Router {
    use axum::routing::get;

    let cors = cors(&state.config.allowed_origins);

    Router::new()
        .nest("/api/v1", api_routes())
        .route("/", get(handlers::root))
        .route("/docs", get(handlers::docs))
        .route("/openapi.json", get(handlers::openapi_json))
        .route("/health/", get(handlers::health))
        .route("/sqlserver/check/", get(handlers::sqlserver_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::handlers::test_support::app;

    #[tokio::test]
    async fn test_preflight_allows_configured_origin() {
        let (app, _) = app().await;
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/assets/")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (app, _) = app().await;
        let request = Request::builder()
            .uri("/api/v1/nothing/")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
