use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::field_bytes;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{
    Action, Asset, AssetDisposal, AssetFilter, AssetType, CatalogItem, DisposeAsset,
    ImportForm, ImportResponse, InactivateAsset, LendingHistory, MessageResponse, NewAsset, Page,
    PageParams, Perm, SearchParams, UpdateAsset,
};
use crate::services::{ImportError, IMPORT_SUCCESS};
use crate::state::AppState;

const fn asset_perm(action: Action) -> Perm {
    Perm::new("asset", "asset", action)
}

#[utoipa::path(
    post,
    path = "/api/v1/assets/",
    tag = "assets",
    request_body = NewAsset,
    responses(
        (status = 201, description = "Asset created", body = Asset),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewAsset>,
) -> AppResult<(StatusCode, Json<Asset>)> {
    user.require(&[asset_perm(Action::Add)])?;
    let asset = state.assets.create_asset(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

#[utoipa::path(
    get,
    path = "/api/v1/assets/",
    tag = "assets",
    params(AssetFilter, PageParams),
    responses((status = 200, description = "Assets", body = inline(Page<Asset>)))
)]
pub async fn list_assets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<AssetFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Asset>>> {
    user.require(&[asset_perm(Action::View)])?;
    Ok(Json(state.assets.list_assets(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/assets/{id}/",
    tag = "assets",
    params(("id" = i64, Path, description = "Asset id")),
    responses(
        (status = 200, description = "Asset", body = Asset),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn get_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Asset>> {
    user.require(&[asset_perm(Action::View)])?;
    Ok(Json(state.assets.get_asset(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/assets/{id}/",
    tag = "assets",
    params(("id" = i64, Path, description = "Asset id")),
    request_body = UpdateAsset,
    responses(
        (status = 200, description = "Updated asset", body = Asset),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn update_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAsset>,
) -> AppResult<Json<Asset>> {
    user.require(&[asset_perm(Action::Edit)])?;
    Ok(Json(state.assets.update_asset(&user, id, payload).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/assets/inactivate/{id}/",
    tag = "assets",
    params(("id" = i64, Path, description = "Asset id")),
    request_body = InactivateAsset,
    responses(
        (status = 200, description = "Inactivated asset", body = Asset),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn inactivate_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<InactivateAsset>,
) -> AppResult<Json<Asset>> {
    user.require(&[asset_perm(Action::Edit)])?;
    Ok(Json(state.assets.inactivate_asset(&user, id, payload).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/assets/disposal/{id}/",
    tag = "assets",
    params(("id" = i64, Path, description = "Asset id")),
    request_body = DisposeAsset,
    responses(
        (status = 200, description = "Recorded disposal", body = AssetDisposal),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn dispose_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<DisposeAsset>,
) -> AppResult<Json<AssetDisposal>> {
    user.require(&[asset_perm(Action::Edit)])?;
    Ok(Json(state.assets.dispose_asset(&user, id, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/assets/history/{id}/",
    tag = "assets",
    params(("id" = i64, Path, description = "Asset id")),
    responses(
        (status = 200, description = "Lendings of the asset", body = [LendingHistory]),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn get_asset_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<LendingHistory>>> {
    user.require(&[asset_perm(Action::View)])?;
    Ok(Json(state.assets.lending_history(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/assets-types/",
    tag = "assets",
    params(SearchParams),
    responses((status = 200, description = "Asset types", body = [AssetType]))
)]
pub async fn list_asset_types(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<AssetType>>> {
    user.require(&[Perm::new("asset", "asset_type", Action::View)])?;
    Ok(Json(state.assets.list_types(params.search.as_deref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/assets-status/",
    tag = "assets",
    params(SearchParams),
    responses((status = 200, description = "Asset statuses", body = [CatalogItem]))
)]
pub async fn list_asset_statuses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    user.require(&[Perm::new("asset", "asset_status", Action::View)])?;
    Ok(Json(
        state.assets.list_statuses(params.search.as_deref()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/assets/disposal-reasons/",
    tag = "assets",
    responses((status = 200, description = "Accepted disposal reasons", body = [String]))
)]
pub async fn disposal_reasons(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<&'static str>>> {
    user.require(&[asset_perm(Action::View)])?;
    Ok(Json(state.assets.disposal_reasons()))
}

/// Create assets from a CSV file with the export headers
#[utoipa::path(
    post,
    path = "/api/v1/assets/bulk-create/",
    tag = "assets",
    request_body(content = ImportForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "All rows imported", body = ImportResponse),
        (status = 400, description = "First invalid row", body = ImportResponse)
    )
)]
pub async fn bulk_create_assets(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ImportResponse>)> {
    user.require(&[asset_perm(Action::Add)])?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(super::multipart_error)? {
        if field.name() == Some("file") {
            file = Some(field_bytes(field).await?);
        }
    }
    let bytes = file.ok_or_else(|| AppError::field("file", "Arquivo é obrigatório"))?;

    match state.imports.bulk_import(&user, &bytes).await {
        Ok(count) => {
            tracing::info!("Bulk import created {} assets", count);
            Ok((
                StatusCode::CREATED,
                Json(ImportResponse {
                    message: Some(IMPORT_SUCCESS.to_string()),
                    error: None,
                }),
            ))
        }
        Err(ImportError::Database(e)) => Err(e.into()),
        Err(e) => {
            tracing::warn!("Bulk import rejected: {}", e);
            Ok((
                StatusCode::BAD_REQUEST,
                Json(ImportResponse {
                    message: None,
                    error: Some(e.to_string()),
                }),
            ))
        }
    }
}

/// Download the filtered assets as CSV
#[utoipa::path(
    get,
    path = "/api/v1/assets/export/",
    tag = "assets",
    params(AssetFilter),
    responses((status = 200, description = "CSV file", body = String, content_type = "text/csv"))
)]
pub async fn export_assets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<AssetFilter>,
) -> AppResult<Response> {
    user.require(&[asset_perm(Action::View)])?;
    let csv = state.imports.export_assets(&filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"ativos.csv\""),
        ],
        csv,
    )
        .into_response())
}

/// Move available assets with an open lending to "in use"
#[utoipa::path(
    get,
    path = "/api/v1/assets/run/fix-status/",
    tag = "assets",
    responses((status = 200, description = "Number of repaired assets", body = MessageResponse))
)]
pub async fn fix_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<MessageResponse>> {
    user.require(&[asset_perm(Action::Edit)])?;
    let fixed = state.assets.fix_status().await?;
    Ok(Json(MessageResponse::new(format!("{} ativos corrigidos", fixed))))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::api::handlers::test_support::{app, login, send};
    use crate::testing::Fixtures;

    fn multipart_request(token: &str, csv: &str) -> Request<Body> {
        let boundary = "agile-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"ativos.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
            b = boundary,
            csv = csv
        );
        Request::builder()
            .method("POST")
            .uri("/api/v1/assets/bulk-create/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_asset_listing_and_detail() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "MASTER", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        let asset = Fixtures::asset(&state.db, "NB-001").await;
        let token = login(&app, "ana").await;

        let (status, body) = send(&app, "GET", "/api/v1/assets/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let uri = format!("/api/v1/assets/{}/", asset);
        let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], "NB-001");

        let (status, body) = send(&app, "GET", "/api/v1/assets/9999/", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["field"], "assetId");

        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/assets/run/fix-status/",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "0 ativos corrigidos"}));
    }

    #[tokio::test]
    async fn test_listing_rejects_huge_page() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "MASTER", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        let token = login(&app, "ana").await;

        let uri = format!("/api/v1/assets/?page={}&size=15", i64::MAX);
        let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body[0]["field"], "page");
    }

    #[tokio::test]
    async fn test_bulk_create_rejects_unknown_columns() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "MASTER", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        let token = login(&app, "ana").await;

        let response = app
            .clone()
            .oneshot(multipart_request(&token, "Coluna Estranha\nx\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Colunas não existentes"));
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_bulk_create_rejects_header_only_file() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "MASTER", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        let token = login(&app, "ana").await;

        let response = app
            .clone()
            .oneshot(multipart_request(&token, "Patrimônio,Descrição\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Arquivo sem linhas de ativos");
    }

    #[tokio::test]
    async fn test_export_is_csv() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "MASTER", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        Fixtures::asset(&state.db, "NB-002").await;
        let token = login(&app, "ana").await;

        let request = Request::builder()
            .uri("/api/v1/assets/export/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("NB-002"));
    }
}
