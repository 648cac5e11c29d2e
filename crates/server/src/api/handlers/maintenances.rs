use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{
    Action, CatalogItem, Maintenance, MaintenanceFilter, NewMaintenance, NewUpgrade, Page,
    PageParams, Perm, SearchParams, UpdateMaintenance, UpdateUpgrade, Upgrade,
};
use crate::state::AppState;

const fn maintenance_perm(action: Action) -> Perm {
    Perm::new("asset", "maintenance", action)
}

const fn upgrade_perm(action: Action) -> Perm {
    Perm::new("asset", "upgrade", action)
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenances/",
    tag = "maintenances",
    request_body = NewMaintenance,
    responses(
        (status = 201, description = "Maintenance created", body = Maintenance),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_maintenance(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewMaintenance>,
) -> AppResult<(StatusCode, Json<Maintenance>)> {
    user.require(&[maintenance_perm(Action::Add)])?;
    let maintenance = state.maintenances.create_maintenance(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(maintenance)))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenances/",
    tag = "maintenances",
    params(MaintenanceFilter, PageParams),
    responses((status = 200, description = "Maintenances", body = inline(Page<Maintenance>)))
)]
pub async fn list_maintenances(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<MaintenanceFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Maintenance>>> {
    user.require(&[maintenance_perm(Action::View)])?;
    Ok(Json(state.maintenances.list_maintenances(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenances/{id}/",
    tag = "maintenances",
    params(("id" = i64, Path, description = "Maintenance id")),
    responses(
        (status = 200, description = "Maintenance", body = Maintenance),
        (status = 404, description = "Maintenance not found")
    )
)]
pub async fn get_maintenance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Maintenance>> {
    user.require(&[maintenance_perm(Action::View)])?;
    Ok(Json(state.maintenances.get_maintenance(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/maintenances/{id}/",
    tag = "maintenances",
    params(("id" = i64, Path, description = "Maintenance id")),
    request_body = UpdateMaintenance,
    responses(
        (status = 200, description = "Updated maintenance", body = Maintenance),
        (status = 404, description = "Maintenance not found")
    )
)]
pub async fn update_maintenance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateMaintenance>,
) -> AppResult<Json<Maintenance>> {
    user.require(&[maintenance_perm(Action::Edit)])?;
    Ok(Json(
        state.maintenances.update_maintenance(&user, id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenances-actions/",
    tag = "maintenances",
    params(SearchParams),
    responses((status = 200, description = "Maintenance actions", body = [CatalogItem]))
)]
pub async fn list_maintenance_actions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    user.require(&[maintenance_perm(Action::View)])?;
    Ok(Json(
        state.maintenances.list_actions(params.search.as_deref()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenances-status/",
    tag = "maintenances",
    params(SearchParams),
    responses((status = 200, description = "Maintenance statuses", body = [CatalogItem]))
)]
pub async fn list_maintenance_statuses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    user.require(&[maintenance_perm(Action::View), upgrade_perm(Action::View)])?;
    Ok(Json(
        state.maintenances.list_statuses(params.search.as_deref()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/maintenances-upgrade/",
    tag = "maintenances",
    request_body = NewUpgrade,
    responses(
        (status = 201, description = "Upgrade created", body = Upgrade),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_upgrade(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewUpgrade>,
) -> AppResult<(StatusCode, Json<Upgrade>)> {
    user.require(&[upgrade_perm(Action::Add)])?;
    let upgrade = state.maintenances.create_upgrade(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(upgrade)))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenances-upgrade/",
    tag = "maintenances",
    params(MaintenanceFilter, PageParams),
    responses((status = 200, description = "Upgrades", body = inline(Page<Upgrade>)))
)]
pub async fn list_upgrades(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<MaintenanceFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Upgrade>>> {
    user.require(&[upgrade_perm(Action::View)])?;
    Ok(Json(state.maintenances.list_upgrades(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/maintenances-upgrade/{id}/",
    tag = "maintenances",
    params(("id" = i64, Path, description = "Upgrade id")),
    responses(
        (status = 200, description = "Upgrade", body = Upgrade),
        (status = 404, description = "Upgrade not found")
    )
)]
pub async fn get_upgrade(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Upgrade>> {
    user.require(&[upgrade_perm(Action::View)])?;
    Ok(Json(state.maintenances.get_upgrade(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/maintenances-upgrade/{id}/",
    tag = "maintenances",
    params(("id" = i64, Path, description = "Upgrade id")),
    request_body = UpdateUpgrade,
    responses(
        (status = 200, description = "Updated upgrade", body = Upgrade),
        (status = 404, description = "Upgrade not found")
    )
)]
pub async fn update_upgrade(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUpgrade>,
) -> AppResult<Json<Upgrade>> {
    user.require(&[upgrade_perm(Action::Edit)])?;
    Ok(Json(
        state.maintenances.update_upgrade(&user, id, payload).await?,
    ))
}
