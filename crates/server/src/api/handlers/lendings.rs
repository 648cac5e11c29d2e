use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{
    Action, CatalogItem, Lending, LendingFilter, NewLending, NewWitness, Page, PageParams, Perm,
    SearchParams, UpdateLending, Witness, WitnessFilter,
};
use crate::state::AppState;

const fn lending_perm(action: Action) -> Perm {
    Perm::new("lending", "lending", action)
}

const fn witness_perm(action: Action) -> Perm {
    Perm::new("lending", "witness", action)
}

#[utoipa::path(
    post,
    path = "/api/v1/lendings/",
    tag = "lendings",
    request_body = NewLending,
    responses(
        (status = 201, description = "Lending created", body = Lending),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_lending(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewLending>,
) -> AppResult<(StatusCode, Json<Lending>)> {
    user.require(&[lending_perm(Action::Add)])?;
    let lending = state.lendings.create_lending(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(lending)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lendings/",
    tag = "lendings",
    params(LendingFilter, PageParams),
    responses((status = 200, description = "Lendings", body = inline(Page<Lending>)))
)]
pub async fn list_lendings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<LendingFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Lending>>> {
    user.require(&[lending_perm(Action::View)])?;
    Ok(Json(state.lendings.list_lendings(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/lendings/{id}/",
    tag = "lendings",
    params(("id" = i64, Path, description = "Lending id")),
    responses(
        (status = 200, description = "Lending", body = Lending),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn get_lending(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Lending>> {
    user.require(&[lending_perm(Action::View)])?;
    Ok(Json(state.lendings.get_lending(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/lendings/{id}/",
    tag = "lendings",
    params(("id" = i64, Path, description = "Lending id")),
    request_body = UpdateLending,
    responses(
        (status = 200, description = "Updated lending", body = Lending),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn update_lending(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLending>,
) -> AppResult<Json<Lending>> {
    user.require(&[lending_perm(Action::Edit)])?;
    Ok(Json(state.lendings.update_lending(&user, id, payload).await?))
}

/// Soft delete; the asset becomes available again
#[utoipa::path(
    delete,
    path = "/api/v1/lendings/{id}/",
    tag = "lendings",
    params(("id" = i64, Path, description = "Lending id")),
    responses(
        (status = 204, description = "Lending deleted"),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn delete_lending(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    user.require(&[lending_perm(Action::Delete)])?;
    state.lendings.delete_lending(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/lendings-workloads/",
    tag = "lendings",
    params(SearchParams),
    responses((status = 200, description = "Workloads", body = [CatalogItem]))
)]
pub async fn list_workloads(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    user.require(&[Perm::new("lending", "workload", Action::View)])?;
    Ok(Json(
        state.lendings.list_workloads(params.search.as_deref()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/lendings-status/",
    tag = "lendings",
    params(SearchParams),
    responses((status = 200, description = "Lending statuses", body = [CatalogItem]))
)]
pub async fn list_lending_statuses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    user.require(&[lending_perm(Action::View)])?;
    Ok(Json(
        state.lendings.list_statuses(params.search.as_deref()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/lendings-witness/",
    tag = "lendings",
    request_body = NewWitness,
    responses(
        (status = 201, description = "Witness created", body = Witness),
        (status = 404, description = "Employee not found")
    )
)]
pub async fn create_witness(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewWitness>,
) -> AppResult<(StatusCode, Json<Witness>)> {
    user.require(&[witness_perm(Action::Add)])?;
    let witness = state.lendings.create_witness(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(witness)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lendings-witness/",
    tag = "lendings",
    params(WitnessFilter),
    responses((status = 200, description = "Witnesses", body = [Witness]))
)]
pub async fn list_witnesses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<WitnessFilter>,
) -> AppResult<Json<Vec<Witness>>> {
    user.require(&[witness_perm(Action::View)])?;
    Ok(Json(state.lendings.list_witnesses(&filter).await?))
}
