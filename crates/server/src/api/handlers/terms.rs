use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{
    Action, CatalogItem, NewTerm, Page, PageParams, Perm, SearchParams, Term, TermFilter,
    UpdateTerm,
};
use crate::state::AppState;

const fn term_perm(action: Action) -> Perm {
    Perm::new("lending", "term", action)
}

#[utoipa::path(
    post,
    path = "/api/v1/terms/",
    tag = "terms",
    request_body = NewTerm,
    responses(
        (status = 201, description = "Term created", body = Term),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_term(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewTerm>,
) -> AppResult<(StatusCode, Json<Term>)> {
    user.require(&[term_perm(Action::Add)])?;
    let term = state.terms.create_term(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(term)))
}

#[utoipa::path(
    get,
    path = "/api/v1/terms/",
    tag = "terms",
    params(TermFilter, PageParams),
    responses((status = 200, description = "Terms", body = inline(Page<Term>)))
)]
pub async fn list_terms(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<TermFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Term>>> {
    user.require(&[term_perm(Action::View)])?;
    Ok(Json(state.terms.list_terms(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/terms/{id}/",
    tag = "terms",
    params(("id" = i64, Path, description = "Term id")),
    responses(
        (status = 200, description = "Term", body = Term),
        (status = 404, description = "Term not found")
    )
)]
pub async fn get_term(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Term>> {
    user.require(&[term_perm(Action::View)])?;
    Ok(Json(state.terms.get_term(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/terms/{id}/",
    tag = "terms",
    params(("id" = i64, Path, description = "Term id")),
    request_body = UpdateTerm,
    responses(
        (status = 200, description = "Updated term", body = Term),
        (status = 404, description = "Term not found")
    )
)]
pub async fn update_term(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTerm>,
) -> AppResult<Json<Term>> {
    user.require(&[term_perm(Action::Edit)])?;
    Ok(Json(state.terms.update_term(&user, id, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/terms-status/",
    tag = "terms",
    params(SearchParams),
    responses((status = 200, description = "Term statuses", body = [CatalogItem]))
)]
pub async fn list_term_statuses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    user.require(&[term_perm(Action::View)])?;
    Ok(Json(state.terms.list_statuses(params.search.as_deref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/terms-types/",
    tag = "terms",
    params(SearchParams),
    responses((status = 200, description = "Term item types", body = [CatalogItem]))
)]
pub async fn list_term_types(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    user.require(&[term_perm(Action::View)])?;
    Ok(Json(
        state.terms.list_item_types(params.search.as_deref()).await?,
    ))
}
