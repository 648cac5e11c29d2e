use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{
    Action, CostCenter, Employee, EmployeeFilter, EmployeeSelect, EmployeeSelectParams,
    LendingHistory, NewEmployee, Page, PageParams, Perm, Reference, ReferenceTable, Role,
    SearchParams, UpdateEmployee,
};
use crate::state::AppState;

const fn employee_perm(action: Action) -> Perm {
    Perm::new("people", "employee", action)
}

#[utoipa::path(
    post,
    path = "/api/v1/people/employees/",
    tag = "people",
    request_body = NewEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewEmployee>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    user.require(&[employee_perm(Action::Add)])?;
    let employee = state.people.create_employee(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

#[utoipa::path(
    get,
    path = "/api/v1/people/employees/",
    tag = "people",
    params(EmployeeFilter, PageParams),
    responses((status = 200, description = "Employees", body = inline(Page<Employee>)))
)]
pub async fn list_employees(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<EmployeeFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Employee>>> {
    user.require(&[employee_perm(Action::View)])?;
    Ok(Json(state.people.list_employees(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/people/employees/{id}/",
    tag = "people",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee", body = Employee),
        (status = 404, description = "Employee not found")
    )
)]
pub async fn get_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Employee>> {
    user.require(&[employee_perm(Action::View)])?;
    Ok(Json(state.people.get_employee(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/people/employees/{id}/",
    tag = "people",
    params(("id" = i64, Path, description = "Employee id")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Updated employee", body = Employee),
        (status = 404, description = "Employee not found")
    )
)]
pub async fn update_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEmployee>,
) -> AppResult<Json<Employee>> {
    user.require(&[employee_perm(Action::Edit)])?;
    Ok(Json(state.people.update_employee(&user, id, payload).await?))
}

/// Compact employee list for select inputs
#[utoipa::path(
    get,
    path = "/api/v1/people/employees-select/",
    tag = "people",
    params(EmployeeSelectParams),
    responses((status = 200, description = "Employees", body = [EmployeeSelect]))
)]
pub async fn employees_select(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<EmployeeSelectParams>,
) -> AppResult<Json<Vec<EmployeeSelect>>> {
    user.require(&[employee_perm(Action::View)])?;
    Ok(Json(state.people.employees_select(&params).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/people/employees/history/lending/{id}/",
    tag = "people",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Lendings of the employee", body = [LendingHistory]),
        (status = 404, description = "Employee not found")
    )
)]
pub async fn employee_lending_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<LendingHistory>>> {
    user.require(&[employee_perm(Action::View)])?;
    Ok(Json(state.people.lending_history(id).await?))
}

async fn references(
    state: &AppState,
    user: &AuthUser,
    model: &'static str,
    table: ReferenceTable,
    search: Option<&str>,
) -> AppResult<Json<Vec<Reference>>> {
    user.require(&[Perm::new("people", model, Action::View)])?;
    Ok(Json(state.people.list_references(table, search).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/people/nationalities/",
    tag = "people",
    params(SearchParams),
    responses((status = 200, description = "Nationalities", body = [Reference]))
)]
pub async fn list_nationalities(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Reference>>> {
    references(
        &state,
        &user,
        "nationality",
        ReferenceTable::Nationality,
        params.search.as_deref(),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/v1/people/marital-status/",
    tag = "people",
    params(SearchParams),
    responses((status = 200, description = "Marital statuses", body = [Reference]))
)]
pub async fn list_marital_statuses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Reference>>> {
    references(
        &state,
        &user,
        "marital_status",
        ReferenceTable::MaritalStatus,
        params.search.as_deref(),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/v1/people/genders/",
    tag = "people",
    params(SearchParams),
    responses((status = 200, description = "Genders", body = [Reference]))
)]
pub async fn list_genders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Reference>>> {
    references(
        &state,
        &user,
        "gender",
        ReferenceTable::Gender,
        params.search.as_deref(),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/v1/people/educational-level/",
    tag = "people",
    params(SearchParams),
    responses((status = 200, description = "Educational levels", body = [Reference]))
)]
pub async fn list_educational_levels(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Reference>>> {
    references(
        &state,
        &user,
        "educational_level",
        ReferenceTable::EducationalLevel,
        params.search.as_deref(),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/v1/people/center-cost/",
    tag = "people",
    params(SearchParams),
    responses((status = 200, description = "Cost centers", body = [CostCenter]))
)]
pub async fn list_cost_centers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<CostCenter>>> {
    user.require(&[Perm::new("people", "center_cost", Action::View)])?;
    Ok(Json(
        state.people.list_cost_centers(params.search.as_deref()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/people/roles/",
    tag = "people",
    params(SearchParams),
    responses((status = 200, description = "Roles", body = [Role]))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Role>>> {
    user.require(&[Perm::new("people", "role", Action::View)])?;
    Ok(Json(state.people.list_roles(params.search.as_deref()).await?))
}
