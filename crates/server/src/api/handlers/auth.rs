use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{
    Action, ChangePassword, CreatedUser, Group, GroupFilter, LoginRequest, LoginResponse,
    MessageResponse, NewGroup, NewPasswordRequest, NewPasswordResponse, NewUser, Page, PageParams,
    Perm, Permission, PermissionFilter, RefreshRequest, UpdateGroup, UpdateUser, User, UserFilter,
};
use crate::state::AppState;

const fn user_perm(action: Action) -> Perm {
    Perm::new("auth", "user", action)
}

const fn group_perm(action: Action) -> Perm {
    Perm::new("auth", "group", action)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login/",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair and profile", body = LoginResponse),
        (status = 401, description = "Wrong username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.auth.login(&payload.username, &payload.password).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token/",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout/",
    tag = "auth",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(state.auth.logout(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/users/",
    tag = "auth",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = CreatedUser),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewUser>,
) -> AppResult<(StatusCode, Json<CreatedUser>)> {
    user.require(&[user_perm(Action::Add)])?;
    let created = state.users.create_user(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/users/",
    tag = "auth",
    params(UserFilter, PageParams),
    responses((status = 200, description = "Users, newest first", body = inline(Page<User>)))
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<UserFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<User>>> {
    user.require(&[user_perm(Action::View)])?;
    Ok(Json(state.users.list_users(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/users/{id}/",
    tag = "auth",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    user.require(&[user_perm(Action::View)])?;
    Ok(Json(state.users.get_user(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/auth/users/{id}/",
    tag = "auth",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    user.require(&[user_perm(Action::Edit)])?;
    Ok(Json(state.users.update_user(&user, id, payload).await?))
}

/// Change the caller's own password
#[utoipa::path(
    patch,
    path = "/api/v1/auth/users/me/password/",
    tag = "auth",
    request_body = ChangePassword,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is wrong")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePassword>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(state.users.change_password(&user, payload).await?))
}

/// Generate a new random password for a user and return it once
#[utoipa::path(
    post,
    path = "/api/v1/auth/send-new-password/",
    tag = "auth",
    request_body = NewPasswordRequest,
    responses(
        (status = 200, description = "The new password", body = NewPasswordResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn send_new_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewPasswordRequest>,
) -> AppResult<Json<NewPasswordResponse>> {
    user.require(&[user_perm(Action::Edit)])?;
    Ok(Json(state.users.new_password(&user, payload.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/groups/",
    tag = "auth",
    request_body = NewGroup,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 400, description = "Validation errors")
    )
)]
pub async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewGroup>,
) -> AppResult<(StatusCode, Json<Group>)> {
    user.require(&[group_perm(Action::Add)])?;
    let group = state.users.create_group(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/groups/",
    tag = "auth",
    params(GroupFilter, PageParams),
    responses((status = 200, description = "Groups with their permissions", body = inline(Page<Group>)))
)]
pub async fn list_groups(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<GroupFilter>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<Group>>> {
    user.require(&[group_perm(Action::View)])?;
    Ok(Json(state.users.list_groups(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/groups/{id}/",
    tag = "auth",
    params(("id" = i64, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group", body = Group),
        (status = 404, description = "Group not found")
    )
)]
pub async fn get_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Group>> {
    user.require(&[group_perm(Action::View)])?;
    Ok(Json(state.users.get_group(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/auth/groups/{id}/",
    tag = "auth",
    params(("id" = i64, Path, description = "Group id")),
    request_body = UpdateGroup,
    responses(
        (status = 200, description = "Updated group", body = Group),
        (status = 404, description = "Group not found")
    )
)]
pub async fn update_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateGroup>,
) -> AppResult<Json<Group>> {
    user.require(&[group_perm(Action::Edit)])?;
    Ok(Json(state.users.update_group(&user, id, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/permissions/",
    tag = "auth",
    params(PermissionFilter),
    responses((status = 200, description = "Permission catalogue", body = [Permission]))
)]
pub async fn list_permissions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<PermissionFilter>,
) -> AppResult<Json<Vec<Permission>>> {
    user.require(&[Perm::new("auth", "permission", Action::View)])?;
    Ok(Json(state.users.list_permissions(&filter).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::handlers::test_support::{app, login, send};
    use crate::models::{Action, Perm};
    use crate::testing::Fixtures;

    #[tokio::test]
    async fn test_login_logout_flow() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "TI", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/auth/login/",
            None,
            Some(json!({"username": "ana", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!("Usuário ou senha incorreto"));

        let token = login(&app, "ana").await;
        let (status, body) = send(&app, "POST", "/api/v1/auth/logout/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "logout"}));

        let (status, body) = send(&app, "POST", "/api/v1/auth/logout/", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!("Não foi possível validar as credenciais"));
    }

    #[tokio::test]
    async fn test_user_routes_check_permissions() {
        let (app, state) = app().await;
        let viewers = Fixtures::group(
            &state.db,
            "VIEW",
            &[Perm::new("auth", "user", Action::View)],
        )
        .await;
        Fixtures::user_in_group(&state.db, "ana", viewers).await;
        let token = login(&app, "ana").await;

        let (status, body) = send(&app, "GET", "/api/v1/auth/users/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["page"], 1);
        assert_eq!(body["size"], 15);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/auth/users/",
            Some(&token),
            Some(json!({"username": "bia", "email": "bia@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!("Não permitido"));

        let (status, _) = send(&app, "GET", "/api/v1/auth/users/?size=101", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "GET", "/api/v1/auth/users/999/", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["field"], "userId");
    }

    #[tokio::test]
    async fn test_change_own_password() {
        let (app, state) = app().await;
        let group = Fixtures::group(&state.db, "TI", &[]).await;
        Fixtures::user_in_group(&state.db, "ana", group).await;
        let token = login(&app, "ana").await;

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/v1/auth/users/me/password/",
            Some(&token),
            Some(json!({"currentPassword": "nope", "newPassword": "n3w-secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body[0]["field"], "password");
    }
}
