use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{
    Action, NewVerification, NewVerificationAnswers, Perm, Verification, VerificationAnswer,
};
use crate::state::AppState;

const fn verification_perm(action: Action) -> Perm {
    Perm::new("asset", "verification", action)
}

#[utoipa::path(
    post,
    path = "/api/v1/verifications/",
    tag = "verifications",
    request_body = NewVerification,
    responses(
        (status = 201, description = "Question created", body = Verification),
        (status = 404, description = "Asset type not found")
    )
)]
pub async fn create_verification(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewVerification>,
) -> AppResult<(StatusCode, Json<Verification>)> {
    user.require(&[verification_perm(Action::Add)])?;
    let verification = state.verifications.create_verification(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(verification)))
}

#[utoipa::path(
    get,
    path = "/api/v1/verifications/{asset_type_id}/",
    tag = "verifications",
    params(("asset_type_id" = i64, Path, description = "Asset type id")),
    responses(
        (status = 200, description = "Checklist of the asset type", body = [Verification]),
        (status = 404, description = "Asset type not found")
    )
)]
pub async fn list_verifications(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_type_id): Path<i64>,
) -> AppResult<Json<Vec<Verification>>> {
    user.require(&[verification_perm(Action::View)])?;
    Ok(Json(
        state.verifications.list_by_asset_type(asset_type_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/verifications/answer/",
    tag = "verifications",
    request_body = NewVerificationAnswers,
    responses(
        (status = 201, description = "Answers recorded", body = [VerificationAnswer]),
        (status = 404, description = "Lending, type or question not found")
    )
)]
pub async fn create_answers(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewVerificationAnswers>,
) -> AppResult<(StatusCode, Json<Vec<VerificationAnswer>>)> {
    user.require(&[verification_perm(Action::Add)])?;
    let answers = state.verifications.create_answers(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(answers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/verifications/answer/{lending_id}/",
    tag = "verifications",
    params(("lending_id" = i64, Path, description = "Lending id")),
    responses((status = 200, description = "Answers given for the lending", body = [VerificationAnswer]))
)]
pub async fn list_answers(
    State(state): State<AppState>,
    user: AuthUser,
    Path(lending_id): Path<i64>,
) -> AppResult<Json<Vec<VerificationAnswer>>> {
    user.require(&[verification_perm(Action::View)])?;
    Ok(Json(state.verifications.list_answers(lending_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::handlers::test_support::{app, login, send};
    use crate::models::{Action, Perm};
    use crate::testing::Fixtures;

    #[tokio::test]
    async fn test_checklist_permissions() {
        let (app, state) = app().await;
        let view = Perm::new("asset", "verification", Action::View);
        let group = Fixtures::group(&state.db, "TECNICO", &[view]).await;
        Fixtures::user_in_group(&state.db, "caio", group).await;
        let token = login(&app, "caio").await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/verifications/",
            Some(&token),
            Some(json!({
                "question": "Bateria segura carga?",
                "step": "Entrega",
                "category": "Bateria",
                "assetTypeId": 1,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, list) = send(&app, "GET", "/api/v1/verifications/1/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(list.as_array().unwrap().is_empty());

        let (status, body) =
            send(&app, "GET", "/api/v1/verifications/999/", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["field"], "assetTypeId");
    }
}
