use std::collections::HashSet;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::{AppError, AppResult, INVALID_CREDENTIALS};
use crate::models::{Perm, UserAccount, MASTER_GROUP};
use crate::state::AppState;

/// The user behind a valid `Authorization: Bearer` access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account: UserAccount,
    pub group: Option<String>,
    /// `module_model_action` codes granted by the user's group
    pub permissions: HashSet<String>,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.account.id
    }

    /// Staff and MASTER members pass; everyone else needs one of `perms`.
    pub fn has_any(&self, perms: &[Perm]) -> bool {
        if self.account.is_staff || self.group.as_deref() == Some(MASTER_GROUP) {
            return true;
        }
        perms.iter().any(|perm| self.permissions.contains(&perm.code()))
    }

    pub fn require(&self, perms: &[Perm]) -> AppResult<()> {
        if self.has_any(perms) {
            Ok(())
        } else {
            Err(AppError::not_allowed())
        }
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;
        state.auth.authenticate(token).await
    }
}
