use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::auth::{self, password, AuthUser, TokenPair, TokenType};
use crate::config::Config;
use crate::error::{AppError, AppResult, INVALID_CREDENTIALS, WRONG_LOGIN};
use crate::models::{LoginResponse, MessageResponse, UserAccount};
use crate::repositories::{GroupRepository, PermissionRepository, TokenRepository, UserRepository};

/// Display name used when a user has no linked employee
const DEFAULT_FULL_NAME: &str = "Usuário";

/// Login, token refresh and bearer-token authentication
pub struct AuthService {
    db: SqlitePool,
    config: Arc<Config>,
}

impl AuthService {
    pub fn new(db: SqlitePool, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    fn secret(&self) -> &[u8] {
        self.config.secret_key.as_bytes()
    }

    fn issue(&self, user_id: i64) -> AppResult<TokenPair> {
        Ok(auth::issue_pair(
            user_id,
            self.secret(),
            Duration::hours(self.config.access_token_hours),
            Duration::days(self.config.refresh_token_days),
            Utc::now(),
        )?)
    }

    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginResponse> {
        let account = UserRepository::get_account_by_username(&self.db, username)
            .await?
            .filter(|account| account.is_active)
            .ok_or_else(|| AppError::unauthorized(WRONG_LOGIN))?;
        if !password::verify(password, &account.password).await {
            return Err(AppError::unauthorized(WRONG_LOGIN));
        }

        if account.group_id.is_none() {
            tracing::warn!("User '{}' has no group, login refused", account.username);
            return Err(AppError::not_allowed());
        }

        let now = Utc::now();
        UserRepository::set_last_login(&self.db, account.id, now).await?;

        let pair = match TokenRepository::get_by_user(&self.db, account.id).await? {
            Some(stored) if stored.expires_in > now => TokenPair {
                access_token: stored.token,
                refresh_token: stored.refresh_token,
                expires_in: stored.expires_in,
                refresh_expires_in: stored.refresh_expires_in,
            },
            _ => {
                let pair = self.issue(account.id)?;
                TokenRepository::replace(&self.db, account.id, &pair).await?;
                pair
            }
        };

        tracing::info!("User '{}' logged in", account.username);
        self.login_response(&account, pair).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> AppResult<LoginResponse> {
        let claims = auth::decode(refresh_token, self.secret(), TokenType::Refresh, Utc::now())?;
        let user_id = claims.user_id()?;

        let account = UserRepository::get_account(&self.db, user_id)
            .await?
            .filter(|account| account.is_active)
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        let stored = TokenRepository::get_by_user(&self.db, user_id).await?;
        if stored.map(|s| s.refresh_token) != Some(refresh_token.to_string()) {
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let pair = self.issue(user_id)?;
        TokenRepository::replace(&self.db, user_id, &pair).await?;

        tracing::debug!("Refreshed tokens for user {}", user_id);
        self.login_response(&account, pair).await
    }

    pub async fn logout(&self, user: &AuthUser) -> AppResult<MessageResponse> {
        TokenRepository::delete_by_user(&self.db, user.id()).await?;
        tracing::info!("User '{}' logged out", user.account.username);
        Ok(MessageResponse::new("logout"))
    }

    /// Drop token rows whose refresh token has expired
    pub async fn purge_expired_tokens(&self) -> AppResult<u64> {
        Ok(TokenRepository::delete_expired(&self.db, Utc::now()).await?)
    }

    /// Resolve an access token into its user.
    ///
    /// The token must verify, be of the access type and still be the one
    /// stored for the user; a logout or a newer login invalidates it.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthUser> {
        let claims = auth::decode(token, self.secret(), TokenType::Access, Utc::now())?;
        let user_id = claims.user_id()?;

        let stored = TokenRepository::get_by_user(&self.db, user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;
        if stored.token != token {
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let account = UserRepository::get_account(&self.db, user_id)
            .await?
            .filter(|account| account.is_active)
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        let (group, permissions) = match account.group_id {
            Some(group_id) => {
                let group = GroupRepository::get_by_id(&self.db, group_id)
                    .await?
                    .map(|g| g.name);
                let codes = PermissionRepository::codes_for_group(&self.db, group_id).await?;
                (group, codes.into_iter().collect())
            }
            None => (None, HashSet::new()),
        };

        Ok(AuthUser {
            account,
            group,
            permissions,
        })
    }

    async fn login_response(
        &self,
        account: &UserAccount,
        pair: TokenPair,
    ) -> AppResult<LoginResponse> {
        let (group, permissions) = match account.group_id {
            Some(group_id) => (
                GroupRepository::get_by_id(&self.db, group_id)
                    .await?
                    .map(|g| g.name),
                PermissionRepository::codes_for_group(&self.db, group_id).await?,
            ),
            None => (None, Vec::new()),
        };

        let full_name = UserRepository::full_name(&self.db, account.id)
            .await?
            .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string());

        Ok(LoginResponse {
            id: account.id,
            group,
            email: account.email.clone(),
            full_name,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
            permissions,
        })
    }
}
