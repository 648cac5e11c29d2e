use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::auth::TokenPair;
use crate::models::StoredToken;

const SELECT_TOKEN: &str = r#"
    SELECT id, user_id, token, refresh_token, expires_in, refresh_expires_in
    FROM tokens
"#;

pub struct TokenRepository;

impl TokenRepository {
    pub async fn get_by_user(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Option<StoredToken>, sqlx::Error> {
        let query = format!("{} WHERE user_id = $1", SELECT_TOKEN);
        sqlx::query_as::<_, StoredToken>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Store the user's current pair, replacing any previous one
    pub async fn replace(
        pool: &SqlitePool,
        user_id: i64,
        pair: &TokenPair,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tokens (user_id, token, refresh_token, expires_in, refresh_expires_in)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(user_id) DO UPDATE SET
                token = excluded.token,
                refresh_token = excluded.refresh_token,
                expires_in = excluded.expires_in,
                refresh_expires_in = excluded.refresh_expires_in
            "#,
        )
        .bind(user_id)
        .bind(&pair.access_token)
        .bind(&pair.refresh_token)
        .bind(pair.expires_in)
        .bind(pair.refresh_expires_in)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete_by_user(pool: &SqlitePool, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete tokens whose refresh token expired before `now`
    pub async fn delete_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE refresh_expires_in < $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::testing::{test_pool, Fixtures};

    fn pair(token: &str, now: DateTime<Utc>, refresh_ttl: Duration) -> TokenPair {
        TokenPair {
            access_token: format!("{token}-access"),
            refresh_token: format!("{token}-refresh"),
            expires_in: now + Duration::hours(1),
            refresh_expires_in: now + refresh_ttl,
        }
    }

    #[tokio::test]
    async fn test_replace_keeps_one_row_per_user() {
        let pool = test_pool().await;
        let user = Fixtures::user(&pool, "ana").await;
        let now = Utc::now();

        TokenRepository::replace(&pool, user, &pair("first", now, Duration::days(2)))
            .await
            .unwrap();
        TokenRepository::replace(&pool, user, &pair("second", now, Duration::days(2)))
            .await
            .unwrap();

        let stored = TokenRepository::get_by_user(&pool, user).await.unwrap().unwrap();
        assert_eq!(stored.token, "second-access");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let pool = test_pool().await;
        let fresh = Fixtures::user(&pool, "fresh").await;
        let stale = Fixtures::user(&pool, "stale").await;
        let now = Utc::now();

        TokenRepository::replace(&pool, fresh, &pair("fresh", now, Duration::days(2)))
            .await
            .unwrap();
        TokenRepository::replace(&pool, stale, &pair("stale", now, -Duration::days(1)))
            .await
            .unwrap();

        assert_eq!(TokenRepository::delete_expired(&pool, now).await.unwrap(), 1);
        assert!(TokenRepository::get_by_user(&pool, fresh).await.unwrap().is_some());
        assert!(TokenRepository::get_by_user(&pool, stale).await.unwrap().is_none());
    }
}
