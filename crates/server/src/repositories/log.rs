use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{Log, LogUser, Operation, PageParams};

const FILTER_LOG: &str = r#"
    FROM logs l
    LEFT JOIN users u ON u.id = l.user_id
    LEFT JOIN employees e ON e.id = u.employee_id
    WHERE ($1 IS NULL OR l.operation LIKE $1 OR l.module LIKE $1 OR l.model LIKE $1
           OR u.username LIKE $1 OR u.email LIKE $1 OR e.full_name LIKE $1)
"#;

pub struct LogRepository;

impl LogRepository {
    pub async fn insert(
        pool: &SqlitePool,
        user_id: Option<i64>,
        module: &str,
        model: &str,
        operation: Operation,
        identifier: Option<i64>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO logs (user_id, module, model, operation, identifier, logged_in)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(module)
        .bind(model)
        .bind(operation.as_str())
        .bind(identifier)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        search: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<Log>, i64), sqlx::Error> {
        let search = crate::models::like_pattern(search);

        let query = format!(
            r#"SELECT l.id, l.module, l.model, l.operation, l.identifier, l.logged_in,
                u.id AS user_id, u.username, u.email
            {} ORDER BY l.id DESC LIMIT $2 OFFSET $3"#,
            FILTER_LOG
        );
        let rows = sqlx::query_as::<_, LogRow>(&query)
            .bind(&search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count = format!("SELECT COUNT(*) {}", FILTER_LOG);
        let total = sqlx::query_scalar(&count).bind(&search).fetch_one(pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LogRow {
    id: i64,
    module: String,
    model: String,
    operation: String,
    identifier: Option<i64>,
    logged_in: DateTime<Utc>,
    user_id: Option<i64>,
    username: Option<String>,
    email: Option<String>,
}

impl From<LogRow> for Log {
    fn from(row: LogRow) -> Self {
        let user = match (row.user_id, row.username, row.email) {
            (Some(id), Some(username), Some(email)) => Some(LogUser { id, username, email }),
            _ => None,
        };
        Log {
            id: row.id,
            module: row.module,
            model: row.model,
            operation: row.operation,
            identifier: row.identifier,
            logged_in: row.logged_in,
            user,
        }
    }
}
