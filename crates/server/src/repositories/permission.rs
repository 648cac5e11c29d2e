use sqlx::SqlitePool;

use crate::models::Permission;

const SELECT_PERMISSION: &str = r#"
    SELECT p.id, p.module, p.model, p.action, p.description
    FROM permissions p
"#;

pub struct PermissionRepository;

impl PermissionRepository {
    /// Insert a permission unless the (module, model, action) triple exists
    pub async fn insert_if_missing(
        pool: &SqlitePool,
        module: &str,
        model: &str,
        action: &str,
        description: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO permissions (module, model, action, description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(module)
        .bind(model)
        .bind(action)
        .bind(description)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        pool: &SqlitePool,
        module: Option<&str>,
    ) -> Result<Vec<Permission>, sqlx::Error> {
        let query = format!(
            "{} WHERE ($1 IS NULL OR p.module = $1) ORDER BY p.id",
            SELECT_PERMISSION
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(module)
            .fetch_all(pool)
            .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!("{} WHERE p.id = $1", SELECT_PERMISSION);
        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_ids(pool: &SqlitePool) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM permissions ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Permissions granted to a group
    pub async fn for_group(pool: &SqlitePool, group_id: i64) -> Result<Vec<Permission>, sqlx::Error> {
        let query = format!(
            r#"{}
            JOIN group_permissions gp ON gp.permission_id = p.id
            WHERE gp.group_id = $1
            ORDER BY p.id"#,
            SELECT_PERMISSION
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }

    /// `module_model_action` codes granted to a group
    pub async fn codes_for_group(
        pool: &SqlitePool,
        group_id: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT p.module || '_' || p.model || '_' || p.action
            FROM permissions p
            JOIN group_permissions gp ON gp.permission_id = p.id
            WHERE gp.group_id = $1
            ORDER BY p.id
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }
}
