use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::{GroupSummary, PageParams};

const SELECT_GROUP: &str = "SELECT id, name FROM groups";

const FILTER_GROUP: &str = "WHERE ($1 IS NULL OR name LIKE $1)";

pub struct GroupRepository;

impl GroupRepository {
    pub async fn create_with_executor<'e, E>(executor: E, name: &str) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("INSERT INTO groups (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(executor)
            .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<GroupSummary>, sqlx::Error> {
        let query = format!("{} WHERE id = $1", SELECT_GROUP);
        sqlx::query_as::<_, GroupSummary>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_name(
        pool: &SqlitePool,
        name: &str,
    ) -> Result<Option<GroupSummary>, sqlx::Error> {
        let query = format!("{} WHERE name = $1", SELECT_GROUP);
        sqlx::query_as::<_, GroupSummary>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &SqlitePool,
        search: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<GroupSummary>, i64), sqlx::Error> {
        let query = format!(
            "{} {} ORDER BY id DESC LIMIT $2 OFFSET $3",
            SELECT_GROUP, FILTER_GROUP
        );
        let items = sqlx::query_as::<_, GroupSummary>(&query)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count = format!("SELECT COUNT(*) FROM groups {}", FILTER_GROUP);
        let total = sqlx::query_scalar(&count).bind(search).fetch_one(pool).await?;

        Ok((items, total))
    }

    pub async fn rename_with_executor<'e, E>(
        executor: E,
        id: i64,
        name: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE groups SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Replace the permission set of a group
    pub async fn set_permissions(
        conn: &mut sqlx::SqliteConnection,
        group_id: i64,
        permission_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM group_permissions WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *conn)
            .await?;

        Self::add_permissions(conn, group_id, permission_ids).await
    }

    /// Grant permissions to a group, ignoring ones it already has
    pub async fn add_permissions(
        conn: &mut sqlx::SqliteConnection,
        group_id: i64,
        permission_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        for permission_id in permission_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO group_permissions (group_id, permission_id) VALUES ($1, $2)",
            )
            .bind(group_id)
            .bind(permission_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_pool;

    #[tokio::test]
    async fn test_create_and_search() {
        let pool = test_pool().await;
        GroupRepository::create_with_executor(&pool, "Suporte").await.unwrap();
        GroupRepository::create_with_executor(&pool, "Financeiro").await.unwrap();

        let (all, total) = GroupRepository::list(&pool, None, PageParams::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].name, "Financeiro");

        let (found, total) = GroupRepository::list(&pool, Some("%port%"), PageParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].name, "Suporte");

        assert!(GroupRepository::get_by_name(&pool, "Suporte")
            .await
            .unwrap()
            .is_some());
    }
}
