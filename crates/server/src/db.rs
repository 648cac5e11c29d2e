use std::str::FromStr;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    if !in_memory(database_url) {
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
                tracing::debug!("Database directory ready: {}", parent.display());
            }
        }
    }

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

fn in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Apply pending migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::debug!("Database migrations applied");
    Ok(())
}

/// Drop every table and rebuild the schema from the migrations.
pub async fn reset(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    let tables: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT name FROM sqlite_master
        WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut conn = pool.acquire().await?;
    sqlx::query("PRAGMA foreign_keys = OFF").execute(&mut *conn).await?;
    for table in &tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", table))
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
    drop(conn);

    tracing::info!("Dropped {} tables", tables.len());

    run_migrations(pool).await
}

/// Database server version, for health checks.
pub async fn version(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    sqlx::query_scalar("SELECT sqlite_version()")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use crate::testing::test_pool;

    use super::*;

    #[tokio::test]
    async fn test_migrations_seed_catalogues() {
        let pool = test_pool().await;

        let statuses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asset_statuses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(statuses, 8);

        let workloads: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workloads")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(workloads, 3);
    }

    #[tokio::test]
    async fn test_reset_clears_data() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO groups (name) VALUES ('TI')")
            .execute(&pool)
            .await
            .unwrap();

        reset(&pool).await.unwrap();

        let groups: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(groups, 0);

        let statuses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asset_statuses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(statuses, 8);
    }

    #[tokio::test]
    async fn test_create_pool_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("agile.db");
        let url = format!("sqlite:{}", path.display());

        let pool = create_pool(&url, 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool.close().await;

        assert!(path.exists());
    }

    #[test]
    fn test_in_memory_urls() {
        assert!(in_memory("sqlite::memory:"));
        assert!(in_memory("sqlite:file:agile?mode=memory&cache=shared"));
        assert!(!in_memory("sqlite:data/agile.db?mode=rwc"));
    }

    #[tokio::test]
    async fn test_version() {
        let pool = test_pool().await;
        assert!(version(&pool).await.unwrap().starts_with('3'));
    }
}
