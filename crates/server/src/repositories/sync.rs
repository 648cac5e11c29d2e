use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::{SyncKind, SyncRecord};

/// Change-detection hashes and per-run records of the ERP sync
pub struct SyncRepository;

impl SyncRepository {
    pub async fn checksum<'e, E>(
        executor: E,
        kind: SyncKind,
        code: &str,
    ) -> Result<Option<String>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT checksum FROM erp_checksums WHERE kind = $1 AND code = $2")
            .bind(kind.as_str())
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    pub async fn save_checksum<'e, E>(
        executor: E,
        kind: SyncKind,
        code: &str,
        checksum: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO erp_checksums (kind, code, checksum, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(kind, code) DO UPDATE SET
                checksum = excluded.checksum,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(kind.as_str())
        .bind(code)
        .bind(checksum)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn insert_record(
        pool: &SqlitePool,
        kind: SyncKind,
        count_new_values: i64,
        execution_time: f64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO sync_records (model, count_new_values, execution_time, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(kind.as_str())
        .bind(count_new_values)
        .bind(execution_time)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Newest records first
    pub async fn latest_records(pool: &SqlitePool, limit: i64) -> Result<Vec<SyncRecord>, sqlx::Error> {
        sqlx::query_as::<_, SyncRecord>(
            r#"
            SELECT id, model, count_new_values, execution_time, updated_at
            FROM sync_records
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_pool;

    #[tokio::test]
    async fn test_checksum_upsert() {
        let pool = test_pool().await;
        assert!(SyncRepository::checksum(&pool, SyncKind::Gender, "M")
            .await
            .unwrap()
            .is_none());

        SyncRepository::save_checksum(&pool, SyncKind::Gender, "M", "aaa")
            .await
            .unwrap();
        SyncRepository::save_checksum(&pool, SyncKind::Gender, "M", "bbb")
            .await
            .unwrap();

        let stored = SyncRepository::checksum(&pool, SyncKind::Gender, "M").await.unwrap();
        assert_eq!(stored.as_deref(), Some("bbb"));
        assert!(SyncRepository::checksum(&pool, SyncKind::Role, "M")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_latest_records() {
        let pool = test_pool().await;
        SyncRepository::insert_record(&pool, SyncKind::Gender, 2, 0.5).await.unwrap();
        SyncRepository::insert_record(&pool, SyncKind::Asset, 10, 1.25).await.unwrap();

        let records = SyncRepository::latest_records(&pool, 1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model, "asset");
        assert_eq!(records[0].count_new_values, 10);
    }
}
