use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

use crate::models::{AssetShort, Invoice, PageParams};

const SELECT_INVOICE: &str = r#"
    SELECT id, number, file_name, path, created_at
    FROM invoices
"#;

pub struct InvoiceRepository;

impl InvoiceRepository {
    pub async fn create_with_executor<'e, E>(
        executor: E,
        number: &str,
        file_name: Option<&str>,
        path: Option<&str>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO invoices (number, file_name, path, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(number)
        .bind(file_name)
        .bind(path)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    /// Non-deleted invoice id with this number
    pub async fn find_by_number<'e, E>(executor: E, number: &str) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            "SELECT id FROM invoices WHERE number = $1 AND deleted_at IS NULL ORDER BY id LIMIT 1",
        )
        .bind(number)
        .fetch_optional(executor)
        .await
    }

    pub async fn get_or_create_by_number(
        conn: &mut SqliteConnection,
        number: &str,
    ) -> Result<i64, sqlx::Error> {
        if let Some(id) = Self::find_by_number(&mut *conn, number).await? {
            return Ok(id);
        }
        Self::create_with_executor(&mut *conn, number, None, None).await
    }

    pub async fn number_taken(
        pool: &SqlitePool,
        number: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE number = $1 AND deleted_at IS NULL AND ($2 IS NULL OR id != $2)
            "#,
        )
        .bind(number)
        .bind(except)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn set_number<'e, E>(executor: E, id: i64, number: &str) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE invoices SET number = $1 WHERE id = $2")
            .bind(number)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_file<'e, E>(
        executor: E,
        id: i64,
        file_name: &str,
        path: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE invoices SET file_name = $1, path = $2 WHERE id = $3")
            .bind(file_name)
            .bind(path)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Link exactly `asset_ids` to the invoice
    pub async fn set_assets(
        conn: &mut SqliteConnection,
        invoice_id: i64,
        asset_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        Self::unlink_assets(&mut *conn, invoice_id).await?;
        for asset_id in asset_ids {
            sqlx::query("UPDATE assets SET invoice_id = $1, updated_at = $2 WHERE id = $3")
                .bind(invoice_id)
                .bind(Utc::now())
                .bind(asset_id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    pub async fn unlink_assets<'e, E>(executor: E, invoice_id: i64) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE assets SET invoice_id = NULL WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn soft_delete<'e, E>(executor: E, id: i64) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE invoices SET deleted_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!("{} WHERE id = $1 AND deleted_at IS NULL", SELECT_INVOICE);
        let row = sqlx::query_as::<_, InvoiceRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => {
                let assets = Self::assets(pool, row.id).await?;
                Ok(Some(row.into_invoice(assets)))
            }
            None => Ok(None),
        }
    }

    pub async fn list(
        pool: &SqlitePool,
        search: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<Invoice>, i64), sqlx::Error> {
        let search = crate::models::like_pattern(search);

        let query = format!(
            r#"{} WHERE deleted_at IS NULL AND ($1 IS NULL OR number LIKE $1)
            ORDER BY id DESC LIMIT $2 OFFSET $3"#,
            SELECT_INVOICE
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&query)
            .bind(&search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let total = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE deleted_at IS NULL AND ($1 IS NULL OR number LIKE $1)",
        )
        .bind(&search)
        .fetch_one(pool)
        .await?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let assets = Self::assets(pool, row.id).await?;
            invoices.push(row.into_invoice(assets));
        }
        Ok((invoices, total))
    }

    async fn assets(pool: &SqlitePool, invoice_id: i64) -> Result<Vec<AssetShort>, sqlx::Error> {
        sqlx::query_as::<_, AssetShort>(
            "SELECT id, code, register_number, description FROM assets WHERE invoice_id = $1 ORDER BY id",
        )
        .bind(invoice_id)
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: i64,
    number: String,
    file_name: Option<String>,
    path: Option<String>,
    created_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, assets: Vec<AssetShort>) -> Invoice {
        Invoice {
            id: self.id,
            number: self.number,
            file_name: self.file_name,
            path: self.path,
            created_at: self.created_at,
            assets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_pool, Fixtures};

    #[tokio::test]
    async fn test_get_or_create_reuses_number() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = InvoiceRepository::get_or_create_by_number(&mut conn, "NF-100")
            .await
            .unwrap();
        let second = InvoiceRepository::get_or_create_by_number(&mut conn, "NF-100")
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_assets_and_soft_delete() {
        let pool = test_pool().await;
        let asset = Fixtures::asset(&pool, "NB-30").await;
        let id = InvoiceRepository::create_with_executor(&pool, "NF-200", Some("nf.pdf"), None)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        InvoiceRepository::set_assets(&mut conn, id, &[asset]).await.unwrap();
        drop(conn);

        let invoice = InvoiceRepository::get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(invoice.assets.len(), 1);
        assert!(InvoiceRepository::number_taken(&pool, "NF-200", None).await.unwrap());
        assert!(!InvoiceRepository::number_taken(&pool, "NF-200", Some(id)).await.unwrap());

        InvoiceRepository::soft_delete(&pool, id).await.unwrap();
        InvoiceRepository::unlink_assets(&pool, id).await.unwrap();
        assert!(InvoiceRepository::get_by_id(&pool, id).await.unwrap().is_none());
        assert!(!InvoiceRepository::number_taken(&pool, "NF-200", None).await.unwrap());

        let (items, total) = InvoiceRepository::list(&pool, None, PageParams::default())
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }
}
