use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::{AssetType, CatalogItem, CostCenter, Reference, ReferenceTable, Role};

/// Fixed-id catalogue tables seeded by the migrations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    AssetStatus,
    Workload,
    LendingStatus,
    MaintenanceAction,
    MaintenanceStatus,
    DocumentType,
    TermStatus,
    TermItemType,
    VerificationType,
}

impl Catalog {
    pub fn table(&self) -> &'static str {
        match self {
            Catalog::AssetStatus => "asset_statuses",
            Catalog::Workload => "workloads",
            Catalog::LendingStatus => "lending_statuses",
            Catalog::MaintenanceAction => "maintenance_actions",
            Catalog::MaintenanceStatus => "maintenance_statuses",
            Catalog::DocumentType => "document_types",
            Catalog::TermStatus => "term_statuses",
            Catalog::TermItemType => "term_item_types",
            Catalog::VerificationType => "verification_types",
        }
    }
}

/// Lookup tables: ERP references, cost centers, roles, asset groups,
/// asset types and the fixed catalogues
pub struct ReferenceRepository;

impl ReferenceRepository {
    pub async fn list(
        pool: &SqlitePool,
        table: ReferenceTable,
        search: Option<&str>,
    ) -> Result<Vec<Reference>, sqlx::Error> {
        let query = format!(
            "SELECT id, code, description FROM {} WHERE ($1 IS NULL OR description LIKE $1) ORDER BY description",
            table.table()
        );
        sqlx::query_as::<_, Reference>(&query)
            .bind(crate::models::like_pattern(search))
            .fetch_all(pool)
            .await
    }

    pub async fn exists(
        pool: &SqlitePool,
        table: ReferenceTable,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {} WHERE id = $1", table.table());
        let count: i64 = sqlx::query_scalar(&query).bind(id).fetch_one(pool).await?;
        Ok(count > 0)
    }

    /// Insert or refresh a reference by code, returning its id
    pub async fn upsert<'e, E>(
        executor: E,
        table: ReferenceTable,
        code: &str,
        description: &str,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!(
            r#"
            INSERT INTO {} (code, description) VALUES ($1, $2)
            ON CONFLICT(code) DO UPDATE SET description = excluded.description
            RETURNING id
            "#,
            table.table()
        );
        sqlx::query_scalar(&query)
            .bind(code)
            .bind(description)
            .fetch_one(executor)
            .await
    }

    /// Insert a reference unless its code exists
    pub async fn insert_if_missing(
        pool: &SqlitePool,
        table: ReferenceTable,
        code: &str,
        description: &str,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "INSERT OR IGNORE INTO {} (code, description) VALUES ($1, $2)",
            table.table()
        );
        let result = sqlx::query(&query)
            .bind(code)
            .bind(description)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_description<'e, E>(
        executor: E,
        table: ReferenceTable,
        description: &str,
    ) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!("SELECT id, description FROM {} ORDER BY id", table.table());
        find_by_folded_name(executor, &query, description).await
    }

    pub async fn find_by_code<'e, E>(
        executor: E,
        table: ReferenceTable,
        code: &str,
    ) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!("SELECT id FROM {} WHERE code = $1", table.table());
        sqlx::query_scalar(&query)
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    // Cost centers

    pub async fn list_cost_centers(
        pool: &SqlitePool,
        search: Option<&str>,
    ) -> Result<Vec<CostCenter>, sqlx::Error> {
        sqlx::query_as::<_, CostCenter>(
            r#"
            SELECT id, code, name, classification FROM cost_centers
            WHERE ($1 IS NULL OR name LIKE $1 OR code LIKE $1)
            ORDER BY name
            "#,
        )
        .bind(crate::models::like_pattern(search))
        .fetch_all(pool)
        .await
    }

    pub async fn cost_center_exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cost_centers WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn upsert_cost_center<'e, E>(
        executor: E,
        code: &str,
        name: &str,
        classification: Option<&str>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO cost_centers (code, name, classification) VALUES ($1, $2, $3)
            ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                classification = excluded.classification
            RETURNING id
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(classification)
        .fetch_one(executor)
        .await
    }

    // Roles

    pub async fn list_roles(pool: &SqlitePool, search: Option<&str>) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            "SELECT id, code, name FROM roles WHERE ($1 IS NULL OR name LIKE $1) ORDER BY name",
        )
        .bind(crate::models::like_pattern(search))
        .fetch_all(pool)
        .await
    }

    pub async fn role_exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn upsert_role<'e, E>(executor: E, code: &str, name: &str) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO roles (code, name) VALUES ($1, $2)
            ON CONFLICT(code) DO UPDATE SET name = excluded.name
            RETURNING id
            "#,
        )
        .bind(code)
        .bind(name)
        .fetch_one(executor)
        .await
    }

    pub async fn find_role_by_name<'e, E>(executor: E, name: &str) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        find_by_folded_name(executor, "SELECT id, name FROM roles ORDER BY id", name).await
    }

    // Asset groups

    pub async fn upsert_asset_group<'e, E>(
        executor: E,
        code: &str,
        group_code: Option<&str>,
        name: &str,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO asset_groups (code, group_code, name) VALUES ($1, $2, $3)
            ON CONFLICT(code) DO UPDATE SET
                group_code = excluded.group_code,
                name = excluded.name
            RETURNING id
            "#,
        )
        .bind(code)
        .bind(group_code)
        .bind(name)
        .fetch_one(executor)
        .await
    }

    /// ERP assets carry their group's name, not its code
    pub async fn find_asset_group_by_name<'e, E>(
        executor: E,
        name: &str,
    ) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT id FROM asset_groups WHERE name = $1 ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    // Asset types

    pub async fn list_asset_types(
        pool: &SqlitePool,
        search: Option<&str>,
    ) -> Result<Vec<AssetType>, sqlx::Error> {
        sqlx::query_as::<_, AssetType>(
            r#"
            SELECT id, code, name, acronym FROM asset_types
            WHERE ($1 IS NULL OR name LIKE $1 OR code LIKE $1)
            ORDER BY name
            "#,
        )
        .bind(crate::models::like_pattern(search))
        .fetch_all(pool)
        .await
    }

    pub async fn asset_type_exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asset_types WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn find_asset_type_by_name<'e, E>(
        executor: E,
        name: &str,
    ) -> Result<Option<i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        find_by_folded_name(executor, "SELECT id, name FROM asset_types ORDER BY id", name).await
    }

    // Fixed catalogues

    pub async fn list_catalog(
        pool: &SqlitePool,
        catalog: Catalog,
        search: Option<&str>,
    ) -> Result<Vec<CatalogItem>, sqlx::Error> {
        let query = format!(
            "SELECT id, name FROM {} WHERE ($1 IS NULL OR name LIKE $1) ORDER BY id",
            catalog.table()
        );
        sqlx::query_as::<_, CatalogItem>(&query)
            .bind(crate::models::like_pattern(search))
            .fetch_all(pool)
            .await
    }

    pub async fn catalog_exists(
        pool: &SqlitePool,
        catalog: Catalog,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {} WHERE id = $1", catalog.table());
        let count: i64 = sqlx::query_scalar(&query).bind(id).fetch_one(pool).await?;
        Ok(count > 0)
    }

    pub async fn find_catalog_by_name(
        pool: &SqlitePool,
        catalog: Catalog,
        name: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        let query = format!("SELECT id, name FROM {} ORDER BY id", catalog.table());
        find_by_folded_name(pool, &query, name).await
    }
}

/// First `(id, name)` row whose name equals `name` ignoring case and
/// surrounding blanks. SQLite's NOCASE only folds ASCII letters, so
/// "FUNÇÃO" would never match "função" in SQL.
async fn find_by_folded_name<'e, E>(
    executor: E,
    query: &str,
    name: &str,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let wanted = name.trim().to_lowercase();
    let rows: Vec<(i64, Option<String>)> = sqlx::query_as(query).fetch_all(executor).await?;
    Ok(rows
        .into_iter()
        .find(|(_, stored)| {
            stored
                .as_deref()
                .is_some_and(|stored| stored.trim().to_lowercase() == wanted)
        })
        .map(|(id, _)| id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_pool;

    #[tokio::test]
    async fn test_reference_upsert_by_code() {
        let pool = test_pool().await;
        let first = ReferenceRepository::upsert(&pool, ReferenceTable::Gender, "F", "Fem")
            .await
            .unwrap();
        let second = ReferenceRepository::upsert(&pool, ReferenceTable::Gender, "F", "Feminino")
            .await
            .unwrap();
        assert_eq!(first, second);

        let genders = ReferenceRepository::list(&pool, ReferenceTable::Gender, None)
            .await
            .unwrap();
        assert_eq!(genders.len(), 1);
        assert_eq!(genders[0].description, "Feminino");

        let found =
            ReferenceRepository::find_by_description(&pool, ReferenceTable::Gender, "FEMININO")
                .await
                .unwrap();
        assert_eq!(found, Some(first));
    }

    #[tokio::test]
    async fn test_seeded_catalogues() {
        let pool = test_pool().await;
        let statuses = ReferenceRepository::list_catalog(&pool, Catalog::AssetStatus, None)
            .await
            .unwrap();
        assert_eq!(statuses.len(), 8);
        assert_eq!(statuses[7].name, "Descarte");

        let workloads = ReferenceRepository::list_catalog(&pool, Catalog::Workload, Some("home"))
            .await
            .unwrap();
        assert_eq!(workloads.len(), 1);
        assert!(
            ReferenceRepository::catalog_exists(&pool, Catalog::MaintenanceStatus, 3)
                .await
                .unwrap()
        );
        assert!(
            !ReferenceRepository::catalog_exists(&pool, Catalog::LendingStatus, 9)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_name_lookups_fold_accented_letters() {
        let pool = test_pool().await;

        let furniture = ReferenceRepository::find_asset_type_by_name(&pool, " mobiliário ")
            .await
            .unwrap();
        assert!(furniture.is_some());

        let borrowed =
            ReferenceRepository::find_catalog_by_name(&pool, Catalog::AssetStatus, "EMPRÉSTIMO")
                .await
                .unwrap();
        assert_eq!(borrowed, Some(7));

        ReferenceRepository::upsert(&pool, ReferenceTable::Gender, "N", "NÃO INFORMADO")
            .await
            .unwrap();
        let found =
            ReferenceRepository::find_by_description(&pool, ReferenceTable::Gender, "não informado")
                .await
                .unwrap();
        assert!(found.is_some());

        assert!(ReferenceRepository::find_asset_type_by_name(&pool, "mobiliario")
            .await
            .unwrap()
            .is_none());
    }
}
