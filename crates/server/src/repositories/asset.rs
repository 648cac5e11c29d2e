use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use super::reference::{Catalog, ReferenceRepository};
use crate::models::{
    maintenance_alert, open_status_label, Asset, AssetDisposal, AssetFilter, AssetShort,
    AssetType, CatalogItem, PageParams,
};

const SELECT_ASSET: &str = r#"
    SELECT
        a.id, a.code, a.register_number, a.description, a.supplier, a.assurance_date,
        a.observations, a.pattern, a.brand, a.operational_system, a.serial_number, a.imei,
        a.acquisition_date, a.value, a.depreciation, a.ms_office, a.line_number, a.operator,
        a.model, a.accessories, a.configuration, a.quantity, a.unit, a.active, a.by_agile,
        a.created_at, a.updated_at,
        t.id AS type_id, t.code AS type_code, t.name AS type_name, t.acronym AS type_acronym,
        s.id AS status_id, s.name AS status_name,
        ag.name AS asset_group,
        i.number AS invoice_number,
        (SELECT m.status_id FROM maintenances m
            WHERE m.asset_id = a.id ORDER BY m.id DESC LIMIT 1) AS maintenance_status_id,
        (SELECT ms.name FROM maintenances m JOIN maintenance_statuses ms ON ms.id = m.status_id
            WHERE m.asset_id = a.id ORDER BY m.id DESC LIMIT 1) AS maintenance_status_name,
        (SELECT u.status_id FROM upgrades u
            WHERE u.asset_id = a.id ORDER BY u.id DESC LIMIT 1) AS upgrade_status_id,
        (SELECT ms.name FROM upgrades u JOIN maintenance_statuses ms ON ms.id = u.status_id
            WHERE u.asset_id = a.id ORDER BY u.id DESC LIMIT 1) AS upgrade_status_name,
        (SELECT COUNT(*) FROM maintenances m WHERE m.asset_id = a.id AND m.criticality = 1) AS low_count,
        (SELECT COUNT(*) FROM maintenances m WHERE m.asset_id = a.id AND m.criticality = 2) AS medium_count,
        (SELECT COUNT(*) FROM maintenances m WHERE m.asset_id = a.id AND m.criticality = 3) AS high_count
    FROM assets a
    LEFT JOIN asset_types t ON t.id = a.type_id
    LEFT JOIN asset_statuses s ON s.id = a.status_id
    LEFT JOIN asset_groups ag ON ag.id = a.asset_group_id
    LEFT JOIN invoices i ON i.id = a.invoice_id AND i.deleted_at IS NULL
"#;

const FROM_ASSET: &str = r#"
    FROM assets a
    LEFT JOIN asset_types t ON t.id = a.type_id
    LEFT JOIN asset_statuses s ON s.id = a.status_id
"#;

/// Pinned ids (`$12`, a JSON array) bypass every other filter.
const FILTER_ASSET: &str = r#"
    WHERE ((($1 IS NULL OR a.code LIKE $1 OR a.register_number LIKE $1 OR a.description LIKE $1
             OR a.serial_number LIKE $1 OR a.imei LIKE $1)
        AND ($2 IS NULL OR a.code LIKE $2)
        AND ($3 IS NULL OR a.description LIKE $3)
        AND ($4 IS NULL OR a.register_number LIKE $4)
        AND ($5 IS NULL OR a.supplier LIKE $5)
        AND ($6 IS NULL OR a.active = $6)
        AND ($7 IS NULL OR a.by_agile = $7)
        AND ($8 IS NULL OR a.type_id = $8)
        AND ($9 IS NULL OR a.status_id = $9)
        AND ($10 IS NULL OR a.acquisition_date >= $10)
        AND ($11 IS NULL OR a.acquisition_date <= $11))
      OR a.id IN (SELECT value FROM json_each($12)))
"#;

const SELECT_ASSET_DATA: &str = r#"
    SELECT
        id, asset_group_id, type_id, status_id, invoice_id, code, register_number,
        description, supplier, assurance_date, observations, pattern, brand,
        operational_system, serial_number, imei, acquisition_date, value, depreciation,
        ms_office, line_number, operator, model, accessories, configuration, quantity,
        unit, active, by_agile
    FROM assets
"#;

/// Every stored column of an asset, as written by create and update
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct AssetData {
    pub asset_group_id: Option<i64>,
    pub type_id: Option<i64>,
    pub status_id: i64,
    pub invoice_id: Option<i64>,
    pub code: Option<String>,
    pub register_number: Option<String>,
    pub description: Option<String>,
    pub supplier: Option<String>,
    pub assurance_date: Option<NaiveDate>,
    pub observations: Option<String>,
    pub pattern: Option<String>,
    pub brand: Option<String>,
    pub operational_system: Option<String>,
    pub serial_number: Option<String>,
    pub imei: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub depreciation: Option<f64>,
    pub ms_office: bool,
    pub line_number: Option<String>,
    pub operator: Option<String>,
    pub model: Option<String>,
    pub accessories: Option<String>,
    pub configuration: Option<String>,
    pub quantity: i64,
    pub unit: Option<String>,
    pub active: bool,
    pub by_agile: bool,
}

/// Stored asset row with its id
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredAsset {
    pub id: i64,
    #[sqlx(flatten)]
    pub data: AssetData,
}

fn filter_binds(filter: &AssetFilter) -> AssetFilterBinds {
    let ids: Vec<i64> = crate::models::parse_ids(filter.ids.as_deref());
    AssetFilterBinds {
        search: crate::models::like_pattern(filter.search.as_deref()),
        code: crate::models::like_pattern(filter.code.as_deref()),
        description: crate::models::like_pattern(filter.description.as_deref()),
        register_number: crate::models::like_pattern(filter.register_number.as_deref()),
        supplier: crate::models::like_pattern(filter.supplier.as_deref()),
        ids: serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string()),
    }
}

struct AssetFilterBinds {
    search: Option<String>,
    code: Option<String>,
    description: Option<String>,
    register_number: Option<String>,
    supplier: Option<String>,
    ids: String,
}

pub struct AssetRepository;

impl AssetRepository {
    pub async fn create_with_executor<'e, E>(executor: E, data: &AssetData) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO assets (
                asset_group_id, type_id, status_id, invoice_id, code, register_number,
                description, supplier, assurance_date, observations, pattern, brand,
                operational_system, serial_number, imei, acquisition_date, value,
                depreciation, ms_office, line_number, operator, model, accessories,
                configuration, quantity, unit, active, by_agile
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
            RETURNING id
            "#,
        )
        .bind(data.asset_group_id)
        .bind(data.type_id)
        .bind(data.status_id)
        .bind(data.invoice_id)
        .bind(&data.code)
        .bind(&data.register_number)
        .bind(&data.description)
        .bind(&data.supplier)
        .bind(data.assurance_date)
        .bind(&data.observations)
        .bind(&data.pattern)
        .bind(&data.brand)
        .bind(&data.operational_system)
        .bind(&data.serial_number)
        .bind(&data.imei)
        .bind(data.acquisition_date)
        .bind(data.value)
        .bind(data.depreciation)
        .bind(data.ms_office)
        .bind(&data.line_number)
        .bind(&data.operator)
        .bind(&data.model)
        .bind(&data.accessories)
        .bind(&data.configuration)
        .bind(data.quantity)
        .bind(&data.unit)
        .bind(data.active)
        .bind(data.by_agile)
        .fetch_one(executor)
        .await
    }

    pub async fn update_with_executor<'e, E>(
        executor: E,
        id: i64,
        data: &AssetData,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            UPDATE assets SET
                asset_group_id = $1, type_id = $2, status_id = $3, invoice_id = $4,
                code = $5, register_number = $6, description = $7, supplier = $8,
                assurance_date = $9, observations = $10, pattern = $11, brand = $12,
                operational_system = $13, serial_number = $14, imei = $15,
                acquisition_date = $16, value = $17, depreciation = $18, ms_office = $19,
                line_number = $20, operator = $21, model = $22, accessories = $23,
                configuration = $24, quantity = $25, unit = $26, active = $27,
                by_agile = $28, updated_at = $29
            WHERE id = $30
            "#,
        )
        .bind(data.asset_group_id)
        .bind(data.type_id)
        .bind(data.status_id)
        .bind(data.invoice_id)
        .bind(&data.code)
        .bind(&data.register_number)
        .bind(&data.description)
        .bind(&data.supplier)
        .bind(data.assurance_date)
        .bind(&data.observations)
        .bind(&data.pattern)
        .bind(&data.brand)
        .bind(&data.operational_system)
        .bind(&data.serial_number)
        .bind(&data.imei)
        .bind(data.acquisition_date)
        .bind(data.value)
        .bind(data.depreciation)
        .bind(data.ms_office)
        .bind(&data.line_number)
        .bind(&data.operator)
        .bind(&data.model)
        .bind(&data.accessories)
        .bind(&data.configuration)
        .bind(data.quantity)
        .bind(&data.unit)
        .bind(data.active)
        .bind(data.by_agile)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("{} WHERE a.id = $1", SELECT_ASSET);
        let row = sqlx::query_as::<_, AssetRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn get_data<'e, E>(executor: E, id: i64) -> Result<Option<StoredAsset>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!("{} WHERE id = $1", SELECT_ASSET_DATA);
        sqlx::query_as::<_, StoredAsset>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn get_data_by_code<'e, E>(
        executor: E,
        code: &str,
    ) -> Result<Option<StoredAsset>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!("{} WHERE code = $1", SELECT_ASSET_DATA);
        sqlx::query_as::<_, StoredAsset>(&query)
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    pub async fn get_short(pool: &SqlitePool, id: i64) -> Result<Option<AssetShort>, sqlx::Error> {
        sqlx::query_as::<_, AssetShort>(
            "SELECT id, code, register_number, description FROM assets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Whether `column` already holds `value` on an asset other than `except`
    async fn taken(
        pool: &SqlitePool,
        column: &str,
        value: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM assets WHERE {} = $1 AND ($2 IS NULL OR id != $2)",
            column
        );
        let count: i64 = sqlx::query_scalar(&query)
            .bind(value)
            .bind(except)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn code_taken(
        pool: &SqlitePool,
        code: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        Self::taken(pool, "code", code, except).await
    }

    pub async fn register_number_taken(
        pool: &SqlitePool,
        register_number: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        Self::taken(pool, "register_number", register_number, except).await
    }

    pub async fn imei_taken(
        pool: &SqlitePool,
        imei: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        Self::taken(pool, "imei", imei, except).await
    }

    pub async fn next_id(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM assets")
            .fetch_one(pool)
            .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// Move an asset to a status without touching its history
    pub async fn set_status<'e, E>(executor: E, id: i64, status_id: i64) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE assets SET status_id = $1, updated_at = $2 WHERE id = $3")
            .bind(status_id)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Append a status history row, dated now unless `at` is given
    pub async fn record_status<'e, E>(
        executor: E,
        asset_id: i64,
        status_id: i64,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO asset_status_history (asset_id, status_id, created_at) VALUES ($1, $2, $3)",
        )
        .bind(asset_id)
        .bind(status_id)
        .bind(at.unwrap_or_else(Utc::now))
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn status_history(
        pool: &SqlitePool,
        asset_id: i64,
    ) -> Result<Vec<(i64, DateTime<Utc>)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT status_id, created_at FROM asset_status_history WHERE asset_id = $1 ORDER BY id",
        )
        .bind(asset_id)
        .fetch_all(pool)
        .await
    }

    pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE assets SET active = $1, updated_at = $2 WHERE id = $3")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn insert_disposal<'e, E>(
        executor: E,
        asset_id: i64,
        reason: &str,
        justification: Option<&str>,
        observations: Option<&str>,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO asset_disposals (asset_id, reason, justification, observations, disposal_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(asset_id)
        .bind(reason)
        .bind(justification)
        .bind(observations)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn disposal(
        pool: &SqlitePool,
        asset_id: i64,
    ) -> Result<Option<AssetDisposal>, sqlx::Error> {
        sqlx::query_as::<_, AssetDisposal>(
            r#"
            SELECT id, asset_id, reason, justification, observations, disposal_date
            FROM asset_disposals WHERE asset_id = $1 ORDER BY id DESC LIMIT 1
            "#,
        )
        .bind(asset_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &AssetFilter,
        page: Option<PageParams>,
    ) -> Result<(Vec<Asset>, i64), sqlx::Error> {
        let binds = filter_binds(filter);
        // Unknown names match nothing
        let type_id = match filter.asset_type.as_deref() {
            Some(name) => Some(
                ReferenceRepository::find_asset_type_by_name(pool, name)
                    .await?
                    .unwrap_or(-1),
            ),
            None => None,
        };
        let status_id = match filter.status.as_deref() {
            Some(name) => Some(
                ReferenceRepository::find_catalog_by_name(pool, Catalog::AssetStatus, name)
                    .await?
                    .unwrap_or(-1),
            ),
            None => None,
        };

        let mut query = format!("{} {} ORDER BY a.id DESC", SELECT_ASSET, FILTER_ASSET);
        if page.is_some() {
            query.push_str(" LIMIT $13 OFFSET $14");
        }

        let mut select = sqlx::query_as::<_, AssetRow>(&query)
            .bind(&binds.search)
            .bind(&binds.code)
            .bind(&binds.description)
            .bind(&binds.register_number)
            .bind(&binds.supplier)
            .bind(filter.active)
            .bind(filter.by_agile)
            .bind(type_id)
            .bind(status_id)
            .bind(filter.acquisition_date_gte)
            .bind(filter.acquisition_date_lte)
            .bind(&binds.ids);
        if let Some(page) = page {
            select = select.bind(page.limit()).bind(page.offset());
        }
        let rows = select.fetch_all(pool).await?;

        let count = format!("SELECT COUNT(*) {} {}", FROM_ASSET, FILTER_ASSET);
        let total = sqlx::query_scalar(&count)
            .bind(&binds.search)
            .bind(&binds.code)
            .bind(&binds.description)
            .bind(&binds.register_number)
            .bind(&binds.supplier)
            .bind(filter.active)
            .bind(filter.by_agile)
            .bind(type_id)
            .bind(status_id)
            .bind(filter.acquisition_date_gte)
            .bind(filter.acquisition_date_lte)
            .bind(&binds.ids)
            .fetch_one(pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Available assets that still have an open lending, with the
    /// creation time of their latest such lending
    pub async fn lent_but_available(
        pool: &SqlitePool,
    ) -> Result<Vec<(i64, DateTime<Utc>)>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT a.id, MAX(l.created_at)
            FROM assets a
            JOIN lendings l ON l.asset_id = a.id
            WHERE a.status_id = 1 AND l.deleted = 0 AND l.status_id IN (1, 2)
            GROUP BY a.id
            ORDER BY a.id
            "#,
        )
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    id: i64,
    code: Option<String>,
    register_number: Option<String>,
    description: Option<String>,
    supplier: Option<String>,
    assurance_date: Option<NaiveDate>,
    observations: Option<String>,
    pattern: Option<String>,
    brand: Option<String>,
    operational_system: Option<String>,
    serial_number: Option<String>,
    imei: Option<String>,
    acquisition_date: Option<NaiveDate>,
    value: Option<f64>,
    depreciation: Option<f64>,
    ms_office: bool,
    line_number: Option<String>,
    operator: Option<String>,
    model: Option<String>,
    accessories: Option<String>,
    configuration: Option<String>,
    quantity: i64,
    unit: Option<String>,
    active: bool,
    by_agile: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    type_id: Option<i64>,
    type_code: Option<String>,
    type_name: Option<String>,
    type_acronym: Option<String>,
    status_id: Option<i64>,
    status_name: Option<String>,
    asset_group: Option<String>,
    invoice_number: Option<String>,
    maintenance_status_id: Option<i64>,
    maintenance_status_name: Option<String>,
    upgrade_status_id: Option<i64>,
    upgrade_status_name: Option<String>,
    low_count: i64,
    medium_count: i64,
    high_count: i64,
}

impl From<AssetRow> for Asset {
    fn from(row: AssetRow) -> Self {
        let asset_type = match (row.type_id, row.type_code, row.type_name) {
            (Some(id), Some(code), Some(name)) => Some(AssetType {
                id,
                code,
                name,
                acronym: row.type_acronym,
            }),
            _ => None,
        };
        let status = match (row.status_id, row.status_name) {
            (Some(id), Some(name)) => Some(CatalogItem { id, name }),
            _ => None,
        };

        Self {
            id: row.id,
            code: row.code,
            register_number: row.register_number,
            description: row.description,
            supplier: row.supplier,
            assurance_date: row.assurance_date,
            observations: row.observations,
            pattern: row.pattern,
            brand: row.brand,
            operational_system: row.operational_system,
            serial_number: row.serial_number,
            imei: row.imei,
            acquisition_date: row.acquisition_date,
            value: row.value,
            depreciation: row.depreciation,
            ms_office: row.ms_office,
            line_number: row.line_number,
            operator: row.operator,
            model: row.model,
            accessories: row.accessories,
            configuration: row.configuration,
            quantity: row.quantity,
            unit: row.unit,
            active: row.active,
            by_agile: row.by_agile,
            asset_type,
            status,
            asset_group: row.asset_group,
            invoice_number: row.invoice_number,
            maintenance_status: open_status_label(
                row.maintenance_status_id.zip(row.maintenance_status_name),
            ),
            upgrade_status: open_status_label(row.upgrade_status_id.zip(row.upgrade_status_name)),
            alert: maintenance_alert(row.low_count, row.medium_count, row.high_count),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
