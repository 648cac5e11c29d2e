use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::{
    AssetShort, CatalogItem, Criticality, EmployeeShort, Maintenance, MaintenanceFilter,
    PageParams, Upgrade,
};

const SELECT_MAINTENANCE: &str = r#"
    SELECT
        m.id, m.criticality, m.open_date, m.close_date, m.glpi_number, m.open_date_glpi,
        m.open_date_supplier, m.supplier_number, m.supplier_service_order,
        m.incident_description, m.resolution, m.value, m.has_assurance,
        m.created_at, m.updated_at,
        ma.id AS action_id, ma.name AS action_name,
        s.id AS status_id, s.name AS status_name,
        a.id AS asset_id, a.code AS asset_code, a.register_number AS asset_register_number,
        a.description AS asset_description,
        e.id AS employee_id, e.code AS employee_code, e.full_name AS employee_full_name,
        e.registration AS employee_registration
    FROM maintenances m
    JOIN maintenance_actions ma ON ma.id = m.action_id
    JOIN maintenance_statuses s ON s.id = m.status_id
    JOIN assets a ON a.id = m.asset_id
    JOIN employees e ON e.id = m.employee_id
"#;

const FROM_MAINTENANCE: &str = r#"
    FROM maintenances m
    JOIN assets a ON a.id = m.asset_id
    JOIN employees e ON e.id = m.employee_id
"#;

const FILTER_MAINTENANCE: &str = r#"
    WHERE ($1 IS NULL OR a.code LIKE $1 OR a.description LIKE $1 OR e.full_name LIKE $1)
      AND ($2 IS NULL OR m.asset_id = $2)
      AND ($3 IS NULL OR m.status_id = $3)
"#;

const SELECT_UPGRADE: &str = r#"
    SELECT
        u.id, u.open_date, u.close_date, u.value, u.detailing, u.supplier, u.invoice_number,
        u.observations, u.created_at, u.updated_at,
        s.id AS status_id, s.name AS status_name,
        a.id AS asset_id, a.code AS asset_code, a.register_number AS asset_register_number,
        a.description AS asset_description,
        e.id AS employee_id, e.code AS employee_code, e.full_name AS employee_full_name,
        e.registration AS employee_registration
    FROM upgrades u
    JOIN maintenance_statuses s ON s.id = u.status_id
    JOIN assets a ON a.id = u.asset_id
    JOIN employees e ON e.id = u.employee_id
"#;

const FROM_UPGRADE: &str = r#"
    FROM upgrades u
    JOIN assets a ON a.id = u.asset_id
    JOIN employees e ON e.id = u.employee_id
"#;

const FILTER_UPGRADE: &str = r#"
    WHERE ($1 IS NULL OR a.code LIKE $1 OR a.description LIKE $1 OR e.full_name LIKE $1)
      AND ($2 IS NULL OR u.asset_id = $2)
      AND ($3 IS NULL OR u.status_id = $3)
"#;

/// Stored columns of a maintenance
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct MaintenanceData {
    pub action_id: i64,
    pub status_id: i64,
    pub asset_id: i64,
    pub employee_id: i64,
    pub criticality: Option<i64>,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub glpi_number: Option<String>,
    pub open_date_glpi: Option<NaiveDate>,
    pub open_date_supplier: Option<NaiveDate>,
    pub supplier_number: Option<String>,
    pub supplier_service_order: Option<String>,
    pub incident_description: Option<String>,
    pub resolution: Option<String>,
    pub value: f64,
    pub has_assurance: bool,
}

/// Stored columns of an upgrade
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct UpgradeData {
    pub status_id: i64,
    pub asset_id: i64,
    pub employee_id: i64,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub detailing: Option<String>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub observations: Option<String>,
}

pub struct MaintenanceRepository;

impl MaintenanceRepository {
    pub async fn create_with_executor<'e, E>(
        executor: E,
        data: &MaintenanceData,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO maintenances (
                action_id, status_id, asset_id, employee_id, criticality, open_date, close_date,
                glpi_number, open_date_glpi, open_date_supplier, supplier_number,
                supplier_service_order, incident_description, resolution, value, has_assurance,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING id
            "#,
        )
        .bind(data.action_id)
        .bind(data.status_id)
        .bind(data.asset_id)
        .bind(data.employee_id)
        .bind(data.criticality)
        .bind(data.open_date)
        .bind(data.close_date)
        .bind(&data.glpi_number)
        .bind(data.open_date_glpi)
        .bind(data.open_date_supplier)
        .bind(&data.supplier_number)
        .bind(&data.supplier_service_order)
        .bind(&data.incident_description)
        .bind(&data.resolution)
        .bind(data.value)
        .bind(data.has_assurance)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    /// Id the next maintenance will most likely get
    pub async fn next_id<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM maintenances")
            .fetch_one(executor)
            .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// Type acronym and description of the asset under maintenance
    pub async fn asset_label<'e, E>(
        executor: E,
        asset_id: i64,
    ) -> Result<Option<(Option<String>, Option<String>)>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            r#"
            SELECT t.acronym, a.description
            FROM assets a LEFT JOIN asset_types t ON t.id = a.type_id
            WHERE a.id = $1
            "#,
        )
        .bind(asset_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &MaintenanceData,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE maintenances SET
                action_id = $1, status_id = $2, asset_id = $3, employee_id = $4,
                criticality = $5, open_date = $6, close_date = $7, glpi_number = $8,
                open_date_glpi = $9, open_date_supplier = $10, supplier_number = $11,
                supplier_service_order = $12, incident_description = $13, resolution = $14,
                value = $15, has_assurance = $16, updated_at = $17
            WHERE id = $18
            "#,
        )
        .bind(data.action_id)
        .bind(data.status_id)
        .bind(data.asset_id)
        .bind(data.employee_id)
        .bind(data.criticality)
        .bind(data.open_date)
        .bind(data.close_date)
        .bind(&data.glpi_number)
        .bind(data.open_date_glpi)
        .bind(data.open_date_supplier)
        .bind(&data.supplier_number)
        .bind(&data.supplier_service_order)
        .bind(&data.incident_description)
        .bind(&data.resolution)
        .bind(data.value)
        .bind(data.has_assurance)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_data(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<MaintenanceData>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceData>(
            r#"
            SELECT
                action_id, status_id, asset_id, employee_id, criticality, open_date, close_date,
                glpi_number, open_date_glpi, open_date_supplier, supplier_number,
                supplier_service_order, incident_description, resolution, value, has_assurance
            FROM maintenances WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Maintenance>, sqlx::Error> {
        let query = format!("{} WHERE m.id = $1", SELECT_MAINTENANCE);
        let row = sqlx::query_as::<_, MaintenanceRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &MaintenanceFilter,
        page: PageParams,
    ) -> Result<(Vec<Maintenance>, i64), sqlx::Error> {
        let search = crate::models::like_pattern(filter.search.as_deref());

        let query = format!(
            "{} {} ORDER BY m.id DESC LIMIT $4 OFFSET $5",
            SELECT_MAINTENANCE, FILTER_MAINTENANCE
        );
        let rows = sqlx::query_as::<_, MaintenanceRow>(&query)
            .bind(&search)
            .bind(filter.asset)
            .bind(filter.status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count = format!("SELECT COUNT(*) {} {}", FROM_MAINTENANCE, FILTER_MAINTENANCE);
        let total = sqlx::query_scalar(&count)
            .bind(&search)
            .bind(filter.asset)
            .bind(filter.status)
            .fetch_one(pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}

pub struct UpgradeRepository;

impl UpgradeRepository {
    pub async fn create(pool: &SqlitePool, data: &UpgradeData) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO upgrades (
                status_id, asset_id, employee_id, open_date, close_date, value, detailing,
                supplier, invoice_number, observations, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING id
            "#,
        )
        .bind(data.status_id)
        .bind(data.asset_id)
        .bind(data.employee_id)
        .bind(data.open_date)
        .bind(data.close_date)
        .bind(data.value)
        .bind(&data.detailing)
        .bind(&data.supplier)
        .bind(&data.invoice_number)
        .bind(&data.observations)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, id: i64, data: &UpgradeData) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE upgrades SET
                status_id = $1, asset_id = $2, employee_id = $3, open_date = $4,
                close_date = $5, value = $6, detailing = $7, supplier = $8,
                invoice_number = $9, observations = $10, updated_at = $11
            WHERE id = $12
            "#,
        )
        .bind(data.status_id)
        .bind(data.asset_id)
        .bind(data.employee_id)
        .bind(data.open_date)
        .bind(data.close_date)
        .bind(data.value)
        .bind(&data.detailing)
        .bind(&data.supplier)
        .bind(&data.invoice_number)
        .bind(&data.observations)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_data(pool: &SqlitePool, id: i64) -> Result<Option<UpgradeData>, sqlx::Error> {
        sqlx::query_as::<_, UpgradeData>(
            r#"
            SELECT
                status_id, asset_id, employee_id, open_date, close_date, value, detailing,
                supplier, invoice_number, observations
            FROM upgrades WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Upgrade>, sqlx::Error> {
        let query = format!("{} WHERE u.id = $1", SELECT_UPGRADE);
        let row = sqlx::query_as::<_, UpgradeRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &MaintenanceFilter,
        page: PageParams,
    ) -> Result<(Vec<Upgrade>, i64), sqlx::Error> {
        let search = crate::models::like_pattern(filter.search.as_deref());

        let query = format!(
            "{} {} ORDER BY u.id DESC LIMIT $4 OFFSET $5",
            SELECT_UPGRADE, FILTER_UPGRADE
        );
        let rows = sqlx::query_as::<_, UpgradeRow>(&query)
            .bind(&search)
            .bind(filter.asset)
            .bind(filter.status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count = format!("SELECT COUNT(*) {} {}", FROM_UPGRADE, FILTER_UPGRADE);
        let total = sqlx::query_scalar(&count)
            .bind(&search)
            .bind(filter.asset)
            .bind(filter.status)
            .fetch_one(pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MaintenanceRow {
    id: i64,
    criticality: Option<i64>,
    open_date: Option<NaiveDate>,
    close_date: Option<NaiveDate>,
    glpi_number: Option<String>,
    open_date_glpi: Option<NaiveDate>,
    open_date_supplier: Option<NaiveDate>,
    supplier_number: Option<String>,
    supplier_service_order: Option<String>,
    incident_description: Option<String>,
    resolution: Option<String>,
    value: f64,
    has_assurance: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    action_id: i64,
    action_name: String,
    status_id: i64,
    status_name: String,
    asset_id: i64,
    asset_code: Option<String>,
    asset_register_number: Option<String>,
    asset_description: Option<String>,
    employee_id: i64,
    employee_code: String,
    employee_full_name: String,
    employee_registration: Option<String>,
}

impl From<MaintenanceRow> for Maintenance {
    fn from(row: MaintenanceRow) -> Self {
        Maintenance {
            id: row.id,
            action: CatalogItem {
                id: row.action_id,
                name: row.action_name,
            },
            status: CatalogItem {
                id: row.status_id,
                name: row.status_name,
            },
            asset: AssetShort {
                id: row.asset_id,
                code: row.asset_code,
                register_number: row.asset_register_number,
                description: row.asset_description,
            },
            employee: EmployeeShort {
                id: row.employee_id,
                code: row.employee_code,
                full_name: row.employee_full_name,
                registration: row.employee_registration,
            },
            criticality: row.criticality.and_then(Criticality::from_id),
            open_date: row.open_date,
            close_date: row.close_date,
            glpi_number: row.glpi_number,
            open_date_glpi: row.open_date_glpi,
            open_date_supplier: row.open_date_supplier,
            supplier_number: row.supplier_number,
            supplier_service_order: row.supplier_service_order,
            incident_description: row.incident_description,
            resolution: row.resolution,
            value: row.value,
            has_assurance: row.has_assurance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UpgradeRow {
    id: i64,
    open_date: Option<NaiveDate>,
    close_date: Option<NaiveDate>,
    value: Option<f64>,
    detailing: Option<String>,
    supplier: Option<String>,
    invoice_number: Option<String>,
    observations: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    status_id: i64,
    status_name: String,
    asset_id: i64,
    asset_code: Option<String>,
    asset_register_number: Option<String>,
    asset_description: Option<String>,
    employee_id: i64,
    employee_code: String,
    employee_full_name: String,
    employee_registration: Option<String>,
}

impl From<UpgradeRow> for Upgrade {
    fn from(row: UpgradeRow) -> Self {
        Upgrade {
            id: row.id,
            status: CatalogItem {
                id: row.status_id,
                name: row.status_name,
            },
            asset: AssetShort {
                id: row.asset_id,
                code: row.asset_code,
                register_number: row.asset_register_number,
                description: row.asset_description,
            },
            employee: EmployeeShort {
                id: row.employee_id,
                code: row.employee_code,
                full_name: row.employee_full_name,
                registration: row.employee_registration,
            },
            open_date: row.open_date,
            close_date: row.close_date,
            value: row.value,
            detailing: row.detailing,
            supplier: row.supplier,
            invoice_number: row.invoice_number,
            observations: row.observations,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_pool, Fixtures};

    #[tokio::test]
    async fn test_maintenance_crud_and_filters() {
        let pool = test_pool().await;
        let employee = Fixtures::employee(&pool, "000020", "Caio Prado").await;
        let asset = Fixtures::asset(&pool, "NB-20").await;

        let id = MaintenanceRepository::create_with_executor(
            &pool,
            &MaintenanceData {
                action_id: 1,
                status_id: 1,
                asset_id: asset,
                employee_id: employee,
                criticality: Some(Criticality::High.id()),
                incident_description: Some("Tela quebrada".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let maintenance = MaintenanceRepository::get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(maintenance.status.name, "Em progresso");
        assert_eq!(maintenance.criticality, Some(Criticality::High));

        let mut data = MaintenanceRepository::get_data(&pool, id).await.unwrap().unwrap();
        data.status_id = 3;
        MaintenanceRepository::update(&pool, id, &data).await.unwrap();

        let filter = MaintenanceFilter {
            status: Some(3),
            ..Default::default()
        };
        let (items, total) = MaintenanceRepository::list(&pool, &filter, PageParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].status.name, "Finalizado");

        let filter = MaintenanceFilter {
            search: Some("nobody".into()),
            ..Default::default()
        };
        let (_, total) = MaintenanceRepository::list(&pool, &filter, PageParams::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_upgrade_crud() {
        let pool = test_pool().await;
        let employee = Fixtures::employee(&pool, "000021", "Lia Souza").await;
        let asset = Fixtures::asset(&pool, "NB-21").await;

        let id = UpgradeRepository::create(
            &pool,
            &UpgradeData {
                status_id: 2,
                asset_id: asset,
                employee_id: employee,
                value: Some(350.0),
                detailing: Some("16GB RAM".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let upgrade = UpgradeRepository::get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(upgrade.status.name, "Pendente");
        assert_eq!(upgrade.value, Some(350.0));

        let (items, total) = UpgradeRepository::list(
            &pool,
            &MaintenanceFilter {
                asset: Some(asset),
                ..Default::default()
            },
            PageParams::default(),
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, id);
    }
}
