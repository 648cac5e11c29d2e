use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use super::employee::employee_short;
use crate::models::{
    AssetShort, CatalogItem, CostCenter, EmployeeShort, Lending, LendingFilter, LendingHistory,
    PageParams, Witness, DEFAULT_DATE_FORMAT,
};

const SELECT_LENDING: &str = r#"
    SELECT
        l.id, l.bu, l.number, l.manager, l.business_executive, l.project, l.location,
        l.observations, l.signed_date, l.revoke_signed_date, l.glpi_number, l.ms_office,
        l.created_at, l.updated_at, l.document_id, l.document_revoke_id,
        e.id AS employee_id, e.code AS employee_code, e.full_name AS employee_full_name,
        e.registration AS employee_registration,
        a.id AS asset_id, a.code AS asset_code, a.register_number AS asset_register_number,
        a.description AS asset_description,
        w.id AS workload_id, w.name AS workload_name,
        s.id AS status_id, s.name AS status_name,
        c.id AS cost_center_id, c.code AS cost_center_code, c.name AS cost_center_name,
        c.classification AS cost_center_classification
    FROM lendings l
    JOIN employees e ON e.id = l.employee_id
    JOIN assets a ON a.id = l.asset_id
    LEFT JOIN workloads w ON w.id = l.workload_id
    JOIN lending_statuses s ON s.id = l.status_id
    JOIN cost_centers c ON c.id = l.cost_center_id
"#;

const FILTER_LENDING: &str = r#"
    WHERE l.deleted = 0
      AND ($1 IS NULL OR e.full_name LIKE $1 OR a.code LIKE $1 OR a.description LIKE $1
           OR l.number LIKE $1 OR l.glpi_number LIKE $1)
      AND ($2 IS NULL OR l.employee_id = $2)
      AND ($3 IS NULL OR l.asset_id = $3)
      AND ($4 IS NULL OR l.status_id = $4)
      AND ($5 IS NULL OR l.bu = $5)
"#;

const SELECT_WITNESS: &str = r#"
    SELECT
        wt.id, wt.lending_id,
        e.id AS employee_id, e.code AS employee_code, e.full_name AS employee_full_name,
        e.registration AS employee_registration
    FROM witnesses wt
    JOIN employees e ON e.id = wt.employee_id
"#;

/// Every stored column of a lending, as written by create and update
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct LendingData {
    pub employee_id: i64,
    pub asset_id: i64,
    pub workload_id: Option<i64>,
    pub status_id: i64,
    pub cost_center_id: i64,
    pub bu: Option<String>,
    pub number: Option<String>,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub observations: Option<String>,
    pub signed_date: Option<NaiveDate>,
    pub revoke_signed_date: Option<NaiveDate>,
    pub glpi_number: Option<String>,
    pub ms_office: bool,
}

pub struct LendingRepository;

impl LendingRepository {
    pub async fn create_with_executor<'e, E>(executor: E, data: &LendingData) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO lendings (
                employee_id, asset_id, workload_id, status_id, cost_center_id, bu, number,
                manager, business_executive, project, location, observations, signed_date,
                revoke_signed_date, glpi_number, ms_office, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING id
            "#,
        )
        .bind(data.employee_id)
        .bind(data.asset_id)
        .bind(data.workload_id)
        .bind(data.status_id)
        .bind(data.cost_center_id)
        .bind(&data.bu)
        .bind(&data.number)
        .bind(&data.manager)
        .bind(&data.business_executive)
        .bind(&data.project)
        .bind(&data.location)
        .bind(&data.observations)
        .bind(data.signed_date)
        .bind(data.revoke_signed_date)
        .bind(&data.glpi_number)
        .bind(data.ms_office)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn update_with_executor<'e, E>(
        executor: E,
        id: i64,
        data: &LendingData,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            UPDATE lendings SET
                employee_id = $1, asset_id = $2, workload_id = $3, status_id = $4,
                cost_center_id = $5, bu = $6, number = $7, manager = $8,
                business_executive = $9, project = $10, location = $11, observations = $12,
                signed_date = $13, revoke_signed_date = $14, glpi_number = $15,
                ms_office = $16, updated_at = $17
            WHERE id = $18
            "#,
        )
        .bind(data.employee_id)
        .bind(data.asset_id)
        .bind(data.workload_id)
        .bind(data.status_id)
        .bind(data.cost_center_id)
        .bind(&data.bu)
        .bind(&data.number)
        .bind(&data.manager)
        .bind(&data.business_executive)
        .bind(&data.project)
        .bind(&data.location)
        .bind(&data.observations)
        .bind(data.signed_date)
        .bind(data.revoke_signed_date)
        .bind(&data.glpi_number)
        .bind(data.ms_office)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn soft_delete<'e, E>(executor: E, id: i64) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE lendings SET deleted = 1, updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Stored columns of a non-deleted lending
    pub async fn get_data(pool: &SqlitePool, id: i64) -> Result<Option<LendingData>, sqlx::Error> {
        sqlx::query_as::<_, LendingData>(
            r#"
            SELECT
                employee_id, asset_id, workload_id, status_id, cost_center_id, bu, number,
                manager, business_executive, project, location, observations, signed_date,
                revoke_signed_date, glpi_number, ms_office
            FROM lendings WHERE id = $1 AND deleted = 0
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Lending>, sqlx::Error> {
        let query = format!("{} WHERE l.id = $1 AND l.deleted = 0", SELECT_LENDING);
        let row = sqlx::query_as::<_, LendingRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => {
                let witnesses = WitnessRepository::list(pool, Some(row.id)).await?;
                Ok(Some(row.into_lending(witnesses)))
            }
            None => Ok(None),
        }
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &LendingFilter,
        page: PageParams,
    ) -> Result<(Vec<Lending>, i64), sqlx::Error> {
        let search = crate::models::like_pattern(filter.search.as_deref());
        let bu = filter.bu.map(|bu| bu.as_str());

        let query = format!(
            "{} {} ORDER BY l.id DESC LIMIT $6 OFFSET $7",
            SELECT_LENDING, FILTER_LENDING
        );
        let rows = sqlx::query_as::<_, LendingRow>(&query)
            .bind(&search)
            .bind(filter.employee)
            .bind(filter.asset)
            .bind(filter.status)
            .bind(bu)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count = format!(
            r#"SELECT COUNT(*) FROM lendings l
            JOIN employees e ON e.id = l.employee_id
            JOIN assets a ON a.id = l.asset_id
            {}"#,
            FILTER_LENDING
        );
        let total = sqlx::query_scalar(&count)
            .bind(&search)
            .bind(filter.employee)
            .bind(filter.asset)
            .bind(filter.status)
            .bind(bu)
            .fetch_one(pool)
            .await?;

        let mut lendings = Vec::with_capacity(rows.len());
        for row in rows {
            let witnesses = WitnessRepository::list(pool, Some(row.id)).await?;
            lendings.push(row.into_lending(witnesses));
        }
        Ok((lendings, total))
    }

    /// Non-deleted lendings of an asset or an employee, newest first
    pub async fn history(
        pool: &SqlitePool,
        asset_id: Option<i64>,
        employee_id: Option<i64>,
    ) -> Result<Vec<LendingHistory>, sqlx::Error> {
        let query = format!(
            r#"{}
            WHERE l.deleted = 0
              AND ($1 IS NULL OR l.asset_id = $1)
              AND ($2 IS NULL OR l.employee_id = $2)
            ORDER BY l.id DESC"#,
            SELECT_LENDING
        );
        let rows = sqlx::query_as::<_, LendingRow>(&query)
            .bind(asset_id)
            .bind(employee_id)
            .fetch_all(pool)
            .await?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            let witnesses = WitnessRepository::list(pool, Some(row.id))
                .await?
                .into_iter()
                .map(|w| w.id)
                .collect();
            history.push(row.into_history(witnesses));
        }
        Ok(history)
    }
}

pub struct WitnessRepository;

impl WitnessRepository {
    pub async fn create(pool: &SqlitePool, employee_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("INSERT INTO witnesses (employee_id) VALUES ($1) RETURNING id")
            .bind(employee_id)
            .fetch_one(pool)
            .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Witness>, sqlx::Error> {
        let query = format!("{} WHERE wt.id = $1", SELECT_WITNESS);
        let row = sqlx::query_as::<_, WitnessRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.and_then(WitnessRow::into_witness))
    }

    pub async fn list(
        pool: &SqlitePool,
        lending_id: Option<i64>,
    ) -> Result<Vec<Witness>, sqlx::Error> {
        let query = format!(
            "{} WHERE ($1 IS NULL OR wt.lending_id = $1) ORDER BY wt.id",
            SELECT_WITNESS
        );
        let rows = sqlx::query_as::<_, WitnessRow>(&query)
            .bind(lending_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().filter_map(WitnessRow::into_witness).collect())
    }

    /// New witness row already pointing at a lending
    pub async fn create_for_lending<'e, E>(
        executor: E,
        employee_id: i64,
        lending_id: i64,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            "INSERT INTO witnesses (employee_id, lending_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(employee_id)
        .bind(lending_id)
        .fetch_one(executor)
        .await
    }

    /// Point exactly `witness_ids` at a lending
    pub async fn attach(
        conn: &mut sqlx::SqliteConnection,
        lending_id: i64,
        witness_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE witnesses SET lending_id = NULL WHERE lending_id = $1")
            .bind(lending_id)
            .execute(&mut *conn)
            .await?;

        for witness_id in witness_ids {
            sqlx::query("UPDATE witnesses SET lending_id = $1 WHERE id = $2")
                .bind(lending_id)
                .bind(witness_id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LendingRow {
    id: i64,
    bu: Option<String>,
    number: Option<String>,
    manager: Option<String>,
    business_executive: Option<String>,
    project: Option<String>,
    location: Option<String>,
    observations: Option<String>,
    signed_date: Option<NaiveDate>,
    revoke_signed_date: Option<NaiveDate>,
    glpi_number: Option<String>,
    ms_office: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    document_id: Option<i64>,
    document_revoke_id: Option<i64>,
    employee_id: i64,
    employee_code: String,
    employee_full_name: String,
    employee_registration: Option<String>,
    asset_id: i64,
    asset_code: Option<String>,
    asset_register_number: Option<String>,
    asset_description: Option<String>,
    workload_id: Option<i64>,
    workload_name: Option<String>,
    status_id: i64,
    status_name: String,
    cost_center_id: i64,
    cost_center_code: String,
    cost_center_name: String,
    cost_center_classification: Option<String>,
}

impl LendingRow {
    fn employee(&self) -> EmployeeShort {
        EmployeeShort {
            id: self.employee_id,
            code: self.employee_code.clone(),
            full_name: self.employee_full_name.clone(),
            registration: self.employee_registration.clone(),
        }
    }

    fn cost_center(&self) -> CostCenter {
        CostCenter {
            id: self.cost_center_id,
            code: self.cost_center_code.clone(),
            name: self.cost_center_name.clone(),
            classification: self.cost_center_classification.clone(),
        }
    }

    fn into_lending(self, witnesses: Vec<Witness>) -> Lending {
        let employee = self.employee();
        let cost_center = self.cost_center();
        let workload = match (self.workload_id, self.workload_name) {
            (Some(id), Some(name)) => Some(CatalogItem { id, name }),
            _ => None,
        };

        Lending {
            id: self.id,
            employee,
            asset: AssetShort {
                id: self.asset_id,
                code: self.asset_code,
                register_number: self.asset_register_number,
                description: self.asset_description,
            },
            workload,
            status: CatalogItem {
                id: self.status_id,
                name: self.status_name,
            },
            cost_center,
            witnesses,
            document: self.document_id,
            document_revoke: self.document_revoke_id,
            bu: self.bu,
            number: self.number,
            manager: self.manager,
            business_executive: self.business_executive,
            project: self.project,
            location: self.location,
            observations: self.observations,
            signed_date: self.signed_date,
            revoke_signed_date: self.revoke_signed_date,
            glpi_number: self.glpi_number,
            ms_office: self.ms_office,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn into_history(self, witnesses: Vec<i64>) -> LendingHistory {
        let format = |date: Option<NaiveDate>| date.map(|d| d.format(DEFAULT_DATE_FORMAT).to_string());

        LendingHistory {
            id: self.id,
            asset: self.asset_id,
            employee: self.employee(),
            cost_center: self.cost_center(),
            number: self.number,
            glpi_number: self.glpi_number,
            observations: self.observations,
            project: self.project,
            signed_date: format(self.signed_date),
            revoke_signed_date: format(self.revoke_signed_date),
            status: Some(self.status_name),
            workload: self.workload_name.unwrap_or_default(),
            witnesses,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WitnessRow {
    id: i64,
    lending_id: Option<i64>,
    employee_id: Option<i64>,
    employee_code: Option<String>,
    employee_full_name: Option<String>,
    employee_registration: Option<String>,
}

impl WitnessRow {
    fn into_witness(self) -> Option<Witness> {
        let employee = employee_short(
            self.employee_id,
            self.employee_code,
            self.employee_full_name,
            self.employee_registration,
        )?;
        Some(Witness {
            id: self.id,
            employee,
            lending_id: self.lending_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_pool, Fixtures};

    #[tokio::test]
    async fn test_create_list_and_history() {
        let pool = test_pool().await;
        let employee = Fixtures::employee(&pool, "000010", "Rita Melo").await;
        let asset = Fixtures::asset(&pool, "NB-1").await;
        let cost_center = Fixtures::cost_center(&pool, "1.01").await;

        let id = LendingRepository::create_with_executor(
            &pool,
            &LendingData {
                employee_id: employee,
                asset_id: asset,
                workload_id: Some(1),
                status_id: 1,
                cost_center_id: cost_center,
                bu: Some("ADS".into()),
                signed_date: NaiveDate::from_ymd_opt(2024, 3, 5),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let witness = WitnessRepository::create(&pool, employee).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        WitnessRepository::attach(&mut conn, id, &[witness]).await.unwrap();
        drop(conn);

        let lending = LendingRepository::get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(lending.status.name, "Arquivo pendente");
        assert_eq!(lending.workload.unwrap().name, "Híbrido");
        assert_eq!(lending.witnesses.len(), 1);

        let filter = LendingFilter {
            search: Some("rita".into()),
            ..Default::default()
        };
        let (found, total) = LendingRepository::list(&pool, &filter, PageParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, id);

        let history = LendingRepository::history(&pool, Some(asset), None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].signed_date.as_deref(), Some("05/03/2024"));
        assert_eq!(history[0].witnesses, vec![witness]);

        LendingRepository::soft_delete(&pool, id).await.unwrap();
        assert!(LendingRepository::get_by_id(&pool, id).await.unwrap().is_none());
        assert!(LendingRepository::history(&pool, None, Some(employee))
            .await
            .unwrap()
            .is_empty());
    }
}
