use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use super::document::SignerContext;
use crate::models::{
    CatalogItem, CostCenter, EmployeeShort, PageParams, Term, TermFilter, TermItem,
};

const SELECT_TERM: &str = r#"
    SELECT
        t.id, t.number, t.manager, t.business_executive, t.project, t.location,
        t.observations, t.signed_date, t.revoke_signed_date, t.glpi_number,
        t.document_id, t.document_revoke_id, t.created_at,
        e.id AS employee_id, e.code AS employee_code, e.full_name AS employee_full_name,
        e.registration AS employee_registration,
        it.id AS type_id, it.name AS type_name,
        s.id AS status_id, s.name AS status_name,
        w.id AS workload_id, w.name AS workload_name,
        c.id AS cost_center_id, c.code AS cost_center_code, c.name AS cost_center_name,
        c.classification AS cost_center_classification,
        i.description, i.size, i.quantity, i.value, i.line_number, i.operator
    FROM terms t
    JOIN employees e ON e.id = t.employee_id
    JOIN term_item_types it ON it.id = t.type_id
    JOIN cost_centers c ON c.id = t.cost_center_id
    LEFT JOIN term_statuses s ON s.id = t.status_id
    LEFT JOIN workloads w ON w.id = t.workload_id
    LEFT JOIN term_items i ON i.term_id = t.id
"#;

const FILTER_TERM: &str = r#"
    WHERE t.deleted = 0
      AND ($1 IS NULL OR e.full_name LIKE $1 OR t.number LIKE $1 OR i.description LIKE $1)
      AND ($2 IS NULL OR t.employee_id = $2)
      AND ($3 IS NULL OR t.status_id = $3)
      AND ($4 IS NULL OR t.type_id = $4)
"#;

/// Stored columns of a new term
#[derive(Debug, Clone, Default)]
pub struct TermData {
    pub employee_id: i64,
    pub type_id: i64,
    pub workload_id: Option<i64>,
    pub cost_center_id: i64,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub observations: Option<String>,
    pub glpi_number: Option<String>,
}

/// Everything printed on a term or its termination
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct TermContext {
    pub term_id: i64,
    pub type_id: i64,
    pub status_id: Option<i64>,
    pub number: Option<String>,
    pub document_id: Option<i64>,
    pub document_revoke_id: Option<i64>,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub workload: Option<String>,
    pub cost_center: String,
    #[sqlx(flatten)]
    pub employee: SignerContext,
    #[sqlx(flatten)]
    pub item: TermItem,
}

pub struct TermRepository;

impl TermRepository {
    pub async fn create_with_executor<'e, E>(executor: E, data: &TermData) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO terms (
                employee_id, type_id, workload_id, cost_center_id, manager, business_executive,
                project, location, observations, glpi_number, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING id
            "#,
        )
        .bind(data.employee_id)
        .bind(data.type_id)
        .bind(data.workload_id)
        .bind(data.cost_center_id)
        .bind(&data.manager)
        .bind(&data.business_executive)
        .bind(&data.project)
        .bind(&data.location)
        .bind(&data.observations)
        .bind(&data.glpi_number)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn create_item<'e, E>(executor: E, term_id: i64, item: &TermItem) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO term_items (term_id, description, size, quantity, value, line_number, operator)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(term_id)
        .bind(&item.description)
        .bind(&item.size)
        .bind(item.quantity)
        .bind(item.value)
        .bind(&item.line_number)
        .bind(&item.operator)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        observations: Option<&str>,
        glpi_number: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE terms SET
                observations = COALESCE($1, observations),
                glpi_number = COALESCE($2, glpi_number),
                updated_at = $3
            WHERE id = $4"#,
        )
        .bind(observations)
        .bind(glpi_number)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Term>, sqlx::Error> {
        let query = format!("{} WHERE t.id = $1 AND t.deleted = 0", SELECT_TERM);
        let row = sqlx::query_as::<_, TermRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &TermFilter,
        page: PageParams,
    ) -> Result<(Vec<Term>, i64), sqlx::Error> {
        let search = crate::models::like_pattern(filter.search.as_deref());

        let query = format!(
            "{} {} ORDER BY t.id DESC LIMIT $5 OFFSET $6",
            SELECT_TERM, FILTER_TERM
        );
        let rows = sqlx::query_as::<_, TermRow>(&query)
            .bind(&search)
            .bind(filter.employee)
            .bind(filter.status)
            .bind(filter.item_type)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count = format!(
            r#"SELECT COUNT(*) FROM terms t
            JOIN employees e ON e.id = t.employee_id
            LEFT JOIN term_items i ON i.term_id = t.id
            {}"#,
            FILTER_TERM
        );
        let total = sqlx::query_scalar(&count)
            .bind(&search)
            .bind(filter.employee)
            .bind(filter.status)
            .bind(filter.item_type)
            .fetch_one(pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn context(pool: &SqlitePool, id: i64) -> Result<Option<TermContext>, sqlx::Error> {
        sqlx::query_as::<_, TermContext>(
            r#"
            SELECT
                t.id AS term_id, t.type_id, t.status_id, t.number, t.document_id,
                t.document_revoke_id, t.manager, t.business_executive, t.project, t.location,
                w.name AS workload, c.code AS cost_center,
                e.full_name, e.taxpayer_identification, e.national_identification, e.address,
                n.description AS nationality, r.name AS role,
                m.description AS marital_status, e.employer_name, e.employer_address,
                e.employer_number, e.employer_contract_object, e.employer_contract_date,
                i.description, i.size, i.quantity, i.value, i.line_number, i.operator
            FROM terms t
            JOIN employees e ON e.id = t.employee_id
            JOIN cost_centers c ON c.id = t.cost_center_id
            LEFT JOIN workloads w ON w.id = t.workload_id
            LEFT JOIN term_items i ON i.term_id = t.id
            LEFT JOIN nationalities n ON n.id = e.nationality_id
            LEFT JOIN roles r ON r.id = e.role_id
            LEFT JOIN marital_statuses m ON m.id = e.marital_status_id
            WHERE t.id = $1 AND t.deleted = 0
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Link a generated term and move it to `status_id`.
    pub async fn set_document<'e, E>(
        executor: E,
        id: i64,
        document_id: i64,
        number: &str,
        status_id: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE terms SET document_id = $1, number = $2, status_id = $3, updated_at = $4
            WHERE id = $5"#,
        )
        .bind(document_id)
        .bind(number)
        .bind(status_id)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn sign<'e, E>(
        executor: E,
        id: i64,
        document_id: i64,
        status_id: i64,
        signed_date: NaiveDate,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE terms SET document_id = $1, status_id = $2, signed_date = $3, updated_at = $4
            WHERE id = $5"#,
        )
        .bind(document_id)
        .bind(status_id)
        .bind(signed_date)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_revoke<'e, E>(
        executor: E,
        id: i64,
        document_id: i64,
        status_id: i64,
        signed_date: Option<NaiveDate>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE terms SET
                document_revoke_id = $1, status_id = $2,
                revoke_signed_date = COALESCE($3, revoke_signed_date), updated_at = $4
            WHERE id = $5"#,
        )
        .bind(document_id)
        .bind(status_id)
        .bind(signed_date)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TermRow {
    id: i64,
    number: Option<String>,
    manager: Option<String>,
    business_executive: Option<String>,
    project: Option<String>,
    location: Option<String>,
    observations: Option<String>,
    signed_date: Option<NaiveDate>,
    revoke_signed_date: Option<NaiveDate>,
    glpi_number: Option<String>,
    document_id: Option<i64>,
    document_revoke_id: Option<i64>,
    created_at: DateTime<Utc>,
    employee_id: i64,
    employee_code: String,
    employee_full_name: String,
    employee_registration: Option<String>,
    type_id: i64,
    type_name: String,
    status_id: Option<i64>,
    status_name: Option<String>,
    workload_id: Option<i64>,
    workload_name: Option<String>,
    cost_center_id: i64,
    cost_center_code: String,
    cost_center_name: String,
    cost_center_classification: Option<String>,
    #[sqlx(flatten)]
    item: TermItem,
}

impl From<TermRow> for Term {
    fn from(row: TermRow) -> Self {
        let catalog = |id: Option<i64>, name: Option<String>| match (id, name) {
            (Some(id), Some(name)) => Some(CatalogItem { id, name }),
            _ => None,
        };

        Term {
            id: row.id,
            employee: EmployeeShort {
                id: row.employee_id,
                code: row.employee_code,
                full_name: row.employee_full_name,
                registration: row.employee_registration,
            },
            item_type: CatalogItem {
                id: row.type_id,
                name: row.type_name,
            },
            status: catalog(row.status_id, row.status_name),
            workload: catalog(row.workload_id, row.workload_name),
            cost_center: CostCenter {
                id: row.cost_center_id,
                code: row.cost_center_code,
                name: row.cost_center_name,
                classification: row.cost_center_classification,
            },
            document: row.document_id,
            document_revoke: row.document_revoke_id,
            number: row.number,
            manager: row.manager,
            business_executive: row.business_executive,
            project: row.project,
            location: row.location,
            observations: row.observations,
            signed_date: row.signed_date,
            revoke_signed_date: row.revoke_signed_date,
            glpi_number: row.glpi_number,
            item: row.item,
            created_at: row.created_at,
        }
    }
}
