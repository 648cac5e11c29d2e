use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::{
    Employee, EmployeeFilter, EmployeeSelect, EmployeeShort, PageParams, Reference, Role,
};

const SELECT_EMPLOYEE: &str = r#"
    SELECT
        e.id, e.code, e.full_name, e.taxpayer_identification, e.national_identification,
        e.job_position, e.status, e.address, e.cell_phone, e.email, e.birthday,
        e.manager, e.admission_date, e.registration, e.legal_person,
        e.employer_name, e.employer_address, e.employer_number,
        e.employer_contract_object, e.employer_contract_date, e.employer_end_contract_date,
        e.created_at, e.updated_at,
        r.id AS role_id, r.code AS role_code, r.name AS role_name,
        n.id AS nationality_id, n.code AS nationality_code, n.description AS nationality_description,
        m.id AS marital_status_id, m.code AS marital_status_code, m.description AS marital_status_description,
        g.id AS gender_id, g.code AS gender_code, g.description AS gender_description,
        l.id AS educational_level_id, l.code AS educational_level_code, l.description AS educational_level_description
    FROM employees e
    LEFT JOIN roles r ON r.id = e.role_id
    LEFT JOIN nationalities n ON n.id = e.nationality_id
    LEFT JOIN marital_statuses m ON m.id = e.marital_status_id
    LEFT JOIN genders g ON g.id = e.gender_id
    LEFT JOIN educational_levels l ON l.id = e.educational_level_id
"#;

const FILTER_EMPLOYEE: &str = r#"
    WHERE ($1 IS NULL OR e.code LIKE $1 OR e.full_name LIKE $1
           OR e.taxpayer_identification LIKE $1 OR e.email LIKE $1 OR e.registration LIKE $1)
      AND ($2 IS NULL OR e.code = $2)
      AND ($3 IS NULL OR e.full_name LIKE $3)
      AND ($4 IS NULL OR e.taxpayer_identification = $4)
      AND ($5 IS NULL OR e.status = $5)
      AND ($6 IS NULL OR e.legal_person = $6)
      AND ($7 IS NULL OR e.birthday >= $7)
      AND ($8 IS NULL OR e.birthday <= $8)
      AND ($9 IS NULL OR e.admission_date >= $9)
      AND ($10 IS NULL OR e.admission_date <= $10)
"#;

/// Build an embedded employee from LEFT JOIN columns.
pub(crate) fn employee_short(
    id: Option<i64>,
    code: Option<String>,
    full_name: Option<String>,
    registration: Option<String>,
) -> Option<EmployeeShort> {
    match (id, code, full_name) {
        (Some(id), Some(code), Some(full_name)) => Some(EmployeeShort {
            id,
            code,
            full_name,
            registration,
        }),
        _ => None,
    }
}

/// Every stored column of an employee, as written by create and update
#[derive(Debug, Clone, Default)]
pub struct EmployeeData {
    pub code: String,
    pub full_name: String,
    pub taxpayer_identification: String,
    pub national_identification: Option<String>,
    pub job_position: Option<String>,
    pub status: String,
    pub address: Option<String>,
    pub cell_phone: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub manager: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub registration: Option<String>,
    pub legal_person: bool,
    pub role_id: Option<i64>,
    pub nationality_id: Option<i64>,
    pub marital_status_id: Option<i64>,
    pub gender_id: Option<i64>,
    pub educational_level_id: Option<i64>,
    pub employer_name: Option<String>,
    pub employer_address: Option<String>,
    pub employer_number: Option<String>,
    pub employer_contract_object: Option<String>,
    pub employer_contract_date: Option<NaiveDate>,
    pub employer_end_contract_date: Option<NaiveDate>,
}

impl From<&Employee> for EmployeeData {
    fn from(employee: &Employee) -> Self {
        Self {
            code: employee.code.clone(),
            full_name: employee.full_name.clone(),
            taxpayer_identification: employee.taxpayer_identification.clone(),
            national_identification: employee.national_identification.clone(),
            job_position: employee.job_position.clone(),
            status: employee.status.clone(),
            address: employee.address.clone(),
            cell_phone: employee.cell_phone.clone(),
            email: employee.email.clone(),
            birthday: employee.birthday,
            manager: employee.manager.clone(),
            admission_date: employee.admission_date,
            registration: employee.registration.clone(),
            legal_person: employee.legal_person,
            role_id: employee.role.as_ref().map(|r| r.id),
            nationality_id: employee.nationality.as_ref().map(|r| r.id),
            marital_status_id: employee.marital_status.as_ref().map(|r| r.id),
            gender_id: employee.gender.as_ref().map(|r| r.id),
            educational_level_id: employee.educational_level.as_ref().map(|r| r.id),
            employer_name: employee.employer_name.clone(),
            employer_address: employee.employer_address.clone(),
            employer_number: employee.employer_number.clone(),
            employer_contract_object: employee.employer_contract_object.clone(),
            employer_contract_date: employee.employer_contract_date,
            employer_end_contract_date: employee.employer_end_contract_date,
        }
    }
}

pub struct EmployeeRepository;

impl EmployeeRepository {
    pub async fn create_with_executor<'e, E>(
        executor: E,
        data: &EmployeeData,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            r#"
            INSERT INTO employees (
                code, full_name, taxpayer_identification, national_identification,
                job_position, status, address, cell_phone, email, birthday, manager,
                admission_date, registration, legal_person, role_id, nationality_id,
                marital_status_id, gender_id, educational_level_id, employer_name,
                employer_address, employer_number, employer_contract_object,
                employer_contract_date, employer_end_contract_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            RETURNING id
            "#,
        )
        .bind(&data.code)
        .bind(&data.full_name)
        .bind(&data.taxpayer_identification)
        .bind(&data.national_identification)
        .bind(&data.job_position)
        .bind(&data.status)
        .bind(&data.address)
        .bind(&data.cell_phone)
        .bind(&data.email)
        .bind(data.birthday)
        .bind(&data.manager)
        .bind(data.admission_date)
        .bind(&data.registration)
        .bind(data.legal_person)
        .bind(data.role_id)
        .bind(data.nationality_id)
        .bind(data.marital_status_id)
        .bind(data.gender_id)
        .bind(data.educational_level_id)
        .bind(&data.employer_name)
        .bind(&data.employer_address)
        .bind(&data.employer_number)
        .bind(&data.employer_contract_object)
        .bind(data.employer_contract_date)
        .bind(data.employer_end_contract_date)
        .fetch_one(executor)
        .await
    }

    pub async fn update_with_executor<'e, E>(
        executor: E,
        id: i64,
        data: &EmployeeData,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            UPDATE employees SET
                code = $1, full_name = $2, taxpayer_identification = $3,
                national_identification = $4, job_position = $5, status = $6,
                address = $7, cell_phone = $8, email = $9, birthday = $10, manager = $11,
                admission_date = $12, registration = $13, legal_person = $14,
                role_id = $15, nationality_id = $16, marital_status_id = $17,
                gender_id = $18, educational_level_id = $19, employer_name = $20,
                employer_address = $21, employer_number = $22,
                employer_contract_object = $23, employer_contract_date = $24,
                employer_end_contract_date = $25, updated_at = $26
            WHERE id = $27
            "#,
        )
        .bind(&data.code)
        .bind(&data.full_name)
        .bind(&data.taxpayer_identification)
        .bind(&data.national_identification)
        .bind(&data.job_position)
        .bind(&data.status)
        .bind(&data.address)
        .bind(&data.cell_phone)
        .bind(&data.email)
        .bind(data.birthday)
        .bind(&data.manager)
        .bind(data.admission_date)
        .bind(&data.registration)
        .bind(data.legal_person)
        .bind(data.role_id)
        .bind(data.nationality_id)
        .bind(data.marital_status_id)
        .bind(data.gender_id)
        .bind(data.educational_level_id)
        .bind(&data.employer_name)
        .bind(&data.employer_address)
        .bind(&data.employer_number)
        .bind(&data.employer_contract_object)
        .bind(data.employer_contract_date)
        .bind(data.employer_end_contract_date)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Employee>, sqlx::Error> {
        let query = format!("{} WHERE e.id = $1", SELECT_EMPLOYEE);
        let row = sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn get_by_code<'e, E>(executor: E, code: &str) -> Result<Option<Employee>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!("{} WHERE e.code = $1", SELECT_EMPLOYEE);
        let row = sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(code)
            .fetch_optional(executor)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn get_by_code_or_taxpayer<'e, E>(
        executor: E,
        code: &str,
        taxpayer_identification: &str,
    ) -> Result<Option<Employee>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!(
            "{} WHERE e.code = $1 OR e.taxpayer_identification = $2 ORDER BY e.id LIMIT 1",
            SELECT_EMPLOYEE
        );
        let row = sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(code)
            .bind(taxpayer_identification)
            .fetch_optional(executor)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn next_id(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM employees")
            .fetch_one(pool)
            .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &EmployeeFilter,
        page: PageParams,
    ) -> Result<(Vec<Employee>, i64), sqlx::Error> {
        let search = crate::models::like_pattern(filter.search.as_deref());
        let full_name = crate::models::like_pattern(filter.full_name.as_deref());

        let query = format!(
            "{} {} ORDER BY e.id DESC LIMIT $11 OFFSET $12",
            SELECT_EMPLOYEE, FILTER_EMPLOYEE
        );
        let rows = sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(&search)
            .bind(&filter.code)
            .bind(&full_name)
            .bind(&filter.taxpayer_identification)
            .bind(&filter.status)
            .bind(filter.legal_person)
            .bind(filter.birthday_gte)
            .bind(filter.birthday_lte)
            .bind(filter.admission_date_gte)
            .bind(filter.admission_date_lte)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count = format!("SELECT COUNT(*) FROM employees e {}", FILTER_EMPLOYEE);
        let total = sqlx::query_scalar(&count)
            .bind(&search)
            .bind(&filter.code)
            .bind(&full_name)
            .bind(&filter.taxpayer_identification)
            .bind(&filter.status)
            .bind(filter.legal_person)
            .bind(filter.birthday_gte)
            .bind(filter.birthday_lte)
            .bind(filter.admission_date_gte)
            .bind(filter.admission_date_lte)
            .fetch_one(pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Picker list, optionally restricted to `ids`
    pub async fn select(
        pool: &SqlitePool,
        ids: &[i64],
        search: Option<&str>,
    ) -> Result<Vec<EmployeeSelect>, sqlx::Error> {
        let rows = sqlx::query_as::<_, EmployeeSelect>(
            r#"
            SELECT id, code, full_name, taxpayer_identification
            FROM employees
            WHERE ($1 IS NULL OR full_name LIKE $1 OR code LIKE $1 OR taxpayer_identification LIKE $1)
            ORDER BY full_name
            "#,
        )
        .bind(crate::models::like_pattern(search))
        .fetch_all(pool)
        .await?;

        if ids.is_empty() {
            return Ok(rows);
        }
        Ok(rows.into_iter().filter(|e| ids.contains(&e.id)).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: i64,
    code: String,
    full_name: String,
    taxpayer_identification: String,
    national_identification: Option<String>,
    job_position: Option<String>,
    status: String,
    address: Option<String>,
    cell_phone: Option<String>,
    email: Option<String>,
    birthday: Option<NaiveDate>,
    manager: Option<String>,
    admission_date: Option<NaiveDate>,
    registration: Option<String>,
    legal_person: bool,
    employer_name: Option<String>,
    employer_address: Option<String>,
    employer_number: Option<String>,
    employer_contract_object: Option<String>,
    employer_contract_date: Option<NaiveDate>,
    employer_end_contract_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    role_id: Option<i64>,
    role_code: Option<String>,
    role_name: Option<String>,
    nationality_id: Option<i64>,
    nationality_code: Option<String>,
    nationality_description: Option<String>,
    marital_status_id: Option<i64>,
    marital_status_code: Option<String>,
    marital_status_description: Option<String>,
    gender_id: Option<i64>,
    gender_code: Option<String>,
    gender_description: Option<String>,
    educational_level_id: Option<i64>,
    educational_level_code: Option<String>,
    educational_level_description: Option<String>,
}

fn reference(
    id: Option<i64>,
    code: Option<String>,
    description: Option<String>,
) -> Option<Reference> {
    match (id, code, description) {
        (Some(id), Some(code), Some(description)) => Some(Reference {
            id,
            code,
            description,
        }),
        _ => None,
    }
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        let role = match (row.role_id, row.role_code, row.role_name) {
            (Some(id), Some(code), Some(name)) => Some(Role { id, code, name }),
            _ => None,
        };

        Self {
            id: row.id,
            code: row.code,
            full_name: row.full_name,
            taxpayer_identification: row.taxpayer_identification,
            national_identification: row.national_identification,
            job_position: row.job_position,
            status: row.status,
            address: row.address,
            cell_phone: row.cell_phone,
            email: row.email,
            birthday: row.birthday,
            manager: row.manager,
            admission_date: row.admission_date,
            registration: row.registration,
            legal_person: row.legal_person,
            employer_name: row.employer_name,
            employer_address: row.employer_address,
            employer_number: row.employer_number,
            employer_contract_object: row.employer_contract_object,
            employer_contract_date: row.employer_contract_date,
            employer_end_contract_date: row.employer_end_contract_date,
            role,
            nationality: reference(
                row.nationality_id,
                row.nationality_code,
                row.nationality_description,
            ),
            marital_status: reference(
                row.marital_status_id,
                row.marital_status_code,
                row.marital_status_description,
            ),
            gender: reference(row.gender_id, row.gender_code, row.gender_description),
            educational_level: reference(
                row.educational_level_id,
                row.educational_level_code,
                row.educational_level_description,
            ),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_pool;

    fn data(code: &str, name: &str, taxpayer: &str) -> EmployeeData {
        EmployeeData {
            code: code.to_string(),
            full_name: name.to_string(),
            taxpayer_identification: taxpayer.to_string(),
            status: "Ativo".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_update_and_filter() {
        let pool = test_pool().await;
        let id = EmployeeRepository::create_with_executor(
            &pool,
            &EmployeeData {
                birthday: NaiveDate::from_ymd_opt(1990, 5, 1),
                legal_person: true,
                ..data("PJ0001", "Carla Dias", "11122233344")
            },
        )
        .await
        .unwrap();
        EmployeeRepository::create_with_executor(&pool, &data("000002", "Diego Alves", "55566677788"))
            .await
            .unwrap();

        let employee = EmployeeRepository::get_by_id(&pool, id).await.unwrap().unwrap();
        assert!(employee.legal_person);
        assert!(employee.role.is_none());

        let mut changed = EmployeeData::from(&employee);
        changed.job_position = Some("Analista".into());
        EmployeeRepository::update_with_executor(&pool, id, &changed)
            .await
            .unwrap();
        let employee = EmployeeRepository::get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(employee.job_position.as_deref(), Some("Analista"));

        let filter = EmployeeFilter {
            birthday_gte: NaiveDate::from_ymd_opt(1990, 1, 1),
            birthday_lte: NaiveDate::from_ymd_opt(1990, 12, 31),
            ..Default::default()
        };
        let (found, total) = EmployeeRepository::list(&pool, &filter, PageParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].code, "PJ0001");

        let filter = EmployeeFilter {
            search: Some("diego".into()),
            ..Default::default()
        };
        let (found, _) = EmployeeRepository::list(&pool, &filter, PageParams::default())
            .await
            .unwrap();
        assert_eq!(found[0].full_name, "Diego Alves");

        let by_taxpayer = EmployeeRepository::get_by_code_or_taxpayer(&pool, "nope", "55566677788")
            .await
            .unwrap();
        assert_eq!(by_taxpayer.unwrap().code, "000002");
        assert_eq!(EmployeeRepository::next_id(&pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_select_restricted_to_ids() {
        let pool = test_pool().await;
        let first = EmployeeRepository::create_with_executor(&pool, &data("1", "Bia", "1"))
            .await
            .unwrap();
        EmployeeRepository::create_with_executor(&pool, &data("2", "Caio", "2"))
            .await
            .unwrap();

        assert_eq!(EmployeeRepository::select(&pool, &[], None).await.unwrap().len(), 2);
        let only = EmployeeRepository::select(&pool, &[first], None).await.unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].full_name, "Bia");
    }
}
