use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::employee::employee_short;
use crate::models::{GroupSummary, PageParams, User, UserAccount, UserFilter};

const SELECT_USER: &str = r#"
    SELECT
        u.id, u.username, u.email, u.is_staff, u.is_active,
        u.department, u.manager, u.last_login,
        g.id AS group_id, g.name AS group_name,
        e.id AS employee_id, e.code AS employee_code,
        e.full_name AS employee_full_name, e.registration AS employee_registration
    FROM users u
    LEFT JOIN groups g ON g.id = u.group_id
    LEFT JOIN employees e ON e.id = u.employee_id
"#;

const SELECT_ACCOUNT: &str = r#"
    SELECT
        id, employee_id, group_id, username, email, password,
        is_staff, is_active, department, manager, last_login
    FROM users
"#;

const FILTER_USER: &str = r#"
    WHERE ($1 IS NULL OR u.username LIKE $1 OR u.email LIKE $1
           OR u.department LIKE $1 OR u.manager LIKE $1)
      AND ($2 IS NULL OR u.is_active = $2)
      AND ($3 IS NULL OR u.is_staff = $3)
      AND ($4 = 0 OR u.employee_id IS NULL)
      AND ($5 = 0 OR u.employee_id IS NOT NULL)
"#;

/// Insert payload with the password already hashed
#[derive(Debug, Clone)]
pub struct CreateUserData {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub group_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub department: Option<String>,
    pub manager: Option<String>,
}

pub struct UserRepository;

impl UserRepository {
    pub async fn create(pool: &SqlitePool, data: CreateUserData) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO users (
                username, email, password, is_staff, is_active,
                group_id, employee_id, department, manager
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(data.is_staff)
        .bind(data.is_active)
        .bind(data.group_id)
        .bind(data.employee_id)
        .bind(&data.department)
        .bind(&data.manager)
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        let query = format!("{} WHERE u.id = $1", SELECT_USER);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn get_account(pool: &SqlitePool, id: i64) -> Result<Option<UserAccount>, sqlx::Error> {
        let query = format!("{} WHERE id = $1", SELECT_ACCOUNT);
        sqlx::query_as::<_, UserAccount>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_account_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        let query = format!("{} WHERE username = $1", SELECT_ACCOUNT);
        sqlx::query_as::<_, UserAccount>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Whether another user already has this username
    pub async fn username_taken(
        pool: &SqlitePool,
        username: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE username = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(username)
        .bind(except)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn email_taken(
        pool: &SqlitePool,
        email: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE email = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(email)
        .bind(except)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    /// Whether the employee is linked to a user other than `except`
    pub async fn employee_linked(
        pool: &SqlitePool,
        employee_id: i64,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE employee_id = $1 AND ($2 IS NULL OR id != $2)",
        )
        .bind(employee_id)
        .bind(except)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &UserFilter,
        page: PageParams,
    ) -> Result<(Vec<User>, i64), sqlx::Error> {
        let search = crate::models::like_pattern(filter.search.as_deref());

        let query = format!(
            "{} {} ORDER BY u.id DESC LIMIT $6 OFFSET $7",
            SELECT_USER, FILTER_USER
        );
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(&search)
            .bind(filter.is_active)
            .bind(filter.is_staff)
            .bind(filter.employee_empty)
            .bind(filter.employee_not_empty)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count = format!("SELECT COUNT(*) FROM users u {}", FILTER_USER);
        let total = sqlx::query_scalar(&count)
            .bind(&search)
            .bind(filter.is_active)
            .bind(filter.is_staff)
            .bind(filter.employee_empty)
            .bind(filter.employee_not_empty)
            .fetch_one(pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Write back every mutable column of an account
    pub async fn update(pool: &SqlitePool, account: &UserAccount) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users SET
                username = $1,
                email = $2,
                is_staff = $3,
                is_active = $4,
                group_id = $5,
                employee_id = $6,
                department = $7,
                manager = $8,
                updated_at = $9
            WHERE id = $10
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(account.is_staff)
        .bind(account.is_active)
        .bind(account.group_id)
        .bind(account.employee_id)
        .bind(&account.department)
        .bind(&account.manager)
        .bind(Utc::now())
        .bind(account.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_password(
        pool: &SqlitePool,
        id: i64,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_last_login(
        pool: &SqlitePool,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Display name of a user: the linked employee's name, if any
    pub async fn full_name(pool: &SqlitePool, id: i64) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT e.full_name FROM users u
            JOIN employees e ON e.id = u.employee_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    is_staff: bool,
    is_active: bool,
    department: Option<String>,
    manager: Option<String>,
    last_login: Option<DateTime<Utc>>,
    group_id: Option<i64>,
    group_name: Option<String>,
    employee_id: Option<i64>,
    employee_code: Option<String>,
    employee_full_name: Option<String>,
    employee_registration: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let group = match (row.group_id, row.group_name) {
            (Some(id), Some(name)) => Some(GroupSummary { id, name }),
            _ => None,
        };

        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            is_staff: row.is_staff,
            is_active: row.is_active,
            department: row.department,
            manager: row.manager,
            last_login: row.last_login,
            group,
            employee: employee_short(
                row.employee_id,
                row.employee_code,
                row.employee_full_name,
                row.employee_registration,
            ),
        }
    }
}
