//! Shared helpers for unit tests: an in-memory database and row fixtures.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::auth::{password, AuthUser};
use crate::models::Perm;
use crate::repositories::{
    AssetData, AssetRepository, CreateUserData, EmployeeData, EmployeeRepository, GroupRepository,
    PermissionRepository, ReferenceRepository, UserRepository,
};

/// Password of every fixture user
pub const FIXTURE_PASSWORD: &str = "secret123";

/// Fresh in-memory database with the migrations applied.
///
/// One connection only: each in-memory connection is its own database.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    crate::db::run_migrations(&pool).await.unwrap();
    pool
}

pub struct Fixtures;

impl Fixtures {
    /// ERP-style employee (not a legal person)
    pub async fn employee(pool: &SqlitePool, code: &str, name: &str) -> i64 {
        let data = EmployeeData {
            code: code.to_string(),
            full_name: name.to_string(),
            taxpayer_identification: format!("CPF-{}", code),
            status: "Ativo".to_string(),
            legal_person: false,
            ..Default::default()
        };
        EmployeeRepository::create_with_executor(pool, &data)
            .await
            .unwrap()
    }

    pub async fn cost_center(pool: &SqlitePool, code: &str) -> i64 {
        ReferenceRepository::upsert_cost_center(pool, code, &format!("Centro {}", code), None)
            .await
            .unwrap()
    }

    /// Available ERP asset of type 1 whose register number is its code
    pub async fn asset(pool: &SqlitePool, code: &str) -> i64 {
        let data = AssetData {
            asset_group_id: None,
            type_id: Some(1),
            status_id: 1,
            invoice_id: None,
            code: Some(code.to_string()),
            register_number: Some(code.to_string()),
            description: Some(format!("NOTEBOOK {}", code)),
            supplier: None,
            assurance_date: None,
            observations: None,
            pattern: None,
            brand: None,
            operational_system: None,
            serial_number: None,
            imei: None,
            acquisition_date: None,
            value: None,
            depreciation: None,
            ms_office: false,
            line_number: None,
            operator: None,
            model: None,
            accessories: None,
            configuration: None,
            quantity: 1,
            unit: None,
            active: true,
            by_agile: false,
        };
        AssetRepository::create_with_executor(pool, &data)
            .await
            .unwrap()
    }

    /// Group holding `perms`, creating the permission rows as needed
    pub async fn group(pool: &SqlitePool, name: &str, perms: &[Perm]) -> i64 {
        let group_id = GroupRepository::create_with_executor(pool, name).await.unwrap();

        let mut ids = Vec::new();
        for perm in perms {
            PermissionRepository::insert_if_missing(
                pool,
                perm.module,
                perm.model,
                perm.action.as_str(),
                &format!("{} {}", perm.action.label(), perm.model),
            )
            .await
            .unwrap();
            let id: i64 = sqlx::query_scalar(
                "SELECT id FROM permissions WHERE module = $1 AND model = $2 AND action = $3",
            )
            .bind(perm.module)
            .bind(perm.model)
            .bind(perm.action.as_str())
            .fetch_one(pool)
            .await
            .unwrap();
            ids.push(id);
        }

        let mut conn = pool.acquire().await.unwrap();
        GroupRepository::set_permissions(&mut conn, group_id, &ids)
            .await
            .unwrap();
        group_id
    }

    /// Active user without a group
    pub async fn user(pool: &SqlitePool, username: &str) -> i64 {
        Self::create_user(pool, username, None, false).await
    }

    pub async fn user_in_group(pool: &SqlitePool, username: &str, group_id: i64) -> i64 {
        Self::create_user(pool, username, Some(group_id), false).await
    }

    /// Staff user, already authenticated
    pub async fn staff(pool: &SqlitePool) -> AuthUser {
        let id = Self::create_user(pool, "staff", None, true).await;
        let account = UserRepository::get_account(pool, id).await.unwrap().unwrap();
        AuthUser {
            account,
            group: None,
            permissions: Default::default(),
        }
    }

    async fn create_user(
        pool: &SqlitePool,
        username: &str,
        group_id: Option<i64>,
        is_staff: bool,
    ) -> i64 {
        UserRepository::create(
            pool,
            CreateUserData {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: password::hash(FIXTURE_PASSWORD).await.unwrap(),
                is_staff,
                is_active: true,
                group_id,
                employee_id: None,
                department: None,
                manager: None,
            },
        )
        .await
        .unwrap()
    }
}
