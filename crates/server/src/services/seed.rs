//! Idempotent start-up data: permissions, the MASTER group, the super user
//! and the reference rows local employees need before the first ERP sync.

use sqlx::SqlitePool;

use crate::auth::password;
use crate::error::AppResult;
use crate::models::{Action, ReferenceTable, MASTER_GROUP, PERMISSION_CATALOGUE};
use crate::repositories::{
    CreateUserData, GroupRepository, PermissionRepository, ReferenceRepository, UserRepository,
};

pub const SUPER_USER: &str = "agile_admin";
const SUPER_USER_EMAIL: &str = "admin@email.com";

const INITIAL_REFERENCES: [(ReferenceTable, &str, &str); 3] = [
    (ReferenceTable::Nationality, "BR", "Brasil"),
    (ReferenceTable::MaritalStatus, "S", "Solteiro(a)"),
    (ReferenceTable::Gender, "M", "Masculino"),
];

/// Every (module, model, action) of the catalogue. Returns how many were new.
pub async fn permissions(pool: &SqlitePool) -> AppResult<usize> {
    let mut created = 0;
    for (module, models) in PERMISSION_CATALOGUE {
        for model in models.iter() {
            for action in Action::ALL {
                let description = format!("{} {}", action.label(), model);
                if PermissionRepository::insert_if_missing(
                    pool,
                    module,
                    model,
                    action.as_str(),
                    &description,
                )
                .await?
                {
                    created += 1;
                }
            }
        }
    }

    if created > 0 {
        tracing::info!("Created {} permissions", created);
    }
    Ok(created)
}

/// The MASTER group, holding every permission
pub async fn master_group(pool: &SqlitePool) -> AppResult<i64> {
    let group_id = match GroupRepository::get_by_name(pool, MASTER_GROUP).await? {
        Some(group) => group.id,
        None => {
            tracing::info!("Creating {} group", MASTER_GROUP);
            GroupRepository::create_with_executor(pool, MASTER_GROUP).await?
        }
    };

    let ids = PermissionRepository::list_ids(pool).await?;
    let mut conn = pool.acquire().await?;
    GroupRepository::add_permissions(&mut conn, group_id, &ids).await?;
    Ok(group_id)
}

/// Staff user `agile_admin` in the MASTER group
pub async fn super_user(pool: &SqlitePool, group_id: i64, plain_password: &str) -> AppResult<i64> {
    if let Some(mut account) = UserRepository::get_account_by_username(pool, SUPER_USER).await? {
        if account.group_id.is_none() {
            account.group_id = Some(group_id);
            UserRepository::update(pool, &account).await?;
        }
        return Ok(account.id);
    }

    let id = UserRepository::create(
        pool,
        CreateUserData {
            username: SUPER_USER.to_string(),
            email: SUPER_USER_EMAIL.to_string(),
            password_hash: password::hash(plain_password).await?,
            is_staff: true,
            is_active: true,
            group_id: Some(group_id),
            employee_id: None,
            department: None,
            manager: None,
        },
    )
    .await?;

    tracing::info!("Created super user '{}'", SUPER_USER);
    Ok(id)
}

pub async fn references(pool: &SqlitePool) -> AppResult<()> {
    for (table, code, description) in INITIAL_REFERENCES {
        ReferenceRepository::insert_if_missing(pool, table, code, description).await?;
    }
    Ok(())
}

/// Seed everything. Failures are logged; start-up goes on.
pub async fn run(pool: &SqlitePool, super_user_password: &str) {
    let result = async {
        permissions(pool).await?;
        let group_id = master_group(pool).await?;
        super_user(pool, group_id, super_user_password).await?;
        references(pool).await
    }
    .await;

    if let Err(e) = result {
        tracing::warn!("Could not seed initial data: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_pool;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let pool = test_pool().await;

        let created = permissions(&pool).await.unwrap();
        let models: usize = PERMISSION_CATALOGUE.iter().map(|(_, m)| m.len()).sum();
        assert_eq!(created, models * 4);
        assert_eq!(permissions(&pool).await.unwrap(), 0);

        run(&pool, "agile_admin").await;
        run(&pool, "agile_admin").await;

        let account = UserRepository::get_account_by_username(&pool, SUPER_USER)
            .await
            .unwrap()
            .unwrap();
        assert!(account.is_staff);
        assert!(password::verify("agile_admin", &account.password).await);

        let master = GroupRepository::get_by_name(&pool, MASTER_GROUP)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.group_id, Some(master.id));
        let granted = PermissionRepository::codes_for_group(&pool, master.id)
            .await
            .unwrap();
        assert_eq!(granted.len(), models * 4);
        assert!(granted.contains(&"asset_asset_view".to_string()));

        let brasil = ReferenceRepository::find_by_code(&pool, ReferenceTable::Nationality, "BR")
            .await
            .unwrap();
        assert!(brasil.is_some());
    }
}
