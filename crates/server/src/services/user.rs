use std::sync::{Arc, LazyLock};

use regex::Regex;
use sqlx::SqlitePool;

use super::AuditService;
use crate::auth::{password, AuthUser};
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    like_pattern, ChangePassword, CreatedUser, Group, GroupFilter, GroupSummary, MessageResponse,
    NewGroup, NewPasswordResponse, NewUser, Operation, Page, PageParams, Permission,
    PermissionFilter, UpdateGroup, UpdateUser, User, UserFilter,
};
use crate::repositories::{
    CreateUserData, EmployeeRepository, GroupRepository, PermissionRepository, UserRepository,
};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email pattern")
});

fn valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

/// Users, groups and the permission catalogue
pub struct UserService {
    db: SqlitePool,
    audit: Arc<AuditService>,
}

impl UserService {
    pub fn new(db: SqlitePool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    pub async fn create_user(&self, actor: &AuthUser, data: NewUser) -> AppResult<CreatedUser> {
        let mut errors = Vec::new();

        if let Some(group_id) = data.group_id {
            if GroupRepository::get_by_id(&self.db, group_id).await?.is_none() {
                errors.push(FieldError::new("groupId", "Grupo não encontrado"));
            }
        }
        if let Some(employee_id) = data.employee_id {
            if !EmployeeRepository::exists(&self.db, employee_id).await? {
                errors.push(FieldError::new("employeeId", "Colaborador não encontrado"));
            } else if UserRepository::employee_linked(&self.db, employee_id, None).await? {
                errors.push(FieldError::new(
                    "employeeId",
                    "Colaborador já vinculado a outro usuário",
                ));
            }
        }
        if UserRepository::username_taken(&self.db, &data.username, None).await? {
            errors.push(FieldError::new("username", "Nome de usuário já existe"));
        }
        if !valid_email(&data.email) {
            errors.push(FieldError::new("email", "Email inválido"));
        } else if UserRepository::email_taken(&self.db, &data.email, None).await? {
            errors.push(FieldError::new("email", "Email já existe"));
        }
        AppError::check(errors)?;

        let plain = data
            .password
            .filter(|p| !p.is_empty())
            .unwrap_or_else(password::generate);

        let id = UserRepository::create(
            &self.db,
            CreateUserData {
                username: data.username,
                email: data.email,
                password_hash: password::hash(&plain).await?,
                is_staff: data.is_staff,
                is_active: data.is_active,
                group_id: data.group_id,
                employee_id: data.employee_id,
                department: data.department,
                manager: data.manager,
            },
        )
        .await?;

        self.audit
            .record(Some(actor.id()), "auth", "user", Operation::Create, Some(id))
            .await;
        tracing::info!("Created user {}", id);

        Ok(CreatedUser {
            user: self.get_user(id).await?,
            password: plain,
        })
    }

    pub async fn update_user(&self, actor: &AuthUser, id: i64, data: UpdateUser) -> AppResult<User> {
        let mut account = UserRepository::get_account(&self.db, id)
            .await?
            .ok_or_else(user_not_found)?;

        let mut errors = Vec::new();
        if let Some(username) = data.username.filter(|u| *u != account.username) {
            if UserRepository::username_taken(&self.db, &username, Some(id)).await? {
                errors.push(FieldError::new("username", "Nome de usuário já existe"));
            }
            account.username = username;
        }
        if let Some(email) = data.email.filter(|e| *e != account.email) {
            if !valid_email(&email) {
                errors.push(FieldError::new("email", "Email inválido"));
            } else if UserRepository::email_taken(&self.db, &email, Some(id)).await? {
                errors.push(FieldError::new("email", "Email já existe"));
            }
            account.email = email;
        }
        if let Some(group_id) = data.group_id.filter(|g| Some(*g) != account.group_id) {
            if GroupRepository::get_by_id(&self.db, group_id).await?.is_none() {
                errors.push(FieldError::new("groupId", "Grupo não encontrado"));
            }
            account.group_id = Some(group_id);
        }
        if let Some(employee_id) = data.employee_id.filter(|e| Some(*e) != account.employee_id) {
            if !EmployeeRepository::exists(&self.db, employee_id).await? {
                errors.push(FieldError::new("employeeId", "Colaborador não encontrado"));
            } else if UserRepository::employee_linked(&self.db, employee_id, Some(id)).await? {
                errors.push(FieldError::new(
                    "employeeId",
                    "Colaborador já vinculado a outro usuário",
                ));
            }
            account.employee_id = Some(employee_id);
        }
        AppError::check(errors)?;

        if let Some(is_staff) = data.is_staff {
            account.is_staff = is_staff;
        }
        if let Some(is_active) = data.is_active {
            account.is_active = is_active;
        }
        if data.department.is_some() {
            account.department = data.department;
        }
        if data.manager.is_some() {
            account.manager = data.manager;
        }

        UserRepository::update(&self.db, &account).await?;
        self.audit
            .record(Some(actor.id()), "auth", "user", Operation::Update, Some(id))
            .await;

        self.get_user(id).await
    }

    pub async fn get_user(&self, id: i64) -> AppResult<User> {
        UserRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(user_not_found)
    }

    pub async fn list_users(&self, filter: &UserFilter, page: PageParams) -> AppResult<Page<User>> {
        page.validate()?;
        let (items, total) = UserRepository::list(&self.db, filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn change_password(
        &self,
        user: &AuthUser,
        data: ChangePassword,
    ) -> AppResult<MessageResponse> {
        if !password::verify(&data.current_password, &user.account.password).await {
            return Err(AppError::field("password", "Senha atual inválida"));
        }
        if data.new_password.is_empty() {
            return Err(AppError::field("newPassword", "Senha não pode ser vazia"));
        }

        UserRepository::set_password(&self.db, user.id(), &password::hash(&data.new_password).await?)
            .await?;
        self.audit
            .record(Some(user.id()), "auth", "user", Operation::Update, Some(user.id()))
            .await;

        Ok(MessageResponse::new("Senha alterada com sucesso."))
    }

    /// Replace a user's password with a generated one and return it once.
    pub async fn new_password(&self, actor: &AuthUser, user_id: i64) -> AppResult<NewPasswordResponse> {
        if UserRepository::get_account(&self.db, user_id).await?.is_none() {
            return Err(user_not_found());
        }

        let plain = password::generate();
        UserRepository::set_password(&self.db, user_id, &password::hash(&plain).await?).await?;
        self.audit
            .record(Some(actor.id()), "auth", "user", Operation::Update, Some(user_id))
            .await;
        tracing::info!("Generated a new password for user {}", user_id);

        Ok(NewPasswordResponse {
            user_id,
            password: plain,
        })
    }

    // Groups

    pub async fn create_group(&self, actor: &AuthUser, data: NewGroup) -> AppResult<Group> {
        let mut errors = Vec::new();
        if data.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Nome é obrigatório"));
        } else if GroupRepository::get_by_name(&self.db, &data.name).await?.is_some() {
            errors.push(FieldError::new("name", "Grupo já existe"));
        }
        errors.extend(self.check_permissions(&data.permissions).await?);
        AppError::check(errors)?;

        let mut tx = self.db.begin().await?;
        let id = GroupRepository::create_with_executor(&mut *tx, &data.name).await?;
        GroupRepository::set_permissions(&mut tx, id, &data.permissions).await?;
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), "auth", "group", Operation::Create, Some(id))
            .await;
        self.get_group(id).await
    }

    pub async fn update_group(&self, actor: &AuthUser, id: i64, data: UpdateGroup) -> AppResult<Group> {
        let group = GroupRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(group_not_found)?;

        let mut errors = Vec::new();
        if let Some(name) = data.name.as_ref().filter(|n| **n != group.name) {
            if GroupRepository::get_by_name(&self.db, name).await?.is_some() {
                errors.push(FieldError::new("name", "Grupo já existe"));
            }
        }
        if let Some(permissions) = &data.permissions {
            errors.extend(self.check_permissions(permissions).await?);
        }
        AppError::check(errors)?;

        let mut tx = self.db.begin().await?;
        if let Some(name) = &data.name {
            GroupRepository::rename_with_executor(&mut *tx, id, name).await?;
        }
        if let Some(permissions) = &data.permissions {
            GroupRepository::set_permissions(&mut tx, id, permissions).await?;
        }
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), "auth", "group", Operation::Update, Some(id))
            .await;
        self.get_group(id).await
    }

    pub async fn get_group(&self, id: i64) -> AppResult<Group> {
        let group = GroupRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(group_not_found)?;
        self.with_permissions(group).await
    }

    pub async fn list_groups(&self, filter: &GroupFilter, page: PageParams) -> AppResult<Page<Group>> {
        page.validate()?;
        let search = like_pattern(filter.search.as_deref());
        let (groups, total) = GroupRepository::list(&self.db, search.as_deref(), page).await?;

        let mut items = Vec::with_capacity(groups.len());
        for group in groups {
            items.push(self.with_permissions(group).await?);
        }
        Ok(Page::new(items, total, page))
    }

    pub async fn list_permissions(&self, filter: &PermissionFilter) -> AppResult<Vec<Permission>> {
        Ok(PermissionRepository::list(&self.db, filter.module.as_deref()).await?)
    }

    async fn with_permissions(&self, group: GroupSummary) -> AppResult<Group> {
        let permissions = PermissionRepository::for_group(&self.db, group.id).await?;
        Ok(Group {
            id: group.id,
            name: group.name,
            permissions,
        })
    }

    async fn check_permissions(&self, ids: &[i64]) -> AppResult<Vec<FieldError>> {
        let mut errors = Vec::new();
        for id in ids {
            if PermissionRepository::get_by_id(&self.db, *id).await?.is_none() {
                errors.push(FieldError::new(
                    "permissions",
                    format!("Permissão {} não encontrada", id),
                ));
            }
        }
        Ok(errors)
    }
}

fn user_not_found() -> AppError {
    AppError::not_found("userId", "Usuário não encontrado")
}

fn group_not_found() -> AppError {
    AppError::not_found("groupId", "Grupo não encontrado")
}
