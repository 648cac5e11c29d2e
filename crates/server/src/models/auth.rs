use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::people::EmployeeShort;

/// Group whose members bypass permission checks
pub const MASTER_GROUP: &str = "MASTER";

/// Permission action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Edit,
    Add,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Edit, Action::Add, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Add => "add",
            Action::Delete => "delete",
        }
    }

    /// Verb used in permission descriptions
    pub fn label(&self) -> &'static str {
        match self {
            Action::View => "Visualizar",
            Action::Edit => "Editar",
            Action::Add => "Adicionar",
            Action::Delete => "Deletar",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Action::View),
            "edit" => Ok(Action::Edit),
            "add" => Ok(Action::Add),
            "delete" => Ok(Action::Delete),
            _ => Err(format!("Invalid action: {}", s)),
        }
    }
}

/// Permission catalogue: module to the models it governs.
pub const PERMISSION_CATALOGUE: &[(&str, &[&str])] = &[
    (
        "asset",
        &[
            "asset",
            "asset_type",
            "asset_status",
            "maintenance",
            "upgrade",
            "verification",
        ],
    ),
    ("lending", &["lending", "workload", "witness", "document", "term"]),
    (
        "people",
        &[
            "employee",
            "nationality",
            "marital_status",
            "center_cost",
            "gender",
            "role",
            "educational_level",
        ],
    ),
    ("auth", &["permission", "group", "user"]),
    ("invoice", &["invoice"]),
    ("logs", &["log"]),
];

/// A permission requirement: (module, model, action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Perm {
    pub module: &'static str,
    pub model: &'static str,
    pub action: Action,
}

impl Perm {
    pub const fn new(module: &'static str, model: &'static str, action: Action) -> Self {
        Self {
            module,
            model,
            action,
        }
    }

    /// `module_model_action`, as returned by login.
    pub fn code(&self) -> String {
        permission_code(self.module, self.model, self.action.as_str())
    }
}

pub fn permission_code(module: &str, model: &str, action: &str) -> String {
    format!("{}_{}_{}", module, model, action)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Permission {
    pub id: i64,
    pub module: String,
    pub model: String,
    pub action: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PermissionFilter {
    pub module: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct GroupSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub permissions: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct GroupFilter {
    pub search: Option<String>,
}

/// User as exposed by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub department: Option<String>,
    pub manager: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub group: Option<GroupSummary>,
    pub employee: Option<EmployeeShort>,
}

/// Stored user row, including the password hash
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub employee_id: Option<i64>,
    pub group_id: Option<i64>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub department: Option<String>,
    pub manager: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Generated when omitted
    pub password: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub group_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub department: Option<String>,
    pub manager: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    pub group_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub department: Option<String>,
    pub manager: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    /// Matches username, email, department or manager
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    /// Only users without an employee
    #[serde(default)]
    pub employee_empty: bool,
    /// Only users linked to an employee
    #[serde(default)]
    pub employee_not_empty: bool,
}

/// Created user plus the password that was set, shown once.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: i64,
    pub group: Option<String>,
    pub email: String,
    pub full_name: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: DateTime<Utc>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPasswordRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPasswordResponse {
    pub user_id: i64,
    pub password: String,
}

/// Stored token pair of a user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub refresh_token: String,
    pub expires_in: DateTime<Utc>,
    pub refresh_expires_in: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip_through_str() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("remove".parse::<Action>().is_err());
    }

    #[test]
    fn test_perm_code() {
        let perm = Perm::new("asset", "asset_type", Action::View);
        assert_eq!(perm.code(), "asset_asset_type_view");
    }

    #[test]
    fn test_catalogue_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for (module, models) in PERMISSION_CATALOGUE {
            for model in *models {
                assert!(seen.insert((module, model)), "duplicate {module}.{model}");
            }
        }
    }
}
