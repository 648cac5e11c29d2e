use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Audit trail operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Import,
    Dispose,
    Inactivate,
    Upload,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "Criação",
            Operation::Update => "Atualização",
            Operation::Delete => "Remoção",
            Operation::Import => "Importação",
            Operation::Dispose => "Descarte",
            Operation::Inactivate => "Inativação",
            Operation::Upload => "Upload de arquivo",
        }
    }
}

/// User that performed a logged operation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub id: i64,
    pub module: String,
    pub model: String,
    pub operation: String,
    pub identifier: Option<i64>,
    pub logged_in: DateTime<Utc>,
    pub user: Option<LogUser>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LogFilter {
    /// Matches operation, module, model, username, email or employee name
    pub search: Option<String>,
}
