use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// ERP entity kinds, in synchronisation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    AssetGroup,
    MaritalStatus,
    Gender,
    Nationality,
    CostCenter,
    Role,
    EducationalLevel,
    Asset,
    Employee,
}

impl SyncKind {
    pub const ORDER: [SyncKind; 9] = [
        SyncKind::AssetGroup,
        SyncKind::MaritalStatus,
        SyncKind::Gender,
        SyncKind::Nationality,
        SyncKind::CostCenter,
        SyncKind::Role,
        SyncKind::EducationalLevel,
        SyncKind::Asset,
        SyncKind::Employee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::AssetGroup => "asset_group",
            SyncKind::MaritalStatus => "marital_status",
            SyncKind::Gender => "gender",
            SyncKind::Nationality => "nationality",
            SyncKind::CostCenter => "cost_center",
            SyncKind::Role => "role",
            SyncKind::EducationalLevel => "educational_level",
            SyncKind::Asset => "asset",
            SyncKind::Employee => "employee",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one entity kind in a sync run
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub id: i64,
    pub model: String,
    pub count_new_values: i64,
    /// Seconds
    pub execution_time: f64,
    pub updated_at: DateTime<Utc>,
}
