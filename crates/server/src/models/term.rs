use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::CatalogItem;
use super::people::{CostCenter, EmployeeShort};

/// Fixed term status ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermStatusId {
    PendingFile = 1,
    Active = 2,
    PendingRevokeFile = 3,
    Revoked = 4,
}

impl TermStatusId {
    pub fn id(self) -> i64 {
        self as i64
    }
}

/// Fixed term item type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermItemTypeId {
    ToolKit = 1,
    Uniform = 2,
    Chip = 3,
}

impl TermItemTypeId {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(TermItemTypeId::ToolKit),
            2 => Some(TermItemTypeId::Uniform),
            3 => Some(TermItemTypeId::Chip),
            _ => None,
        }
    }
}

/// Uniform sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ItemSize {
    PP,
    P,
    M,
    G,
    GG,
    XG,
    XGG,
}

impl ItemSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSize::PP => "PP",
            ItemSize::P => "P",
            ItemSize::M => "M",
            ItemSize::G => "G",
            ItemSize::GG => "GG",
            ItemSize::XG => "XG",
            ItemSize::XGG => "XGG",
        }
    }
}

/// What the employee signed for
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TermItem {
    pub description: Option<String>,
    pub size: Option<String>,
    pub quantity: Option<i64>,
    pub value: Option<f64>,
    pub line_number: Option<String>,
    pub operator: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub id: i64,
    pub employee: EmployeeShort,
    /// Item type
    #[serde(rename = "type")]
    pub item_type: CatalogItem,
    pub status: Option<CatalogItem>,
    pub workload: Option<CatalogItem>,
    pub cost_center: CostCenter,
    pub document: Option<i64>,
    pub document_revoke: Option<i64>,
    pub number: Option<String>,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub observations: Option<String>,
    pub signed_date: Option<NaiveDate>,
    pub revoke_signed_date: Option<NaiveDate>,
    pub glpi_number: Option<String>,
    pub item: TermItem,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTerm {
    pub employee_id: i64,
    /// Term item type id
    pub type_id: i64,
    pub workload_id: Option<i64>,
    pub cost_center_id: i64,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub observations: Option<String>,
    pub glpi_number: Option<String>,
    /// Tool kit contents, uniform or chip description
    pub description: Option<String>,
    pub size: Option<ItemSize>,
    pub quantity: Option<i64>,
    pub value: Option<f64>,
    pub line_number: Option<String>,
    pub operator: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTerm {
    pub observations: Option<String>,
    pub glpi_number: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TermFilter {
    /// Matches employee name, number or item description
    pub search: Option<String>,
    /// Employee id
    pub employee: Option<i64>,
    /// Term status id
    pub status: Option<i64>,
    /// Term item type id
    #[serde(rename = "type")]
    pub item_type: Option<i64>,
}
