use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::asset::AssetShort;
use super::common::CatalogItem;
use super::people::EmployeeShort;

/// Maintenance status id while the repair is under way
pub const IN_PROGRESS_STATUS: i64 = 1;
/// Maintenance status id every new maintenance starts in
pub const PENDING_STATUS: i64 = 2;
/// Maintenance status id that closes a maintenance or upgrade
pub const FINISHED_STATUS: i64 = 3;

/// Severity of a maintenance, used for asset alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Criticality {
    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    pub id: i64,
    pub action: CatalogItem,
    pub status: CatalogItem,
    pub asset: AssetShort,
    pub employee: EmployeeShort,
    pub criticality: Option<Criticality>,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub glpi_number: Option<String>,
    pub open_date_glpi: Option<NaiveDate>,
    pub open_date_supplier: Option<NaiveDate>,
    pub supplier_number: Option<String>,
    pub supplier_service_order: Option<String>,
    pub incident_description: Option<String>,
    pub resolution: Option<String>,
    pub value: f64,
    pub has_assurance: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New maintenance. It always opens today as Pendente, with a generated
/// supplier service order.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMaintenance {
    pub action_id: i64,
    pub asset_id: i64,
    pub employee_id: i64,
    pub criticality: Option<Criticality>,
    pub glpi_number: Option<String>,
    pub open_date_glpi: Option<NaiveDate>,
    pub open_date_supplier: Option<NaiveDate>,
    pub supplier_number: Option<String>,
    pub incident_description: Option<String>,
    pub resolution: Option<String>,
    pub value: Option<f64>,
    #[serde(default)]
    pub has_assurance: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaintenance {
    pub criticality: Option<Criticality>,
    /// Finish the maintenance today
    #[serde(default)]
    pub close: bool,
    /// Move the maintenance to Em progresso
    #[serde(default)]
    pub in_progress: bool,
    pub glpi_number: Option<String>,
    pub open_date_glpi: Option<NaiveDate>,
    pub open_date_supplier: Option<NaiveDate>,
    pub supplier_number: Option<String>,
    pub incident_description: Option<String>,
    pub resolution: Option<String>,
    pub value: Option<f64>,
    pub has_assurance: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    pub id: i64,
    pub status: CatalogItem,
    pub asset: AssetShort,
    pub employee: EmployeeShort,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub detailing: Option<String>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUpgrade {
    pub status_id: i64,
    pub asset_id: i64,
    pub employee_id: i64,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub detailing: Option<String>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUpgrade {
    pub status_id: Option<i64>,
    pub asset_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub detailing: Option<String>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub observations: Option<String>,
}

/// Filters shared by maintenances and upgrades
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MaintenanceFilter {
    /// Matches asset code, asset description or employee name
    pub search: Option<String>,
    /// Asset id
    pub asset: Option<i64>,
    /// Maintenance status id
    pub status: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criticality_ids() {
        assert_eq!(Criticality::from_id(3), Some(Criticality::High));
        assert_eq!(Criticality::Low.id(), 1);
        assert!(Criticality::from_id(0).is_none());

        let parsed: Criticality = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Criticality::Medium);
    }

    #[test]
    fn test_update_flags_default_off() {
        let update: UpdateMaintenance =
            serde_json::from_str(r#"{"resolution": "troca de tela"}"#).unwrap();
        assert!(!update.close);
        assert!(!update.in_progress);

        let update: UpdateMaintenance =
            serde_json::from_str(r#"{"close": true, "hasAssurance": true}"#).unwrap();
        assert!(update.close);
        assert_eq!(update.has_assurance, Some(true));
    }
}
