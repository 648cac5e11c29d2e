use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::asset::AssetShort;
use super::common::CatalogItem;
use super::people::{CostCenter, EmployeeShort};

/// Fixed lending status ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LendingStatusId {
    PendingFile = 1,
    Active = 2,
    PendingRevokeFile = 3,
    Inactive = 4,
}

impl LendingStatusId {
    pub fn id(self) -> i64 {
        self as i64
    }
}

/// Business unit a lending is billed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum BusinessUnit {
    Ads,
    Csa,
    Bps,
    Corp,
}

impl BusinessUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessUnit::Ads => "ADS",
            BusinessUnit::Csa => "CSA",
            BusinessUnit::Bps => "BPS",
            BusinessUnit::Corp => "CORP",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Witness {
    pub id: i64,
    pub employee: EmployeeShort,
    pub lending_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewWitness {
    pub employee_id: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct WitnessFilter {
    /// Lending id
    pub lending: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lending {
    pub id: i64,
    pub employee: EmployeeShort,
    pub asset: AssetShort,
    pub workload: Option<CatalogItem>,
    pub status: CatalogItem,
    pub cost_center: CostCenter,
    pub witnesses: Vec<Witness>,
    /// Current contract document
    pub document: Option<i64>,
    /// Current termination document
    pub document_revoke: Option<i64>,
    pub bu: Option<String>,
    pub number: Option<String>,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub observations: Option<String>,
    pub signed_date: Option<NaiveDate>,
    pub revoke_signed_date: Option<NaiveDate>,
    pub glpi_number: Option<String>,
    pub ms_office: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLending {
    pub employee_id: i64,
    pub asset_id: i64,
    pub workload_id: i64,
    pub cost_center_id: i64,
    /// Witness ids
    #[serde(default)]
    pub witnesses: Vec<i64>,
    pub bu: Option<BusinessUnit>,
    pub number: Option<String>,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub observations: Option<String>,
    pub glpi_number: Option<String>,
    #[serde(default)]
    pub ms_office: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLending {
    pub workload_id: Option<i64>,
    pub status_id: Option<i64>,
    pub cost_center_id: Option<i64>,
    pub witnesses: Option<Vec<i64>>,
    pub bu: Option<BusinessUnit>,
    pub number: Option<String>,
    pub manager: Option<String>,
    pub business_executive: Option<String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub observations: Option<String>,
    pub signed_date: Option<NaiveDate>,
    pub revoke_signed_date: Option<NaiveDate>,
    pub glpi_number: Option<String>,
    pub ms_office: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LendingFilter {
    /// Matches employee name, asset code or description, number or GLPI number
    pub search: Option<String>,
    /// Employee id
    pub employee: Option<i64>,
    /// Asset id
    pub asset: Option<i64>,
    /// Lending status id
    pub status: Option<i64>,
    pub bu: Option<BusinessUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_unit_serde() {
        let bu: BusinessUnit = serde_json::from_str("\"CORP\"").unwrap();
        assert_eq!(bu, BusinessUnit::Corp);
        assert_eq!(serde_json::to_string(&BusinessUnit::Ads).unwrap(), "\"ADS\"");
        assert!(serde_json::from_str::<BusinessUnit>("\"XYZ\"").is_err());
    }

    #[test]
    fn test_new_lending_defaults() {
        let lending: NewLending = serde_json::from_str(
            r#"{"employeeId": 1, "assetId": 2, "workloadId": 1, "costCenterId": 4}"#,
        )
        .unwrap();
        assert!(lending.witnesses.is_empty());
        assert!(!lending.ms_office);
        assert!(lending.bu.is_none());
    }
}
