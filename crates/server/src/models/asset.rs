use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::CatalogItem;
use super::people::{CostCenter, EmployeeShort};

/// Fixed asset status ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetStatusId {
    Available = 1,
    Lent = 2,
    StockSp = 3,
    StockBa = 4,
    Reserved = 5,
    Inactive = 6,
    Borrowed = 7,
    Discarded = 8,
}

impl AssetStatusId {
    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Available),
            2 => Some(Self::Lent),
            3 => Some(Self::StockSp),
            4 => Some(Self::StockBa),
            5 => Some(Self::Reserved),
            6 => Some(Self::Inactive),
            7 => Some(Self::Borrowed),
            8 => Some(Self::Discarded),
            _ => None,
        }
    }
}

/// Why an asset was written off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DisposalReason {
    #[serde(rename = "Devolução")]
    Return,
    #[serde(rename = "Doação")]
    Donation,
    #[serde(rename = "Permuta")]
    Exchange,
    #[serde(rename = "Sinistro")]
    Loss,
    #[serde(rename = "Transferência")]
    Transfer,
    #[serde(rename = "Recadastramento")]
    Reregistration,
    #[serde(rename = "Desmembramento")]
    Dismemberment,
    #[serde(rename = "Obsoleto")]
    Obsolete,
    #[serde(rename = "Em desuso")]
    Unused,
    #[serde(rename = "Imprestável")]
    Unserviceable,
    #[serde(rename = "Venda")]
    Sale,
}

impl DisposalReason {
    pub const ALL: [DisposalReason; 11] = [
        DisposalReason::Return,
        DisposalReason::Donation,
        DisposalReason::Exchange,
        DisposalReason::Loss,
        DisposalReason::Transfer,
        DisposalReason::Reregistration,
        DisposalReason::Dismemberment,
        DisposalReason::Obsolete,
        DisposalReason::Unused,
        DisposalReason::Unserviceable,
        DisposalReason::Sale,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DisposalReason::Return => "Devolução",
            DisposalReason::Donation => "Doação",
            DisposalReason::Exchange => "Permuta",
            DisposalReason::Loss => "Sinistro",
            DisposalReason::Transfer => "Transferência",
            DisposalReason::Reregistration => "Recadastramento",
            DisposalReason::Dismemberment => "Desmembramento",
            DisposalReason::Obsolete => "Obsoleto",
            DisposalReason::Unused => "Em desuso",
            DisposalReason::Unserviceable => "Imprestável",
            DisposalReason::Sale => "Venda",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AssetType {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub acronym: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: i64,
    pub code: Option<String>,
    pub register_number: Option<String>,
    pub description: Option<String>,
    pub supplier: Option<String>,
    pub assurance_date: Option<NaiveDate>,
    pub observations: Option<String>,
    pub pattern: Option<String>,
    pub brand: Option<String>,
    pub operational_system: Option<String>,
    pub serial_number: Option<String>,
    pub imei: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub depreciation: Option<f64>,
    pub ms_office: bool,
    pub line_number: Option<String>,
    pub operator: Option<String>,
    pub model: Option<String>,
    pub accessories: Option<String>,
    pub configuration: Option<String>,
    pub quantity: i64,
    pub unit: Option<String>,
    pub active: bool,
    pub by_agile: bool,
    #[serde(rename = "type")]
    pub asset_type: Option<AssetType>,
    pub status: Option<CatalogItem>,
    pub asset_group: Option<String>,
    pub invoice_number: Option<String>,
    /// Latest maintenance status, "-" when none is open
    pub maintenance_status: String,
    /// Latest upgrade status, "-" when none is open
    pub upgrade_status: String,
    pub alert: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Asset summary embedded in other resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetShort {
    pub id: i64,
    pub code: Option<String>,
    pub register_number: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub type_id: Option<i64>,
    pub status_id: Option<i64>,
    pub code: Option<String>,
    pub register_number: Option<String>,
    pub description: Option<String>,
    pub supplier: Option<String>,
    pub assurance_date: Option<NaiveDate>,
    pub observations: Option<String>,
    pub pattern: Option<String>,
    pub brand: Option<String>,
    pub operational_system: Option<String>,
    pub serial_number: Option<String>,
    pub imei: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub depreciation: Option<f64>,
    #[serde(default)]
    pub ms_office: bool,
    pub line_number: Option<String>,
    pub operator: Option<String>,
    pub model: Option<String>,
    pub accessories: Option<String>,
    pub configuration: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAsset {
    pub type_id: Option<i64>,
    pub status_id: Option<i64>,
    pub description: Option<String>,
    pub supplier: Option<String>,
    pub assurance_date: Option<NaiveDate>,
    pub observations: Option<String>,
    pub pattern: Option<String>,
    pub brand: Option<String>,
    pub operational_system: Option<String>,
    pub serial_number: Option<String>,
    pub imei: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub depreciation: Option<f64>,
    pub ms_office: Option<bool>,
    pub line_number: Option<String>,
    pub operator: Option<String>,
    pub model: Option<String>,
    pub accessories: Option<String>,
    pub configuration: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
}

impl UpdateAsset {
    /// Keep only the fields an ERP-owned asset may change.
    pub fn restrict_to_erp_fields(self) -> Self {
        Self {
            type_id: self.type_id,
            status_id: self.status_id,
            observations: self.observations,
            model: self.model,
            line_number: self.line_number,
            operator: self.operator,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InactivateAsset {
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DisposeAsset {
    pub reason: DisposalReason,
    pub justification: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetDisposal {
    pub id: i64,
    pub asset_id: i64,
    pub reason: String,
    pub justification: Option<String>,
    pub observations: Option<String>,
    pub disposal_date: DateTime<Utc>,
}

fn default_active() -> Option<bool> {
    Some(true)
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AssetFilter {
    /// Matches code, register number, description, serial number or IMEI
    pub search: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub register_number: Option<String>,
    pub supplier: Option<String>,
    /// Defaults to active assets only
    #[serde(default = "default_active")]
    pub active: Option<bool>,
    pub by_agile: Option<bool>,
    /// Asset type name
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    /// Asset status name
    pub status: Option<String>,
    pub acquisition_date_gte: Option<NaiveDate>,
    pub acquisition_date_lte: Option<NaiveDate>,
    /// Comma separated ids always included in the result
    pub ids: Option<String>,
}

impl Default for AssetFilter {
    fn default() -> Self {
        Self {
            search: None,
            code: None,
            description: None,
            register_number: None,
            supplier: None,
            active: default_active(),
            by_agile: None,
            asset_type: None,
            status: None,
            acquisition_date_gte: None,
            acquisition_date_lte: None,
            ids: None,
        }
    }
}

/// One past lending of an asset or employee
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LendingHistory {
    pub id: i64,
    pub asset: i64,
    pub employee: EmployeeShort,
    pub cost_center: CostCenter,
    pub number: Option<String>,
    pub glpi_number: Option<String>,
    pub observations: Option<String>,
    pub project: Option<String>,
    /// `DD/MM/YYYY`
    pub signed_date: Option<String>,
    /// `DD/MM/YYYY`
    pub revoke_signed_date: Option<String>,
    pub status: Option<String>,
    pub workload: String,
    pub witnesses: Vec<i64>,
}

/// Multipart form accepted by the bulk import
#[derive(ToSchema)]
pub struct ImportForm {
    /// CSV file with the export headers
    #[schema(format = Binary)]
    pub file: String,
}

/// Result of a bulk import
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Maintenance status label shown on an asset: the latest status unless
/// it is finished.
pub fn open_status_label(latest: Option<(i64, String)>) -> String {
    match latest {
        Some((status_id, name)) if status_id != super::maintenance::FINISHED_STATUS => name,
        _ => "-".to_string(),
    }
}

/// Alert derived from maintenance counts by criticality.
pub fn maintenance_alert(low: i64, medium: i64, high: i64) -> String {
    if high > 3 {
        "Muitas manutenções críticas.".to_string()
    } else if medium > 5 {
        "Muitas manutenções médias.".to_string()
    } else if low > 10 {
        "Muitas manutenções leves.".to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_id_round_trip() {
        for id in 1..=8 {
            assert_eq!(AssetStatusId::from_id(id).unwrap().id(), id);
        }
        assert!(AssetStatusId::from_id(9).is_none());
    }

    #[test]
    fn test_disposal_reason_serde() {
        let reason: DisposalReason = serde_json::from_str("\"Em desuso\"").unwrap();
        assert_eq!(reason, DisposalReason::Unused);
        assert_eq!(
            serde_json::to_string(&DisposalReason::Transfer).unwrap(),
            "\"Transferência\""
        );
        for reason in DisposalReason::ALL {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.label()));
        }
    }

    #[test]
    fn test_open_status_label() {
        assert_eq!(open_status_label(None), "-");
        assert_eq!(open_status_label(Some((3, "Finalizado".into()))), "-");
        assert_eq!(
            open_status_label(Some((1, "Em progresso".into()))),
            "Em progresso"
        );
    }

    #[test]
    fn test_maintenance_alert_thresholds() {
        assert_eq!(maintenance_alert(0, 0, 0), "");
        assert_eq!(maintenance_alert(0, 0, 3), "");
        assert_eq!(maintenance_alert(0, 0, 4), "Muitas manutenções críticas.");
        assert_eq!(maintenance_alert(0, 6, 0), "Muitas manutenções médias.");
        assert_eq!(maintenance_alert(11, 0, 0), "Muitas manutenções leves.");
        assert_eq!(maintenance_alert(11, 6, 4), "Muitas manutenções críticas.");
    }

    #[test]
    fn test_restrict_to_erp_fields() {
        let update = UpdateAsset {
            description: Some("new".into()),
            observations: Some("obs".into()),
            status_id: Some(3),
            ..Default::default()
        }
        .restrict_to_erp_fields();

        assert!(update.description.is_none());
        assert_eq!(update.observations.as_deref(), Some("obs"));
        assert_eq!(update.status_id, Some(3));
    }
}
