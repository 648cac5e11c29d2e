//! Normalised ERP records.
//!
//! Every record serialises with sorted keys (serde_json maps are ordered),
//! so its JSON form is stable and can be hashed for change detection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Cost center (`GCCUSTO`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenterRecord {
    pub code: String,
    pub name: String,
    pub classification: Option<String>,
}

/// Asset group (`IGRUPOPATRIMONIO`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetGroupRecord {
    pub code: String,
    pub group_code: Option<String>,
    pub name: String,
}

/// Code/description pair shared by marital statuses, genders,
/// nationalities and educational levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeDescriptionRecord {
    pub code: String,
    pub description: String,
}

/// Job role (`PFUNCAO`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub code: String,
    pub name: String,
}

/// Fixed asset (`IPATRIMONIO` and its complements)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub code: String,
    /// Asset group description
    pub group: Option<String>,
    pub cost_center: Option<String>,
    pub register_number: Option<String>,
    pub description: String,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub assurance_date: Option<NaiveDate>,
    pub acquisition_date: Option<NaiveDate>,
    pub observations: Option<String>,
    pub pattern: Option<String>,
    pub operational_system: Option<String>,
    pub serial_number: Option<String>,
    pub imei: Option<String>,
    pub value: Option<f64>,
    pub depreciation: Option<f64>,
    pub ms_office: bool,
    pub active: bool,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub line_number: Option<String>,
    pub operator: Option<String>,
    pub accessories: Option<String>,
}

/// Person and employment data (`PPESSOA` joined with `PFUNC`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub code: String,
    pub full_name: String,
    pub birthday: Option<NaiveDate>,
    pub taxpayer_identification: String,
    pub national_identification: Option<String>,
    pub marital_status: Option<String>,
    pub nationality: Option<String>,
    pub gender: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub address: String,
    pub cell_phone: Option<String>,
    pub email: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub registration: Option<String>,
    pub educational_level: Option<String>,
}
