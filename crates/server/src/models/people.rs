use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Code/description reference (nationality, marital status, gender,
/// educational level)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Reference {
    pub id: i64,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CostCenter {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub classification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Role {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// Code/description reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTable {
    Nationality,
    MaritalStatus,
    Gender,
    EducationalLevel,
}

impl ReferenceTable {
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceTable::Nationality => "nationalities",
            ReferenceTable::MaritalStatus => "marital_statuses",
            ReferenceTable::Gender => "genders",
            ReferenceTable::EducationalLevel => "educational_levels",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub code: String,
    pub full_name: String,
    pub taxpayer_identification: String,
    pub national_identification: Option<String>,
    pub job_position: Option<String>,
    pub status: String,
    pub address: Option<String>,
    pub cell_phone: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub manager: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub registration: Option<String>,
    pub legal_person: bool,
    pub employer_name: Option<String>,
    pub employer_address: Option<String>,
    pub employer_number: Option<String>,
    pub employer_contract_object: Option<String>,
    pub employer_contract_date: Option<NaiveDate>,
    pub employer_end_contract_date: Option<NaiveDate>,
    pub role: Option<Role>,
    pub nationality: Option<Reference>,
    pub marital_status: Option<Reference>,
    pub gender: Option<Reference>,
    pub educational_level: Option<Reference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Employee summary embedded in other resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeShort {
    pub id: i64,
    pub code: String,
    pub full_name: String,
    pub registration: Option<String>,
}

/// Employee option for pickers
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSelect {
    pub id: i64,
    pub code: String,
    pub full_name: String,
    pub taxpayer_identification: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub code: String,
    pub full_name: String,
    pub taxpayer_identification: String,
    pub national_identification: Option<String>,
    pub job_position: Option<String>,
    pub address: Option<String>,
    pub cell_phone: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub manager: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub role_id: Option<i64>,
    pub nationality_id: Option<i64>,
    pub marital_status_id: Option<i64>,
    pub gender_id: Option<i64>,
    pub educational_level_id: Option<i64>,
    pub employer_name: Option<String>,
    pub employer_address: Option<String>,
    pub employer_number: Option<String>,
    pub employer_contract_object: Option<String>,
    pub employer_contract_date: Option<NaiveDate>,
    pub employer_end_contract_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    pub full_name: Option<String>,
    pub national_identification: Option<String>,
    pub job_position: Option<String>,
    pub status: Option<String>,
    pub address: Option<String>,
    pub cell_phone: Option<String>,
    pub email: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub manager: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub role_id: Option<i64>,
    pub nationality_id: Option<i64>,
    pub marital_status_id: Option<i64>,
    pub gender_id: Option<i64>,
    pub educational_level_id: Option<i64>,
    pub employer_name: Option<String>,
    pub employer_address: Option<String>,
    pub employer_number: Option<String>,
    pub employer_contract_object: Option<String>,
    pub employer_contract_date: Option<NaiveDate>,
    pub employer_end_contract_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFilter {
    /// Matches code, name, taxpayer id, email or registration
    pub search: Option<String>,
    pub code: Option<String>,
    pub full_name: Option<String>,
    pub taxpayer_identification: Option<String>,
    pub status: Option<String>,
    pub legal_person: Option<bool>,
    pub birthday_gte: Option<NaiveDate>,
    pub birthday_lte: Option<NaiveDate>,
    pub admission_date_gte: Option<NaiveDate>,
    pub admission_date_lte: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EmployeeSelectParams {
    /// Comma separated ids to restrict the list to
    pub ids: Option<String>,
    pub search: Option<String>,
}

/// Parse a comma separated id list, ignoring invalid entries.
pub fn parse_ids(ids: Option<&str>) -> Vec<i64> {
    ids.unwrap_or_default()
        .split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_ids(Some("1, 2,x,3")), vec![1, 2, 3]);
        assert!(parse_ids(Some("")).is_empty());
        assert!(parse_ids(None).is_empty());
    }
}
