use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::CatalogItem;

/// A checklist question for one asset type
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub id: i64,
    pub question: String,
    pub step: String,
    pub category: Option<String>,
    /// Asset type name
    pub asset_type: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVerification {
    pub question: String,
    pub step: String,
    /// Created when no category has this name yet
    pub category: String,
    pub asset_type_id: i64,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationAnswer {
    pub id: i64,
    pub lending_id: i64,
    pub verification: Verification,
    /// Delivery or return
    #[serde(rename = "type")]
    pub answer_type: CatalogItem,
    pub answer: String,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAnswer {
    pub verification_id: i64,
    pub answer: String,
    pub observations: Option<String>,
}

/// Answers to a lending checklist, all of one type
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVerificationAnswers {
    pub lending_id: i64,
    pub type_id: i64,
    pub answered: Vec<NewAnswer>,
}
