use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Fixed document type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentTypeId {
    Contract = 1,
    Term = 2,
    RevokeContract = 3,
    RevokeTerm = 4,
    Verification = 5,
}

impl DocumentTypeId {
    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            DocumentTypeId::Contract => "Contrato de Comodato",
            DocumentTypeId::Term => "Termo de Responsabilidade",
            DocumentTypeId::RevokeContract => "Distrato de Comodato",
            DocumentTypeId::RevokeTerm => "Distrato de Termo de Responsabilidade",
            DocumentTypeId::Verification => "Verificação",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    /// Document type name
    #[serde(rename = "type")]
    pub doc_type: String,
    pub path: Option<String>,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// Generate the lending contract
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewContractDocument {
    pub lending_id: i64,
    /// Contractor (PJ) template, with the employer block
    #[serde(default)]
    pub legal_person: bool,
}

/// Generate the contract termination. The two witnesses are employee ids.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewRevokeContractDocument {
    pub lending_id: i64,
    #[serde(default)]
    pub legal_person: bool,
    #[serde(default)]
    pub witnesses_id: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTermDocument {
    pub term_id: i64,
}

/// Signed scan uploaded for a lending or a term
#[derive(Debug, Clone)]
pub struct SignedUpload {
    /// Lending id for contracts, term id for terms
    pub owner_id: i64,
    pub bytes: Vec<u8>,
}

/// Multipart form accepted by the contract upload routes
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct ContractUploadForm {
    pub lending_id: i64,
    #[schema(format = Binary)]
    pub file: String,
}

/// Multipart form accepted by the term upload routes
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct TermUploadForm {
    pub term_id: i64,
    #[schema(format = Binary)]
    pub file: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    /// Exact document type name
    pub doc_type: Option<String>,
}

/// Code printed on a generated document: the prefix followed by the
/// sequence, zero-filled to `6 - digits` characters.
pub fn document_code(prefix: &str, sequence: i64) -> String {
    let digits = sequence.to_string();
    let width = 6usize.saturating_sub(digits.len());
    format!("{}{:0>width$}", prefix, digits, width = width)
}
