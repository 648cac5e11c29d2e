use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::asset::AssetShort;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub number: String,
    pub file_name: Option<String>,
    pub path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assets: Vec<AssetShort>,
}

/// Uploaded invoice document
#[derive(Debug, Clone)]
pub struct InvoiceFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Invoice creation request, assembled from a multipart form
#[derive(Debug, Clone, Default)]
pub struct NewInvoice {
    pub number: String,
    pub assets: Vec<i64>,
    pub file: Option<InvoiceFile>,
}

/// Multipart form accepted by invoice creation
#[derive(ToSchema)]
pub struct InvoiceForm {
    pub number: String,
    /// Comma separated asset ids
    pub assets: Option<String>,
    #[schema(format = Binary)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateInvoice {
    pub number: Option<String>,
    /// Replaces the linked assets when given
    pub assets: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct InvoiceFilter {
    /// Matches the invoice number
    pub search: Option<String>,
}
