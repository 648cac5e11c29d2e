use async_trait::async_trait;

use crate::models::{
    AssetGroupRecord, AssetRecord, CodeDescriptionRecord, CostCenterRecord, EmployeeRecord,
    RoleRecord,
};
use crate::Result;

/// Read access to the ERP tables the sync service mirrors.
///
/// Rows that cannot be converted (no code) are dropped by implementations.
#[async_trait]
pub trait TotvsSource: Send + Sync {
    /// Server version string, used by the connectivity check.
    async fn version(&self) -> Result<String>;

    async fn asset_groups(&self) -> Result<Vec<AssetGroupRecord>>;

    async fn marital_statuses(&self) -> Result<Vec<CodeDescriptionRecord>>;

    async fn genders(&self) -> Result<Vec<CodeDescriptionRecord>>;

    async fn nationalities(&self) -> Result<Vec<CodeDescriptionRecord>>;

    async fn cost_centers(&self) -> Result<Vec<CostCenterRecord>>;

    async fn roles(&self) -> Result<Vec<RoleRecord>>;

    async fn educational_levels(&self) -> Result<Vec<CodeDescriptionRecord>>;

    async fn assets(&self) -> Result<Vec<AssetRecord>>;

    async fn employees(&self) -> Result<Vec<EmployeeRecord>>;
}
