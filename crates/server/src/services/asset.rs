use std::sync::Arc;

use sqlx::SqlitePool;

use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    padded_sequence, Asset, AssetDisposal, AssetFilter, AssetStatusId, AssetType, CatalogItem,
    DisposalReason, DisposeAsset, InactivateAsset, LendingHistory, NewAsset, Operation, Page,
    PageParams, UpdateAsset,
};
use crate::repositories::{AssetData, AssetRepository, Catalog, LendingRepository, ReferenceRepository};

const MODULE: &str = "asset";
const MODEL: &str = "asset";

/// Asset register: local creation, edits, disposal and status repair
pub struct AssetService {
    db: SqlitePool,
    audit: Arc<AuditService>,
}

impl AssetService {
    pub fn new(db: SqlitePool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    pub async fn create_asset(&self, actor: &AuthUser, data: NewAsset) -> AppResult<Asset> {
        let mut errors = Vec::new();
        if let Some(code) = non_empty(&data.code) {
            if AssetRepository::code_taken(&self.db, code, None).await? {
                errors.push(FieldError::new("code", "Este Código já existe."));
            }
        }
        if let Some(register_number) = non_empty(&data.register_number) {
            if AssetRepository::register_number_taken(&self.db, register_number, None).await? {
                errors.push(FieldError::new(
                    "registerNumber",
                    "Este N° de Patrimônio já existe",
                ));
            }
        }
        AppError::check(errors)?;

        self.check_type_and_status(data.type_id, data.status_id).await?;

        let register_number = match non_empty(&data.register_number) {
            Some(register_number) => register_number.to_string(),
            None => padded_sequence(AssetRepository::next_id(&self.db).await?),
        };
        let status_id = data.status_id.unwrap_or(AssetStatusId::Available.id());

        let mut tx = self.db.begin().await?;
        let id = AssetRepository::create_with_executor(
            &mut *tx,
            &AssetData {
                asset_group_id: None,
                type_id: data.type_id,
                status_id,
                invoice_id: None,
                code: data.code.filter(|c| !c.trim().is_empty()),
                register_number: Some(register_number),
                description: data.description,
                supplier: data.supplier,
                assurance_date: data.assurance_date,
                observations: data.observations,
                pattern: data.pattern,
                brand: data.brand,
                operational_system: data.operational_system,
                serial_number: data.serial_number,
                imei: data.imei,
                acquisition_date: data.acquisition_date,
                value: data.value,
                depreciation: data.depreciation,
                ms_office: data.ms_office,
                line_number: data.line_number,
                operator: data.operator,
                model: data.model,
                accessories: data.accessories,
                configuration: data.configuration,
                quantity: data.quantity.unwrap_or(1),
                unit: data.unit,
                active: true,
                by_agile: true,
            },
        )
        .await?;
        AssetRepository::record_status(&mut *tx, id, status_id, None).await?;
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, MODEL, Operation::Create, Some(id))
            .await;
        tracing::info!("Created asset {}", id);

        self.get_asset(id).await
    }

    /// ERP-owned assets only take the locally managed fields; type and
    /// status apply to every asset.
    pub async fn update_asset(
        &self,
        actor: &AuthUser,
        id: i64,
        data: UpdateAsset,
    ) -> AppResult<Asset> {
        let stored = AssetRepository::get_data(&self.db, id)
            .await?
            .ok_or_else(asset_not_found)?;

        self.check_type_and_status(data.type_id, data.status_id).await?;

        let data = if stored.data.by_agile {
            data
        } else {
            data.restrict_to_erp_fields()
        };

        if let Some(imei) = non_empty(&data.imei) {
            if AssetRepository::imei_taken(&self.db, imei, Some(id)).await? {
                return Err(AppError::field("imei", "IMEI já cadastrado"));
            }
        }

        let previous_status = stored.data.status_id;
        let mut updated = stored.data;
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if data.$field.is_some() { updated.$field = data.$field; })*
            };
        }
        apply!(
            type_id,
            description,
            supplier,
            assurance_date,
            observations,
            pattern,
            brand,
            operational_system,
            serial_number,
            imei,
            acquisition_date,
            value,
            depreciation,
            line_number,
            operator,
            model,
            accessories,
            configuration,
            unit,
        );
        if let Some(ms_office) = data.ms_office {
            updated.ms_office = ms_office;
        }
        if let Some(quantity) = data.quantity {
            updated.quantity = quantity;
        }
        if let Some(status_id) = data.status_id {
            updated.status_id = status_id;
        }

        let mut tx = self.db.begin().await?;
        AssetRepository::update_with_executor(&mut *tx, id, &updated).await?;
        if updated.status_id != previous_status {
            AssetRepository::record_status(&mut *tx, id, updated.status_id, None).await?;
        }
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, MODEL, Operation::Update, Some(id))
            .await;
        tracing::info!("Updated asset {}", id);

        self.get_asset(id).await
    }

    pub async fn inactivate_asset(
        &self,
        actor: &AuthUser,
        id: i64,
        data: InactivateAsset,
    ) -> AppResult<Asset> {
        self.get_asset(id).await?;
        AssetRepository::set_active(&self.db, id, data.active).await?;

        self.audit
            .record(Some(actor.id()), MODULE, MODEL, Operation::Inactivate, Some(id))
            .await;
        tracing::info!("Asset {} active={}", id, data.active);

        self.get_asset(id).await
    }

    pub async fn dispose_asset(
        &self,
        actor: &AuthUser,
        id: i64,
        data: DisposeAsset,
    ) -> AppResult<AssetDisposal> {
        let stored = AssetRepository::get_data(&self.db, id)
            .await?
            .ok_or_else(asset_not_found)?;
        if stored.data.status_id == AssetStatusId::Discarded.id() {
            return Err(AppError::bad_request("Ativo já descartado."));
        }

        let discarded = AssetStatusId::Discarded.id();
        let mut tx = self.db.begin().await?;
        AssetRepository::insert_disposal(
            &mut *tx,
            id,
            data.reason.label(),
            data.justification.as_deref(),
            data.observations.as_deref(),
        )
        .await?;
        let mut updated = stored.data;
        updated.status_id = discarded;
        updated.active = false;
        AssetRepository::update_with_executor(&mut *tx, id, &updated).await?;
        AssetRepository::record_status(&mut *tx, id, discarded, None).await?;
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, MODEL, Operation::Dispose, Some(id))
            .await;
        tracing::info!("Disposed asset {} ({})", id, data.reason.label());

        AssetRepository::disposal(&self.db, id)
            .await?
            .ok_or_else(|| AppError::internal("disposal not recorded"))
    }

    pub async fn get_asset(&self, id: i64) -> AppResult<Asset> {
        AssetRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(asset_not_found)
    }

    pub async fn list_assets(&self, filter: &AssetFilter, page: PageParams) -> AppResult<Page<Asset>> {
        page.validate()?;
        let (items, total) = AssetRepository::list(&self.db, filter, Some(page)).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn lending_history(&self, id: i64) -> AppResult<Vec<LendingHistory>> {
        self.get_asset(id).await?;
        Ok(LendingRepository::history(&self.db, Some(id), None).await?)
    }

    pub async fn list_types(&self, search: Option<&str>) -> AppResult<Vec<AssetType>> {
        Ok(ReferenceRepository::list_asset_types(&self.db, search).await?)
    }

    pub async fn list_statuses(&self, search: Option<&str>) -> AppResult<Vec<CatalogItem>> {
        Ok(ReferenceRepository::list_catalog(&self.db, Catalog::AssetStatus, search).await?)
    }

    pub fn disposal_reasons(&self) -> Vec<&'static str> {
        DisposalReason::ALL.iter().map(DisposalReason::label).collect()
    }

    /// Move available assets that still hold an open lending to the lent
    /// status. Returns how many assets changed.
    pub async fn fix_status(&self) -> AppResult<usize> {
        let stale = AssetRepository::lent_but_available(&self.db).await?;
        let lent = AssetStatusId::Lent.id();

        let mut tx = self.db.begin().await?;
        for (asset_id, lent_at) in &stale {
            AssetRepository::set_status(&mut *tx, *asset_id, lent).await?;
            AssetRepository::record_status(&mut *tx, *asset_id, lent, Some(*lent_at)).await?;
            tracing::debug!("Asset {} moved to lent status", asset_id);
        }
        tx.commit().await?;

        tracing::info!("Fixed status of {} assets", stale.len());
        Ok(stale.len())
    }

    async fn check_type_and_status(
        &self,
        type_id: Option<i64>,
        status_id: Option<i64>,
    ) -> AppResult<()> {
        let mut errors = Vec::new();
        if let Some(type_id) = type_id {
            if !ReferenceRepository::asset_type_exists(&self.db, type_id).await? {
                errors.push(FieldError::new(
                    "typeId",
                    format!("Tipo de Ativo não existe. {}", type_id),
                ));
            }
        }
        if let Some(status_id) = status_id {
            if !ReferenceRepository::catalog_exists(&self.db, Catalog::AssetStatus, status_id).await? {
                errors.push(FieldError::new(
                    "statusId",
                    format!("Situação de Ativo não existe. {}", status_id),
                ));
            }
        }
        AppError::check(errors)
    }
}

fn asset_not_found() -> AppError {
    AppError::not_found("assetId", "Ativo não encontrado")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_pool, Fixtures};

    async fn service() -> (AssetService, SqlitePool, AuthUser) {
        let pool = test_pool().await;
        let audit = Arc::new(AuditService::new(pool.clone()));
        let actor = Fixtures::staff(&pool).await;
        (AssetService::new(pool.clone(), audit), pool, actor)
    }

    #[tokio::test]
    async fn test_create_asset() {
        let (service, pool, actor) = service().await;
        let asset = service
            .create_asset(
                &actor,
                NewAsset {
                    code: Some("LOC-1".into()),
                    type_id: Some(1),
                    description: Some("Notebook Dell".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(asset.by_agile);
        assert!(asset.active);
        assert_eq!(asset.quantity, 1);
        assert_eq!(asset.status.as_ref().unwrap().id, 1);
        assert_eq!(asset.register_number.as_deref(), Some("000000000000001"));
        assert_eq!(asset.asset_type.as_ref().unwrap().name, "NOTEBOOK");

        let history = AssetRepository::status_history(&pool, asset.id).await.unwrap();
        assert_eq!(history.len(), 1);

        let duplicate = service
            .create_asset(
                &actor,
                NewAsset {
                    code: Some("LOC-1".into()),
                    register_number: asset.register_number.clone(),
                    ..Default::default()
                },
            )
            .await;
        match duplicate {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors[0].error, "Este Código já existe.");
                assert_eq!(errors[1].field, "registerNumber");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_type() {
        let (service, _pool, actor) = service().await;
        let err = service
            .create_asset(
                &actor,
                NewAsset {
                    type_id: Some(999),
                    status_id: Some(42),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert_eq!(errors[0].error, "Tipo de Ativo não existe. 999");
                assert_eq!(errors[1].error, "Situação de Ativo não existe. 42");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_erp_asset_is_restricted() {
        let (service, pool, actor) = service().await;
        let id = Fixtures::asset(&pool, "ERP-1").await;

        let updated = service
            .update_asset(
                &actor,
                id,
                UpdateAsset {
                    description: Some("changed".into()),
                    observations: Some("na gaveta".into()),
                    status_id: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.description.as_deref() != Some("changed"));
        assert_eq!(updated.observations.as_deref(), Some("na gaveta"));
        assert_eq!(updated.status.unwrap().id, 3);
        let history = AssetRepository::status_history(&pool, id).await.unwrap();
        assert_eq!(history.last().unwrap().0, 3);
    }

    #[tokio::test]
    async fn test_dispose_asset() {
        let (service, _pool, actor) = service().await;
        let asset = service
            .create_asset(&actor, NewAsset::default())
            .await
            .unwrap();

        let disposal = service
            .dispose_asset(
                &actor,
                asset.id,
                DisposeAsset {
                    reason: DisposalReason::Obsolete,
                    justification: Some("tela quebrada".into()),
                    observations: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(disposal.reason, "Obsoleto");

        let disposed = service.get_asset(asset.id).await.unwrap();
        assert!(!disposed.active);
        assert_eq!(disposed.status.unwrap().id, 8);

        let again = service
            .dispose_asset(
                &actor,
                asset.id,
                DisposeAsset {
                    reason: DisposalReason::Sale,
                    justification: None,
                    observations: None,
                },
            )
            .await;
        assert!(matches!(again, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_missing_asset() {
        let (service, _pool, _actor) = service().await;
        match service.get_asset(404).await {
            Err(AppError::NotFound(e)) => assert_eq!(e.error, "Ativo não encontrado"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fix_status() {
        let (service, pool, _actor) = service().await;
        let employee = Fixtures::employee(&pool, "000500", "Davi Reis").await;
        let cost_center = Fixtures::cost_center(&pool, "2.01").await;
        let asset = Fixtures::asset(&pool, "NB-500").await;

        LendingRepository::create_with_executor(
            &pool,
            &crate::repositories::LendingData {
                employee_id: employee,
                asset_id: asset,
                workload_id: Some(1),
                status_id: 2,
                cost_center_id: cost_center,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(service.fix_status().await.unwrap(), 1);
        assert_eq!(service.get_asset(asset).await.unwrap().status.unwrap().id, 2);
        assert_eq!(service.fix_status().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disposal_reason_labels() {
        let (service, _pool, _actor) = service().await;
        let reasons = service.disposal_reasons();
        assert_eq!(reasons.len(), 11);
        assert_eq!(reasons[0], "Devolução");
    }
}
