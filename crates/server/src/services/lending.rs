use std::sync::Arc;

use sqlx::SqlitePool;

use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    AssetStatusId, CatalogItem, Lending, LendingFilter, LendingStatusId, NewLending, NewWitness,
    Operation, Page, PageParams, UpdateLending, Witness, WitnessFilter,
};
use crate::repositories::{
    AssetRepository, Catalog, EmployeeRepository, LendingData, LendingRepository,
    ReferenceRepository, WitnessRepository,
};

const MODULE: &str = "lending";

/// Lending contracts (comodato) and their witnesses
pub struct LendingService {
    db: SqlitePool,
    audit: Arc<AuditService>,
}

impl LendingService {
    pub fn new(db: SqlitePool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    pub async fn create_lending(&self, actor: &AuthUser, data: NewLending) -> AppResult<Lending> {
        let mut errors = Vec::new();

        if !EmployeeRepository::exists(&self.db, data.employee_id).await? {
            errors.push(FieldError::new(
                "employeeId",
                format!("Colaborador não existe. {}", data.employee_id),
            ));
        }

        match AssetRepository::get_data(&self.db, data.asset_id).await? {
            None => errors.push(FieldError::new(
                "assetId",
                format!("Ativo não existe. {}", data.asset_id),
            )),
            Some(asset) if asset.data.type_id.is_none() => errors.push(FieldError::new(
                "assetId",
                "Ativo não possui Tipo. Altere o Ativo.",
            )),
            Some(asset) => {
                let label = asset
                    .data
                    .register_number
                    .or(asset.data.code)
                    .unwrap_or_else(|| asset.id.to_string());
                let message = match AssetStatusId::from_id(asset.data.status_id) {
                    Some(AssetStatusId::Lent) => {
                        Some(format!("Ativo já está vinculado a um comodato. {}", label))
                    }
                    Some(AssetStatusId::Inactive) => Some(format!("Ativo está inativo. {}", label)),
                    Some(AssetStatusId::Reserved) => Some(format!("Ativo está reservado. {}", label)),
                    Some(AssetStatusId::Discarded) => Some(format!("Ativo descartado. {}", label)),
                    Some(AssetStatusId::Borrowed) => Some(format!("Ativo emprestado. {}", label)),
                    _ => None,
                };
                if let Some(message) = message {
                    errors.push(FieldError::new("assetId", message));
                }
            }
        }

        self.check_workload_and_cost_center(
            Some(data.workload_id),
            Some(data.cost_center_id),
            &mut errors,
        )
        .await?;
        self.check_witnesses(&data.witnesses, &mut errors).await?;
        AppError::check(errors)?;

        let lent = AssetStatusId::Lent.id();
        let mut tx = self.db.begin().await?;
        let id = LendingRepository::create_with_executor(
            &mut *tx,
            &LendingData {
                employee_id: data.employee_id,
                asset_id: data.asset_id,
                workload_id: Some(data.workload_id),
                status_id: LendingStatusId::PendingFile.id(),
                cost_center_id: data.cost_center_id,
                bu: data.bu.map(|bu| bu.as_str().to_string()),
                number: data.number,
                manager: data.manager,
                business_executive: data.business_executive,
                project: data.project,
                location: data.location,
                observations: data.observations,
                signed_date: None,
                revoke_signed_date: None,
                glpi_number: data.glpi_number,
                ms_office: data.ms_office,
            },
        )
        .await?;
        WitnessRepository::attach(&mut *tx, id, &data.witnesses).await?;
        AssetRepository::set_status(&mut *tx, data.asset_id, lent).await?;
        AssetRepository::record_status(&mut *tx, data.asset_id, lent, None).await?;
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, "lending", Operation::Create, Some(id))
            .await;
        tracing::info!("Created lending {} for asset {}", id, data.asset_id);

        self.get_lending(id).await
    }

    /// Moving a lending to Inativo gives its asset back.
    pub async fn update_lending(
        &self,
        actor: &AuthUser,
        id: i64,
        data: UpdateLending,
    ) -> AppResult<Lending> {
        let mut stored = LendingRepository::get_data(&self.db, id)
            .await?
            .ok_or_else(lending_not_found)?;

        let mut errors = Vec::new();
        self.check_workload_and_cost_center(data.workload_id, data.cost_center_id, &mut errors)
            .await?;
        if let Some(status_id) = data.status_id {
            if !ReferenceRepository::catalog_exists(&self.db, Catalog::LendingStatus, status_id).await? {
                errors.push(FieldError::new(
                    "statusId",
                    format!("Situação de Comodato não existe. {}", status_id),
                ));
            }
        }
        if let Some(witnesses) = &data.witnesses {
            self.check_witnesses(witnesses, &mut errors).await?;
        }
        AppError::check(errors)?;

        let released = data.status_id == Some(LendingStatusId::Inactive.id())
            && stored.status_id != LendingStatusId::Inactive.id();

        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if data.$field.is_some() { stored.$field = data.$field; })*
            };
        }
        apply!(
            workload_id,
            number,
            manager,
            business_executive,
            project,
            location,
            observations,
            signed_date,
            revoke_signed_date,
            glpi_number,
        );
        if let Some(status_id) = data.status_id {
            stored.status_id = status_id;
        }
        if let Some(cost_center_id) = data.cost_center_id {
            stored.cost_center_id = cost_center_id;
        }
        if let Some(bu) = data.bu {
            stored.bu = Some(bu.as_str().to_string());
        }
        if let Some(ms_office) = data.ms_office {
            stored.ms_office = ms_office;
        }

        let mut tx = self.db.begin().await?;
        LendingRepository::update_with_executor(&mut *tx, id, &stored).await?;
        if let Some(witnesses) = &data.witnesses {
            WitnessRepository::attach(&mut *tx, id, witnesses).await?;
        }
        if released {
            let available = AssetStatusId::Available.id();
            AssetRepository::set_status(&mut *tx, stored.asset_id, available).await?;
            AssetRepository::record_status(&mut *tx, stored.asset_id, available, None).await?;
        }
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, "lending", Operation::Update, Some(id))
            .await;
        tracing::info!("Updated lending {}", id);

        self.get_lending(id).await
    }

    pub async fn delete_lending(&self, actor: &AuthUser, id: i64) -> AppResult<()> {
        let stored = LendingRepository::get_data(&self.db, id)
            .await?
            .ok_or_else(lending_not_found)?;

        let available = AssetStatusId::Available.id();
        let mut tx = self.db.begin().await?;
        LendingRepository::soft_delete(&mut *tx, id).await?;
        AssetRepository::set_status(&mut *tx, stored.asset_id, available).await?;
        AssetRepository::record_status(&mut *tx, stored.asset_id, available, None).await?;
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, "lending", Operation::Delete, Some(id))
            .await;
        tracing::info!("Deleted lending {}", id);
        Ok(())
    }

    pub async fn get_lending(&self, id: i64) -> AppResult<Lending> {
        LendingRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(lending_not_found)
    }

    pub async fn list_lendings(
        &self,
        filter: &LendingFilter,
        page: PageParams,
    ) -> AppResult<Page<Lending>> {
        page.validate()?;
        let (items, total) = LendingRepository::list(&self.db, filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn create_witness(&self, actor: &AuthUser, data: NewWitness) -> AppResult<Witness> {
        if !EmployeeRepository::exists(&self.db, data.employee_id).await? {
            return Err(AppError::not_found("employeeId", "Colaborador não encontrado"));
        }
        let id = WitnessRepository::create(&self.db, data.employee_id).await?;

        self.audit
            .record(Some(actor.id()), MODULE, "witness", Operation::Create, Some(id))
            .await;

        WitnessRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("witnessId", "Testemunha não encontrada"))
    }

    pub async fn list_witnesses(&self, filter: &WitnessFilter) -> AppResult<Vec<Witness>> {
        Ok(WitnessRepository::list(&self.db, filter.lending).await?)
    }

    pub async fn list_workloads(&self, search: Option<&str>) -> AppResult<Vec<CatalogItem>> {
        Ok(ReferenceRepository::list_catalog(&self.db, Catalog::Workload, search).await?)
    }

    pub async fn list_statuses(&self, search: Option<&str>) -> AppResult<Vec<CatalogItem>> {
        Ok(ReferenceRepository::list_catalog(&self.db, Catalog::LendingStatus, search).await?)
    }

    async fn check_workload_and_cost_center(
        &self,
        workload_id: Option<i64>,
        cost_center_id: Option<i64>,
        errors: &mut Vec<FieldError>,
    ) -> AppResult<()> {
        if let Some(workload_id) = workload_id {
            if !ReferenceRepository::catalog_exists(&self.db, Catalog::Workload, workload_id).await? {
                errors.push(FieldError::new(
                    "workloadId",
                    format!("Lotação não existe. {}", workload_id),
                ));
            }
        }
        if let Some(cost_center_id) = cost_center_id {
            if !ReferenceRepository::cost_center_exists(&self.db, cost_center_id).await? {
                errors.push(FieldError::new(
                    "costCenterId",
                    format!("Centro de Custo não existe. {}", cost_center_id),
                ));
            }
        }
        Ok(())
    }

    async fn check_witnesses(&self, ids: &[i64], errors: &mut Vec<FieldError>) -> AppResult<()> {
        let mut missing = Vec::new();
        for id in ids {
            if WitnessRepository::get_by_id(&self.db, *id).await?.is_none() {
                missing.push(id.to_string());
            }
        }
        if !missing.is_empty() {
            errors.push(FieldError::new(
                "witnesses",
                format!("Testemunhas não encontradas: {}", missing.join(", ")),
            ));
        }
        Ok(())
    }
}

fn lending_not_found() -> AppError {
    AppError::not_found("lendingId", "Contrato de Comodato não encontrado")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_pool, Fixtures};

    struct Setup {
        service: LendingService,
        pool: SqlitePool,
        actor: AuthUser,
        employee: i64,
        asset: i64,
        cost_center: i64,
    }

    async fn setup() -> Setup {
        let pool = test_pool().await;
        let audit = Arc::new(AuditService::new(pool.clone()));
        let actor = Fixtures::staff(&pool).await;
        Setup {
            service: LendingService::new(pool.clone(), audit),
            employee: Fixtures::employee(&pool, "000300", "Paula Lima").await,
            asset: Fixtures::asset(&pool, "NB-300").await,
            cost_center: Fixtures::cost_center(&pool, "3.01").await,
            actor,
            pool,
        }
    }

    fn new_lending(s: &Setup, witnesses: Vec<i64>) -> NewLending {
        NewLending {
            employee_id: s.employee,
            asset_id: s.asset,
            workload_id: 2,
            cost_center_id: s.cost_center,
            witnesses,
            bu: None,
            number: Some("CT-1".into()),
            manager: None,
            business_executive: None,
            project: None,
            location: None,
            observations: None,
            glpi_number: None,
            ms_office: false,
        }
    }

    async fn asset_status(pool: &SqlitePool, asset: i64) -> i64 {
        AssetRepository::get_data(pool, asset).await.unwrap().unwrap().data.status_id
    }

    #[tokio::test]
    async fn test_create_lending_moves_asset() {
        let s = setup().await;
        let witness = s
            .service
            .create_witness(&s.actor, NewWitness { employee_id: s.employee })
            .await
            .unwrap();

        let lending = s
            .service
            .create_lending(&s.actor, new_lending(&s, vec![witness.id]))
            .await
            .unwrap();
        assert_eq!(lending.status.id, 1);
        assert_eq!(lending.witnesses.len(), 1);
        assert_eq!(asset_status(&s.pool, s.asset).await, 2);

        // The asset is now lent
        let err = s
            .service
            .create_lending(&s.actor, new_lending(&s, vec![]))
            .await
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors[0].error.starts_with("Ativo já está vinculado a um comodato."))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_lending_validation() {
        let s = setup().await;
        let mut data = new_lending(&s, vec![99]);
        data.asset_id = 777;
        data.workload_id = 9;

        match s.service.create_lending(&s.actor, data).await.unwrap_err() {
            AppError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["assetId", "workloadId", "witnesses"]);
                assert_eq!(errors[0].error, "Ativo não existe. 777");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inactivating_releases_asset() {
        let s = setup().await;
        let lending = s
            .service
            .create_lending(&s.actor, new_lending(&s, vec![]))
            .await
            .unwrap();

        let updated = s
            .service
            .update_lending(
                &s.actor,
                lending.id,
                UpdateLending {
                    status_id: Some(4),
                    observations: Some("devolvido".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status.id, 4);
        assert_eq!(updated.observations.as_deref(), Some("devolvido"));
        assert_eq!(asset_status(&s.pool, s.asset).await, 1);
    }

    #[tokio::test]
    async fn test_delete_lending() {
        let s = setup().await;
        let lending = s
            .service
            .create_lending(&s.actor, new_lending(&s, vec![]))
            .await
            .unwrap();

        s.service.delete_lending(&s.actor, lending.id).await.unwrap();
        assert_eq!(asset_status(&s.pool, s.asset).await, 1);

        match s.service.get_lending(lending.id).await {
            Err(AppError::NotFound(e)) => assert_eq!(e.field, "lendingId"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(s.service.delete_lending(&s.actor, lending.id).await.is_err());
    }
}
