use std::sync::Arc;

use chrono_tz::Tz;
use sqlx::SqlitePool;

use super::AuditService;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    padded_sequence, today, CatalogItem, Maintenance, MaintenanceFilter, NewMaintenance,
    NewUpgrade, Operation, Page, PageParams, UpdateMaintenance, UpdateUpgrade, Upgrade,
    FINISHED_STATUS, IN_PROGRESS_STATUS, PENDING_STATUS,
};
use crate::repositories::{
    AssetRepository, Catalog, EmployeeRepository, MaintenanceData, MaintenanceRepository,
    ReferenceRepository, UpgradeData, UpgradeRepository,
};

const MODULE: &str = "maintenance";

/// References a maintenance or upgrade points at
#[derive(Default)]
struct References {
    action_id: Option<i64>,
    status_id: Option<i64>,
    asset_id: Option<i64>,
    employee_id: Option<i64>,
}

/// Asset maintenances and hardware upgrades
pub struct MaintenanceService {
    db: SqlitePool,
    audit: Arc<AuditService>,
    timezone: Tz,
}

impl MaintenanceService {
    /// Open and close dates are taken in `timezone`.
    pub fn new(db: SqlitePool, audit: Arc<AuditService>, timezone: Tz) -> Self {
        Self {
            db,
            audit,
            timezone,
        }
    }

    pub async fn create_maintenance(
        &self,
        actor: &AuthUser,
        data: NewMaintenance,
    ) -> AppResult<Maintenance> {
        self.check_references(References {
            action_id: Some(data.action_id),
            asset_id: Some(data.asset_id),
            employee_id: Some(data.employee_id),
            ..Default::default()
        })
        .await?;
        check_value(data.value)?;

        let mut tx = self.db.begin().await?;
        let next_id = MaintenanceRepository::next_id(&mut *tx).await?;
        let (acronym, description) = MaintenanceRepository::asset_label(&mut *tx, data.asset_id)
            .await?
            .unwrap_or_default();
        let id = MaintenanceRepository::create_with_executor(
            &mut *tx,
            &MaintenanceData {
                action_id: data.action_id,
                status_id: PENDING_STATUS,
                asset_id: data.asset_id,
                employee_id: data.employee_id,
                criticality: data.criticality.map(|c| c.id()),
                open_date: Some(today(self.timezone)),
                close_date: None,
                glpi_number: data.glpi_number,
                open_date_glpi: data.open_date_glpi,
                open_date_supplier: data.open_date_supplier,
                supplier_number: data.supplier_number,
                supplier_service_order: Some(service_order(
                    acronym.as_deref(),
                    description.as_deref(),
                    next_id,
                )),
                incident_description: data.incident_description,
                resolution: data.resolution,
                value: data.value.unwrap_or(0.0),
                has_assurance: data.has_assurance,
            },
        )
        .await?;
        tx.commit().await?;

        self.audit
            .record(Some(actor.id()), MODULE, "maintenance", Operation::Create, Some(id))
            .await;
        tracing::info!("Created maintenance {} for asset {}", id, data.asset_id);

        self.get_maintenance(id).await
    }

    /// `inProgress` moves the maintenance to Em progresso; `close` finishes
    /// it today and wins over `inProgress`.
    pub async fn update_maintenance(
        &self,
        actor: &AuthUser,
        id: i64,
        data: UpdateMaintenance,
    ) -> AppResult<Maintenance> {
        let mut stored = MaintenanceRepository::get_data(&self.db, id)
            .await?
            .ok_or_else(maintenance_not_found)?;
        check_value(data.value)?;

        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if data.$field.is_some() { stored.$field = data.$field; })*
            };
        }
        apply!(
            glpi_number,
            open_date_glpi,
            open_date_supplier,
            supplier_number,
            incident_description,
            resolution,
        );
        if let Some(criticality) = data.criticality {
            stored.criticality = Some(criticality.id());
        }
        if let Some(value) = data.value {
            stored.value = value;
        }
        if let Some(has_assurance) = data.has_assurance {
            stored.has_assurance = has_assurance;
        }
        if data.in_progress {
            stored.status_id = IN_PROGRESS_STATUS;
        }
        if data.close {
            stored.close_date = Some(today(self.timezone));
            stored.status_id = FINISHED_STATUS;
        }

        MaintenanceRepository::update(&self.db, id, &stored).await?;
        self.audit
            .record(Some(actor.id()), MODULE, "maintenance", Operation::Update, Some(id))
            .await;

        self.get_maintenance(id).await
    }

    pub async fn get_maintenance(&self, id: i64) -> AppResult<Maintenance> {
        MaintenanceRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(maintenance_not_found)
    }

    pub async fn list_maintenances(
        &self,
        filter: &MaintenanceFilter,
        page: PageParams,
    ) -> AppResult<Page<Maintenance>> {
        page.validate()?;
        let (items, total) = MaintenanceRepository::list(&self.db, filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn create_upgrade(&self, actor: &AuthUser, data: NewUpgrade) -> AppResult<Upgrade> {
        self.check_references(References {
            status_id: Some(data.status_id),
            asset_id: Some(data.asset_id),
            employee_id: Some(data.employee_id),
            ..Default::default()
        })
        .await?;

        let id = UpgradeRepository::create(
            &self.db,
            &UpgradeData {
                status_id: data.status_id,
                asset_id: data.asset_id,
                employee_id: data.employee_id,
                open_date: data.open_date,
                close_date: data.close_date,
                value: data.value,
                detailing: data.detailing,
                supplier: data.supplier,
                invoice_number: data.invoice_number,
                observations: data.observations,
            },
        )
        .await?;

        self.audit
            .record(Some(actor.id()), MODULE, "upgrade", Operation::Create, Some(id))
            .await;
        tracing::info!("Created upgrade {} for asset {}", id, data.asset_id);

        self.get_upgrade(id).await
    }

    pub async fn update_upgrade(
        &self,
        actor: &AuthUser,
        id: i64,
        data: UpdateUpgrade,
    ) -> AppResult<Upgrade> {
        let mut stored = UpgradeRepository::get_data(&self.db, id)
            .await?
            .ok_or_else(upgrade_not_found)?;

        self.check_references(References {
            status_id: data.status_id,
            asset_id: data.asset_id,
            employee_id: data.employee_id,
            ..Default::default()
        })
        .await?;

        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if data.$field.is_some() { stored.$field = data.$field; })*
            };
        }
        apply!(
            open_date,
            close_date,
            value,
            detailing,
            supplier,
            invoice_number,
            observations,
        );
        if let Some(status_id) = data.status_id {
            stored.status_id = status_id;
        }
        if let Some(asset_id) = data.asset_id {
            stored.asset_id = asset_id;
        }
        if let Some(employee_id) = data.employee_id {
            stored.employee_id = employee_id;
        }

        UpgradeRepository::update(&self.db, id, &stored).await?;
        self.audit
            .record(Some(actor.id()), MODULE, "upgrade", Operation::Update, Some(id))
            .await;

        self.get_upgrade(id).await
    }

    pub async fn get_upgrade(&self, id: i64) -> AppResult<Upgrade> {
        UpgradeRepository::get_by_id(&self.db, id)
            .await?
            .ok_or_else(upgrade_not_found)
    }

    pub async fn list_upgrades(
        &self,
        filter: &MaintenanceFilter,
        page: PageParams,
    ) -> AppResult<Page<Upgrade>> {
        page.validate()?;
        let (items, total) = UpgradeRepository::list(&self.db, filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn list_actions(&self, search: Option<&str>) -> AppResult<Vec<CatalogItem>> {
        Ok(ReferenceRepository::list_catalog(&self.db, Catalog::MaintenanceAction, search).await?)
    }

    pub async fn list_statuses(&self, search: Option<&str>) -> AppResult<Vec<CatalogItem>> {
        Ok(ReferenceRepository::list_catalog(&self.db, Catalog::MaintenanceStatus, search).await?)
    }

    async fn check_references(&self, refs: References) -> AppResult<()> {
        let mut errors = Vec::new();

        if let Some(id) = refs.action_id {
            if !ReferenceRepository::catalog_exists(&self.db, Catalog::MaintenanceAction, id).await? {
                errors.push(FieldError::new("actionId", "Ação de Manutenção não existe."));
            }
        }
        if let Some(id) = refs.status_id {
            if !ReferenceRepository::catalog_exists(&self.db, Catalog::MaintenanceStatus, id).await? {
                errors.push(FieldError::new("statusId", "Status de Manutenção não existe."));
            }
        }
        if let Some(id) = refs.asset_id {
            if AssetRepository::get_short(&self.db, id).await?.is_none() {
                errors.push(FieldError::new("assetId", format!("Ativo não existe. {}", id)));
            }
        }
        if let Some(id) = refs.employee_id {
            if !EmployeeRepository::exists(&self.db, id).await? {
                errors.push(FieldError::new(
                    "employeeId",
                    format!("Colaborador não existe. {}", id),
                ));
            }
        }

        AppError::check(errors)
    }
}

/// `MA` + asset type acronym (or the first letters of the description)
/// + the zero-padded maintenance number.
fn service_order(acronym: Option<&str>, description: Option<&str>, number: i64) -> String {
    let prefix: String = match acronym {
        Some(acronym) if !acronym.is_empty() => acronym.to_string(),
        _ => description.unwrap_or_default().chars().take(3).collect(),
    };
    format!("MA{}{}", prefix, padded_sequence(number))
}

fn check_value(value: Option<f64>) -> AppResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(AppError::field("value", "Valor não pode ser negativo"))
        }
        _ => Ok(()),
    }
}

fn maintenance_not_found() -> AppError {
    AppError::not_found("maintenanceId", "Manutenção não encontrada")
}

fn upgrade_not_found() -> AppError {
    AppError::not_found("upgradeId", "Upgrade não encontrado")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Criticality;
    use crate::testing::{test_pool, Fixtures};

    async fn service() -> (MaintenanceService, SqlitePool, AuthUser) {
        let pool = test_pool().await;
        let audit = Arc::new(AuditService::new(pool.clone()));
        let actor = Fixtures::staff(&pool).await;
        (
            MaintenanceService::new(pool.clone(), audit, chrono_tz::America::Bahia),
            pool,
            actor,
        )
    }

    fn new_maintenance(asset_id: i64, employee_id: i64) -> NewMaintenance {
        NewMaintenance {
            action_id: 1,
            asset_id,
            employee_id,
            criticality: Some(Criticality::High),
            glpi_number: Some("GLPI-1".into()),
            open_date_glpi: None,
            open_date_supplier: None,
            supplier_number: None,
            incident_description: Some("não liga".into()),
            resolution: None,
            value: None,
            has_assurance: false,
        }
    }

    #[test]
    fn test_service_order() {
        assert_eq!(service_order(Some("NTB"), None, 1), "MANTB000000000000001");
        assert_eq!(
            service_order(None, Some("CADEIRA GIRATÓRIA"), 42),
            "MACAD00000000000042"
        );
        assert_eq!(service_order(Some(""), None, 7), "MA000000000000007");
    }

    #[tokio::test]
    async fn test_maintenance_lifecycle() {
        let (service, pool, actor) = service().await;
        let asset = Fixtures::asset(&pool, "NB-600").await;
        let employee = Fixtures::employee(&pool, "000600", "Vera Dias").await;

        let created = service
            .create_maintenance(&actor, new_maintenance(asset, employee))
            .await
            .unwrap();
        assert_eq!(created.status.id, PENDING_STATUS);
        assert_eq!(created.open_date, Some(today(chrono_tz::America::Bahia)));
        assert_eq!(
            created.supplier_service_order.as_deref(),
            Some("MANTB000000000000001")
        );
        assert_eq!(created.criticality, Some(Criticality::High));
        assert_eq!(created.value, 0.0);

        let asset_view = AssetRepository::get_by_id(&pool, asset).await.unwrap().unwrap();
        assert_eq!(asset_view.maintenance_status, "Pendente");

        let started = service
            .update_maintenance(
                &actor,
                created.id,
                UpdateMaintenance {
                    in_progress: true,
                    value: Some(180.5),
                    has_assurance: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(started.status.name, "Em progresso");
        assert!(started.close_date.is_none());
        assert_eq!(started.value, 180.5);
        assert!(started.has_assurance);

        let closed = service
            .update_maintenance(
                &actor,
                created.id,
                UpdateMaintenance {
                    close: true,
                    resolution: Some("troca de fonte".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(closed.status.name, "Finalizado");
        assert_eq!(closed.close_date, Some(today(chrono_tz::America::Bahia)));
        assert_eq!(closed.glpi_number.as_deref(), Some("GLPI-1"));
        assert_eq!(closed.resolution.as_deref(), Some("troca de fonte"));

        let asset_view = AssetRepository::get_by_id(&pool, asset).await.unwrap().unwrap();
        assert_eq!(asset_view.maintenance_status, "-");
    }

    #[tokio::test]
    async fn test_client_cannot_pick_status_or_order() {
        let (service, pool, actor) = service().await;
        let asset = Fixtures::asset(&pool, "NB-602").await;
        let employee = Fixtures::employee(&pool, "000602", "Rui Lopes").await;

        let data: NewMaintenance = serde_json::from_value(serde_json::json!({
            "actionId": 2,
            "assetId": asset,
            "employeeId": employee,
            "statusId": 3,
            "openDate": "2001-01-01",
            "supplierServiceOrder": "QUALQUER"
        }))
        .unwrap();
        let created = service.create_maintenance(&actor, data).await.unwrap();
        assert_eq!(created.status.id, PENDING_STATUS);
        assert_ne!(created.open_date, chrono::NaiveDate::from_ymd_opt(2001, 1, 1));
        assert!(created
            .supplier_service_order
            .as_deref()
            .is_some_and(|so| so.starts_with("MANTB")));

        let mut negative = new_maintenance(asset, employee);
        negative.value = Some(-1.0);
        match service.create_maintenance(&actor, negative).await.unwrap_err() {
            AppError::Validation(errors) => assert_eq!(errors[0].field, "value"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_maintenance_references_must_exist() {
        let (service, _pool, actor) = service().await;
        let mut data = new_maintenance(55, 66);
        data.action_id = 9;

        match service.create_maintenance(&actor, data).await.unwrap_err() {
            AppError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["actionId", "assetId", "employeeId"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            service.get_maintenance(1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upgrade_lifecycle() {
        let (service, pool, actor) = service().await;
        let asset = Fixtures::asset(&pool, "NB-601").await;
        let employee = Fixtures::employee(&pool, "000601", "Igor Nunes").await;

        let created = service
            .create_upgrade(
                &actor,
                NewUpgrade {
                    status_id: 2,
                    asset_id: asset,
                    employee_id: employee,
                    open_date: None,
                    close_date: None,
                    value: Some(350.0),
                    detailing: Some("16GB RAM".into()),
                    supplier: None,
                    invoice_number: None,
                    observations: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.status.name, "Pendente");

        let updated = service
            .update_upgrade(
                &actor,
                created.id,
                UpdateUpgrade {
                    supplier: Some("Kabum".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.supplier.as_deref(), Some("Kabum"));
        assert_eq!(updated.value, Some(350.0));

        let page = service
            .list_upgrades(
                &MaintenanceFilter {
                    asset: Some(asset),
                    ..Default::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }
}
