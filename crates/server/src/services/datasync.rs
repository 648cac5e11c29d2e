use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tokio::sync::Mutex;
use totvs::{AssetRecord, EmployeeRecord, TotvsError, TotvsSource};

use crate::error::AppResult;
use crate::models::{AssetStatusId, ReferenceTable, SyncKind, SyncRecord};
use crate::repositories::{
    AssetData, AssetRepository, EmployeeData, EmployeeRepository, InvoiceRepository,
    ReferenceRepository, SyncRepository,
};

/// First description words that name a furniture item
const FURNITURE_WORDS: [&str; 6] = ["CADEIRA", "MESA", "ARMARIO", "GAVETEIRO", "ROUPEIRO", "SOFA"];
const FURNITURE_TYPE: &str = "MOBILIÁRIO";
const PHONE_TYPE: &str = "TELEFONIA";
const DEFAULT_GENDER_CODE: &str = "M";
const DEFAULT_EMPLOYEE_STATUS: &str = "Ativo";

#[derive(Debug, Error)]
pub enum DatasyncError {
    #[error("A sync run is already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Totvs(#[from] TotvsError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to hash record: {0}")]
    Hash(#[from] serde_json::Error),
}

/// Result of one sync run
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Changed rows per kind that synced
    pub synced: Vec<(SyncKind, i64)>,
    pub failed: Vec<SyncKind>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// SHA-256 hex of the record's JSON with sorted keys
pub fn checksum<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    // serde_json::Value maps are sorted by key
    let canonical = serde_json::to_value(record)?.to_string();
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

/// Candidate asset type names for an ERP description, most specific last.
pub fn type_candidates(description: &str) -> Vec<String> {
    let words: Vec<&str> = description.split_whitespace().collect();
    let Some(first) = words.first() else {
        return Vec::new();
    };
    let first = first.to_uppercase();

    let mut candidates = Vec::new();
    if FURNITURE_WORDS.iter().any(|w| first.starts_with(w)) {
        candidates.push(FURNITURE_TYPE.to_string());
    } else if first.starts_with("CELULAR") {
        candidates.push(PHONE_TYPE.to_string());
    } else {
        candidates.push(first.clone());
    }
    if let Some(second) = words.get(1) {
        candidates.push(format!("{} {}", first, second.to_uppercase()));
    }
    candidates
}

/// Mirrors ERP records into the local database
pub struct DatasyncService {
    db: SqlitePool,
    source: Arc<dyn TotvsSource>,
    running: Mutex<()>,
}

impl DatasyncService {
    pub fn new(db: SqlitePool, source: Arc<dyn TotvsSource>) -> Self {
        Self {
            db,
            source,
            running: Mutex::new(()),
        }
    }

    /// Sync every kind in order. A failing kind is logged and skipped.
    pub async fn run(&self) -> Result<SyncReport, DatasyncError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| DatasyncError::AlreadyRunning)?;

        tracing::info!("ERP sync started");
        let mut report = SyncReport::default();

        for kind in SyncKind::ORDER {
            let started = Instant::now();
            match self.sync_kind(kind).await {
                Ok(count) => {
                    let elapsed = started.elapsed().as_secs_f64();
                    if let Err(e) = SyncRepository::insert_record(&self.db, kind, count, elapsed).await
                    {
                        tracing::error!("Failed to record sync of {}: {}", kind, e);
                    }
                    tracing::info!("Synced {}: {} changed in {:.2}s", kind, count, elapsed);
                    report.synced.push((kind, count));
                }
                Err(e) => {
                    tracing::error!("Sync of {} failed: {}", kind, e);
                    report.failed.push(kind);
                }
            }
        }

        tracing::info!(
            "ERP sync finished, {} kinds synced, {} failed",
            report.synced.len(),
            report.failed.len()
        );
        Ok(report)
    }

    pub async fn latest_records(&self, limit: i64) -> AppResult<Vec<SyncRecord>> {
        Ok(SyncRepository::latest_records(&self.db, limit).await?)
    }

    async fn sync_kind(&self, kind: SyncKind) -> Result<i64, DatasyncError> {
        let mut tx = self.db.begin().await?;
        let mut changed = 0;

        match kind {
            SyncKind::AssetGroup => {
                for record in self.source.asset_groups().await? {
                    if let Some(sum) = changed_checksum(&mut tx, kind, &record.code, &record).await? {
                        ReferenceRepository::upsert_asset_group(
                            &mut *tx,
                            &record.code,
                            record.group_code.as_deref(),
                            &record.name,
                        )
                        .await?;
                        SyncRepository::save_checksum(&mut *tx, kind, &record.code, &sum).await?;
                        changed += 1;
                    }
                }
            }
            SyncKind::MaritalStatus
            | SyncKind::Gender
            | SyncKind::Nationality
            | SyncKind::EducationalLevel => {
                let (table, records) = match kind {
                    SyncKind::MaritalStatus => {
                        (ReferenceTable::MaritalStatus, self.source.marital_statuses().await?)
                    }
                    SyncKind::Gender => (ReferenceTable::Gender, self.source.genders().await?),
                    SyncKind::Nationality => {
                        (ReferenceTable::Nationality, self.source.nationalities().await?)
                    }
                    _ => (
                        ReferenceTable::EducationalLevel,
                        self.source.educational_levels().await?,
                    ),
                };
                for record in records {
                    if let Some(sum) = changed_checksum(&mut tx, kind, &record.code, &record).await? {
                        ReferenceRepository::upsert(&mut *tx, table, &record.code, &record.description)
                            .await?;
                        SyncRepository::save_checksum(&mut *tx, kind, &record.code, &sum).await?;
                        changed += 1;
                    }
                }
            }
            SyncKind::CostCenter => {
                for record in self.source.cost_centers().await? {
                    if let Some(sum) = changed_checksum(&mut tx, kind, &record.code, &record).await? {
                        ReferenceRepository::upsert_cost_center(
                            &mut *tx,
                            &record.code,
                            &record.name,
                            record.classification.as_deref(),
                        )
                        .await?;
                        SyncRepository::save_checksum(&mut *tx, kind, &record.code, &sum).await?;
                        changed += 1;
                    }
                }
            }
            SyncKind::Role => {
                for record in self.source.roles().await? {
                    if let Some(sum) = changed_checksum(&mut tx, kind, &record.code, &record).await? {
                        ReferenceRepository::upsert_role(&mut *tx, &record.code, &record.name).await?;
                        SyncRepository::save_checksum(&mut *tx, kind, &record.code, &sum).await?;
                        changed += 1;
                    }
                }
            }
            SyncKind::Asset => {
                for record in self.source.assets().await? {
                    if let Some(sum) = changed_checksum(&mut tx, kind, &record.code, &record).await? {
                        upsert_asset(&mut tx, &record).await?;
                        SyncRepository::save_checksum(&mut *tx, kind, &record.code, &sum).await?;
                        changed += 1;
                    }
                }
            }
            SyncKind::Employee => {
                for record in self.source.employees().await? {
                    if let Some(sum) = changed_checksum(&mut tx, kind, &record.code, &record).await? {
                        upsert_employee(&mut tx, &record).await?;
                        SyncRepository::save_checksum(&mut *tx, kind, &record.code, &sum).await?;
                        changed += 1;
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(changed)
    }
}

/// The record's new checksum when it differs from the stored one
async fn changed_checksum<T: Serialize>(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SyncKind,
    code: &str,
    record: &T,
) -> Result<Option<String>, DatasyncError> {
    let sum = checksum(record)?;
    let stored = SyncRepository::checksum(&mut **tx, kind, code).await?;
    Ok((stored.as_deref() != Some(sum.as_str())).then_some(sum))
}

async fn infer_type(
    tx: &mut Transaction<'_, Sqlite>,
    description: &str,
) -> Result<Option<i64>, sqlx::Error> {
    for candidate in type_candidates(description) {
        if let Some(id) = ReferenceRepository::find_asset_type_by_name(&mut **tx, &candidate).await? {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// Status is only decided on insert, or when the ERP row turns inactive.
async fn upsert_asset(tx: &mut Transaction<'_, Sqlite>, record: &AssetRecord) -> Result<(), sqlx::Error> {
    let type_id = infer_type(tx, &record.description).await?;
    let asset_group_id = match &record.group {
        Some(group) => ReferenceRepository::find_asset_group_by_name(&mut **tx, group).await?,
        None => None,
    };
    let invoice_id = match &record.invoice_number {
        Some(number) => Some(InvoiceRepository::get_or_create_by_number(&mut **tx, number).await?),
        None => None,
    };
    let existing = AssetRepository::get_data_by_code(&mut **tx, &record.code).await?;
    let erp_status = if record.active {
        AssetStatusId::Available.id()
    } else {
        AssetStatusId::Inactive.id()
    };

    let mut data = AssetData {
        asset_group_id,
        type_id,
        status_id: erp_status,
        invoice_id,
        code: Some(record.code.clone()),
        register_number: record.register_number.clone(),
        description: Some(record.description.clone()),
        supplier: record.supplier.clone(),
        assurance_date: record.assurance_date,
        observations: record.observations.clone(),
        pattern: record.pattern.clone(),
        brand: None,
        operational_system: record.operational_system.clone(),
        serial_number: record.serial_number.clone(),
        imei: record.imei.clone(),
        acquisition_date: record.acquisition_date,
        value: record.value,
        depreciation: record.depreciation,
        ms_office: record.ms_office,
        line_number: record.line_number.clone(),
        operator: record.operator.clone(),
        model: None,
        accessories: record.accessories.clone(),
        configuration: None,
        quantity: record.quantity.unwrap_or(1),
        unit: record.unit.clone(),
        active: record.active,
        by_agile: false,
    };

    match existing {
        None => {
            let id = AssetRepository::create_with_executor(&mut **tx, &data).await?;
            AssetRepository::record_status(&mut **tx, id, data.status_id, None).await?;
        }
        Some(stored) => {
            let turned_inactive =
                !record.active && stored.data.status_id != AssetStatusId::Inactive.id();
            if !turned_inactive {
                data.status_id = stored.data.status_id;
            }
            data.type_id = data.type_id.or(stored.data.type_id);
            data.brand = stored.data.brand;
            data.model = stored.data.model;
            data.configuration = stored.data.configuration;
            if data.observations.is_none() {
                data.observations = stored.data.observations;
            }
            AssetRepository::update_with_executor(&mut **tx, stored.id, &data).await?;
            if turned_inactive {
                AssetRepository::record_status(&mut **tx, stored.id, data.status_id, None).await?;
            }
        }
    }
    Ok(())
}

async fn upsert_employee(
    tx: &mut Transaction<'_, Sqlite>,
    record: &EmployeeRecord,
) -> Result<(), sqlx::Error> {
    let role_id = match &record.role {
        Some(name) => ReferenceRepository::find_role_by_name(&mut **tx, name).await?,
        None => None,
    };
    let nationality_id =
        find_reference(tx, ReferenceTable::Nationality, record.nationality.as_deref()).await?;
    let marital_status_id =
        find_reference(tx, ReferenceTable::MaritalStatus, record.marital_status.as_deref()).await?;
    let educational_level_id = find_reference(
        tx,
        ReferenceTable::EducationalLevel,
        record.educational_level.as_deref(),
    )
    .await?;
    let gender_id = match find_reference(tx, ReferenceTable::Gender, record.gender.as_deref()).await? {
        Some(id) => Some(id),
        None => {
            ReferenceRepository::find_by_code(&mut **tx, ReferenceTable::Gender, DEFAULT_GENDER_CODE)
                .await?
        }
    };

    let existing = EmployeeRepository::get_by_code_or_taxpayer(
        &mut **tx,
        &record.code,
        &record.taxpayer_identification,
    )
    .await?;

    let mut data = existing.as_ref().map(EmployeeData::from).unwrap_or_default();
    data.code = record.code.clone();
    data.full_name = record.full_name.clone();
    data.taxpayer_identification = record.taxpayer_identification.clone();
    data.national_identification = record.national_identification.clone();
    data.status = record
        .status
        .clone()
        .unwrap_or_else(|| DEFAULT_EMPLOYEE_STATUS.to_string());
    data.address = Some(record.address.clone());
    data.cell_phone = record.cell_phone.clone();
    data.email = record.email.clone();
    data.birthday = record.birthday;
    data.admission_date = record.admission_date;
    data.registration = record.registration.clone();
    data.legal_person = false;
    data.role_id = role_id;
    data.nationality_id = nationality_id;
    data.marital_status_id = marital_status_id;
    data.gender_id = gender_id;
    data.educational_level_id = educational_level_id;

    match existing {
        Some(employee) => EmployeeRepository::update_with_executor(&mut **tx, employee.id, &data).await,
        None => EmployeeRepository::create_with_executor(&mut **tx, &data)
            .await
            .map(|_| ()),
    }
}

async fn find_reference(
    tx: &mut Transaction<'_, Sqlite>,
    table: ReferenceTable,
    description: Option<&str>,
) -> Result<Option<i64>, sqlx::Error> {
    match description {
        Some(description) => {
            ReferenceRepository::find_by_description(&mut **tx, table, description).await
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use totvs::{AssetGroupRecord, CodeDescriptionRecord, CostCenterRecord, RoleRecord};

    use crate::testing::test_pool;

    #[derive(Default)]
    struct FakeSource {
        genders: Vec<CodeDescriptionRecord>,
        assets: StdMutex<Vec<AssetRecord>>,
        employees: Vec<EmployeeRecord>,
        fail_roles: bool,
    }

    #[async_trait]
    impl TotvsSource for FakeSource {
        async fn version(&self) -> totvs::Result<String> {
            Ok("fake".into())
        }
        async fn asset_groups(&self) -> totvs::Result<Vec<AssetGroupRecord>> {
            Ok(vec![AssetGroupRecord {
                code: "10".into(),
                group_code: Some("TI".into()),
                name: "EQUIPAMENTOS DE TI".into(),
            }])
        }
        async fn marital_statuses(&self) -> totvs::Result<Vec<CodeDescriptionRecord>> {
            Ok(vec![])
        }
        async fn genders(&self) -> totvs::Result<Vec<CodeDescriptionRecord>> {
            Ok(self.genders.clone())
        }
        async fn nationalities(&self) -> totvs::Result<Vec<CodeDescriptionRecord>> {
            Ok(vec![])
        }
        async fn cost_centers(&self) -> totvs::Result<Vec<CostCenterRecord>> {
            Ok(vec![])
        }
        async fn roles(&self) -> totvs::Result<Vec<RoleRecord>> {
            if self.fail_roles {
                return Err(TotvsError::NotConfigured);
            }
            Ok(vec![RoleRecord {
                code: "01".into(),
                name: "ANALISTA".into(),
            }])
        }
        async fn educational_levels(&self) -> totvs::Result<Vec<CodeDescriptionRecord>> {
            Ok(vec![])
        }
        async fn assets(&self) -> totvs::Result<Vec<AssetRecord>> {
            Ok(self.assets.lock().unwrap().clone())
        }
        async fn employees(&self) -> totvs::Result<Vec<EmployeeRecord>> {
            Ok(self.employees.clone())
        }
    }

    fn asset_record(code: &str, description: &str, active: bool) -> AssetRecord {
        AssetRecord {
            code: code.into(),
            group: Some("EQUIPAMENTOS DE TI".into()),
            cost_center: None,
            register_number: Some(format!("P-{}", code)),
            description: description.into(),
            supplier: None,
            invoice_number: Some("NF-ERP".into()),
            assurance_date: None,
            acquisition_date: None,
            observations: None,
            pattern: None,
            operational_system: None,
            serial_number: None,
            imei: None,
            value: Some(10.5),
            depreciation: None,
            ms_office: false,
            active,
            quantity: None,
            unit: None,
            line_number: None,
            operator: None,
            accessories: None,
        }
    }

    fn employee_record() -> EmployeeRecord {
        EmployeeRecord {
            code: "000900".into(),
            full_name: "JOANA PRADO".into(),
            birthday: None,
            taxpayer_identification: "99988877766".into(),
            national_identification: None,
            marital_status: None,
            nationality: None,
            gender: None,
            role: Some("analista".into()),
            status: None,
            address: "Rua B;1;;;;;;".into(),
            cell_phone: None,
            email: None,
            admission_date: None,
            registration: Some("M-900".into()),
            educational_level: None,
        }
    }

    #[test]
    fn test_checksum_is_stable() {
        let a = CodeDescriptionRecord {
            code: "S".into(),
            description: "Solteiro".into(),
        };
        let b = a.clone();
        assert_eq!(checksum(&a).unwrap(), checksum(&b).unwrap());
        assert_eq!(checksum(&a).unwrap().len(), 64);

        let c = CodeDescriptionRecord {
            description: "Solteira".into(),
            ..a.clone()
        };
        assert_ne!(checksum(&a).unwrap(), checksum(&c).unwrap());
    }

    #[test]
    fn test_type_candidates() {
        assert_eq!(type_candidates("NOTEBOOK DELL"), vec!["NOTEBOOK", "NOTEBOOK DELL"]);
        assert_eq!(type_candidates("cadeira giratoria"), vec!["MOBILIÁRIO", "CADEIRA GIRATORIA"]);
        assert_eq!(type_candidates("CELULAR"), vec!["TELEFONIA"]);
        assert!(type_candidates("  ").is_empty());
    }

    #[tokio::test]
    async fn test_sync_run() {
        let pool = test_pool().await;
        let source = Arc::new(FakeSource {
            genders: vec![CodeDescriptionRecord {
                code: "M".into(),
                description: "Masculino".into(),
            }],
            assets: StdMutex::new(vec![
                asset_record("1", "NOTEBOOK DELL LATITUDE", true),
                asset_record("2", "CADEIRA GIRATORIA", true),
            ]),
            employees: vec![employee_record()],
            ..Default::default()
        });
        let service = DatasyncService::new(pool.clone(), source.clone());

        let report = service.run().await.unwrap();
        assert!(report.is_success());
        assert!(report.synced.contains(&(SyncKind::Asset, 2)));
        assert!(report.synced.contains(&(SyncKind::Employee, 1)));

        let notebook = AssetRepository::get_data_by_code(&pool, "1").await.unwrap().unwrap();
        assert_eq!(notebook.data.type_id, Some(1));
        assert!(notebook.data.asset_group_id.is_some());
        assert!(notebook.data.invoice_id.is_some());
        assert!(!notebook.data.by_agile);
        let chair = AssetRepository::get_data_by_code(&pool, "2").await.unwrap().unwrap();
        assert_eq!(chair.data.invoice_id, notebook.data.invoice_id);
        let furniture = ReferenceRepository::find_asset_type_by_name(&pool, "MOBILIÁRIO")
            .await
            .unwrap();
        assert_eq!(chair.data.type_id, furniture);

        let employee = EmployeeRepository::get_by_code(&pool, "000900").await.unwrap().unwrap();
        assert!(!employee.legal_person);
        assert_eq!(employee.role.unwrap().name, "ANALISTA");
        assert_eq!(employee.gender.unwrap().code, "M");

        // Nothing changed, nothing counted
        let report = service.run().await.unwrap();
        assert!(report.synced.contains(&(SyncKind::Asset, 0)));

        // Local status survives an unchanged-active update; deactivation wins
        AssetRepository::set_status(&pool, notebook.id, 3).await.unwrap();
        source.assets.lock().unwrap()[0] = asset_record("1", "NOTEBOOK DELL LATITUDE 2", true);
        service.run().await.unwrap();
        let stored = AssetRepository::get_data(&pool, notebook.id).await.unwrap().unwrap();
        assert_eq!(stored.data.status_id, 3);

        source.assets.lock().unwrap()[0] = asset_record("1", "NOTEBOOK DELL LATITUDE 2", false);
        service.run().await.unwrap();
        let stored = AssetRepository::get_data(&pool, notebook.id).await.unwrap().unwrap();
        assert_eq!(stored.data.status_id, 6);
        assert!(!stored.data.active);

        let records = service.latest_records(100).await.unwrap();
        assert_eq!(records.len(), 9 * 4);
    }

    #[tokio::test]
    async fn test_failing_kind_does_not_stop_run() {
        let pool = test_pool().await;
        let source = Arc::new(FakeSource {
            fail_roles: true,
            employees: vec![employee_record()],
            ..Default::default()
        });
        let service = DatasyncService::new(pool.clone(), source);

        let report = service.run().await.unwrap();
        assert_eq!(report.failed, vec![SyncKind::Role]);
        assert!(report.synced.contains(&(SyncKind::Employee, 1)));
        assert!(!report.is_success());
    }
}
