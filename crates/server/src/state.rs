use sqlx::SqlitePool;
use std::sync::Arc;
use totvs::TotvsSource;

use crate::config::Config;
use crate::services::{
    AssetImportService, AssetService, AuditService, AuthService, DatasyncJob, DatasyncService,
    DocumentService, FetchTotvsJob, InvoiceService, LendingService, MaintenanceService,
    PeopleService, SchedulerService, TermService, TokenCleanupJob, UserService,
    VerificationService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub audit: Arc<AuditService>,
    pub users: Arc<UserService>,
    pub people: Arc<PeopleService>,
    pub assets: Arc<AssetService>,
    pub imports: Arc<AssetImportService>,
    pub lendings: Arc<LendingService>,
    pub maintenances: Arc<MaintenanceService>,
    pub invoices: Arc<InvoiceService>,
    pub documents: Arc<DocumentService>,
    pub terms: Arc<TermService>,
    pub verifications: Arc<VerificationService>,
    /// Present when an ERP connection is configured
    pub totvs: Option<Arc<dyn TotvsSource>>,
    pub datasync: Option<Arc<DatasyncService>>,
    pub scheduler: Arc<SchedulerService>,
}

impl AppState {
    /// Build every service and start the scheduler. Needs a running tokio runtime.
    pub fn new(db: SqlitePool, config: Config, totvs: Option<Arc<dyn TotvsSource>>) -> Self {
        let config = Arc::new(config);

        let audit = Arc::new(AuditService::new(db.clone()));
        let auth = Arc::new(AuthService::new(db.clone(), Arc::clone(&config)));

        let users = Arc::new(UserService::new(db.clone(), Arc::clone(&audit)));
        let people = Arc::new(PeopleService::new(db.clone(), Arc::clone(&audit)));
        let assets = Arc::new(AssetService::new(db.clone(), Arc::clone(&audit)));
        let imports = Arc::new(AssetImportService::new(db.clone(), Arc::clone(&audit)));
        let lendings = Arc::new(LendingService::new(db.clone(), Arc::clone(&audit)));
        let maintenances = Arc::new(MaintenanceService::new(
            db.clone(),
            Arc::clone(&audit),
            config.timezone,
        ));
        let invoices = Arc::new(InvoiceService::new(
            db.clone(),
            Arc::clone(&audit),
            config.storage_path("invoices"),
        ));
        let documents = Arc::new(DocumentService::new(
            db.clone(),
            Arc::clone(&audit),
            config.timezone,
            config.storage_path("contracts"),
            config.storage_path("terms"),
        ));
        let terms = Arc::new(TermService::new(db.clone(), Arc::clone(&audit)));
        let verifications = Arc::new(VerificationService::new(db.clone(), Arc::clone(&audit)));

        let datasync = totvs
            .as_ref()
            .map(|source| Arc::new(DatasyncService::new(db.clone(), Arc::clone(source))));

        let mut scheduler =
            SchedulerService::builder().with_job(TokenCleanupJob::new(Arc::clone(&auth)));
        if let Some(datasync) = &datasync {
            scheduler = scheduler.with_job(FetchTotvsJob::new(Arc::clone(datasync)));
        }
        match &datasync {
            Some(datasync) if config.sync_enabled() => {
                scheduler = scheduler.with_job(DatasyncJob::new(Arc::clone(datasync), config.timezone));
            }
            _ => tracing::info!("Periodic ERP sync disabled"),
        }
        let scheduler = Arc::new(scheduler.start());

        Self {
            db,
            config,
            auth,
            audit,
            users,
            people,
            assets,
            imports,
            lendings,
            maintenances,
            invoices,
            documents,
            terms,
            verifications,
            totvs,
            datasync,
            scheduler,
        }
    }
}
