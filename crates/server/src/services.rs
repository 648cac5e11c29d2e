mod asset;
mod asset_import;
mod audit;
mod auth;
mod datasync;
mod document;
mod invoice;
mod lending;
mod maintenance;
mod people;
pub mod scheduler;
pub mod seed;
mod storage;
mod term;
mod user;
mod verification;

pub use asset::AssetService;
pub use asset_import::{AssetImportService, ImportError, COLUMNS as IMPORT_COLUMNS, IMPORT_SUCCESS};
pub use audit::AuditService;
pub use auth::AuthService;
pub use document::DocumentService;
pub use datasync::{checksum, type_candidates, DatasyncError, DatasyncService, SyncReport};
pub use invoice::InvoiceService;
pub use lending::LendingService;
pub use maintenance::MaintenanceService;
pub use people::PeopleService;
pub use scheduler::{
    DatasyncJob, FetchTotvsJob, JobResult, JobStatus, SchedulerBuilder, SchedulerError,
    SchedulerJob, SchedulerService, TokenCleanupJob, FETCH_TOTVS_JOB,
};
pub use term::TermService;
pub use user::UserService;
pub use verification::VerificationService;
