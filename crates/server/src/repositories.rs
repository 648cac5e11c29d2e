mod asset;
mod document;
mod employee;
mod group;
mod invoice;
mod lending;
mod log;
mod maintenance;
mod permission;
mod reference;
mod sync;
mod term;
mod token;
mod user;
mod verification;

pub use asset::{AssetData, AssetRepository, StoredAsset};
pub use document::{ContractContext, DocumentRepository, SignerContext, WitnessSigner};
pub use employee::{EmployeeData, EmployeeRepository};
pub use group::GroupRepository;
pub use invoice::InvoiceRepository;
pub use lending::{LendingData, LendingRepository, WitnessRepository};
pub use log::LogRepository;
pub use maintenance::{MaintenanceData, MaintenanceRepository, UpgradeData, UpgradeRepository};
pub use permission::PermissionRepository;
pub use reference::{Catalog, ReferenceRepository};
pub use sync::SyncRepository;
pub use term::{TermContext, TermData, TermRepository};
pub use token::TokenRepository;
pub use user::{CreateUserData, UserRepository};
pub use verification::VerificationRepository;
