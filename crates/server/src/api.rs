mod handlers;
mod router;

pub(crate) use handlers::{
    assets, auth, datasync, documents, health, invoices, lendings, logs, maintenances, people,
    terms, verifications,
};
pub use router::create_router;
