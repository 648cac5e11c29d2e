//! Error types for ERP access

#[derive(Debug, thiserror::Error)]
pub enum TotvsError {
    #[error("ERP database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ERP database error: {0}")]
    SqlServer(#[from] tiberius::error::Error),

    #[error("ERP connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid ERP database url: {0}")]
    InvalidUrl(String),

    #[error("Unsupported ERP database url: {0}")]
    UnsupportedUrl(String),

    #[error("ERP source is not configured")]
    NotConfigured,
}
