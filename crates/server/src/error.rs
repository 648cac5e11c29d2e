use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

pub const NOT_ALLOWED: &str = "Não permitido";
pub const INVALID_CREDENTIALS: &str = "Não foi possível validar as credenciais";
pub const WRONG_LOGIN: &str = "Usuário ou senha incorreto";

/// A validation failure tied to a request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            error: error.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", .0.iter().map(|e| format!("{}: {}", e.field, e.error)).collect::<Vec<_>>().join(", "))]
    Validation(Vec<FieldError>),

    #[error("{}", .0.error)]
    NotFound(FieldError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Single field validation error.
    pub fn field(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, error)])
    }

    pub fn not_found(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NotFound(FieldError::new(field, error))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_allowed() -> Self {
        Self::Unauthorized(NOT_ALLOWED.to_string())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Fail with every collected field error, if any.
    pub fn check(errors: Vec<FieldError>) -> AppResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(errors))
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Value {
        match self {
            Self::Validation(errors) => serde_json::json!(errors),
            Self::NotFound(error) => serde_json::json!(error),
            Self::BadRequest(message) | Self::Unauthorized(message) => Value::from(message.as_str()),
            Self::Database(_) | Self::Internal(_) => Value::from("Internal server error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Error {}: {}", status.as_u16(), self);
        } else {
            tracing::warn!("Error {}: {}", status.as_u16(), self);
        }

        (status, Json(self.detail())).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<crate::auth::PasswordError> for AppError {
    fn from(e: crate::auth::PasswordError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<crate::auth::AuthError> for AppError {
    fn from(e: crate::auth::AuthError) -> Self {
        match e {
            crate::auth::AuthError::Encoding(message) => Self::Internal(message),
            _ => Self::unauthorized(INVALID_CREDENTIALS),
        }
    }
}

impl From<totvs::TotvsError> for AppError {
    fn from(e: totvs::TotvsError) -> Self {
        match e {
            totvs::TotvsError::NotConfigured => Self::bad_request(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<crate::services::SchedulerError> for AppError {
    fn from(e: crate::services::SchedulerError) -> Self {
        match e {
            crate::services::SchedulerError::JobAlreadyRunning(_) => {
                Self::bad_request(e.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}
