use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Machine-stable kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            tracing::error!("❌ DB error: {}", db_err.message());

            if let Some(constraint) = db_err.constraint() {
                tracing::info!("🔒 Constraint violated: {}", constraint);
            }

            if let Some(mapped) = db_err.code().as_deref().and_then(from_sql_state) {
                return mapped;
            }
        } else if matches!(e, sqlx::Error::RowNotFound) {
            return AppError::NotFound("Record not found".into());
        } else {
            tracing::error!("❌ Unknown DB error: {}", e);
        }

        AppError::Internal(e.into())
    }
}

/// Maps the SQLSTATE codes that describe a client mistake rather than a fault.
fn from_sql_state(code: &str) -> Option<AppError> {
    match code {
        UNIQUE_VIOLATION => Some(AppError::Conflict("Data integrity violation".into())),
        FOREIGN_KEY_VIOLATION => Some(AppError::NotFound("Referenced record not found".into())),
        _ => None,
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(e.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    incident: Option<Uuid>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, incident) = match &self {
            AppError::Internal(e) => {
                let incident = Uuid::new_v4();
                tracing::error!("❌ Internal error [{}]: {:?}", incident, e);
                ("Something went wrong.".to_string(), Some(incident))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            status: status.as_u16(),
            kind: self.kind(),
            message,
            incident,
        };

        (status, Json(body)).into_response()
    }
}
