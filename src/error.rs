use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// Failures raised by the storage layer.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("unique constraint violated")]
    Duplicate,

    #[error("referenced record does not exist")]
    InvalidReference,

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        let violation = err
            .as_database_error()
            .map(|db_err| (db_err.is_unique_violation(), db_err.is_foreign_key_violation()));

        match violation {
            Some((true, _)) => RepositoryError::Duplicate,
            Some((_, true)) => RepositoryError::InvalidReference,
            _ => RepositoryError::Database(err),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidData(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub const DUPLICATE_TITLE: &str = "Duplicate note title";
pub const INVALID_NOTE_DATA: &str = "Invalid note data received";

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate => AppError::Conflict(DUPLICATE_TITLE),
            RepositoryError::InvalidReference => AppError::InvalidData(INVALID_NOTE_DATA),
            RepositoryError::Database(e) => AppError::Database(e),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::NotFound(_) | AppError::InvalidData(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = if status.is_server_error() {
            error!(error = %self, "request failed");
            json!({
                "status": "error",
                "message": "Something bad happened while handling the request",
            })
        } else {
            debug!(error = %self, %status, "request rejected");
            json!({
                "status": "fail",
                "message": self.to_string(),
            })
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
