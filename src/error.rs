use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::SqlErr;
use serde::Serialize;
use thiserror::Error;

use crate::{
    db_access::Retryable,
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Payment gateway error {0}")]
    Gateway(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True when the database rejected a write on a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::DbError(err) => err
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation()),
            AppError::OrmError(err) => {
                matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
            }
            _ => false,
        }
    }

    /// True when the database rejected a write on a foreign key.
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            AppError::DbError(err) => err
                .as_database_error()
                .is_some_and(|db| db.is_foreign_key_violation()),
            AppError::OrmError(err) => {
                matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
            }
            _ => false,
        }
    }

    /// Turns a unique-constraint violation into a 400 carrying `message`.
    pub fn unique_as_bad_request(self, message: &str) -> Self {
        if self.is_unique_violation() {
            AppError::BadRequest(message.to_string())
        } else {
            self
        }
    }

    /// Turns a foreign key violation into a 400 carrying `message`. Order
    /// lines keep their dress, so deleting an ordered dress lands here.
    pub fn foreign_key_as_bad_request(self, message: &str) -> Self {
        if self.is_foreign_key_violation() {
            AppError::BadRequest(message.to_string())
        } else {
            self
        }
    }
}

/// Unwraps an error shared between callers that waited on one cache load.
impl From<Arc<AppError>> for AppError {
    fn from(err: Arc<AppError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(|shared| match &*shared {
            AppError::NotFound => AppError::NotFound,
            AppError::BadRequest(msg) => AppError::BadRequest(msg.clone()),
            AppError::Unauthorized(msg) => AppError::Unauthorized(msg.clone()),
            AppError::Forbidden => AppError::Forbidden,
            AppError::Gateway(msg) => AppError::Gateway(msg.clone()),
            other => AppError::Internal(anyhow::anyhow!("{other}: {other:?}")),
        })
    }
}

impl Retryable for AppError {
    fn is_transient(&self) -> bool {
        match self {
            AppError::DbError(err) => err.is_transient(),
            AppError::OrmError(err) => err.is_transient(),
            _ => false,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database error"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => {}
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
