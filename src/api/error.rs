use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::borrow::Cow;

use crate::modules::file_upload::{storage::StorageError, validator::ValidationFailure};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Too Many Requests")]
    TooManyRequests,
    #[error("Storage operation failed")]
    Storage,
    #[error("Internal Server Error")]
    InternalServer,
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Error::Storage | Error::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status_code());

        match self {
            // Has Message
            Error::NotFound(msg) | Error::BadRequest(msg) => res.json(ErrorBody {
                message: msg.clone(),
            }),
            // No Message
            Error::TooManyRequests => res.json(ErrorBody {
                message: "Too many requests, please try again later".into(),
            }),
            Error::Storage => res.json(ErrorBody {
                message: "Storage operation failed".into(),
            }),
            Error::InternalServer => res.json(ErrorBody {
                message: "Internal Server Error".into(),
            }),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // sqlx errors
    #[error("Database Error: {0}")]
    DatabaseError(Cow<'static, str>),
    #[error("Migration Error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    // content validation
    #[error("Validation Error: {0}")]
    Validation(#[from] ValidationFailure),
    // local disk or object store
    #[error("Storage Error: {0}")]
    Storage(#[from] StorageError),
    // Custom Errors
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Internal System Error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::Validation(failure) => Error::BadRequest(failure.to_string().into()),
            SystemError::NotFound(msg) => Error::NotFound(msg),
            SystemError::Storage(err) => {
                tracing::error!(error = %err, "storage failure surfaced to client");
                Error::Storage
            }
            _ => {
                tracing::error!(error = ?value, "Internal Server Error");
                Error::InternalServer
            }
        }
    }
}

impl From<sqlx::Error> for SystemError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            tracing::error!(code = ?db_err.code(), "database error: {}", db_err.message());
            return SystemError::DatabaseError(db_err.message().to_string().into());
        }
        tracing::error!(error = ?err, "database driver error");
        SystemError::InternalError(Box::new(err))
    }
}

impl From<std::io::Error> for SystemError {
    fn from(err: std::io::Error) -> Self {
        SystemError::InternalError(Box::new(err))
    }
}

impl SystemError {
    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Message safe to hand back to a client, used where errors are reported
    /// inside a successful response body.
    pub fn client_message(&self) -> Cow<'static, str> {
        match self {
            SystemError::NotFound(msg) => msg.clone(),
            SystemError::Validation(failure) => failure.to_string().into(),
            SystemError::Storage(_) => "Storage operation failed".into(),
            _ => "Internal Server Error".into(),
        }
    }
}
