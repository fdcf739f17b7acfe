use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Errors surfaced to HTTP callers.
///
/// Best-effort side channels never produce one of these: their failures are
/// logged by [`crate::dispatch`] and dropped.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation error")]
    Validation(#[from] ValidationErrors),

    /// A body field that could not be deserialized, keyed by its wire path.
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is unreachable")]
    ServiceUnreachable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                AppError::Conflict(format!("Already exists: {}", info.message()))
            }
            other => AppError::Other(other.into()),
        }
    }
}

/// Standard success envelope: `{"data": ..., "message": ...}`.
#[derive(Serialize, ToSchema, Debug)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Error envelope. `errors` is only present for validation failures and maps
/// a field path (`items[0].qty`) to its messages.
#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorResponse::new(message)),
            AppError::Validation(errors) => {
                let mut fields = BTreeMap::new();
                flatten_validation_errors("", &errors, &mut fields);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        message: "Validation error".into(),
                        errors: Some(fields),
                    },
                )
            }
            AppError::InvalidField { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    message: "Validation error".into(),
                    errors: Some(BTreeMap::from([(field, vec![message])])),
                },
            ),
            AppError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, ErrorResponse::new(message))
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, ErrorResponse::new("Not found")),
            AppError::Conflict(message) => (StatusCode::CONFLICT, ErrorResponse::new(message)),
            AppError::ServiceUnreachable(service) => {
                tracing::error!("{} is unreachable", service);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new(format!("{} is unreachable", service)),
                )
            }
            AppError::Other(err) => {
                tracing::error!(error = ?err, "Unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal Server Error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn flatten_validation_errors(
    prefix: &str,
    errors: &ValidationErrors,
    out: &mut BTreeMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field);
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => out
                .entry(path)
                .or_default()
                .extend(field_errors.iter().map(describe)),
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

fn describe(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => error.code.to_string(),
    }
}

/// Field names on the wire are camelCase; validator reports the Rust names.
fn camel_case(field: &str) -> String {
    if field.starts_with('_') {
        return field.to_string();
    }

    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' && !out.is_empty() {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
