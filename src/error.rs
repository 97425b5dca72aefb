use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};

use crate::response::timestamp;

/// When set, masked 500 responses carry the original error text.
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

pub fn expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    /// 400 with a list of field-level problems.
    Validation(String, Vec<String>),
    RateLimited(String, u64),
    Unavailable(String),
    Internal(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Validation(msg, details) => {
                write!(f, "Validation: {msg} ({})", details.join(", "))
            }
            AppError::RateLimited(msg, _) => write!(f, "Rate Limited: {msg}"),
            AppError::Unavailable(msg) => write!(f, "Service Unavailable: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) | AppError::Validation(..) => StatusCode::BAD_REQUEST,
            AppError::RateLimited(..) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(err) => classify_database_error(err).0,
        }
    }

    pub fn required_fields(missing: &[&str]) -> Self {
        AppError::Validation(
            format!("Campos requeridos faltantes: {}", missing.join(", ")),
            missing.iter().map(|f| format!("{f} es requerido")).collect(),
        )
    }
}

/// Maps driver failures onto operational errors. `None` means the error is
/// not operational and must be masked.
fn classify_database_error(err: &sqlx::Error) -> (StatusCode, Option<&'static str>) {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => (
            StatusCode::BAD_REQUEST,
            Some("El registro ya existe en la base de datos"),
        ),
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => (
            StatusCode::BAD_REQUEST,
            Some("Referencia a registro inexistente"),
        ),
        sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => (
            StatusCode::SERVICE_UNAVAILABLE,
            Some("No se puede conectar a la base de datos"),
        ),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => (
            StatusCode::SERVICE_UNAVAILABLE,
            Some("No se puede conectar a la base de datos"),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
    }
}

const GENERIC_ERROR: &str = "Error interno del servidor";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut details: Option<Vec<String>> = None;
        let mut original: Option<String> = None;
        let mut retry_after: Option<u64> = None;

        let message = match &self {
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::Unavailable(msg) => msg.clone(),
            AppError::Validation(msg, list) => {
                details = Some(list.clone());
                msg.clone()
            }
            AppError::RateLimited(msg, secs) => {
                retry_after = Some(*secs);
                msg.clone()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                original = Some(msg.clone());
                GENERIC_ERROR.to_string()
            }
            AppError::Database(err) => match classify_database_error(err) {
                (_, Some(msg)) => {
                    tracing::warn!("Database error mapped to {status}: {err}");
                    msg.to_string()
                }
                (_, None) => {
                    tracing::error!("Database error: {err}");
                    original = Some(err.to_string());
                    GENERIC_ERROR.to_string()
                }
            },
        };

        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));
        body.insert("error".into(), Value::String(message));
        if let Some(details) = details {
            body.insert("details".into(), json!(details));
        }
        if let Some(original) = original {
            if EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
                body.insert("originalError".into(), Value::String(original));
            }
        }
        body.insert("timestamp".into(), Value::String(timestamp()));

        let mut response = (status, axum::Json(Value::Object(body))).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}
