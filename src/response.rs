use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// RFC 3339 timestamp with millisecond precision, as carried by every envelope.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Success envelope: `{success: true, data?, count?, message?, ..., timestamp}`.
pub struct ApiResponse {
    status: StatusCode,
    body: Map<String, Value>,
}

impl ApiResponse {
    pub fn ok(data: impl Serialize) -> Self {
        Self::empty(StatusCode::OK).with("data", data)
    }

    pub fn created(data: impl Serialize) -> Self {
        Self::empty(StatusCode::CREATED).with("data", data)
    }

    /// A list payload; `count` is the number of items returned.
    pub fn list<T: Serialize>(items: &[T]) -> Self {
        Self::ok(items).with("count", items.len())
    }

    pub fn message(message: &str) -> Self {
        Self::empty(StatusCode::OK).with_message(message)
    }

    fn empty(status: StatusCode) -> Self {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(true));
        Self { status, body }
    }

    pub fn with_message(self, message: &str) -> Self {
        self.with("message", message)
    }

    /// Adds an arbitrary top-level key (e.g. `paginacion`).
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.body.insert(key.to_string(), value);
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(mut self) -> Response {
        self.body
            .insert("timestamp".into(), Value::String(timestamp()));
        (self.status, Json(Value::Object(self.body))).into_response()
    }
}
