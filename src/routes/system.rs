use axum::Router;
use axum::extract::{OriginalUri, State};
use axum::http::Method;
use axum::routing::get;
use serde_json::json;

use crate::error::AppError;
use crate::response::timestamp;
use crate::state::SharedState;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(welcome))
        .route("/api", get(index))
        .route("/api/health", get(health))
}

async fn welcome(State(state): State<SharedState>) -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "message": "🚀 Servidor Galugas API funcionando correctamente",
        "version": API_VERSION,
        "environment": state.config.environment.as_str(),
        "timestamp": timestamp(),
        "documentation": "/api",
    }))
}

async fn index() -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "message": "Bienvenido a la API de Galugas",
        "version": API_VERSION,
        "timestamp": timestamp(),
        "endpoints": {
            "auth": "/api/auth",
            "dispositivos": "/api/dispositivos",
            "categorias": "/api/categorias",
            "marcas": "/api/marcas",
            "usuarios": "/api/usuarios",
            "logs": "/api/logs",
            "health": "/api/health",
        },
    }))
}

async fn health(State(state): State<SharedState>) -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "status": "OK",
        "timestamp": timestamp(),
        "environment": state.config.environment.as_str(),
        "version": API_VERSION,
    }))
}

pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("Ruta no encontrada - {method} {}", uri.path()))
}
