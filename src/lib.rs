pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod maintenance;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod upload;
pub mod validation;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use sqlx::MySqlPool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::audit::record_requests;
use crate::middleware::context::load_context;
use crate::rate_limit::{ApiRateLimiter, limit_requests};
use crate::state::{AppState, SharedState};
use crate::upload::UploadStore;

fn cors(client_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true);

    match HeaderValue::from_str(client_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Invalid CLIENT_URL {client_url:?}, CORS disabled: {e}");
            layer
        }
    }
}

/// Builds the application router. Layers run outermost first: security
/// headers, CORS and tracing, then rate limiting, session context and the
/// request audit.
pub fn build_app(pool: MySqlPool, config: Config) -> (Router, SharedState) {
    error::expose_internal_errors(!config.environment.is_production());

    let state: SharedState = Arc::new(AppState {
        pool,
        limiter: ApiRateLimiter::new(config.rate_limit_max, config.rate_limit_window),
        uploads: UploadStore::new(config.upload_dir.clone(), config.max_file_size),
        config,
    });

    let app = Router::new()
        .merge(routes::api_routes(&state))
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()))
        .fallback(routes::system::not_found)
        .layer(from_fn_with_state(state.clone(), record_requests))
        .layer(from_fn_with_state(state.clone(), load_context))
        .layer(from_fn_with_state(state.clone(), limit_requests))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&state.config.client_url))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state.clone());

    (app, state)
}
