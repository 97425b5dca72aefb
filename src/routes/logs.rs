use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::db::activity_logs::LogQuery;
use crate::error::AppError;
use crate::extract::{ApiQuery, blank_as_none};
use crate::middleware::access::{require_admin, require_auth};
use crate::response::ApiResponse;
use crate::services::activity::{self, NewActivity, action, module};
use crate::state::SharedState;

pub fn router(state: &SharedState) -> Router<SharedState> {
    let own = Router::new()
        .route("/mis-actividades", get(my_activity))
        .route_layer(from_fn(require_auth));

    let admin = Router::new()
        .route("/", get(list))
        .route("/estadisticas", get(stats))
        .route("/exportar", get(export))
        .route("/limpiar", post(purge))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    own.merge(admin)
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    limite: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct PeriodQuery {
    periodo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PurgeRequest {
    dias: Option<i64>,
}

async fn my_activity(
    user: AuthUser,
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<ApiResponse, AppError> {
    let entries = activity::recent_for_user(&state.pool, user.user_id, query.limite).await?;
    Ok(ApiResponse::list(&entries))
}

async fn list(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<LogQuery>,
) -> Result<ApiResponse, AppError> {
    let (entries, pagination) = activity::query(&state.pool, &query).await?;
    Ok(ApiResponse::ok(&entries).with("paginacion", pagination))
}

async fn stats(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> Result<ApiResponse, AppError> {
    let stats = activity::stats(&state.pool, query.periodo.as_deref()).await?;
    Ok(ApiResponse::ok(stats))
}

async fn export(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiQuery(query): ApiQuery<LogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let csv = activity::export(&state.pool, &query).await?;
    let filename = activity::export_filename();

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::EXPORTACION,
            module::LOGS,
            format!("{} exportó los registros de actividad", user.full_name()),
        )
        .metadata(json!({ "archivo": filename }))
        .client(&client),
    )
    .await;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}

/// The body is optional; an empty one purges with the default retention.
async fn purge(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    body: Bytes,
) -> Result<ApiResponse, AppError> {
    let req: PurgeRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PurgeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("JSON inválido: {e}")))?
    };
    let days = req.dias.unwrap_or(activity::DEFAULT_RETENTION_DAYS);

    let outcome = activity::purge(&state.pool, days).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::MANTENIMIENTO,
            module::LOGS,
            format!(
                "Limpió logs anteriores a {days} días ({} registros eliminados)",
                outcome.eliminados
            ),
        )
        .metadata(json!({ "dias": days, "eliminados": outcome.eliminados }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::ok(&outcome).with_message(&outcome.mensaje))
}
