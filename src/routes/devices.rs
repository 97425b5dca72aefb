use axum::Router;
use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use serde::Deserialize;
use serde_json::json;

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::db::devices::DeviceFilters;
use crate::error::AppError;
use crate::extract::{ApiPath, ApiQuery};
use crate::middleware::access::{require_admin, require_vendedor};
use crate::response::ApiResponse;
use crate::services::activity::{self, NewActivity, action, module};
use crate::services::devices;
use crate::state::SharedState;
use crate::upload::DeviceForm;

pub fn router(state: &SharedState) -> Router<SharedState> {
    let public = Router::new()
        .route("/", get(list))
        .route("/search", get(search))
        .route("/estadisticas", get(stats))
        .route("/{id}", get(get_one));

    let vendor = Router::new()
        .route("/", post(create))
        .route("/{id}", put(update))
        .route_layer(from_fn_with_state(state.clone(), require_vendedor));

    let admin = Router::new()
        .route("/{id}", delete(remove))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    public.merge(vendor).merge(admin)
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn list(
    State(state): State<SharedState>,
    ApiQuery(filters): ApiQuery<DeviceFilters>,
) -> Result<ApiResponse, AppError> {
    let devices = devices::list(&state, &filters).await?;
    Ok(ApiResponse::list(&devices))
}

async fn search(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<ApiResponse, AppError> {
    let devices = devices::search(&state, query.q.as_deref()).await?;
    Ok(ApiResponse::list(&devices))
}

async fn stats(State(state): State<SharedState>) -> Result<ApiResponse, AppError> {
    Ok(ApiResponse::ok(devices::stats(&state).await?))
}

async fn get_one(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, AppError> {
    Ok(ApiResponse::ok(devices::get(&state, id).await?))
}

async fn create(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    form: DeviceForm,
) -> Result<ApiResponse, AppError> {
    let device = devices::create(&state, &form).await?;
    let core = &device.details.device;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::CREACION,
            module::DISPOSITIVOS,
            format!("Creó nuevo dispositivo: {}", core.name),
        )
        .resource("Dispositivo", core.id)
        .metadata(json!({
            "nombre": core.name,
            "precio": core.price,
            "imagen_subida": form.image.is_some(),
        }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::created(&device).with_message("Dispositivo creado exitosamente"))
}

async fn update(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
    form: DeviceForm,
) -> Result<ApiResponse, AppError> {
    let device = devices::update(&state, id, &form).await?;

    let changed: Vec<&String> = form.fields.keys().collect();
    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::ACTUALIZACION,
            module::DISPOSITIVOS,
            format!("Actualizó dispositivo: {}", device.details.device.name),
        )
        .resource("Dispositivo", id)
        .metadata(json!({
            "campos": changed,
            "nueva_imagen": form.image.is_some(),
        }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::ok(&device).with_message("Dispositivo actualizado exitosamente"))
}

async fn remove(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, AppError> {
    let device = devices::delete(&state, id).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::ELIMINACION,
            module::DISPOSITIVOS,
            format!("Eliminó dispositivo: {}", device.name),
        )
        .resource("Dispositivo", id)
        .client(&client),
    )
    .await;

    Ok(ApiResponse::message("Dispositivo eliminado exitosamente"))
}
