use axum::Router;
use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use serde_json::json;

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::access::require_admin;
use crate::response::ApiResponse;
use crate::services::activity::{self, NewActivity, action, module};
use crate::services::brands::{self, BrandInput};
use crate::state::SharedState;

pub fn router(state: &SharedState) -> Router<SharedState> {
    let public = Router::new()
        .route("/", get(list))
        .route("/{id}", get(get_one));

    let admin = Router::new()
        .route("/", post(create))
        .route("/{id}", put(update).delete(remove))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    public.merge(admin)
}

async fn list(State(state): State<SharedState>) -> Result<ApiResponse, AppError> {
    let brands = brands::list(&state.pool).await?;
    Ok(ApiResponse::list(&brands))
}

async fn get_one(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, AppError> {
    Ok(ApiResponse::ok(brands::get(&state.pool, id).await?))
}

async fn create(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiJson(input): ApiJson<BrandInput>,
) -> Result<ApiResponse, AppError> {
    let brand = brands::create(&state.pool, &input).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::CREACION,
            module::MARCAS,
            format!("Creó nueva marca: {}", brand.name),
        )
        .resource("Marca", brand.id)
        .metadata(json!({ "nombre": brand.name, "pais": brand.country }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::created(&brand).with_message("Marca creada exitosamente"))
}

async fn update(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<BrandInput>,
) -> Result<ApiResponse, AppError> {
    let brand = brands::update(&state.pool, id, &input).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::ACTUALIZACION,
            module::MARCAS,
            format!("Actualizó marca: {}", brand.name),
        )
        .resource("Marca", id)
        .metadata(json!({
            "name": input.name,
            "description": input.description,
            "country": input.country,
        }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::ok(&brand).with_message("Marca actualizada exitosamente"))
}

async fn remove(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, AppError> {
    let brand = brands::delete(&state.pool, id).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::ELIMINACION,
            module::MARCAS,
            format!("Eliminó marca: {}", brand.name),
        )
        .resource("Marca", id)
        .client(&client),
    )
    .await;

    Ok(ApiResponse::message("Marca eliminada exitosamente"))
}
