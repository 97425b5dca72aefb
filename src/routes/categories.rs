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
use crate::services::categories::{self, CategoryInput};
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
    let categories = categories::list(&state.pool).await?;
    Ok(ApiResponse::list(&categories))
}

async fn get_one(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, AppError> {
    Ok(ApiResponse::ok(categories::get(&state.pool, id).await?))
}

async fn create(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<ApiResponse, AppError> {
    let category = categories::create(&state.pool, &input).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::CREACION,
            module::CATEGORIAS,
            format!("Creó nueva categoría: {}", category.name),
        )
        .resource("Categoria", category.id)
        .metadata(json!({ "nombre": category.name }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::created(&category).with_message("Categoría creada exitosamente"))
}

async fn update(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<ApiResponse, AppError> {
    let category = categories::update(&state.pool, id, &input).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::ACTUALIZACION,
            module::CATEGORIAS,
            format!("Actualizó categoría: {}", category.name),
        )
        .resource("Categoria", id)
        .metadata(json!({ "name": input.name, "description": input.description }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::ok(&category).with_message("Categoría actualizada exitosamente"))
}

async fn remove(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, AppError> {
    let category = categories::delete(&state.pool, id).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::ELIMINACION,
            module::CATEGORIAS,
            format!("Eliminó categoría: {}", category.name),
        )
        .resource("Categoria", id)
        .client(&client),
    )
    .await;

    Ok(ApiResponse::message("Categoría eliminada exitosamente"))
}
