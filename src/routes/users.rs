use axum::Router;
use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, put};
use serde::Deserialize;
use serde_json::json;

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::db::users::UserFilters;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::access::require_admin;
use crate::response::ApiResponse;
use crate::services::activity::{self, NewActivity, action, module};
use crate::services::auth::ProfileUpdate;
use crate::services::users;
use crate::state::SharedState;

/// User administration. Every route is admin-only.
pub fn router(state: &SharedState) -> Router<SharedState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(get_one).put(update).delete(remove))
        .route("/{id}/role", put(change_role))
        .route("/{id}/status", put(change_status))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

#[derive(Debug, Default, Deserialize)]
struct RoleChange {
    #[serde(alias = "rol")]
    role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusChange {
    #[serde(alias = "estado")]
    status: Option<String>,
}

async fn list(
    State(state): State<SharedState>,
    ApiQuery(filters): ApiQuery<UserFilters>,
) -> Result<ApiResponse, AppError> {
    let users = users::list(&state.pool, &filters).await?;
    Ok(ApiResponse::list(&users))
}

async fn get_one(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, AppError> {
    Ok(ApiResponse::ok(users::get(&state.pool, id).await?))
}

async fn update(
    admin: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> Result<ApiResponse, AppError> {
    let user = users::update(&state.pool, id, &req).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &admin,
            action::ACTUALIZACION,
            module::USUARIOS,
            format!("Actualizó usuario: {}", user.email),
        )
        .resource("Usuario", id)
        .metadata(json!({
            "first_name": req.first_name,
            "last_name": req.last_name,
            "email": req.email,
            "phone": req.phone,
        }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::ok(&user).with_message("Usuario actualizado exitosamente"))
}

async fn remove(
    admin: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, AppError> {
    let user = users::delete(&state.pool, &admin, id).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &admin,
            action::ELIMINACION,
            module::USUARIOS,
            format!("Eliminó usuario: {}", user.email),
        )
        .resource("Usuario", id)
        .client(&client),
    )
    .await;

    Ok(ApiResponse::message("Usuario eliminado exitosamente"))
}

async fn change_role(
    admin: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RoleChange>,
) -> Result<ApiResponse, AppError> {
    let (user, role) = users::change_role(&state.pool, id, req.role.as_deref()).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &admin,
            action::CAMBIO_ROL,
            module::USUARIOS,
            format!("Cambió rol de {} de {} a {role}", user.email, user.role),
        )
        .resource("Usuario", id)
        .metadata(json!({ "rol_anterior": user.role, "rol_nuevo": role.as_str() }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::ok(json!({ "id": id, "role": role.as_str() }))
        .with_message("Rol actualizado exitosamente"))
}

async fn change_status(
    admin: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusChange>,
) -> Result<ApiResponse, AppError> {
    let (user, status) = users::change_status(&state.pool, id, req.status.as_deref()).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &admin,
            action::CAMBIO_ESTADO,
            module::USUARIOS,
            format!(
                "Cambió estado de {} de {} a {}",
                user.email,
                user.status,
                status.as_str()
            ),
        )
        .resource("Usuario", id)
        .metadata(json!({ "estado_anterior": user.status, "estado_nuevo": status.as_str() }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::ok(json!({ "id": id, "status": status.as_str() }))
        .with_message("Estado actualizado exitosamente"))
}
