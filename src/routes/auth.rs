use axum::Router;
use axum::extract::State;
use axum::routing::{get, post, put};
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::auth::extractor::{AuthUser, ClientInfo, MaybeAuthUser};
use crate::auth::session;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::access::require_auth;
use crate::response::ApiResponse;
use crate::services::activity::{self, NewActivity, action, module};
use crate::services::auth::{
    self as auth_service, LoginRequest, PasswordChange, ProfileUpdate, RegisterRequest,
};
use crate::services::users;
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    let public = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout));

    let authenticated = Router::new()
        .route("/me", get(me))
        .route("/check-admin", get(check_admin))
        .route("/profile", put(update_profile))
        .route("/change-password", put(change_password))
        .route_layer(axum::middleware::from_fn(require_auth));

    public.merge(authenticated)
}

async fn login(
    State(state): State<SharedState>,
    MaybeAuthUser(previous): MaybeAuthUser,
    client: ClientInfo,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse), AppError> {
    let user = auth_service::authenticate(&state.pool, &req, &client).await?;
    let (token, snapshot) = auth_service::open_session(
        &state.pool,
        &state.config.session_secret,
        &user,
        previous.as_ref(),
    )
    .await?;

    activity::record(
        &state.pool,
        NewActivity::new(
            Some(user.id),
            snapshot.role.into(),
            action::LOGIN,
            module::AUTENTICACION,
            format!("{} inició sesión", user.full_name()),
        )
        .resource("Usuario", user.id)
        .client(&client),
    )
    .await;

    let cookie = session::session_cookie(&token, state.config.environment.is_production());
    Ok((
        jar.add(cookie),
        ApiResponse::ok(json!({ "user": snapshot })).with_message("Inicio de sesión exitoso"),
    ))
}

async fn register(
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<ApiResponse, AppError> {
    let user = auth_service::register(&state.pool, &req).await?;

    activity::record(
        &state.pool,
        NewActivity::system(
            action::REGISTRO,
            module::AUTENTICACION,
            format!("Nuevo usuario registrado: {}", user.email),
        )
        .resource("Usuario", user.id)
        .client(&client),
    )
    .await;

    Ok(ApiResponse::created(&user).with_message("Usuario registrado exitosamente"))
}

async fn logout(
    State(state): State<SharedState>,
    MaybeAuthUser(user): MaybeAuthUser,
    client: ClientInfo,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse), AppError> {
    if let Some(user) = user {
        auth_service::close_session(&state.pool, &user).await?;
        activity::record(
            &state.pool,
            NewActivity::by(
                &user,
                action::LOGOUT,
                module::AUTENTICACION,
                format!("{} cerró sesión", user.full_name()),
            )
            .client(&client),
        )
        .await;
    }

    Ok((
        jar.add(session::clear_cookie()),
        ApiResponse::message("Sesión cerrada exitosamente"),
    ))
}

async fn me(user: AuthUser, State(state): State<SharedState>) -> Result<ApiResponse, AppError> {
    let current = users::get(&state.pool, user.user_id).await?;
    Ok(ApiResponse::ok(&current))
}

async fn check_admin(user: AuthUser) -> ApiResponse {
    ApiResponse::ok(json!({
        "is_admin": user.role.is_admin(),
        "role": user.role.as_str(),
    }))
}

async fn update_profile(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> Result<ApiResponse, AppError> {
    let updated = auth_service::update_profile(&state.pool, &user, &req).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::ACTUALIZACION,
            module::USUARIOS,
            format!("{} actualizó su perfil", updated.full_name()),
        )
        .resource("Usuario", user.user_id)
        .metadata(json!({
            "first_name": req.first_name,
            "last_name": req.last_name,
            "email": req.email,
            "phone": req.phone,
        }))
        .client(&client),
    )
    .await;

    Ok(ApiResponse::ok(&updated).with_message("Perfil actualizado exitosamente"))
}

async fn change_password(
    user: AuthUser,
    State(state): State<SharedState>,
    client: ClientInfo,
    ApiJson(req): ApiJson<PasswordChange>,
) -> Result<ApiResponse, AppError> {
    auth_service::change_password(&state.pool, user.user_id, &req).await?;

    activity::record(
        &state.pool,
        NewActivity::by(
            &user,
            action::CAMBIO_PASSWORD,
            module::AUTENTICACION,
            format!("{} cambió su contraseña", user.full_name()),
        )
        .resource("Usuario", user.user_id)
        .client(&client),
    )
    .await;

    Ok(ApiResponse::message("Contraseña actualizada exitosamente"))
}
