use axum::extract::{OriginalUri, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::json;

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::error::AppError;
use crate::middleware::audit::module_for_path;
use crate::services::activity::{self, NewActivity, action};
use crate::state::SharedState;

fn unauthorized() -> AppError {
    AppError::Unauthorized("No autorizado. Debe iniciar sesión".to_string())
}

pub async fn require_auth(req: Request, next: Next) -> Result<Response, AppError> {
    if req.extensions().get::<AuthUser>().is_none() {
        return Err(unauthorized());
    }
    Ok(next.run(req).await)
}

pub async fn require_vendedor(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    gate(&state, req, next, AuthUser::require_vendedor).await
}

pub async fn require_admin(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    gate(&state, req, next, AuthUser::require_admin).await
}

async fn gate(
    state: &SharedState,
    req: Request,
    next: Next,
    check: fn(&AuthUser) -> Result<(), AppError>,
) -> Result<Response, AppError> {
    let Some(user) = req.extensions().get::<AuthUser>().cloned() else {
        return Err(unauthorized());
    };

    if let Err(denied) = check(&user) {
        let path = req
            .extensions()
            .get::<OriginalUri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let method = req.method().to_string();
        let client = req
            .extensions()
            .get::<ClientInfo>()
            .cloned()
            .unwrap_or_default();

        tracing::warn!(user_id = user.user_id, %path, "Access denied for role {}", user.role);

        activity::record(
            &state.pool,
            NewActivity::by(
                &user,
                action::ACCESO_DENEGADO,
                module_for_path(&path),
                format!(
                    "{} intentó acceder a {method} {path} sin permisos suficientes",
                    user.full_name()
                ),
            )
            .metadata(json!({
                "metodo": method,
                "ruta": path,
                "rol": user.role.as_str(),
            }))
            .client(&client),
        )
        .await;

        return Err(denied);
    }

    Ok(next.run(req).await)
}
