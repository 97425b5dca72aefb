use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::role::Role;
use crate::error::AppError;
use crate::models::SessionUser;

/// The user behind the current session. Resolved once per request by the
/// context middleware and read back from request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub session_id: String,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_session(session_id: String, user: SessionUser) -> Self {
        Self {
            session_id,
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Acceso denegado. Se requieren permisos de administrador".to_string(),
            ))
        }
    }

    pub fn require_vendedor(&self) -> Result<(), AppError> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Acceso denegado. Se requieren permisos de vendedor o administrador".to_string(),
            ))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| {
                AppError::Unauthorized("No autorizado. Debe iniciar sesión".to_string())
            })
    }
}

/// Session user when there is one; never rejects.
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

/// Origin of the request as attached to activity entries.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ClientInfo>()
            .cloned()
            .unwrap_or_default())
    }
}
