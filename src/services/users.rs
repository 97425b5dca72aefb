use sqlx::MySqlPool;

use crate::auth::extractor::AuthUser;
use crate::auth::role::Role;
use crate::db;
use crate::db::users::UserFilters;
use crate::error::AppError;
use crate::models::{Status, User};
use crate::services::auth::{ProfileUpdate, profile_changes};
use crate::validation;

fn not_found() -> AppError {
    AppError::NotFound("Usuario no encontrado".to_string())
}

pub async fn list(pool: &MySqlPool, filters: &UserFilters) -> Result<Vec<User>, AppError> {
    let role = validation::clean(filters.rol.as_deref())
        .map(|raw| raw.parse::<Role>().map_err(AppError::BadRequest))
        .transpose()?;
    let status = match validation::clean(filters.estado.as_deref()) {
        Some(raw) => raw.parse::<Status>().map_err(AppError::BadRequest)?,
        None => Status::Activo,
    };

    Ok(db::users::list(pool, filters, role, status).await?)
}

pub async fn get(pool: &MySqlPool, id: i64) -> Result<User, AppError> {
    db::base::find_active_by_id::<User>(pool, id)
        .await?
        .ok_or_else(not_found)
}

pub async fn update(pool: &MySqlPool, id: i64, req: &ProfileUpdate) -> Result<User, AppError> {
    get(pool, id).await?;
    let changes = profile_changes(pool, id, req).await?;
    db::users::update_profile(pool, id, &changes)
        .await?
        .ok_or_else(not_found)
}

/// Soft-deletes a user and ends their sessions. Admins cannot remove themselves.
pub async fn delete(pool: &MySqlPool, actor: &AuthUser, id: i64) -> Result<User, AppError> {
    if actor.user_id == id {
        return Err(AppError::BadRequest(
            "No puedes eliminar tu propia cuenta".to_string(),
        ));
    }

    let user = get(pool, id).await?;
    db::base::soft_delete::<User>(pool, id).await?;
    let revoked = db::sessions::delete_for_user(pool, id).await?;
    tracing::info!(user_id = id, revoked, "User deactivated");
    Ok(user)
}

pub async fn change_role(
    pool: &MySqlPool,
    id: i64,
    role: Option<&str>,
) -> Result<(User, Role), AppError> {
    let role = validation::clean(role)
        .ok_or_else(|| AppError::BadRequest("El rol es requerido".to_string()))?
        .parse::<Role>()
        .map_err(AppError::BadRequest)?;

    let user = get(pool, id).await?;
    db::users::update_role(pool, id, role).await?;
    db::sessions::delete_for_user(pool, id).await?;
    Ok((user, role))
}

/// Changes the lifecycle status. Works on inactive users so they can be
/// reactivated.
pub async fn change_status(
    pool: &MySqlPool,
    id: i64,
    status: Option<&str>,
) -> Result<(User, Status), AppError> {
    let status = validation::clean(status)
        .ok_or_else(|| AppError::BadRequest("El estado es requerido".to_string()))?
        .parse::<Status>()
        .map_err(AppError::BadRequest)?;

    let user = db::base::find_by_id::<User>(pool, id)
        .await?
        .ok_or_else(not_found)?;
    db::base::set_status::<User>(pool, id, status).await?;
    db::sessions::delete_for_user(pool, id).await?;
    Ok((user, status))
}
