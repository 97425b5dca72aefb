use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::auth::role::Role;
use crate::auth::{password, session};
use crate::db;
use crate::db::users::{NewUser, ProfileChanges};
use crate::error::AppError;
use crate::models::{SessionUser, Status, User};
use crate::services::activity::{self, NewActivity, action, module};
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    #[serde(alias = "contrasena")]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "contrasena")]
    pub password: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks the credentials of an active account. Every failure is recorded
/// against the system actor.
pub async fn authenticate(
    pool: &MySqlPool,
    req: &LoginRequest,
    client: &ClientInfo,
) -> Result<User, AppError> {
    let email = validation::clean(req.email.as_deref());
    let password = req.password.as_deref().filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::BadRequest(
            "Email y contraseña son requeridos".to_string(),
        ));
    };
    let email = normalize_email(&email);

    let user = db::users::find_by_email(pool, &email).await?;
    let reason = match &user {
        None => Some("usuario inexistente"),
        Some(u) if !password::verify(password, &u.password_hash) => Some("contraseña incorrecta"),
        Some(u) if u.status != Status::Activo.as_str() => Some("cuenta no activa"),
        Some(_) => None,
    };

    match (user, reason) {
        (Some(user), None) => Ok(user),
        (_, reason) => {
            activity::record(
                pool,
                NewActivity::system(
                    action::ERROR_AUTENTICACION,
                    module::AUTENTICACION,
                    format!("Intento de inicio de sesión fallido para {email}"),
                )
                .metadata(json!({ "email": email, "motivo": reason }))
                .client(client),
            )
            .await;
            Err(AppError::Unauthorized("Credenciales inválidas".to_string()))
        }
    }
}

pub fn session_user(user: &User) -> Result<SessionUser, AppError> {
    let role = user
        .role
        .parse::<Role>()
        .map_err(|e| AppError::Internal(format!("User {} has bad role: {e}", user.id)))?;
    Ok(SessionUser {
        user_id: user.id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        role,
    })
}

/// Starts a session for `user`, replacing `previous` if the browser held one.
/// Returns the cookie token and the stored snapshot.
pub async fn open_session(
    pool: &MySqlPool,
    secret: &str,
    user: &User,
    previous: Option<&AuthUser>,
) -> Result<(String, SessionUser), AppError> {
    if let Some(prev) = previous {
        db::sessions::delete(pool, &prev.session_id).await?;
    }

    let snapshot = session_user(user)?;
    let token = session::generate_token();
    let id = session::hash_token(secret, &token);
    let expires_at = Utc::now() + Duration::hours(session::SESSION_TTL_HOURS);
    db::sessions::create(pool, &id, &snapshot, expires_at).await?;

    Ok((token, snapshot))
}

pub async fn close_session(pool: &MySqlPool, user: &AuthUser) -> Result<(), AppError> {
    db::sessions::delete(pool, &user.session_id).await?;
    Ok(())
}

pub async fn register(pool: &MySqlPool, req: &RegisterRequest) -> Result<User, AppError> {
    let first_name = validation::clean(req.first_name.as_deref());
    let last_name = validation::clean(req.last_name.as_deref());
    let email = validation::clean(req.email.as_deref());
    let password = req.password.as_deref().filter(|p| !p.is_empty());

    let mut missing = Vec::new();
    if first_name.is_none() {
        missing.push("first_name");
    }
    if last_name.is_none() {
        missing.push("last_name");
    }
    if email.is_none() {
        missing.push("email");
    }
    if password.is_none() {
        missing.push("password");
    }
    let (Some(first_name), Some(last_name), Some(email), Some(password)) =
        (first_name, last_name, email, password)
    else {
        return Err(AppError::required_fields(&missing));
    };

    let email = normalize_email(&email);
    validation::email(&email)?;
    validation::password(password)?;
    validation::name("El nombre", &first_name)?;
    validation::name("El apellido", &last_name)?;

    if db::users::email_taken(pool, &email, None).await? {
        return Err(AppError::BadRequest(
            "Ya existe un usuario con ese email".to_string(),
        ));
    }

    let hash = password::hash(password).map_err(AppError::Internal)?;
    let phone = validation::clean(req.phone.as_deref());

    let user = db::users::create(
        pool,
        &NewUser {
            first_name: &first_name,
            last_name: &last_name,
            email: &email,
            password_hash: &hash,
            phone: phone.as_deref(),
            role: Role::Usuario,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "Registered new user");
    Ok(user)
}

/// Validates a profile patch and resolves it against `user_id`'s email.
pub async fn profile_changes(
    pool: &MySqlPool,
    user_id: i64,
    req: &ProfileUpdate,
) -> Result<ProfileChanges, AppError> {
    let changes = ProfileChanges {
        first_name: validation::clean(req.first_name.as_deref()),
        last_name: validation::clean(req.last_name.as_deref()),
        email: validation::clean(req.email.as_deref()).map(|e| normalize_email(&e)),
        phone: validation::clean(req.phone.as_deref()),
    };

    if let Some(first_name) = &changes.first_name {
        validation::name("El nombre", first_name)?;
    }
    if let Some(last_name) = &changes.last_name {
        validation::name("El apellido", last_name)?;
    }
    if let Some(email) = &changes.email {
        validation::email(email)?;
        if db::users::email_taken(pool, email, Some(user_id)).await? {
            return Err(AppError::BadRequest("El email ya está en uso".to_string()));
        }
    }

    Ok(changes)
}

/// Updates the caller's own profile and rewrites their session snapshot.
pub async fn update_profile(
    pool: &MySqlPool,
    user: &AuthUser,
    req: &ProfileUpdate,
) -> Result<User, AppError> {
    let changes = profile_changes(pool, user.user_id, req).await?;
    let updated = db::users::update_profile(pool, user.user_id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

    db::sessions::update_data(pool, &user.session_id, &session_user(&updated)?).await?;
    Ok(updated)
}

pub async fn change_password(
    pool: &MySqlPool,
    user_id: i64,
    req: &PasswordChange,
) -> Result<(), AppError> {
    let current = req.current_password.as_deref().filter(|p| !p.is_empty());
    let new = req.new_password.as_deref().filter(|p| !p.is_empty());
    let (Some(current), Some(new)) = (current, new) else {
        let mut missing = Vec::new();
        if current.is_none() {
            missing.push("current_password");
        }
        if new.is_none() {
            missing.push("new_password");
        }
        return Err(AppError::required_fields(&missing));
    };

    let user = db::base::find_by_id::<User>(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

    if !password::verify(current, &user.password_hash) {
        return Err(AppError::BadRequest("Contraseña actual incorrecta".to_string()));
    }
    validation::password(new)?;

    let hash = password::hash(new).map_err(AppError::Internal)?;
    db::users::update_password(pool, user_id, &hash).await?;
    Ok(())
}
