use serde::Deserialize;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::auth::role::Role;
use crate::db::base;
use crate::models::{Status, User};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserFilters {
    pub rol: Option<String>,
    pub estado: Option<String>,
    pub search: Option<String>,
}

pub struct NewUser<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: Option<&'a str>,
    pub role: Role,
}

/// Profile fields a user or an admin may change; `None` keeps the stored value.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub async fn create(pool: &MySqlPool, user: &NewUser<'_>) -> Result<User, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (first_name, last_name, email, password_hash, phone, role, status)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.phone)
    .bind(user.role.as_str())
    .bind(Status::Activo.as_str())
    .execute(pool)
    .await?;

    base::find_by_id::<User>(pool, result.last_insert_id() as i64)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn find_by_email(pool: &MySqlPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Whether another user already owns `email`.
pub async fn email_taken(
    pool: &MySqlPool,
    email: &str,
    except_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM users WHERE email = ? AND (? IS NULL OR id <> ?) LIMIT 1",
    )
    .bind(email)
    .bind(except_id)
    .bind(except_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub async fn list(
    pool: &MySqlPool,
    filters: &UserFilters,
    role: Option<Role>,
    status: Status,
) -> Result<Vec<User>, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new("SELECT * FROM users WHERE status = ");
    qb.push_bind(status.as_str());

    if let Some(role) = role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    qb.push(" ORDER BY created_at DESC, id DESC");
    qb.build_query_as::<User>().fetch_all(pool).await
}

pub async fn update_profile(
    pool: &MySqlPool,
    id: i64,
    changes: &ProfileChanges,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query(
        "UPDATE users
         SET first_name = COALESCE(?, first_name),
             last_name = COALESCE(?, last_name),
             email = COALESCE(?, email),
             phone = COALESCE(?, phone),
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(&changes.first_name)
    .bind(&changes.last_name)
    .bind(&changes.email)
    .bind(&changes.phone)
    .bind(id)
    .execute(pool)
    .await?;

    base::find_by_id(pool, id).await
}

pub async fn update_password(
    pool: &MySqlPool,
    id: i64,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_role(pool: &MySqlPool, id: i64, role: Role) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE users SET role = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}
