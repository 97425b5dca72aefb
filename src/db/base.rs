//! Queries shared by every table that carries an `id` primary key. Tables
//! with a `status` column additionally get the active-only helpers through
//! [`SoftDelete`].

use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, MySqlPool};

use crate::models::{Brand, Category, Device, Status, TechnicalInfo, User};

pub trait Entity: for<'r> FromRow<'r, MySqlRow> + Send + Unpin {
    const TABLE: &'static str;
}

/// Marker for entities deleted by flipping `status` to `Inactivo`.
pub trait SoftDelete: Entity {}

impl Entity for Device {
    const TABLE: &'static str = "devices";
}
impl SoftDelete for Device {}

impl Entity for Category {
    const TABLE: &'static str = "categories";
}
impl SoftDelete for Category {}

impl Entity for Brand {
    const TABLE: &'static str = "brands";
}
impl SoftDelete for Brand {}

impl Entity for User {
    const TABLE: &'static str = "users";
}
impl SoftDelete for User {}

impl Entity for TechnicalInfo {
    const TABLE: &'static str = "technical_info";
}

pub async fn find_by_id<T: Entity>(pool: &MySqlPool, id: i64) -> Result<Option<T>, sqlx::Error> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", T::TABLE);
    sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_active_by_id<T: SoftDelete>(
    pool: &MySqlPool,
    id: i64,
) -> Result<Option<T>, sqlx::Error> {
    let sql = format!("SELECT * FROM {} WHERE id = ? AND status = ?", T::TABLE);
    sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .bind(Status::Activo.as_str())
        .fetch_optional(pool)
        .await
}

/// Marks the row `Inactivo`. Returns false when no row has this id.
pub async fn soft_delete<T: SoftDelete>(pool: &MySqlPool, id: i64) -> Result<bool, sqlx::Error> {
    set_status::<T>(pool, id, Status::Inactivo).await
}

pub async fn set_status<T: SoftDelete>(
    pool: &MySqlPool,
    id: i64,
    status: Status,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        T::TABLE
    );
    let result = sqlx::query(&sql)
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_active<T: SoftDelete>(pool: &MySqlPool) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE status = ?", T::TABLE);
    sqlx::query_scalar(&sql)
        .bind(Status::Activo.as_str())
        .fetch_one(pool)
        .await
}

/// All active rows ordered by name.
pub async fn list_active<T: SoftDelete>(pool: &MySqlPool) -> Result<Vec<T>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE status = ? ORDER BY name ASC",
        T::TABLE
    );
    sqlx::query_as::<_, T>(&sql)
        .bind(Status::Activo.as_str())
        .fetch_all(pool)
        .await
}
