use sqlx::MySqlPool;

use crate::db::base;
use crate::models::{Category, Status};

pub async fn create(
    pool: &MySqlPool,
    name: &str,
    description: Option<&str>,
) -> Result<Category, sqlx::Error> {
    let result = sqlx::query("INSERT INTO categories (name, description, status) VALUES (?, ?, ?)")
        .bind(name)
        .bind(description)
        .bind(Status::Activo.as_str())
        .execute(pool)
        .await?;

    base::find_by_id::<Category>(pool, result.last_insert_id() as i64)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Partial update; `None` keeps the stored value.
pub async fn update(
    pool: &MySqlPool,
    id: i64,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query(
        "UPDATE categories
         SET name = COALESCE(?, name),
             description = COALESCE(?, description),
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(name)
    .bind(description)
    .bind(id)
    .execute(pool)
    .await?;

    base::find_by_id(pool, id).await
}
