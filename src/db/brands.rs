use sqlx::MySqlPool;

use crate::db::base;
use crate::models::{Brand, Status};

pub async fn create(
    pool: &MySqlPool,
    name: &str,
    description: Option<&str>,
    country: Option<&str>,
) -> Result<Brand, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO brands (name, description, country, status) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(description)
    .bind(country)
    .bind(Status::Activo.as_str())
    .execute(pool)
    .await?;

    base::find_by_id::<Brand>(pool, result.last_insert_id() as i64)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update(
    pool: &MySqlPool,
    id: i64,
    name: Option<&str>,
    description: Option<&str>,
    country: Option<&str>,
) -> Result<Option<Brand>, sqlx::Error> {
    sqlx::query(
        "UPDATE brands
         SET name = COALESCE(?, name),
             description = COALESCE(?, description),
             country = COALESCE(?, country),
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(name)
    .bind(description)
    .bind(country)
    .bind(id)
    .execute(pool)
    .await?;

    base::find_by_id(pool, id).await
}
