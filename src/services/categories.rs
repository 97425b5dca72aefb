use serde::Deserialize;
use sqlx::MySqlPool;

use crate::db;
use crate::error::AppError;
use crate::models::Category;
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn list(pool: &MySqlPool) -> Result<Vec<Category>, AppError> {
    Ok(db::base::list_active::<Category>(pool).await?)
}

pub async fn get(pool: &MySqlPool, id: i64) -> Result<Category, AppError> {
    db::base::find_active_by_id::<Category>(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Categoría no encontrada".to_string()))
}

pub async fn create(pool: &MySqlPool, input: &CategoryInput) -> Result<Category, AppError> {
    let name = validation::clean(input.name.as_deref()).ok_or_else(|| {
        AppError::BadRequest("El nombre de la categoría es requerido".to_string())
    })?;
    validation::name("El nombre", &name)?;
    let description = validation::clean(input.description.as_deref());

    Ok(db::categories::create(pool, &name, description.as_deref()).await?)
}

pub async fn update(
    pool: &MySqlPool,
    id: i64,
    input: &CategoryInput,
) -> Result<Category, AppError> {
    get(pool, id).await?;

    let name = validation::clean(input.name.as_deref());
    if let Some(name) = &name {
        validation::name("El nombre", name)?;
    }
    let description = validation::clean(input.description.as_deref());

    db::categories::update(pool, id, name.as_deref(), description.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound("Categoría no encontrada".to_string()))
}

pub async fn delete(pool: &MySqlPool, id: i64) -> Result<Category, AppError> {
    let category = get(pool, id).await?;
    db::base::soft_delete::<Category>(pool, id).await?;
    Ok(category)
}
