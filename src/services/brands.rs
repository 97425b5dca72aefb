use serde::Deserialize;
use sqlx::MySqlPool;

use crate::db;
use crate::error::AppError;
use crate::models::Brand;
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct BrandInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
}

pub async fn list(pool: &MySqlPool) -> Result<Vec<Brand>, AppError> {
    Ok(db::base::list_active::<Brand>(pool).await?)
}

pub async fn get(pool: &MySqlPool, id: i64) -> Result<Brand, AppError> {
    db::base::find_active_by_id::<Brand>(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Marca no encontrada".to_string()))
}

pub async fn create(pool: &MySqlPool, input: &BrandInput) -> Result<Brand, AppError> {
    let name = validation::clean(input.name.as_deref())
        .ok_or_else(|| AppError::BadRequest("El nombre de la marca es requerido".to_string()))?;
    validation::name("El nombre", &name)?;
    let description = validation::clean(input.description.as_deref());
    let country = validation::clean(input.country.as_deref());

    Ok(db::brands::create(pool, &name, description.as_deref(), country.as_deref()).await?)
}

pub async fn update(pool: &MySqlPool, id: i64, input: &BrandInput) -> Result<Brand, AppError> {
    get(pool, id).await?;

    let name = validation::clean(input.name.as_deref());
    if let Some(name) = &name {
        validation::name("El nombre", name)?;
    }
    let description = validation::clean(input.description.as_deref());
    let country = validation::clean(input.country.as_deref());

    db::brands::update(
        pool,
        id,
        name.as_deref(),
        description.as_deref(),
        country.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Marca no encontrada".to_string()))
}

pub async fn delete(pool: &MySqlPool, id: i64) -> Result<Brand, AppError> {
    let brand = get(pool, id).await?;
    db::base::soft_delete::<Brand>(pool, id).await?;
    Ok(brand)
}
