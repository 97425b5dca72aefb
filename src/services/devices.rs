use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::db;
use crate::db::devices::{DeviceChanges, DeviceFilters, NewDevice};
use crate::error::AppError;
use crate::models::{
    Availability, Brand, Category, Device, DeviceStats, DeviceView, NewTechnicalInfo, Status,
    TechnicalInfo,
};
use crate::state::AppState;
use crate::upload::DeviceForm;
use crate::validation;

fn not_found() -> AppError {
    AppError::NotFound("Dispositivo no encontrado".to_string())
}

/// Text value of a form field; numbers are accepted and blanks dropped.
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => validation::clean(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number<T: FromStr>(fields: &Map<String, Value>, key: &str) -> Result<Option<T>, AppError> {
    match text(fields, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{key} debe ser un número válido"))),
    }
}

fn date(fields: &Map<String, Value>, key: &str) -> Result<Option<NaiveDate>, AppError> {
    let Some(raw) = text(fields, key) else {
        return Ok(None);
    };
    // Accept full ISO timestamps by keeping the date part
    let day = raw.get(..10).unwrap_or(raw.as_str());
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::BadRequest("Fecha de lanzamiento inválida".to_string()))
}

fn availability(fields: &Map<String, Value>) -> Result<Option<Availability>, AppError> {
    text(fields, "availability")
        .map(|raw| raw.parse::<Availability>().map_err(AppError::BadRequest))
        .transpose()
}

/// Inline technical sheet, from a nested `technical_info` object or from
/// top-level fields of a flat form.
fn technical_info(fields: &Map<String, Value>) -> Result<NewTechnicalInfo, AppError> {
    let source = match fields.get("technical_info") {
        Some(Value::Object(nested)) => nested,
        _ => fields,
    };
    Ok(NewTechnicalInfo {
        processor: text(source, "processor"),
        ram_gb: number(source, "ram_gb")?,
        storage: text(source, "storage"),
        resolution: text(source, "resolution"),
        dimensions: text(source, "dimensions"),
        power: text(source, "power"),
        ports: text(source, "ports"),
        connectivity: text(source, "connectivity"),
        version: text(source, "version"),
        other: text(source, "other"),
    })
}

async fn ensure_brand(state: &AppState, id: i64) -> Result<(), AppError> {
    match db::base::find_active_by_id::<Brand>(&state.pool, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest("La marca especificada no existe".to_string())),
    }
}

async fn ensure_category(state: &AppState, id: i64) -> Result<(), AppError> {
    match db::base::find_active_by_id::<Category>(&state.pool, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest(
            "La categoría especificada no existe".to_string(),
        )),
    }
}

async fn view(state: &AppState, id: i64) -> Result<DeviceView, AppError> {
    let details = db::devices::find_active_details(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(DeviceView::new(details, &state.config.public_url))
}

pub async fn list(state: &AppState, filters: &DeviceFilters) -> Result<Vec<DeviceView>, AppError> {
    let status = match validation::clean(filters.estado.as_deref()) {
        Some(raw) => raw.parse::<Status>().map_err(AppError::BadRequest)?,
        None => Status::Activo,
    };

    let rows = db::devices::list(&state.pool, filters, status).await?;
    Ok(rows
        .into_iter()
        .map(|d| DeviceView::new(d, &state.config.public_url))
        .collect())
}

pub async fn search(state: &AppState, term: Option<&str>) -> Result<Vec<DeviceView>, AppError> {
    let term = validation::clean(term).ok_or_else(|| {
        AppError::BadRequest("El término de búsqueda es requerido".to_string())
    })?;
    let filters = DeviceFilters {
        search: Some(term),
        ..Default::default()
    };
    list(state, &filters).await
}

pub async fn get(state: &AppState, id: i64) -> Result<DeviceView, AppError> {
    view(state, id).await
}

pub async fn stats(state: &AppState) -> Result<DeviceStats, AppError> {
    let pool = &state.pool;
    Ok(DeviceStats {
        total: db::base::count_active::<Device>(pool).await?,
        by_category: db::devices::count_by_category(pool).await?,
        by_brand: db::devices::count_by_brand(pool).await?,
        average_price: db::devices::average_price(pool).await?,
        recent_releases: db::devices::recent_releases(pool, 5).await?,
    })
}

pub async fn create(state: &AppState, form: &DeviceForm) -> Result<DeviceView, AppError> {
    let fields = &form.fields;

    let name = text(fields, "name");
    let price: Option<f64> = number(fields, "price")?;
    let release_date = date(fields, "release_date")?;
    let brand_id: Option<i64> = number(fields, "brand_id")?;

    let mut missing = Vec::new();
    for (key, present) in [
        ("name", name.is_some()),
        ("price", price.is_some()),
        ("release_date", release_date.is_some()),
        ("brand_id", brand_id.is_some()),
    ] {
        if !present {
            missing.push(key);
        }
    }
    let (Some(name), Some(price), Some(release_date), Some(brand_id)) =
        (name, price, release_date, brand_id)
    else {
        return Err(AppError::required_fields(&missing));
    };

    validation::name("El nombre", &name)?;
    validation::price(price)?;
    let stock: i32 = number(fields, "stock")?.unwrap_or(0);
    validation::stock(stock)?;
    let availability = availability(fields)?.unwrap_or(Availability::Disponible);
    let category_id: Option<i64> = number(fields, "category_id")?;
    let technical_info_id: Option<i64> = number(fields, "technical_info_id")?;
    let inline_info = technical_info(fields)?;
    let description = text(fields, "description");

    ensure_brand(state, brand_id).await?;
    if let Some(category_id) = category_id {
        ensure_category(state, category_id).await?;
    }

    let image_path = match &form.image {
        Some(image) => Some(state.uploads.save(image).await?),
        None => None,
    };

    let created = async {
        let mut tx = state.pool.begin().await?;

        let technical_info_id = match technical_info_id {
            Some(id) => {
                if !db::technical_info::exists(&mut *tx, id).await? {
                    return Err(AppError::BadRequest(
                        "La información técnica especificada no existe".to_string(),
                    ));
                }
                Some(id)
            }
            None if !inline_info.is_empty() => {
                Some(db::technical_info::create(&mut *tx, &inline_info).await?)
            }
            None => None,
        };

        let id = db::devices::create(
            &mut *tx,
            &NewDevice {
                name: &name,
                description: description.as_deref(),
                price,
                release_date,
                stock,
                availability: availability.as_str(),
                brand_id,
                category_id,
                technical_info_id,
                image_path: image_path.as_deref(),
            },
        )
        .await?;

        tx.commit().await?;
        Ok::<_, AppError>(id)
    }
    .await;

    match created {
        Ok(id) => view(state, id).await,
        Err(e) => {
            if let Some(file) = &image_path {
                state.uploads.delete(file).await;
            }
            Err(e)
        }
    }
}

/// Partial update. A new image replaces the stored one, which is removed
/// once the row points at the new file.
pub async fn update(state: &AppState, id: i64, form: &DeviceForm) -> Result<DeviceView, AppError> {
    let existing = db::base::find_active_by_id::<Device>(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    let fields = &form.fields;

    let mut changes = DeviceChanges {
        name: text(fields, "name"),
        description: text(fields, "description"),
        price: number(fields, "price")?,
        release_date: date(fields, "release_date")?,
        stock: number(fields, "stock")?,
        availability: availability(fields)?.map(|a| a.as_str().to_string()),
        brand_id: number(fields, "brand_id")?,
        category_id: number(fields, "category_id")?,
        technical_info_id: number(fields, "technical_info_id")?,
        image_path: None,
    };

    if let Some(name) = &changes.name {
        validation::name("El nombre", name)?;
    }
    if let Some(price) = changes.price {
        validation::price(price)?;
    }
    if let Some(stock) = changes.stock {
        validation::stock(stock)?;
    }
    if let Some(brand_id) = changes.brand_id {
        ensure_brand(state, brand_id).await?;
    }
    if let Some(category_id) = changes.category_id {
        ensure_category(state, category_id).await?;
    }
    if let Some(info_id) = changes.technical_info_id {
        if db::base::find_by_id::<TechnicalInfo>(&state.pool, info_id)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest(
                "La información técnica especificada no existe".to_string(),
            ));
        }
    }

    if let Some(image) = &form.image {
        changes.image_path = Some(state.uploads.save(image).await?);
    }

    if let Err(e) = db::devices::update(&state.pool, id, &changes).await {
        if let Some(file) = &changes.image_path {
            state.uploads.delete(file).await;
        }
        return Err(e.into());
    }

    if let (Some(_), Some(old)) = (&changes.image_path, &existing.image_path) {
        state.uploads.delete(old).await;
    }

    view(state, id).await
}

/// Soft delete. Returns the device as it was before removal.
pub async fn delete(state: &AppState, id: i64) -> Result<Device, AppError> {
    let device = db::base::find_active_by_id::<Device>(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    db::base::soft_delete::<Device>(&state.pool, id).await?;
    Ok(device)
}
