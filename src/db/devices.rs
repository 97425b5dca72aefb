use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};

use crate::extract::blank_as_none;
use crate::models::{DeviceDetails, GroupCount, RecentRelease, Status};

const DETAILS_SELECT: &str = "SELECT d.*,
        b.name AS brand_name, b.description AS brand_description,
        c.name AS category_name, c.description AS category_description,
        ti.processor, ti.ram_gb, ti.storage, ti.resolution, ti.dimensions,
        ti.power, ti.ports, ti.connectivity, ti.version, ti.other
    FROM devices d
    LEFT JOIN brands b ON d.brand_id = b.id
    LEFT JOIN categories c ON d.category_id = c.id
    LEFT JOIN technical_info ti ON d.technical_info_id = ti.id";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DeviceFilters {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub categoria_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub marca_id: Option<i64>,
    pub estado: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub offset: Option<i64>,
}

pub struct NewDevice<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: f64,
    pub release_date: NaiveDate,
    pub stock: i32,
    pub availability: &'a str,
    pub brand_id: i64,
    pub category_id: Option<i64>,
    pub technical_info_id: Option<i64>,
    pub image_path: Option<&'a str>,
}

/// Fields of a partial update; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct DeviceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub stock: Option<i32>,
    pub availability: Option<String>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
    pub technical_info_id: Option<i64>,
    pub image_path: Option<String>,
}

/// Maps the public `order_by` value onto a column. Anything unknown sorts by name.
fn order_column(order_by: Option<&str>) -> &'static str {
    match order_by.map(str::trim) {
        Some("price") => "d.price",
        Some("release_date") => "d.release_date",
        Some("created_at") => "d.created_at",
        _ => "d.name",
    }
}

fn order_direction(direction: Option<&str>) -> &'static str {
    match direction {
        Some(d) if d.trim().eq_ignore_ascii_case("desc") => "DESC",
        _ => "ASC",
    }
}

pub async fn list(
    pool: &MySqlPool,
    filters: &DeviceFilters,
    status: Status,
) -> Result<Vec<DeviceDetails>, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new(DETAILS_SELECT);
    qb.push(" WHERE d.status = ").push_bind(status.as_str());

    if let Some(category_id) = filters.categoria_id {
        qb.push(" AND d.category_id = ").push_bind(category_id);
    }
    if let Some(brand_id) = filters.marca_id {
        qb.push(" AND d.brand_id = ").push_bind(brand_id);
    }
    if let Some(min) = filters.min_price {
        qb.push(" AND d.price >= ").push_bind(min);
    }
    if let Some(max) = filters.max_price {
        qb.push(" AND d.price <= ").push_bind(max);
    }
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (d.name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.name LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    qb.push(" ORDER BY ")
        .push(order_column(filters.order_by.as_deref()))
        .push(" ")
        .push(order_direction(filters.order_direction.as_deref()))
        .push(", d.id ASC");

    if let Some(limit) = filters.limit {
        qb.push(" LIMIT ").push_bind(limit.max(0));
        if let Some(offset) = filters.offset {
            qb.push(" OFFSET ").push_bind(offset.max(0));
        }
    }

    qb.build_query_as::<DeviceDetails>().fetch_all(pool).await
}

pub async fn find_active_details(
    pool: &MySqlPool,
    id: i64,
) -> Result<Option<DeviceDetails>, sqlx::Error> {
    let sql = format!("{DETAILS_SELECT} WHERE d.id = ? AND d.status = ?");
    sqlx::query_as::<_, DeviceDetails>(&sql)
        .bind(id)
        .bind(Status::Activo.as_str())
        .fetch_optional(pool)
        .await
}

pub async fn create(
    conn: &mut MySqlConnection,
    device: &NewDevice<'_>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO devices
            (name, description, price, release_date, stock, availability,
             brand_id, category_id, technical_info_id, status, image_path)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(device.name)
    .bind(device.description)
    .bind(device.price)
    .bind(device.release_date)
    .bind(device.stock)
    .bind(device.availability)
    .bind(device.brand_id)
    .bind(device.category_id)
    .bind(device.technical_info_id)
    .bind(Status::Activo.as_str())
    .bind(device.image_path)
    .execute(conn)
    .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn update(
    pool: &MySqlPool,
    id: i64,
    changes: &DeviceChanges,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE devices
         SET name = COALESCE(?, name),
             description = COALESCE(?, description),
             price = COALESCE(?, price),
             release_date = COALESCE(?, release_date),
             stock = COALESCE(?, stock),
             availability = COALESCE(?, availability),
             brand_id = COALESCE(?, brand_id),
             category_id = COALESCE(?, category_id),
             technical_info_id = COALESCE(?, technical_info_id),
             image_path = COALESCE(?, image_path),
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(&changes.name)
    .bind(&changes.description)
    .bind(changes.price)
    .bind(changes.release_date)
    .bind(changes.stock)
    .bind(&changes.availability)
    .bind(changes.brand_id)
    .bind(changes.category_id)
    .bind(changes.technical_info_id)
    .bind(&changes.image_path)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_by_category(pool: &MySqlPool) -> Result<Vec<GroupCount>, sqlx::Error> {
    sqlx::query_as::<_, GroupCount>(
        "SELECT c.name AS name, COUNT(*) AS total
         FROM devices d
         JOIN categories c ON d.category_id = c.id
         WHERE d.status = ?
         GROUP BY c.id, c.name
         ORDER BY total DESC, c.name ASC",
    )
    .bind(Status::Activo.as_str())
    .fetch_all(pool)
    .await
}

pub async fn count_by_brand(pool: &MySqlPool) -> Result<Vec<GroupCount>, sqlx::Error> {
    sqlx::query_as::<_, GroupCount>(
        "SELECT b.name AS name, COUNT(*) AS total
         FROM devices d
         JOIN brands b ON d.brand_id = b.id
         WHERE d.status = ?
         GROUP BY b.id, b.name
         ORDER BY total DESC, b.name ASC",
    )
    .bind(Status::Activo.as_str())
    .fetch_all(pool)
    .await
}

pub async fn average_price(pool: &MySqlPool) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar("SELECT AVG(price) FROM devices WHERE status = ?")
        .bind(Status::Activo.as_str())
        .fetch_one(pool)
        .await
}

pub async fn recent_releases(
    pool: &MySqlPool,
    limit: i64,
) -> Result<Vec<RecentRelease>, sqlx::Error> {
    sqlx::query_as::<_, RecentRelease>(
        "SELECT id, name, release_date FROM devices
         WHERE status = ?
         ORDER BY release_date DESC, id DESC
         LIMIT ?",
    )
    .bind(Status::Activo.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await
}
