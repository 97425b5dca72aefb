use sqlx::MySqlConnection;

use crate::models::NewTechnicalInfo;

/// Inserts a technical sheet and returns its id. Runs on a connection so the
/// caller can share a transaction with the owning device.
pub async fn create(
    conn: &mut MySqlConnection,
    info: &NewTechnicalInfo,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO technical_info
            (processor, ram_gb, storage, resolution, dimensions, power, ports, connectivity,
             version, other)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&info.processor)
    .bind(info.ram_gb)
    .bind(&info.storage)
    .bind(&info.resolution)
    .bind(&info.dimensions)
    .bind(&info.power)
    .bind(&info.ports)
    .bind(&info.connectivity)
    .bind(&info.version)
    .bind(&info.other)
    .execute(conn)
    .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn exists(conn: &mut MySqlConnection, id: i64) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM technical_info WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}
