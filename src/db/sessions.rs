use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use sqlx::types::Json;

use crate::models::{Session, SessionUser};

pub async fn create(
    pool: &MySqlPool,
    id: &str,
    user: &SessionUser,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO sessions (id, user_id, data, expires_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(user.user_id)
        .bind(Json(user))
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Unexpired session by hashed id.
pub async fn find_valid(pool: &MySqlPool, id: &str) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ? AND expires_at > ?")
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
}

pub async fn update_data(
    pool: &MySqlPool,
    id: &str,
    user: &SessionUser,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET data = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(Json(user))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &MySqlPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_for_user(pool: &MySqlPool, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_expired(pool: &MySqlPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
