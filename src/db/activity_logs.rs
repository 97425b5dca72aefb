use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::extract::blank_as_none;
use crate::models::{ActivityLog, ActivityLogEntry, LabelCount};

const ENTRY_SELECT: &str = "SELECT l.*,
        u.first_name AS user_first_name,
        u.last_name AS user_last_name,
        u.email AS user_email
    FROM activity_logs l
    LEFT JOIN users u ON l.user_id = u.id";

/// Filters and paging accepted by the log listing and export.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LogQuery {
    pub tipo_usuario: Option<String>,
    pub modulo: Option<String>,
    pub accion: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub usuario_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub fecha_desde: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub fecha_hasta: Option<NaiveDate>,
    pub busqueda: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub pagina: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limite: Option<i64>,
}

pub struct NewLog<'a> {
    pub user_id: Option<i64>,
    pub actor_role: &'a str,
    pub action: &'a str,
    pub module: &'a str,
    pub description: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub resource: Option<&'a str>,
    pub resource_id: Option<i64>,
    pub metadata: Option<&'a serde_json::Value>,
}

pub async fn create(pool: &MySqlPool, log: &NewLog<'_>) -> Result<ActivityLog, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO activity_logs
            (user_id, actor_role, action, module, description, ip_address, user_agent,
             resource, resource_id, metadata)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(log.user_id)
    .bind(log.actor_role)
    .bind(log.action)
    .bind(log.module)
    .bind(log.description)
    .bind(log.ip_address)
    .bind(log.user_agent)
    .bind(log.resource)
    .bind(log.resource_id)
    .bind(log.metadata)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, ActivityLog>("SELECT * FROM activity_logs WHERE id = ?")
        .bind(result.last_insert_id() as i64)
        .fetch_one(pool)
        .await
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn push_filters(qb: &mut QueryBuilder<'_, MySql>, query: &LogQuery) {
    qb.push(" WHERE 1=1");

    if let Some(role) = non_empty(&query.tipo_usuario) {
        qb.push(" AND l.actor_role = ").push_bind(role.to_string());
    }
    if let Some(module) = non_empty(&query.modulo) {
        qb.push(" AND l.module = ").push_bind(module.to_string());
    }
    if let Some(action) = non_empty(&query.accion) {
        qb.push(" AND l.action = ").push_bind(action.to_string());
    }
    if let Some(user_id) = query.usuario_id {
        qb.push(" AND l.user_id = ").push_bind(user_id);
    }
    if let Some(from) = query.fecha_desde {
        qb.push(" AND DATE(l.created_at) >= ").push_bind(from);
    }
    if let Some(to) = query.fecha_hasta {
        qb.push(" AND DATE(l.created_at) <= ").push_bind(to);
    }
    if let Some(search) = non_empty(&query.busqueda) {
        let pattern = format!("%{search}%");
        qb.push(" AND (l.description LIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// One page of matching entries, newest first.
pub async fn list(
    pool: &MySqlPool,
    query: &LogQuery,
    limit: i64,
    offset: i64,
) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new(ENTRY_SELECT);
    push_filters(&mut qb, query);
    qb.push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    qb.build_query_as::<ActivityLogEntry>().fetch_all(pool).await
}

pub async fn count(pool: &MySqlPool, query: &LogQuery) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new(
        "SELECT COUNT(*) FROM activity_logs l LEFT JOIN users u ON l.user_id = u.id",
    );
    push_filters(&mut qb, query);
    qb.build_query_scalar::<i64>().fetch_one(pool).await
}

pub async fn recent_for_user(
    pool: &MySqlPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
    let sql = format!(
        "{ENTRY_SELECT} WHERE l.user_id = ? ORDER BY l.created_at DESC, l.id DESC LIMIT ?"
    );
    sqlx::query_as::<_, ActivityLogEntry>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

async fn grouped(
    pool: &MySqlPool,
    column: &str,
    since: DateTime<Utc>,
    limit: Option<i64>,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    let mut qb = QueryBuilder::<MySql>::new("SELECT ");
    qb.push(column)
        .push(" AS label, COUNT(*) AS total FROM activity_logs WHERE created_at >= ")
        .push_bind(since)
        .push(" GROUP BY ")
        .push(column)
        .push(" ORDER BY total DESC, label ASC");
    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(limit);
    }
    qb.build_query_as::<LabelCount>().fetch_all(pool).await
}

pub async fn count_by_actor_role(
    pool: &MySqlPool,
    since: DateTime<Utc>,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    grouped(pool, "actor_role", since, None).await
}

pub async fn top_modules(
    pool: &MySqlPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    grouped(pool, "module", since, Some(limit)).await
}

pub async fn top_actions(
    pool: &MySqlPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    grouped(pool, "action", since, Some(limit)).await
}

pub async fn count_active_users(
    pool: &MySqlPool,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(DISTINCT user_id) FROM activity_logs
         WHERE user_id IS NOT NULL AND created_at >= ?",
    )
    .bind(since)
    .fetch_one(pool)
    .await
}

pub async fn count_since(pool: &MySqlPool, since: DateTime<Utc>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs WHERE created_at >= ?")
        .bind(since)
        .fetch_one(pool)
        .await
}

/// Deletes every entry created before `cutoff`, returning how many went.
pub async fn delete_older_than(
    pool: &MySqlPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM activity_logs WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
