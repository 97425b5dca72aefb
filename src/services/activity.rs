//! Activity recorder: append-only audit trail plus the queries, statistics,
//! export and retention purge built on top of it.

use std::fmt::Write;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::MySqlPool;

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::auth::role::ActorRole;
use crate::db;
use crate::db::activity_logs::{LogQuery, NewLog};
use crate::error::AppError;
use crate::models::{ActivityLog, ActivityLogEntry, ActivityStats};

pub mod action {
    pub const CONSULTA: &str = "CONSULTA";
    pub const CREACION: &str = "CREACION";
    pub const ACTUALIZACION: &str = "ACTUALIZACION";
    pub const ELIMINACION: &str = "ELIMINACION";
    pub const ACCESO: &str = "ACCESO";
    pub const ACCESO_DENEGADO: &str = "ACCESO_DENEGADO";
    pub const LOGIN: &str = "LOGIN";
    pub const LOGOUT: &str = "LOGOUT";
    pub const REGISTRO: &str = "REGISTRO";
    pub const ERROR_AUTENTICACION: &str = "ERROR_AUTENTICACION";
    pub const CAMBIO_PASSWORD: &str = "CAMBIO_PASSWORD";
    pub const CAMBIO_ROL: &str = "CAMBIO_ROL";
    pub const CAMBIO_ESTADO: &str = "CAMBIO_ESTADO";
    pub const EXPORTACION: &str = "EXPORTACION";
    pub const MANTENIMIENTO: &str = "MANTENIMIENTO";
}

pub mod module {
    pub const PANEL_ADMIN: &str = "PANEL_ADMIN";
    pub const DISPOSITIVOS: &str = "DISPOSITIVOS";
    pub const CATEGORIAS: &str = "CATEGORIAS";
    pub const MARCAS: &str = "MARCAS";
    pub const AUTENTICACION: &str = "AUTENTICACION";
    pub const USUARIOS: &str = "USUARIOS";
    pub const LOGS: &str = "LOGS";
    pub const API: &str = "API";
    pub const SISTEMA: &str = "SISTEMA";
}

pub const REDACTED: &str = "***SENSITIVE***";

const SENSITIVE_KEYS: [&str; 6] = [
    "password",
    "contrasena",
    "token",
    "secret",
    "authorization",
    "api_key",
];

/// Replaces the value of every key that looks like a credential, at any depth.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                let lowered = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|k| lowered.contains(k)) {
                    out.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(key.clone(), redact(val));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// An audit entry about to be written.
#[derive(Debug, Clone)]
pub struct NewActivity {
    user_id: Option<i64>,
    actor_role: ActorRole,
    action: String,
    module: String,
    description: String,
    resource: Option<String>,
    resource_id: Option<i64>,
    metadata: Option<Value>,
    client: ClientInfo,
}

impl NewActivity {
    pub fn by(user: &AuthUser, action: &str, module: &str, description: impl Into<String>) -> Self {
        Self::new(Some(user.user_id), user.role.into(), action, module, description)
    }

    pub fn system(action: &str, module: &str, description: impl Into<String>) -> Self {
        Self::new(None, ActorRole::System, action, module, description)
    }

    pub fn new(
        user_id: Option<i64>,
        actor_role: ActorRole,
        action: &str,
        module: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            actor_role,
            action: action.to_string(),
            module: module.to_string(),
            description: description.into(),
            resource: None,
            resource_id: None,
            metadata: None,
            client: ClientInfo::default(),
        }
    }

    pub fn resource(mut self, name: &str, id: i64) -> Self {
        self.resource = Some(name.to_string());
        self.resource_id = Some(id);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn client(mut self, client: &ClientInfo) -> Self {
        self.client = client.clone();
        self
    }
}

/// Writes an entry. Failures are reported to the process log and swallowed so
/// the triggering operation still succeeds.
pub async fn record(pool: &MySqlPool, entry: NewActivity) -> Option<ActivityLog> {
    let metadata = entry.metadata.as_ref().map(redact);
    let log = NewLog {
        user_id: entry.user_id,
        actor_role: entry.actor_role.as_str(),
        action: &entry.action,
        module: &entry.module,
        description: &entry.description,
        ip_address: entry.client.ip.as_deref(),
        user_agent: entry.client.user_agent.as_deref(),
        resource: entry.resource.as_deref(),
        resource_id: entry.resource_id,
        metadata: metadata.as_ref(),
    };

    match db::activity_logs::create(pool, &log).await {
        Ok(saved) => Some(saved),
        Err(e) => {
            tracing::error!(
                action = %entry.action,
                module = %entry.module,
                "Failed to record activity: {e}"
            );
            None
        }
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits an `i64`.
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;
pub const EXPORT_LIMIT: i64 = 10_000;
pub const DEFAULT_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pagination {
    pub pagina: i64,
    pub limite: i64,
    pub total: i64,
    pub paginas: i64,
}

impl Pagination {
    pub fn new(pagina: Option<i64>, limite: Option<i64>, total: i64) -> Self {
        let pagina = pagina.unwrap_or(1).clamp(1, MAX_PAGE);
        let limite = limite.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let paginas = (total + limite - 1) / limite;
        Self {
            pagina,
            limite,
            total,
            paginas,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.pagina - 1) * self.limite
    }
}

pub async fn query(
    pool: &MySqlPool,
    query: &LogQuery,
) -> Result<(Vec<ActivityLogEntry>, Pagination), AppError> {
    let total = db::activity_logs::count(pool, query).await?;
    let pagination = Pagination::new(query.pagina, query.limite, total);
    let entries =
        db::activity_logs::list(pool, query, pagination.limite, pagination.offset()).await?;
    Ok((entries, pagination))
}

pub async fn recent_for_user(
    pool: &MySqlPool,
    user_id: i64,
    limit: Option<i64>,
) -> Result<Vec<ActivityLogEntry>, AppError> {
    let limit = limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);
    Ok(db::activity_logs::recent_for_user(pool, user_id, limit).await?)
}

/// Statistics window in days for `dia`, `semana` and `mes`.
pub fn period_days(periodo: Option<&str>) -> (&'static str, i64) {
    match periodo.map(str::trim) {
        Some("semana") => ("semana", 7),
        Some("mes") => ("mes", 30),
        _ => ("dia", 1),
    }
}

pub async fn stats(pool: &MySqlPool, periodo: Option<&str>) -> Result<ActivityStats, AppError> {
    let (label, days) = period_days(periodo);
    let since = Utc::now() - Duration::days(days);

    Ok(ActivityStats {
        periodo: label.to_string(),
        por_tipo_usuario: db::activity_logs::count_by_actor_role(pool, since).await?,
        modulos_mas_usados: db::activity_logs::top_modules(pool, since, 10).await?,
        acciones_frecuentes: db::activity_logs::top_actions(pool, since, 10).await?,
        usuarios_activos: db::activity_logs::count_active_users(pool, since).await?,
        total_actividades: db::activity_logs::count_since(pool, since).await?,
    })
}

pub async fn export(pool: &MySqlPool, query: &LogQuery) -> Result<String, AppError> {
    let entries = db::activity_logs::list(pool, query, EXPORT_LIMIT, 0).await?;
    Ok(to_csv(&entries))
}

pub fn export_filename() -> String {
    format!("logs_galugas_{}.csv", Utc::now().format("%Y-%m-%d"))
}

const CSV_HEADER: [&str; 10] = [
    "ID",
    "Fecha",
    "Usuario",
    "Tipo Usuario",
    "Módulo",
    "Acción",
    "Descripción",
    "Recurso Afectado",
    "IP Address",
    "User Agent",
];

fn csv_field(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn to_csv(entries: &[ActivityLogEntry]) -> String {
    let mut csv = String::new();
    let header: Vec<String> = CSV_HEADER.iter().map(|h| csv_field(h)).collect();
    let _ = writeln!(csv, "{}", header.join(","));

    for entry in entries {
        let log = &entry.log;
        let row = [
            log.id.to_string(),
            log.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.actor_name(),
            log.actor_role.clone(),
            log.module.clone(),
            log.action.clone(),
            log.description.clone(),
            log.resource.clone().unwrap_or_default(),
            log.ip_address.clone().unwrap_or_default(),
            log.user_agent.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        let _ = writeln!(csv, "{}", row.join(","));
    }

    csv
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeOutcome {
    pub eliminados: u64,
    pub mensaje: String,
}

/// Deletes entries older than `days` days. The caller records the purge itself.
pub async fn purge(pool: &MySqlPool, days: i64) -> Result<PurgeOutcome, AppError> {
    if days < 1 {
        return Err(AppError::BadRequest(
            "El número de días debe ser mayor a 0".to_string(),
        ));
    }

    let cutoff = Utc::now() - Duration::days(days);
    let eliminados = db::activity_logs::delete_older_than(pool, cutoff).await?;
    tracing::info!("Purged {eliminados} activity entries older than {days} days");

    Ok(PurgeOutcome {
        eliminados,
        mensaje: format!("Se eliminaron {eliminados} registros anteriores a {days} días"),
    })
}
