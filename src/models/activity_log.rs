use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub actor_role: String,
    pub action: String,
    pub module: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub resource: Option<String>,
    pub resource_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A log row joined with the acting user's identity, when there is one.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActivityLogEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub log: ActivityLog,
    pub user_first_name: Option<String>,
    pub user_last_name: Option<String>,
    pub user_email: Option<String>,
}

impl ActivityLogEntry {
    pub fn actor_name(&self) -> String {
        match (&self.user_first_name, &self.user_last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            _ => "Sistema".to_string(),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub periodo: String,
    pub por_tipo_usuario: Vec<LabelCount>,
    pub modulos_mas_usados: Vec<LabelCount>,
    pub acciones_frecuentes: Vec<LabelCount>,
    pub usuarios_activos: i64,
    pub total_actividades: i64,
}
