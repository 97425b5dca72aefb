use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TechnicalInfo {
    pub id: i64,
    pub processor: Option<String>,
    pub ram_gb: Option<i32>,
    pub storage: Option<String>,
    pub resolution: Option<String>,
    pub dimensions: Option<String>,
    pub power: Option<String>,
    pub ports: Option<String>,
    pub connectivity: Option<String>,
    pub version: Option<String>,
    pub other: Option<String>,
}

/// Inline technical sheet supplied while creating a device.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NewTechnicalInfo {
    pub processor: Option<String>,
    pub ram_gb: Option<i32>,
    pub storage: Option<String>,
    pub resolution: Option<String>,
    pub dimensions: Option<String>,
    pub power: Option<String>,
    pub ports: Option<String>,
    pub connectivity: Option<String>,
    pub version: Option<String>,
    pub other: Option<String>,
}

impl NewTechnicalInfo {
    pub fn is_empty(&self) -> bool {
        *self == NewTechnicalInfo::default()
    }
}
