use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub release_date: NaiveDate,
    pub stock: i32,
    pub availability: String,
    pub brand_id: i64,
    pub category_id: Option<i64>,
    pub technical_info_id: Option<i64>,
    pub status: String,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A device row joined with its brand, category and technical sheet.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DeviceDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub device: Device,
    pub brand_name: Option<String>,
    pub brand_description: Option<String>,
    pub category_name: Option<String>,
    pub category_description: Option<String>,
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

#[derive(Debug, Clone, Serialize)]
pub struct DeviceView {
    #[serde(flatten)]
    pub details: DeviceDetails,
    pub image_url: Option<String>,
    pub details_url: String,
}

impl DeviceView {
    pub fn new(details: DeviceDetails, public_url: &str) -> Self {
        let base = public_url.trim_end_matches('/');
        let image_url = details
            .device
            .image_path
            .as_ref()
            .map(|file| format!("{base}/uploads/{file}"));
        let details_url = format!("{base}/api/dispositivos/{}", details.device.id);
        Self {
            details,
            image_url,
            details_url,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct GroupCount {
    pub name: String,
    pub total: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RecentRelease {
    pub id: i64,
    pub name: String,
    pub release_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceStats {
    pub total: i64,
    pub by_category: Vec<GroupCount>,
    pub by_brand: Vec<GroupCount>,
    pub average_price: Option<f64>,
    pub recent_releases: Vec<RecentRelease>,
}
