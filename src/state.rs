use std::sync::Arc;

use sqlx::MySqlPool;

use crate::config::Config;
use crate::rate_limit::ApiRateLimiter;
use crate::upload::UploadStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: MySqlPool,
    pub config: Config,
    pub limiter: ApiRateLimiter,
    pub uploads: UploadStore,
}
