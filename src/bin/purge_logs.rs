//! Deletes activity entries older than the retention window.
//!
//! Usage: `purge_logs [DAYS]` (defaults to `LOG_RETENTION_DAYS`).

use sqlx::mysql::MySqlPoolOptions;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use galugas::config::Config;
use galugas::services::activity::{self, NewActivity, action, module};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let days: i64 = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .map_err(|_| format!("Invalid number of days: {arg}"))?,
        None => i64::from(config.log_retention_days),
    };

    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(&config.database_url)
        .await?;

    let outcome = activity::purge(&pool, days)
        .await
        .map_err(|e| e.to_string())?;

    activity::record(
        &pool,
        NewActivity::system(
            action::MANTENIMIENTO,
            module::LOGS,
            format!(
                "Limpieza programada de logs anteriores a {days} días ({} registros eliminados)",
                outcome.eliminados
            ),
        )
        .metadata(json!({ "dias": days, "eliminados": outcome.eliminados })),
    )
    .await;

    println!("{}", outcome.mensaje);
    pool.close().await;
    Ok(())
}
