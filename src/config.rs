use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database_url: String,
    pub db_pool_size: u32,
    pub db_acquire_timeout: Duration,
    pub session_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub public_url: String,
    pub client_url: String,
    pub max_body_size: usize,
    pub max_file_size: usize,
    pub upload_dir: PathBuf,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
    pub log_retention_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

pub const DEV_SESSION_SECRET: &str = "galugas-development-session-secret";

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let environment = match env_or("APP_ENV", "development").as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "mysql://{}:{}@{}:{}/{}",
                env_or("DB_USER", "root"),
                env_or("DB_PASSWORD", ""),
                env_or("DB_HOST", "127.0.0.1"),
                env_or("DB_PORT", "3306"),
                env_or("DB_NAME", "galugas"),
            ),
        };

        let db_pool_size: u32 = parse_env("DB_POOL_SIZE", "10")?;
        let db_acquire_timeout = Duration::from_secs(parse_env("DB_ACQUIRE_TIMEOUT_SECS", "60")?);

        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment.is_production() => {
                return Err("Missing required environment variable: SESSION_SECRET".to_string());
            }
            _ => DEV_SESSION_SECRET.to_string(),
        };

        let host: IpAddr = parse_env("HOST", "0.0.0.0")?;
        let port: u16 = parse_env("PORT", "3000")?;

        let public_url = env_or("PUBLIC_URL", &format!("http://localhost:{port}"));
        let client_url = env_or("CLIENT_URL", "http://localhost:3001");

        let max_body_size: usize = parse_env("MAX_BODY_SIZE", "10485760")?;
        let max_file_size: usize = parse_env("MAX_FILE_SIZE", "5242880")?;
        let upload_dir = PathBuf::from(env_or("UPLOAD_PATH", "uploads"));

        let rate_limit_window = Duration::from_millis(parse_env("RATE_LIMIT_WINDOW", "900000")?);
        let rate_limit_max: u32 = parse_env("RATE_LIMIT_MAX", "100")?;

        let trusted_proxies: Vec<IpNet> = env_or("TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("LOG_LEVEL", "info");
        let log_retention_days: u32 = parse_env("LOG_RETENTION_DAYS", "90")?;

        Ok(Config {
            environment,
            database_url,
            db_pool_size,
            db_acquire_timeout,
            session_secret,
            host,
            port,
            public_url,
            client_url,
            max_body_size,
            max_file_size,
            upload_dir,
            rate_limit_window,
            rate_limit_max,
            trusted_proxies,
            log_level,
            log_retention_days,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))
}
