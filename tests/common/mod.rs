use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use uuid::Uuid;

use galugas::config::{Config, Environment};

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: MySqlPool,
    pub client: Client,
    pub db_name: String,
    pub upload_dir: PathBuf,
}

/// Full `name=value` pair of the session cookie set by a response, if any.
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("galugas.sid="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Send a request with an optional session cookie and JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<&Value>,
    ) -> (Value, StatusCode) {
        let mut req = self.client.request(method, self.url(path));
        if let Some(cookie) = cookie {
            req = req.header(COOKIE, cookie);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.expect("request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> (Value, StatusCode) {
        self.request(Method::GET, path, cookie, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        cookie: Option<&str>,
        body: &Value,
    ) -> (Value, StatusCode) {
        self.request(Method::POST, path, cookie, Some(body)).await
    }

    pub async fn put(&self, path: &str, cookie: Option<&str>, body: &Value) -> (Value, StatusCode) {
        self.request(Method::PUT, path, cookie, Some(body)).await
    }

    pub async fn delete(&self, path: &str, cookie: Option<&str>) -> (Value, StatusCode) {
        self.request(Method::DELETE, path, cookie, None).await
    }

    pub async fn register(&self, email: &str, password: &str) -> (Value, StatusCode) {
        self.post(
            "/api/auth/register",
            None,
            &json!({
                "first_name": "Ana",
                "last_name": "Prueba",
                "email": email,
                "password": password,
            }),
        )
        .await
    }

    /// Login; returns the body, status and the session cookie when one was set.
    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode, Option<String>) {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let cookie = session_cookie(&resp);
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status, cookie)
    }

    /// Register a user, give it `role` directly in the database and log in.
    /// Returns the session cookie and the user id.
    pub async fn session_as(&self, role: &str, email: &str) -> (String, i64) {
        let (body, status) = self.register(email, "password123").await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let id = body["data"]["id"].as_i64().expect("user id");

        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await
            .expect("failed to set role");

        let (body, status, cookie) = self.login(email, "password123").await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (cookie.expect("session cookie"), id)
    }

    pub async fn admin(&self) -> String {
        self.session_as("Administrador", "admin@galugas.test").await.0
    }

    pub async fn vendedor(&self) -> String {
        self.session_as("Vendedor", "vendedor@galugas.test").await.0
    }

    pub async fn create_brand(&self, cookie: &str, name: &str) -> i64 {
        let (body, status) = self
            .post("/api/marcas", Some(cookie), &json!({ "name": name, "country": "Japón" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create brand failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_category(&self, cookie: &str, name: &str) -> i64 {
        let (body, status) = self
            .post("/api/categorias", Some(cookie), &json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create category failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }

    /// Number of activity entries with `action` and `module`.
    pub async fn count_logs(&self, action: &str, module: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs WHERE action = ? AND module = ?")
            .bind(action)
            .bind(module)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

pub fn test_config(database_url: String, upload_dir: PathBuf, addr: SocketAddr) -> Config {
    Config {
        environment: Environment::Development,
        database_url,
        db_pool_size: 5,
        db_acquire_timeout: Duration::from_secs(10),
        session_secret: "test-session-secret".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: addr.port(),
        public_url: format!("http://{addr}"),
        client_url: "http://localhost:3001".to_string(),
        max_body_size: 10 * 1024 * 1024,
        max_file_size: 1024 * 1024,
        upload_dir,
        rate_limit_window: Duration::from_secs(900),
        rate_limit_max: 10_000,
        trusted_proxies: vec![],
        log_level: "warn".to_string(),
        log_retention_days: 90,
    }
}

fn server_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| base.to_string())
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawn a test app, letting the caller adjust the configuration first.
pub async fn spawn_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let db_name = format!("galugas_test_{}", Uuid::now_v7().simple());

    let admin_pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect(&server_url(&base_url))
        .await
        .expect("Failed to connect to MySQL for test DB creation");

    sqlx::query(&format!("CREATE DATABASE `{db_name}`"))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = format!("{}/{db_name}", server_url(&base_url));
    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    let upload_dir = std::env::temp_dir().join(&db_name);
    let mut config = test_config(test_url, upload_dir.clone(), addr);
    customize(&mut config);

    let (app, state) = galugas::build_app(pool.clone(), config);
    state.uploads.ensure_dir().await.expect("upload dir");

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        upload_dir,
    }
}

/// Drop the test database and upload directory after a test completes.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;
    let _ = tokio::fs::remove_dir_all(&app.upload_dir).await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect(&server_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS `{db_name}`"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
