mod common;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

// ── System ──────────────────────────────────────────────────────

#[tokio::test]
async fn welcome_index_and_health() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documentation"], "/api");
    assert_eq!(body["environment"], "development");

    let (body, status) = app.get("/api", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bienvenido a la API de Galugas");
    assert_eq!(body["endpoints"]["dispositivos"], "/api/dispositivos");

    let (body, status) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());

    common::cleanup(app).await;
}

#[tokio::test]
async fn security_headers_on_every_response() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/api/health")).send().await.unwrap();
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers()["x-frame-options"], "DENY");
    assert_eq!(
        resp.headers()["referrer-policy"],
        "strict-origin-when-cross-origin"
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn unknown_route_returns_envelope() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/api/nada", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Ruta no encontrada - GET /api/nada");
    assert!(body["timestamp"].is_string());

    common::cleanup(app).await;
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .header(CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("JSON inválido"));

    let (body, status) = app.get("/api/categorias/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ID inválido");

    common::cleanup(app).await;
}

#[tokio::test]
async fn rate_limit_rejects_excess_requests() {
    let app = common::spawn_app_with(|config| config.rate_limit_max = 3).await;

    for _ in 0..3 {
        let (_, status) = app.get("/api/categorias", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let resp = app.client.get(app.url("/api/categorias")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    common::cleanup(app).await;
}

// ── Auth ────────────────────────────────────────────────────────

#[tokio::test]
async fn register_creates_active_usuario() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("Ana@Galugas.test", "password123").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "ana@galugas.test");
    assert_eq!(body["data"]["role"], "Usuario");
    assert_eq!(body["data"]["status"], "Activo");
    assert!(body["data"].get("password_hash").is_none());

    assert_eq!(app.count_logs("REGISTRO", "AUTENTICACION").await, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_validates_input() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .post("/api/auth/register", None, &json!({ "email": "x@galugas.test" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Campos requeridos faltantes"));
    assert_eq!(body["details"].as_array().unwrap().len(), 3);

    let (_, status) = app.register("short@galugas.test", "123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app.register("no-es-email", "password123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Formato de email inválido");

    app.register("dup@galugas.test", "password123").await;
    let (body, status) = app.register("dup@galugas.test", "password123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Ya existe un usuario con ese email");

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let app = common::spawn_app().await;
    app.register("ana@galugas.test", "password123").await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "ana@galugas.test", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("galugas.sid="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(!set_cookie.contains("Secure"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["email"], "ana@galugas.test");
    assert_eq!(body["data"]["user"]["role"], "Usuario");
    assert_eq!(app.count_logs("LOGIN", "AUTENTICACION").await, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_failure_is_recorded_by_system() {
    let app = common::spawn_app().await;
    app.register("ana@galugas.test", "password123").await;

    let (body, status, cookie) = app.login("ana@galugas.test", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Credenciales inválidas");
    assert!(cookie.is_none());

    let (_, status, _) = app.login("nadie@galugas.test", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app.post("/api/auth/login", None, &json!({ "email": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let rows: Vec<(Option<i64>, String)> = sqlx::query_as(
        "SELECT user_id, actor_role FROM activity_logs WHERE action = 'ERROR_AUTENTICACION'",
    )
    .fetch_all(&app.pool)
    .await
    .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|(id, role)| id.is_none() && role == "Sistema"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn me_requires_session() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No autorizado. Debe iniciar sesión");

    let (_, status) = app.get("/api/auth/me", Some("galugas.sid=forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (cookie, id) = app.session_as("Usuario", "ana@galugas.test").await;
    let (body, status) = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);
    assert!(body["data"].get("password_hash").is_none());

    let (body, status) = app.get("/api/auth/check-admin", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_admin"], false);

    common::cleanup(app).await;
}

#[tokio::test]
async fn logout_ends_session() {
    let app = common::spawn_app().await;
    let (cookie, id) = app.session_as("Usuario", "ana@galugas.test").await;

    let (body, status) = app.post("/api/auth/logout", Some(&cookie), &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sesión cerrada exitosamente");

    let (_, status) = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The audit entry for the logout request belongs to the user who left
    let owner: Option<i64> = sqlx::query_scalar(
        "SELECT user_id FROM activity_logs
         WHERE module = 'AUTENTICACION' AND action = 'CREACION' AND description LIKE '%/api/auth/logout%'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(owner, Some(id));

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_request_is_audited_as_system() {
    let app = common::spawn_app().await;
    app.register("ana@galugas.test", "password123").await;
    app.login("ana@galugas.test", "password123").await;

    let (user_id, role): (Option<i64>, String) = sqlx::query_as(
        "SELECT user_id, actor_role FROM activity_logs
         WHERE action = 'CREACION' AND module = 'AUTENTICACION'
         ORDER BY id DESC LIMIT 1",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(user_id, None);
    assert_eq!(role, "Sistema");

    common::cleanup(app).await;
}

#[tokio::test]
async fn profile_update_refreshes_session() {
    let app = common::spawn_app().await;
    let (cookie, _) = app.session_as("Usuario", "ana@galugas.test").await;
    app.register("otra@galugas.test", "password123").await;

    let (body, status) = app
        .put("/api/auth/profile", Some(&cookie), &json!({ "email": "otra@galugas.test" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "El email ya está en uso");

    let (body, status) = app
        .put(
            "/api/auth/profile",
            Some(&cookie),
            &json!({ "first_name": "Lucía", "phone": "555-0101" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Lucía");
    assert_eq!(body["data"]["last_name"], "Prueba");
    assert_eq!(body["data"]["phone"], "555-0101");

    let snapshot: Value = sqlx::query_scalar("SELECT data FROM sessions LIMIT 1")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(snapshot["first_name"], "Lucía");

    common::cleanup(app).await;
}

#[tokio::test]
async fn change_password_checks_current() {
    let app = common::spawn_app().await;
    let (cookie, _) = app.session_as("Usuario", "ana@galugas.test").await;

    let (body, status) = app
        .put(
            "/api/auth/change-password",
            Some(&cookie),
            &json!({ "current_password": "incorrecta", "new_password": "nueva-clave" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Contraseña actual incorrecta");

    let (_, status) = app
        .put(
            "/api/auth/change-password",
            Some(&cookie),
            &json!({ "current_password": "password123", "new_password": "nueva-clave" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, status, _) = app.login("ana@galugas.test", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, status, _) = app.login("ana@galugas.test", "nueva-clave").await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

// ── Access control ──────────────────────────────────────────────

#[tokio::test]
async fn usuario_cannot_reach_admin_routes() {
    let app = common::spawn_app().await;
    let (cookie, id) = app.session_as("Usuario", "ana@galugas.test").await;

    let (body, status) = app
        .post("/api/categorias", Some(&cookie), &json!({ "name": "Televisores" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Acceso denegado. Se requieren permisos de administrador"
    );

    let created: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(created, 0);

    let (user_id, metadata): (Option<i64>, Value) = sqlx::query_as(
        "SELECT user_id, metadata FROM activity_logs WHERE action = 'ACCESO_DENEGADO'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(user_id, Some(id));
    assert_eq!(metadata["ruta"], "/api/categorias");
    assert_eq!(metadata["metodo"], "POST");
    assert_eq!(metadata["rol"], "Usuario");

    let (_, status) = app.get("/api/usuarios", Some(&cookie)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, status) = app.get("/api/logs", Some(&cookie)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn gated_routes_need_a_session() {
    let app = common::spawn_app().await;

    let (_, status) = app
        .post("/api/dispositivos", None, &json!({ "name": "TV" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, status) = app.delete("/api/marcas/1", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, status) = app.get("/api/logs/mis-actividades", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn vendedor_manages_devices_but_not_admin_routes() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let (vendedor, vendedor_id) = app.session_as("Vendedor", "vera@galugas.test").await;
    let brand = app.create_brand(&admin, "Lenovo").await;

    let (body, status) = create_device(
        &app,
        &vendedor,
        json!({ "name": "ThinkPad X1", "price": 1500, "release_date": "2024-05-01", "brand_id": brand }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_i64().unwrap();

    let (_, status) = app
        .put(&format!("/api/dispositivos/{id}"), Some(&vendedor), &json!({ "stock": 3 }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app.delete(&format!("/api/dispositivos/{id}"), Some(&vendedor)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Acceso denegado. Se requieren permisos de administrador"
    );
    let (_, status) = app.get(&format!("/api/dispositivos/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app
        .post("/api/categorias", Some(&vendedor), &json!({ "name": "Portátiles" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, status) = app.get("/api/usuarios", Some(&vendedor)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let denied: Vec<(String, Value)> = sqlx::query_as(
        "SELECT module, metadata FROM activity_logs
         WHERE action = 'ACCESO_DENEGADO' AND user_id = ? ORDER BY id",
    )
    .bind(vendedor_id)
    .fetch_all(&app.pool)
    .await
    .unwrap();
    assert_eq!(denied.len(), 3);
    assert_eq!(denied[0].0, "DISPOSITIVOS");
    assert_eq!(denied[0].1["metodo"], "DELETE");
    assert_eq!(denied[0].1["ruta"], format!("/api/dispositivos/{id}"));
    assert!(denied.iter().all(|(_, m)| m["rol"] == "Vendedor"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn usuario_cannot_create_devices() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let (cookie, id) = app.session_as("Usuario", "ana@galugas.test").await;
    let brand = app.create_brand(&admin, "Asus").await;

    let (body, status) = create_device(
        &app,
        &cookie,
        json!({ "name": "Zenbook", "price": 999, "release_date": "2024-01-15", "brand_id": brand }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Acceso denegado. Se requieren permisos de vendedor o administrador"
    );

    let devices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM devices")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(devices, 0);

    let metadata: Value = sqlx::query_scalar(
        "SELECT metadata FROM activity_logs WHERE action = 'ACCESO_DENEGADO' AND user_id = ?",
    )
    .bind(id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(metadata["ruta"], "/api/dispositivos");
    assert_eq!(metadata["rol"], "Usuario");

    common::cleanup(app).await;
}

// ── Categories & brands ─────────────────────────────────────────

#[tokio::test]
async fn category_lifecycle() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;

    let id = app.create_category(&admin, "Televisores").await;

    let (body, status) = app
        .post("/api/categorias", Some(&admin), &json!({ "name": "Televisores" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "El registro ya existe en la base de datos");

    let (_, status) = app
        .post("/api/categorias", Some(&admin), &json!({ "name": "X" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app
        .put(
            &format!("/api/categorias/{id}"),
            Some(&admin),
            &json!({ "description": "Pantallas" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Televisores");
    assert_eq!(body["data"]["description"], "Pantallas");

    let (body, _) = app.get("/api/categorias", None).await;
    assert_eq!(body["count"], 1);

    let (_, status) = app.delete(&format!("/api/categorias/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (body, _) = app.get("/api/categorias", None).await;
    assert_eq!(body["count"], 0);
    let (body, status) = app.get(&format!("/api/categorias/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Categoría no encontrada");

    assert_eq!(app.count_logs("ELIMINACION", "CATEGORIAS").await, 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn brand_lifecycle() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;

    let id = app.create_brand(&admin, "Sony").await;

    let (body, status) = app.get(&format!("/api/marcas/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["country"], "Japón");

    let (body, status) = app
        .put(&format!("/api/marcas/{id}"), Some(&admin), &json!({ "name": "Sony Corp" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Sony Corp");
    assert_eq!(body["data"]["country"], "Japón");

    let (_, status) = app.delete(&format!("/api/marcas/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app.get(&format!("/api/marcas/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (resource, resource_id): (Option<String>, Option<i64>) = sqlx::query_as(
        "SELECT resource, resource_id FROM activity_logs WHERE action = 'ACTUALIZACION' AND module = 'MARCAS' AND resource IS NOT NULL",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(resource.as_deref(), Some("Marca"));
    assert_eq!(resource_id, Some(id));

    common::cleanup(app).await;
}

// ── Devices ─────────────────────────────────────────────────────

async fn create_device(app: &common::TestApp, cookie: &str, body: Value) -> (Value, StatusCode) {
    app.post("/api/dispositivos", Some(cookie), &body).await
}

#[tokio::test]
async fn device_create_and_read() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let vendedor = app.vendedor().await;
    let brand = app.create_brand(&admin, "Samsung").await;
    let category = app.create_category(&admin, "Televisores").await;

    let (body, status) = create_device(
        &app,
        &vendedor,
        json!({
            "name": "QLED 55",
            "price": 899.99,
            "release_date": "2024-03-01",
            "brand_id": brand,
            "category_id": category,
            "stock": 12,
            "technical_info": { "processor": "Neo Quantum", "resolution": "4K" },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let device = &body["data"];
    let id = device["id"].as_i64().unwrap();
    assert_eq!(device["brand_name"], "Samsung");
    assert_eq!(device["category_name"], "Televisores");
    assert_eq!(device["processor"], "Neo Quantum");
    assert_eq!(device["availability"], "Disponible");
    assert_eq!(device["status"], "Activo");
    assert!(device["image_url"].is_null());
    assert_eq!(
        device["details_url"],
        app.url(&format!("/api/dispositivos/{id}"))
    );

    let (body, status) = app.get(&format!("/api/dispositivos/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resolution"], "4K");

    assert_eq!(app.count_logs("CREACION", "DISPOSITIVOS").await, 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn device_create_validates() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let brand = app.create_brand(&admin, "LG").await;

    let (body, status) = create_device(&app, &admin, json!({ "name": "OLED" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Campos requeridos faltantes: price, release_date, brand_id"
    );

    let (body, status) = create_device(
        &app,
        &admin,
        json!({ "name": "OLED", "price": 100, "release_date": "2024-01-01", "brand_id": 9999 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "La marca especificada no existe");

    let (_, status) = create_device(
        &app,
        &admin,
        json!({ "name": "OLED", "price": 0, "release_date": "2024-01-01", "brand_id": brand }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = create_device(
        &app,
        &admin,
        json!({ "name": "OLED", "price": 10, "release_date": "2024-01-01", "brand_id": brand, "stock": 10000 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM devices")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn device_listing_filters_and_search() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let brand = app.create_brand(&admin, "Apple").await;

    for (name, price) in [("iPhone 15", 999.0), ("AirPods", 199.0), ("iPad Air", 599.0)] {
        let (body, status) = create_device(
            &app,
            &admin,
            json!({ "name": name, "price": price, "release_date": "2023-09-22", "brand_id": brand }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (body, _) = app.get("/api/dispositivos?min_price=500", None).await;
    assert_eq!(body["count"], 2);

    let (body, _) = app
        .get("/api/dispositivos?order_by=price&order_direction=desc", None)
        .await;
    assert_eq!(body["data"][0]["name"], "iPhone 15");
    assert_eq!(body["data"][2]["name"], "AirPods");

    let (body, _) = app
        .get("/api/dispositivos?order_by=price;DROP TABLE devices", None)
        .await;
    assert_eq!(body["count"], 3);

    let (body, status) = app.get("/api/dispositivos/search?q=air", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (body, status) = app.get("/api/dispositivos/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "El término de búsqueda es requerido");

    let (body, status) = app.get("/api/dispositivos/estadisticas", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["by_brand"][0]["name"], "Apple");
    assert_eq!(body["data"]["by_brand"][0]["total"], 3);
    assert_eq!(body["data"]["recent_releases"].as_array().unwrap().len(), 3);

    common::cleanup(app).await;
}

#[tokio::test]
async fn device_update_and_delete() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let vendedor = app.vendedor().await;
    let brand = app.create_brand(&admin, "Xiaomi").await;

    let (body, _) = create_device(
        &app,
        &vendedor,
        json!({ "name": "Redmi Note", "price": 250, "release_date": "2024-02-10", "brand_id": brand }),
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (body, status) = app
        .put(
            &format!("/api/dispositivos/{id}"),
            Some(&vendedor),
            &json!({ "price": 199.5, "availability": "Agotado" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 199.5);
    assert_eq!(body["data"]["availability"], "Agotado");
    assert_eq!(body["data"]["name"], "Redmi Note");

    let (_, status) = app.delete(&format!("/api/dispositivos/{id}"), Some(&vendedor)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app.delete(&format!("/api/dispositivos/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app.get(&format!("/api/dispositivos/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (body, _) = app.get("/api/dispositivos", None).await;
    assert_eq!(body["count"], 0);
    let (body, _) = app.get("/api/dispositivos?estado=Inactivo", None).await;
    assert_eq!(body["count"], 1);

    common::cleanup(app).await;
}

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

#[tokio::test]
async fn device_multipart_upload() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let brand = app.create_brand(&admin, "Canon").await;

    let form = Form::new()
        .text("name", "EOS R50")
        .text("price", "749.00")
        .text("release_date", "2023-02-08")
        .text("brand_id", brand.to_string())
        .text("processor", "DIGIC X")
        .part(
            "imagen",
            Part::bytes(PNG.to_vec())
                .file_name("camara.png")
                .mime_str("image/png")
                .unwrap(),
        );

    let resp = app
        .client
        .post(app.url("/api/dispositivos"))
        .header("cookie", &admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let device = &body["data"];
    assert_eq!(device["processor"], "DIGIC X");

    let image_path = device["image_path"].as_str().unwrap();
    assert!(image_path.starts_with("device-") && image_path.ends_with(".png"));
    assert!(app.upload_dir.join(image_path).exists());

    let image_url = device["image_url"].as_str().unwrap();
    let resp = app.client.get(image_url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), PNG);

    common::cleanup(app).await;
}

#[tokio::test]
async fn device_upload_rejects_non_images() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let brand = app.create_brand(&admin, "Canon").await;

    let form = Form::new()
        .text("name", "EOS R50")
        .text("price", "749.00")
        .text("release_date", "2023-02-08")
        .text("brand_id", brand.to_string())
        .part(
            "imagen",
            Part::bytes(b"#!/bin/sh".to_vec())
                .file_name("script.sh")
                .mime_str("text/x-shellscript")
                .unwrap(),
        );

    let resp = app
        .client
        .post(app.url("/api/dispositivos"))
        .header("cookie", &admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Tipo de archivo no permitido"));

    let stored = std::fs::read_dir(&app.upload_dir).unwrap().count();
    assert_eq!(stored, 0);

    common::cleanup(app).await;
}

// ── Users ───────────────────────────────────────────────────────

#[tokio::test]
async fn admin_manages_users() {
    let app = common::spawn_app().await;
    let (admin, admin_id) = app.session_as("Administrador", "admin@galugas.test").await;
    let (user_cookie, user_id) = app.session_as("Usuario", "ana@galugas.test").await;

    let (body, status) = app.get("/api/usuarios", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (body, _) = app.get("/api/usuarios?rol=Administrador", Some(&admin)).await;
    assert_eq!(body["count"], 1);

    let (body, status) = app
        .put(&format!("/api/usuarios/{user_id}"), Some(&admin), &json!({ "phone": "555-0199" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "555-0199");

    // A role change revokes the target's sessions
    let (body, status) = app
        .put(&format!("/api/usuarios/{user_id}/role"), Some(&admin), &json!({ "role": "Vendedor" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "Vendedor");
    let (_, status) = app.get("/api/auth/me", Some(&user_cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app
        .put(&format!("/api/usuarios/{user_id}/role"), Some(&admin), &json!({ "role": "Jefe" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.count_logs("CAMBIO_ROL", "USUARIOS").await, 1);

    let (body, status) = app.delete(&format!("/api/usuarios/{admin_id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No puedes eliminar tu propia cuenta");

    common::cleanup(app).await;
}

#[tokio::test]
async fn status_change_blocks_and_restores_login() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let (_, user_id) = app.session_as("Usuario", "ana@galugas.test").await;

    let (_, status) = app
        .put(
            &format!("/api/usuarios/{user_id}/status"),
            Some(&admin),
            &json!({ "status": "Suspendido" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, status, _) = app.login("ana@galugas.test", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, status) = app.get(&format!("/api/usuarios/{user_id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (body, _) = app.get("/api/usuarios?estado=Suspendido", Some(&admin)).await;
    assert_eq!(body["count"], 1);

    let (_, status) = app
        .put(
            &format!("/api/usuarios/{user_id}/status"),
            Some(&admin),
            &json!({ "status": "Activo" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, status, _) = app.login("ana@galugas.test", "password123").await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

#[tokio::test]
async fn deleted_user_disappears() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let (user_cookie, user_id) = app.session_as("Usuario", "ana@galugas.test").await;

    let (_, status) = app.delete(&format!("/api/usuarios/{user_id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app.get(&format!("/api/usuarios/{user_id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status) = app.get("/api/auth/me", Some(&user_cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (body, _) = app.get("/api/usuarios", Some(&admin)).await;
    assert_eq!(body["count"], 1);

    common::cleanup(app).await;
}

// ── Activity logs ───────────────────────────────────────────────

#[tokio::test]
async fn request_bodies_are_redacted() {
    let app = common::spawn_app().await;
    app.register("ana@galugas.test", "super-secreta").await;

    let metadata: Value = sqlx::query_scalar(
        "SELECT metadata FROM activity_logs WHERE action = 'CREACION' AND module = 'AUTENTICACION'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let body = &metadata["parametros"]["body"];
    assert_eq!(body["password"], "***SENSITIVE***");
    assert_eq!(body["email"], "ana@galugas.test");
    assert_eq!(metadata["metodo"], "POST");
    assert_eq!(metadata["ruta"], "/api/auth/register");
    assert_eq!(metadata["statusCode"], 201);

    let leaked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE CAST(metadata AS CHAR) LIKE '%super-secreta%'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(leaked, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn log_query_paginates() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;

    for _ in 0..5 {
        app.get("/api/categorias", None).await;
    }

    let (body, status) = app
        .get("/api/logs?modulo=CATEGORIAS&accion=CONSULTA&limite=2", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["paginacion"]["total"], 5);
    assert_eq!(body["paginacion"]["paginas"], 3);
    assert_eq!(body["paginacion"]["pagina"], 1);
    assert_eq!(body["data"][0]["actor_role"], "Sistema");

    let (body, _) = app
        .get("/api/logs?modulo=CATEGORIAS&accion=CONSULTA&limite=2&pagina=3", Some(&admin))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Reading logs does not produce log entries
    let audited: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE description LIKE '%/api/logs%'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(audited, 0);

    common::cleanup(app).await;
}

/// Inserts a user directly, so it has no activity of its own.
async fn seed_user(app: &common::TestApp, first: &str, last: &str, role: &str) -> i64 {
    let email = format!("{}@galugas.test", first.to_lowercase());
    sqlx::query(
        "INSERT INTO users (first_name, last_name, email, password_hash, role)
         VALUES (?, ?, ?, 'x', ?)",
    )
    .bind(first)
    .bind(last)
    .bind(email)
    .bind(role)
    .execute(&app.pool)
    .await
    .unwrap()
    .last_insert_id() as i64
}

async fn seed_log(
    app: &common::TestApp,
    user_id: Option<i64>,
    role: &str,
    description: &str,
    created_at: &str,
) {
    sqlx::query(
        "INSERT INTO activity_logs (user_id, actor_role, action, module, description, created_at)
         VALUES (?, ?, 'CONSULTA', 'PRUEBAS', ?, ?)",
    )
    .bind(user_id)
    .bind(role)
    .bind(description)
    .bind(created_at)
    .execute(&app.pool)
    .await
    .unwrap();
}

/// Seeds five entries in module `PRUEBAS` and returns the two actor ids.
async fn seed_filter_fixture(app: &common::TestApp) -> (i64, i64) {
    let carla = seed_user(app, "Carla", "Quiroga", "Vendedor").await;
    let diego = seed_user(app, "Diego", "Ruiz", "Usuario").await;

    seed_log(app, Some(carla), "Vendedor", "Creó dispositivo", "2024-03-01 10:00:00").await;
    seed_log(app, Some(carla), "Vendedor", "Actualizó marca", "2024-03-02 23:59:59").await;
    seed_log(app, Some(diego), "Usuario", "Revisó catálogo", "2024-03-03 00:00:00").await;
    seed_log(app, None, "Sistema", "Tarea programada", "2024-03-05 12:00:00").await;
    seed_log(app, Some(diego), "Usuario", "Cambio de perfil", "2024-03-02 08:00:00").await;

    (carla, diego)
}

async fn log_total(app: &common::TestApp, admin: &str, query: &str) -> (i64, i64) {
    let (body, status) = app.get(&format!("/api/logs?{query}"), Some(admin)).await;
    assert_eq!(status, StatusCode::OK, "{query}: {body}");
    (
        body["paginacion"]["total"].as_i64().unwrap(),
        body["paginacion"]["paginas"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn log_query_filters_by_actor() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let (carla, diego) = seed_filter_fixture(&app).await;

    assert_eq!(log_total(&app, &admin, "modulo=PRUEBAS").await, (5, 1));
    assert_eq!(log_total(&app, &admin, "tipo_usuario=Vendedor").await, (2, 1));
    assert_eq!(
        log_total(&app, &admin, "modulo=PRUEBAS&tipo_usuario=Sistema").await,
        (1, 1)
    );
    assert_eq!(
        log_total(&app, &admin, "modulo=PRUEBAS&tipo_usuario=Usuario&limite=1").await,
        (2, 2)
    );
    assert_eq!(log_total(&app, &admin, &format!("usuario_id={carla}")).await, (2, 1));
    assert_eq!(
        log_total(&app, &admin, &format!("usuario_id={diego}&tipo_usuario=Vendedor")).await,
        (0, 0)
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn log_query_filters_by_date_range() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    seed_filter_fixture(&app).await;

    // Both bounds are whole calendar days
    assert_eq!(
        log_total(&app, &admin, "fecha_desde=2024-03-02&fecha_hasta=2024-03-03").await,
        (3, 1)
    );
    assert_eq!(log_total(&app, &admin, "fecha_hasta=2024-03-01").await, (1, 1));
    assert_eq!(
        log_total(&app, &admin, "modulo=PRUEBAS&fecha_desde=2024-03-05").await,
        (1, 1)
    );
    assert_eq!(
        log_total(&app, &admin, "fecha_desde=2024-03-02&fecha_hasta=2024-03-03&limite=2").await,
        (3, 2)
    );

    let (body, _) = app
        .get("/api/logs?modulo=PRUEBAS&fecha_hasta=2024-03-03", Some(&admin))
        .await;
    assert_eq!(body["data"][0]["description"], "Revisó catálogo");

    common::cleanup(app).await;
}

#[tokio::test]
async fn log_query_searches_descriptions_and_actor_names() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    seed_filter_fixture(&app).await;

    assert_eq!(log_total(&app, &admin, "busqueda=Quiroga").await, (2, 1));
    assert_eq!(log_total(&app, &admin, "busqueda=Diego").await, (2, 1));
    assert_eq!(log_total(&app, &admin, "busqueda=programada").await, (1, 1));
    assert_eq!(
        log_total(&app, &admin, "busqueda=Carla&fecha_desde=2024-03-02").await,
        (1, 1)
    );

    let (body, _) = app.get("/api/logs?busqueda=Quiroga", Some(&admin)).await;
    assert_eq!(body["data"][0]["user_first_name"], "Carla");

    common::cleanup(app).await;
}

#[tokio::test]
async fn blank_and_oversized_query_values() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    seed_filter_fixture(&app).await;

    assert_eq!(
        log_total(
            &app,
            &admin,
            "modulo=PRUEBAS&tipo_usuario=&accion=&usuario_id=&fecha_desde=&fecha_hasta=\
             &busqueda=&pagina=&limite="
        )
        .await,
        (5, 1)
    );

    let (body, status) = app
        .get("/api/logs?modulo=PRUEBAS&pagina=9223372036854775807", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["paginacion"]["total"], 5);

    let (_, status) = app.get("/api/logs/mis-actividades?limite=", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app
        .get(
            "/api/dispositivos?categoria_id=&marca_id=&min_price=&max_price=&limit=&offset=",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn my_activity_lists_own_entries() {
    let app = common::spawn_app().await;
    let (cookie, id) = app.session_as("Usuario", "ana@galugas.test").await;
    app.get("/api/auth/me", Some(&cookie)).await;

    let (body, status) = app.get("/api/logs/mis-actividades?limite=5", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert!(!entries.is_empty() && entries.len() <= 5);
    assert!(entries.iter().all(|e| e["user_id"] == id));

    common::cleanup(app).await;
}

#[tokio::test]
async fn statistics_by_period() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    app.get("/api/marcas", None).await;

    let (body, status) = app.get("/api/logs/estadisticas?periodo=semana", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["periodo"], "semana");
    assert!(body["data"]["total_actividades"].as_i64().unwrap() > 0);
    assert!(body["data"]["usuarios_activos"].as_i64().unwrap() >= 1);
    assert!(!body["data"]["modulos_mas_usados"].as_array().unwrap().is_empty());

    let (body, _) = app.get("/api/logs/estadisticas?periodo=siglo", Some(&admin)).await;
    assert_eq!(body["data"]["periodo"], "dia");

    common::cleanup(app).await;
}

#[tokio::test]
async fn export_renders_csv() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;

    let resp = app
        .client
        .get(app.url("/api/logs/exportar?modulo=AUTENTICACION"))
        .header("cookie", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let disposition = resp.headers()[CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("logs_galugas_"));

    let csv = resp.text().await.unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "\"ID\",\"Fecha\",\"Usuario\",\"Tipo Usuario\",\"Módulo\",\"Acción\",\"Descripción\",\"Recurso Afectado\",\"IP Address\",\"User Agent\""
    );
    assert!(lines.count() >= 1);

    assert_eq!(app.count_logs("EXPORTACION", "LOGS").await, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn purge_removes_only_old_entries() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;

    for days in [40, 45, 400] {
        sqlx::query(
            "INSERT INTO activity_logs (actor_role, action, module, description, created_at)
             VALUES ('Sistema', 'CONSULTA', 'API', 'antiguo', NOW() - INTERVAL ? DAY)",
        )
        .bind(days)
        .execute(&app.pool)
        .await
        .unwrap();
    }
    let recent_before: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs WHERE description <> 'antiguo'")
            .fetch_one(&app.pool)
            .await
            .unwrap();

    let (body, status) = app.post("/api/logs/limpiar", Some(&admin), &json!({ "dias": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "El número de días debe ser mayor a 0");

    let (body, status) = app.post("/api/logs/limpiar", Some(&admin), &json!({ "dias": 30 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["eliminados"], 3);

    let old: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs WHERE description = 'antiguo'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(old, 0);

    // Recent rows survive and the purge itself is recorded
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(remaining, recent_before + 1);
    assert_eq!(app.count_logs("MANTENIMIENTO", "LOGS").await, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn purge_defaults_to_ninety_days() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;

    for days in [60, 120] {
        sqlx::query(
            "INSERT INTO activity_logs (actor_role, action, module, description, created_at)
             VALUES ('Sistema', 'CONSULTA', 'API', 'antiguo', NOW() - INTERVAL ? DAY)",
        )
        .bind(days)
        .execute(&app.pool)
        .await
        .unwrap();
    }

    let resp = app
        .client
        .post(app.url("/api/logs/limpiar"))
        .header("cookie", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["eliminados"], 1);

    common::cleanup(app).await;
}
