use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};

use crate::auth::extractor::{AuthUser, ClientInfo};
use crate::error::AppError;
use crate::services::activity::{self, NewActivity, action, module};
use crate::state::SharedState;

const SKIPPED_PREFIXES: [&str; 8] = [
    "/health",
    "/api/health",
    "/favicon.ico",
    "/uploads/",
    "/css/",
    "/js/",
    "/images/",
    "/api/logs",
];

pub fn should_skip(path: &str) -> bool {
    SKIPPED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

pub fn action_for(method: &Method, status: u16) -> String {
    let failed = status >= 400;
    let base = match *method {
        Method::GET => {
            return if status == 200 {
                action::CONSULTA.to_string()
            } else {
                format!("ERROR_{}", action::CONSULTA)
            };
        }
        Method::POST => action::CREACION,
        Method::PUT | Method::PATCH => action::ACTUALIZACION,
        Method::DELETE => action::ELIMINACION,
        _ => return action::ACCESO.to_string(),
    };

    if failed {
        format!("ERROR_{base}")
    } else {
        base.to_string()
    }
}

pub fn module_for_path(path: &str) -> &'static str {
    const RULES: [(&str, &str); 8] = [
        ("/admin", module::PANEL_ADMIN),
        ("/dispositivos", module::DISPOSITIVOS),
        ("/categorias", module::CATEGORIAS),
        ("/marcas", module::MARCAS),
        ("/auth", module::AUTENTICACION),
        ("/usuarios", module::USUARIOS),
        ("/logs", module::LOGS),
        ("/api", module::API),
    ];

    RULES
        .iter()
        .find(|(fragment, _)| path.contains(fragment))
        .map(|(_, module)| *module)
        .unwrap_or(module::SISTEMA)
}

fn query_params(query: Option<&str>) -> Value {
    let map: Map<String, Value> = query
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(map)
}

fn parse_body(content_type: &str, bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let map: Map<String, Value> = form_urlencoded::parse(bytes)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        return Value::Object(map);
    }
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

/// Buffers JSON and urlencoded bodies so they can be attached to the entry.
/// Anything else (multipart uploads in particular) passes through untouched.
async fn capture_body(req: Request, limit: usize) -> Result<(Request, Value), Response> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let capturable = content_type.starts_with("application/json")
        || content_type.starts_with("application/x-www-form-urlencoded");
    if !capturable {
        return Ok((req, Value::Null));
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|_| {
        AppError::BadRequest("El cuerpo de la solicitud es demasiado grande".to_string())
            .into_response()
    })?;

    let parsed = parse_body(&content_type, &bytes);
    Ok((Request::from_parts(parts, Body::from(bytes)), parsed))
}

/// Emits one activity entry per request once the handler has produced its
/// response. The actor is whoever held the session when the request arrived.
pub async fn record_requests(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if should_skip(&path) {
        return next.run(req).await;
    }

    let started = Instant::now();
    let method = req.method().clone();
    let actor = req.extensions().get::<AuthUser>().cloned();
    let client = req
        .extensions()
        .get::<ClientInfo>()
        .cloned()
        .unwrap_or_default();
    let query = query_params(req.uri().query());

    let (req, body) = match capture_body(req, state.config.max_body_size).await {
        Ok(captured) => captured,
        Err(response) => return response,
    };

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_millis() as u64;
    let action = action_for(&method, status);
    let module = module_for_path(&path);

    let metadata = json!({
        "metodo": method.as_str(),
        "ruta": path,
        "statusCode": status,
        "duracion_ms": duration_ms,
        "user_agent": client.user_agent,
        "parametros": { "query": query, "body": body },
    });

    let entry = match &actor {
        Some(user) => NewActivity::by(
            user,
            &action,
            module,
            format!(
                "{} realizó {method} en {path} - Status: {status} - Duración: {duration_ms}ms",
                user.full_name()
            ),
        ),
        None => NewActivity::system(
            &action,
            module,
            format!("Acción {action} en {module} - Status: {status} - Duración: {duration_ms}ms"),
        ),
    };

    activity::record(&state.pool, entry.metadata(metadata).client(&client)).await;

    response
}
