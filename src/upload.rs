use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;

/// Multipart field carrying the device picture.
pub const IMAGE_FIELD: &str = "imagen";

const ALLOWED_TYPES: [(&str, &str); 6] = [
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
];

/// Extension for an accepted image MIME type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

pub struct UploadStore {
    dir: PathBuf,
    max_file_size: usize,
}

impl UploadStore {
    pub fn new(dir: PathBuf, max_file_size: usize) -> Self {
        Self { dir, max_file_size }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Validates and writes an image, returning the stored file name.
    pub async fn save(&self, image: &ImageUpload) -> Result<String, AppError> {
        let ext = extension_for(&image.content_type).ok_or_else(|| {
            AppError::BadRequest(
                "Tipo de archivo no permitido. Solo se permiten imágenes (JPEG, PNG, GIF, WebP, SVG)"
                    .to_string(),
            )
        })?;

        if image.data.len() > self.max_file_size {
            return Err(AppError::BadRequest(format!(
                "El archivo es demasiado grande. Tamaño máximo: {}MB",
                self.max_file_size / (1024 * 1024)
            )));
        }

        let filename = format!("device-{}.{ext}", Uuid::now_v7());
        tokio::fs::write(self.dir.join(&filename), &image.data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {e}")))?;

        tracing::debug!("Stored upload {filename} ({} bytes)", image.data.len());
        Ok(filename)
    }

    /// Best-effort removal of a previously stored file.
    pub async fn delete(&self, filename: &str) {
        let Some(name) = Path::new(filename).file_name() else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(self.dir.join(name)).await {
            tracing::warn!("Failed to remove upload {filename}: {e}");
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

/// Device payload: a JSON object, a urlencoded form, or a multipart form with
/// an optional image in the `imagen` field.
#[derive(Debug, Default)]
pub struct DeviceForm {
    pub fields: Map<String, Value>,
    pub image: Option<ImageUpload>,
}

impl<S: Send + Sync> FromRequest<S> for DeviceForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();

        let body = Bytes::from_request(req, state).await.map_err(|_| {
            AppError::BadRequest("El cuerpo de la solicitud es demasiado grande".to_string())
        })?;

        if content_type.starts_with("multipart/form-data") {
            return parse_multipart(&content_type, body).await;
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(DeviceForm::default());
        }

        let fields = if content_type.starts_with("application/x-www-form-urlencoded") {
            form_urlencoded::parse(&body)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect()
        } else {
            match serde_json::from_slice::<Value>(&body) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(AppError::BadRequest(
                        "Se esperaba un objeto JSON".to_string(),
                    ));
                }
                Err(e) => return Err(AppError::BadRequest(format!("JSON inválido: {e}"))),
            }
        };

        Ok(DeviceForm {
            fields,
            image: None,
        })
    }
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<DeviceForm, AppError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| AppError::BadRequest("Falta el boundary del formulario".to_string()))?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = DeviceForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Error en el formulario: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let is_file = field.file_name().is_some();

        if is_file && name != IMAGE_FIELD {
            return Err(AppError::BadRequest("Campo de archivo inesperado".to_string()));
        }

        if name == IMAGE_FIELD && is_file {
            if form.image.is_some() {
                return Err(AppError::BadRequest("Demasiados archivos".to_string()));
            }
            let filename = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Error leyendo archivo: {e}")))?;
            if data.is_empty() {
                continue;
            }
            form.image = Some(ImageUpload {
                filename,
                content_type,
                data,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Error en el formulario: {e}")))?;
        form.fields.insert(name, Value::String(value));
    }

    Ok(form)
}
