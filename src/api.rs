//! API HTTP del formulario: subida de la imagen, salud y apagado.

use std::io::Write;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
};

/// Nombre del campo del formulario que transporta la imagen.
const IMAGE_FIELD: &str = "image";

// --- Respuestas de la API ---

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    review: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.max_upload_bytes;
    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/health", get(health_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn analyze_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", %request_id);

    async move {
        // El fichero temporal se borra al salir de este bloque.
        let upload = read_image_field(multipart).await?;
        info!(has_image = upload.is_some(), "petición de análisis recibida");

        let result = state
            .pipeline
            .process(upload.as_ref().map(|f| f.path()))
            .await;

        match result {
            Ok(review) => Ok(Json(AnalyzeResponse { review })),
            Err(e) => {
                error!("Error en el análisis: {}", e);
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "vision_model": state.config.vision_model,
        "agent_model": state.config.agent_model,
    }))
}

// --- Handler de Apagado y Utilidades ---

#[axum::debug_handler]
async fn shutdown_handler(
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap().take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}

/// Vuelca el campo `image` a un fichero temporal. Un campo ausente o vacío
/// equivale a "sin imagen"; el resto de campos se ignoran.
async fn read_image_field(mut multipart: Multipart) -> AppResult<Option<NamedTempFile>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidUpload(e.to_string()))?;
        if bytes.is_empty() {
            continue;
        }

        let mut file = NamedTempFile::new().map_err(|e| AppError::io(std::env::temp_dir(), e))?;
        file.write_all(&bytes)
            .map_err(|e| AppError::io(file.path(), e))?;
        upload = Some(file);
    }

    Ok(upload)
}
