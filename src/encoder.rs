//! Codificación de la imagen en base64 para enviarla al modelo de visión.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{AppError, AppResult};
use crate::models::EncodedImage;

/// Lee el fichero completo y devuelve sus bytes en base64.
pub async fn encode_image(path: &Path) -> AppResult<EncodedImage> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::io(path, e))?;
    Ok(EncodedImage::new(STANDARD.encode(bytes)))
}
