//! Taxonomía de errores de la aplicación y su traducción a respuestas HTTP.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error de cualquier etapa del análisis.
///
/// Ninguna etapa se recupera de un fallo de otra: todos los errores
/// llegan tal cual a la capa de presentación.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Credenciales o ajustes ausentes o inválidos al arrancar.
    #[error("Error de configuración: {0}")]
    Config(String),

    /// La imagen no existe o no se puede leer.
    #[error("No se pudo leer la imagen {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fallo de un servicio externo (visión, búsqueda o razonamiento).
    #[error("Fallo en el servicio {service}: {message}")]
    Service {
        service: &'static str,
        message: String,
    },

    /// El agente agotó sus turnos sin emitir una respuesta final.
    #[error("El agente alcanzó el límite de {max_turns} turnos sin respuesta final")]
    StepLimit { max_turns: usize },

    /// Cuerpo multipart mal formado.
    #[error("Petición inválida: {0}")]
    InvalidUpload(String),
}

impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn service(service: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Service {
            service,
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Service { .. } | Self::StepLimit { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidUpload(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_bad_gateway() {
        let err = AppError::service("vision", "timeout");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Fallo en el servicio vision: timeout");

        let err = AppError::StepLimit { max_turns: 3 };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn io_error_names_the_path() {
        let err = AppError::io(
            "/tmp/missing.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/tmp/missing.jpg"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_upload_is_a_client_error() {
        let err = AppError::InvalidUpload("boundary".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
