//! Flujo completo de un análisis:
//!   1. Imagen → base64 (si no hay imagen se usa el centinela).
//!   2. Modelo de visión → nombre del producto.
//!   3. Plantilla de análisis con el nombre.
//!   4. Agente con búsqueda web → informe en texto libre.
//!
//! No hay recuperación parcial: el primer error corta el análisis.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::ProductAnalyst;
use crate::encoder::encode_image;
use crate::error::AppResult;
use crate::models::{AnalysisQuery, NO_IMAGE_SENTINEL};
use crate::vision::ProductReader;

/// Las tres etapas externas, creadas una vez al arrancar.
#[derive(Clone)]
pub struct Pipeline {
    reader: Arc<dyn ProductReader>,
    analyst: Arc<dyn ProductAnalyst>,
}

impl Pipeline {
    pub fn new(reader: Arc<dyn ProductReader>, analyst: Arc<dyn ProductAnalyst>) -> Self {
        Self { reader, analyst }
    }

    /// Analiza la imagen en `image` y devuelve el informe del agente tal cual.
    pub async fn process(&self, image: Option<&Path>) -> AppResult<String> {
        let product_name = match image {
            Some(path) => {
                let encoded = encode_image(path).await?;
                self.reader.product_name(&encoded).await?
            }
            None => {
                warn!("petición sin imagen; se analiza el texto centinela");
                NO_IMAGE_SENTINEL.to_string()
            }
        };

        let query = AnalysisQuery::for_product(&product_name);
        info!(product = %product_name, "lanzando el agente de análisis");

        let run = self.analyst.analyze(&query).await?;
        debug!(messages = run.trace.len(), "historial del agente descartado");
        Ok(run.output)
    }
}
