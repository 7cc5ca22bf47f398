//! Modelos de dominio que viajan entre las etapas del análisis.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Nombre de producto usado cuando la petición no trae imagen.
pub const NO_IMAGE_SENTINEL: &str = "No image provided.";

/// Imagen codificada en base64, lista para incrustarse en un data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn new(base64: String) -> Self {
        Self(base64)
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// El tipo declarado es siempre JPEG; el formato real no se comprueba.
    pub fn data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.0)
    }
}

/// Consulta de análisis: plantilla fija con el nombre del producto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisQuery(String);

impl AnalysisQuery {
    pub fn for_product(product_name: &str) -> Self {
        Self(format!(
            "
    Analyze the product: {product_name}.
    Search for its ingredients, nutritional information, environmental impact, and customer reviews.
    Provide ratings on a scale of 1-10 for:
    1. Health impact
    2. Environmental sustainability
    3. Social responsibility
    output only the rating seperately for all the three aspects out of 10
    also give a short brief for each rating and a health related adjective to product based on the ratings.
    "
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Un resultado de búsqueda web tal y como lo ve el agente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Argumentos de la herramienta de búsqueda.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchArgs {
    #[schemars(description = "Free-text web search query")]
    pub query: String,
}
