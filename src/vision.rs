//! Extracción del nombre del producto con un modelo multimodal.
//!
//! Se habla directamente con el endpoint `chat/completions` compatible con
//! OpenAI que expone Groq: un único mensaje de usuario con una parte de
//! texto y otra de imagen (data URI). Un solo intento, sin reintentos.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::{endpoint_url, AppConfig};
use crate::error::{AppError, AppResult};
use crate::models::EncodedImage;

pub const VISION_INSTRUCTION: &str =
    "what is the full product name in the image? just give me the product name";

/// Etapa que convierte una imagen en un nombre de producto.
#[async_trait]
pub trait ProductReader: Send + Sync {
    async fn product_name(&self, image: &EncodedImage) -> AppResult<String>;
}

// --- Tipos de la API de chat (privados) ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn build_request<'a>(model: &'a str, image: &EncodedImage) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text {
                    text: VISION_INSTRUCTION.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_uri(),
                    },
                },
            ],
        }],
    }
}

/// Devuelve el contenido de la primera opción sin tocarlo.
fn first_choice_content(response: ChatResponse) -> AppResult<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::service("vision", "la respuesta no contiene opciones"))?;
    choice
        .message
        .content
        .ok_or_else(|| AppError::service("vision", "la primera opción no tiene contenido"))
}

/// Cliente de visión sobre Groq.
#[derive(Debug, Clone)]
pub struct GroqVision {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl GroqVision {
    pub fn from_config(cfg: &AppConfig) -> AppResult<Self> {
        let endpoint = endpoint_url(&cfg.groq_base_url, "chat/completions")?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: cfg.groq_api_key.clone(),
            model: cfg.vision_model.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ProductReader for GroqVision {
    async fn product_name(&self, image: &EncodedImage) -> AppResult<String> {
        let body = build_request(&self.model, image);
        debug!(model = %self.model, bytes = image.as_base64().len(), "enviando imagen al modelo de visión");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::service("vision", format!("la petición falló: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::service(
                "vision",
                format!("HTTP {status}: {text}"),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::service("vision", format!("respuesta ilegible: {e}")))?;

        let name = first_choice_content(parsed)?;
        info!(product = %name, "nombre de producto extraído");
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_has_text_and_image_parts() {
        let image = EncodedImage::new("AAEC".into());
        let value = serde_json::to_value(build_request("vision-model", &image)).unwrap();

        assert_eq!(value["model"], "vision-model");
        let message = &value["messages"][0];
        assert_eq!(message["role"], "user");
        assert_eq!(message["content"][0], json!({"type": "text", "text": VISION_INSTRUCTION}));
        assert_eq!(
            message["content"][1],
            json!({"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAEC"}})
        );
    }

    #[test]
    fn first_choice_is_returned_untouched() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "  Acme Widget Pro\n"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        }))
        .unwrap();
        assert_eq!(first_choice_content(response).unwrap(), "  Acme Widget Pro\n");
    }

    #[test]
    fn refusals_pass_through_as_product_names() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "I can't identify a product."}}]
        }))
        .unwrap();
        assert_eq!(
            first_choice_content(response).unwrap(),
            "I can't identify a product."
        );
    }

    #[test]
    fn empty_choices_are_a_service_error() {
        let response: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(
            first_choice_content(response),
            Err(AppError::Service { service: "vision", .. })
        ));

        let response: ChatResponse = serde_json::from_value(json!({})).unwrap();
        assert!(first_choice_content(response).is_err());
    }

    #[test]
    fn null_content_is_a_service_error() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": null}}]
        }))
        .unwrap();
        assert!(matches!(
            first_choice_content(response),
            Err(AppError::Service { .. })
        ));
    }

    #[test]
    fn endpoint_is_joined_under_the_base_path() {
        let cfg = AppConfig::from_lookup(|key| match key {
            "GROQ_API_KEY" => Some("gsk".into()),
            "TAVILY_API_KEY" => Some("tvly".into()),
            _ => None,
        })
        .unwrap();
        let vision = GroqVision::from_config(&cfg).unwrap();
        assert_eq!(
            vision.endpoint().as_str(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }
}
