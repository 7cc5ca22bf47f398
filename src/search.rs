//! Herramienta de búsqueda web para el agente.
//!
//! ```text
//! WebSearch (rig::tool::Tool)
//!   └── dyn SearchProvider
//!         └── TavilyProvider
//! ```
//!
//! La herramienta nunca devuelve más de [`MAX_RESULTS`] resultados y cada
//! instancia admite un número limitado de llamadas: el agente crea una
//! nueva por análisis.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{endpoint_url, AppConfig};
use crate::error::{AppError, AppResult};
use crate::models::{SearchArgs, SearchHit};

/// Resultados máximos que ve el agente por búsqueda.
pub const MAX_RESULTS: usize = 2;

/// Backend de búsqueda intercambiable.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn search(&self, query: &str, max_results: usize) -> AppResult<Vec<SearchHit>>;
}

// --- Tipos de la API de Tavily (privados) ---

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for SearchHit {
    fn from(r: TavilyResult) -> Self {
        Self {
            title: r.title,
            url: r.url,
            snippet: r.content,
        }
    }
}

/// Proveedor sobre la API de [Tavily](https://tavily.com).
#[derive(Debug, Clone)]
pub struct TavilyProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl TavilyProvider {
    pub fn from_config(cfg: &AppConfig) -> AppResult<Self> {
        let endpoint = endpoint_url(&cfg.tavily_base_url, "search")?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: cfg.tavily_api_key.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    fn provider_name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: usize) -> AppResult<Vec<SearchHit>> {
        let body = json!({
            "query": query,
            "max_results": max_results,
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::service("search", format!("la petición a Tavily falló: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::service(
                "search",
                format!("Tavily respondió HTTP {status}: {text}"),
            ));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AppError::service("search", format!("respuesta de Tavily ilegible: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(SearchHit::from)
            .collect())
    }
}

/// Error que la herramienta devuelve al bucle del agente.
#[derive(Debug, thiserror::Error)]
pub enum SearchToolError {
    #[error(transparent)]
    Provider(#[from] AppError),

    #[error("se agotó el presupuesto de {limit} búsquedas para este análisis")]
    BudgetExhausted { limit: usize },
}

/// Búsqueda web registrada como herramienta del agente.
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
    max_calls: usize,
    calls: AtomicUsize,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn SearchProvider>, max_calls: usize) -> Self {
        Self {
            provider,
            max_calls,
            calls: AtomicUsize::new(0),
        }
    }

    async fn run(&self, query: &str) -> Result<Vec<SearchHit>, SearchToolError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call > self.max_calls {
            warn!(limit = self.max_calls, %query, "búsqueda rechazada: presupuesto agotado");
            return Err(SearchToolError::BudgetExhausted {
                limit: self.max_calls,
            });
        }

        debug!(provider = self.provider.provider_name(), call, %query, "buscando en la web");
        let mut hits = self.provider.search(query, MAX_RESULTS).await?;
        hits.truncate(MAX_RESULTS);
        info!(%query, hits = hits.len(), "búsqueda completada");
        Ok(hits)
    }
}

impl Tool for WebSearch {
    const NAME: &'static str = "web_search";

    type Error = SearchToolError;
    type Args = SearchArgs;
    type Output = Vec<SearchHit>;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        let parameters = serde_json::to_value(schemars::schema_for!(SearchArgs))
            .unwrap_or_else(|_| json!({ "type": "object" }));
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: format!(
                "Search the web. Returns at most {MAX_RESULTS} results with title, url and snippet."
            ),
            parameters,
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.run(&args.query).await
    }
}
