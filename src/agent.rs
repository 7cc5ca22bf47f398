//! Agente de razonamiento con búsqueda web, construido sobre Rig.
//!
//! El bucle del agente es una máquina de estados acotada:
//! `Thinking -> ToolCall -> Thinking ... -> Done | Failed`.
//!   - `multi_turn(max_turns)` limita los turnos; al agotarlos sin respuesta
//!     final el análisis termina con `AppError::StepLimit`.
//!   - cada análisis recibe una herramienta `web_search` nueva con un
//!     presupuesto de `max_searches` llamadas.
//!   - cualquier fallo del modelo termina en `AppError::Service`.

use std::sync::Arc;

use async_trait::async_trait;
use rig::agent::{Agent, AgentBuilder};
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt, PromptError};
use rig::message::Message;
use rig::providers::groq;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::AnalysisQuery;
use crate::search::{SearchProvider, WebSearch};

const PREAMBLE: &str = "You are a helpful assistant";

/// Resultado de una ejecución del agente.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Texto final del agente, sin ningún formato garantizado.
    pub output: String,
    /// Historial de mensajes (llamadas a herramientas incluidas).
    pub trace: Vec<Message>,
}

impl AgentRun {
    #[cfg(test)]
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            trace: Vec::new(),
        }
    }
}

/// Etapa que convierte una consulta de análisis en el informe final.
#[async_trait]
pub trait ProductAnalyst: Send + Sync {
    async fn analyze(&self, query: &AnalysisQuery) -> AppResult<AgentRun>;
}

/// Agente con el preámbulo fijo y una `web_search` recién creada.
fn build_agent<M: CompletionModel + 'static>(
    model: M,
    search: Arc<dyn SearchProvider>,
    max_searches: usize,
) -> Agent<M> {
    AgentBuilder::new(model)
        .preamble(PREAMBLE)
        .tool(WebSearch::new(search, max_searches))
        .build()
}

/// Ejecuta el bucle con el límite de turnos y traduce su desenlace.
async fn run_agent<M: CompletionModel + 'static>(
    agent: &Agent<M>,
    query: &AnalysisQuery,
    max_turns: usize,
) -> AppResult<AgentRun> {
    let mut trace: Vec<Message> = Vec::new();
    let result = agent
        .prompt(query.as_str())
        .with_history(&mut trace)
        .multi_turn(max_turns)
        .await;

    match result {
        Ok(output) => {
            info!(
                messages = trace.len(),
                chars = output.len(),
                "análisis completado"
            );
            Ok(AgentRun { output, trace })
        }
        Err(PromptError::MaxDepthError { max_depth, .. }) => {
            warn!(max_depth, "el agente agotó sus turnos");
            Err(AppError::StepLimit { max_turns })
        }
        Err(e) => Err(AppError::service("reasoning", e)),
    }
}

/// Agente sobre Groq con la búsqueda web como única herramienta.
pub struct RigAnalyst {
    client: groq::Client,
    model: String,
    search: Arc<dyn SearchProvider>,
    max_turns: usize,
    max_searches: usize,
}

impl RigAnalyst {
    /// El cliente de Groq se crea una vez con la clave y la URL base ya
    /// validadas por la configuración.
    pub fn from_config(cfg: &AppConfig, search: Arc<dyn SearchProvider>) -> Self {
        let client = groq::Client::builder(&cfg.groq_api_key)
            .base_url(cfg.groq_base_url.as_str().trim_end_matches('/'))
            .build();
        Self {
            client,
            model: cfg.agent_model.clone(),
            search,
            max_turns: cfg.agent_max_turns,
            max_searches: cfg.agent_max_searches,
        }
    }
}

#[async_trait]
impl ProductAnalyst for RigAnalyst {
    async fn analyze(&self, query: &AnalysisQuery) -> AppResult<AgentRun> {
        info!(model = %self.model, "consultando al agente");
        let agent = build_agent(
            self.client.completion_model(&self.model),
            self.search.clone(),
            self.max_searches,
        );
        run_agent(&agent, query, self.max_turns).await
    }
}
