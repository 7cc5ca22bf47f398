//! Carga y gestión de configuración de la aplicación (Groq + Tavily + servidor).

use std::env;
use std::str::FromStr;

use url::Url;

use crate::error::{AppError, AppResult};

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:7860";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_AGENT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuración completa de la aplicación.
#[derive(Clone)]
pub struct AppConfig {
    pub groq_api_key: String,
    pub tavily_api_key: String,
    pub server_addr: String,

    pub groq_base_url: Url,
    pub tavily_base_url: Url,
    pub vision_model: String,
    pub agent_model: String,

    /// Turnos máximos del bucle del agente.
    pub agent_max_turns: usize,
    /// Búsquedas web máximas por análisis.
    pub agent_max_searches: usize,
    pub max_upload_bytes: usize,
    pub open_browser: bool,
}

// Las claves nunca aparecen en los logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("server_addr", &self.server_addr)
            .field("groq_base_url", &self.groq_base_url.as_str())
            .field("tavily_base_url", &self.tavily_base_url.as_str())
            .field("vision_model", &self.vision_model)
            .field("agent_model", &self.agent_model)
            .field("agent_max_turns", &self.agent_max_turns)
            .field("agent_max_searches", &self.agent_max_searches)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("open_browser", &self.open_browser)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env`, pero leyendo cada variable con `lookup`.
    /// Los valores vacíos cuentan como ausentes.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let groq_api_key =
            get("GROQ_API_KEY").ok_or_else(|| AppError::config("Falta GROQ_API_KEY en el entorno"))?;
        let tavily_api_key = get("TAVILY_API_KEY")
            .ok_or_else(|| AppError::config("Falta TAVILY_API_KEY en el entorno"))?;

        let server_addr = get("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());

        let groq_base_url = parse_url(
            "GROQ_BASE_URL",
            get("GROQ_BASE_URL").as_deref().unwrap_or(DEFAULT_GROQ_BASE_URL),
        )?;
        let tavily_base_url = parse_url(
            "TAVILY_BASE_URL",
            get("TAVILY_BASE_URL").as_deref().unwrap_or(DEFAULT_TAVILY_BASE_URL),
        )?;

        let vision_model = get("VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string());
        let agent_model = get("AGENT_MODEL").unwrap_or_else(|| DEFAULT_AGENT_MODEL.to_string());

        let agent_max_turns = parse_positive("AGENT_MAX_TURNS", get("AGENT_MAX_TURNS"), 5)?;
        let agent_max_searches = parse_positive("AGENT_MAX_SEARCHES", get("AGENT_MAX_SEARCHES"), 4)?;
        let max_upload_bytes =
            parse_positive("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), 20 * 1024 * 1024)?;

        let open_browser = match get("OPEN_BROWSER") {
            None => true,
            Some(v) => bool::from_str(&v.to_lowercase()).map_err(|_| {
                AppError::config(format!("OPEN_BROWSER debe ser true o false, no '{v}'"))
            })?,
        };

        Ok(Self {
            groq_api_key,
            tavily_api_key,
            server_addr,
            groq_base_url,
            tavily_base_url,
            vision_model,
            agent_model,
            agent_max_turns,
            agent_max_searches,
            max_upload_bytes,
            open_browser,
        })
    }
}

/// Une `path` bajo la ruta de `base`, aunque `base` no acabe en `/`.
pub fn endpoint_url(base: &Url, path: &str) -> AppResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| AppError::config(format!("no se pudo construir la URL {base}{path}: {e}")))
}

fn parse_url(key: &str, raw: &str) -> AppResult<Url> {
    Url::parse(raw).map_err(|e| AppError::config(format!("{key} no es una URL válida ({raw}): {e}")))
}

fn parse_positive(key: &str, raw: Option<String>, default: usize) -> AppResult<usize> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(AppError::config(format!(
            "{key} debe ser un entero mayor que cero, no '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const KEYS: &[(&str, &str)] = &[("GROQ_API_KEY", "gsk_test"), ("TAVILY_API_KEY", "tvly_test")];

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let cfg = AppConfig::from_lookup(lookup_from(KEYS)).unwrap();
        assert_eq!(cfg.server_addr, DEFAULT_SERVER_ADDR);
        assert_eq!(cfg.vision_model, DEFAULT_VISION_MODEL);
        assert_eq!(cfg.agent_model, DEFAULT_AGENT_MODEL);
        assert_eq!(cfg.agent_max_turns, 5);
        assert_eq!(cfg.agent_max_searches, 4);
        assert_eq!(cfg.groq_base_url.as_str(), "https://api.groq.com/openai/v1");
        assert!(cfg.open_browser);
    }

    #[test]
    fn missing_groq_key_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("TAVILY_API_KEY", "tvly")])).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("GROQ_API_KEY")));
    }

    #[test]
    fn blank_tavily_key_counts_as_missing() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk"),
            ("TAVILY_API_KEY", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("TAVILY_API_KEY")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut pairs = KEYS.to_vec();
        pairs.push(("AGENT_MAX_TURNS", "0"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(AppError::Config(_))
        ));

        let mut pairs = KEYS.to_vec();
        pairs.push(("TAVILY_BASE_URL", "not a url"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(AppError::Config(_))
        ));

        let mut pairs = KEYS.to_vec();
        pairs.push(("OPEN_BROWSER", "maybe"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn endpoints_keep_the_base_path() {
        let base = Url::parse("https://proxy.internal/tavily").unwrap();
        assert_eq!(
            endpoint_url(&base, "search").unwrap().as_str(),
            "https://proxy.internal/tavily/search"
        );

        let base = Url::parse("https://proxy.internal/tavily/").unwrap();
        assert_eq!(
            endpoint_url(&base, "/search").unwrap().as_str(),
            "https://proxy.internal/tavily/search"
        );

        let base = Url::parse(DEFAULT_TAVILY_BASE_URL).unwrap();
        assert_eq!(
            endpoint_url(&base, "search").unwrap().as_str(),
            "https://api.tavily.com/search"
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let cfg = AppConfig::from_lookup(lookup_from(KEYS)).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("gsk_test"));
        assert!(!dbg.contains("tvly_test"));
    }
}
