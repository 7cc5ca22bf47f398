// Módulos de la aplicación
mod agent;
mod api;
mod app_state;
mod config;
mod encoder;
mod error;
mod models;
mod pipeline;
mod search;
mod vision;

use crate::app_state::AppState;
use anyhow::Context;
use axum::Router;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Cargar configuración (falla antes de abrir el puerto si faltan claves)
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;
    info!(?cfg, "Configuración cargada");

    // 3. Crear una sola vez los clientes de visión, búsqueda y razonamiento
    let search: Arc<dyn search::SearchProvider> = Arc::new(
        search::TavilyProvider::from_config(&cfg).context("Error inicializando Tavily")?,
    );
    let reader = Arc::new(vision::GroqVision::from_config(&cfg).context("Error inicializando el modelo de visión")?);
    info!(endpoint = %reader.endpoint(), model = %cfg.vision_model, "Cliente de visión listo");
    let analyst = Arc::new(agent::RigAnalyst::from_config(&cfg, search));
    let pipeline = pipeline::Pipeline::new(reader, analyst);

    // Crear canal para la señal de apagado.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // 4. Crear estado compartido de la aplicación
    let app_state = AppState {
        config: cfg.clone(),
        pipeline,
        shutdown_sender: Arc::new(Mutex::new(Some(shutdown_tx))),
    };

    // 5. Configurar el router de la API y el servicio de ficheros estáticos
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .fallback_service(ServeDir::new("frontend"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 6. Iniciar el servidor
    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    let server_url = format!("http://{}", server_addr);
    info!("🚀 Servidor escuchando en {}", &server_url);

    // Abrir el frontend en el navegador por defecto
    if app_state.config.open_browser && webbrowser::open(&server_url).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error sirviendo peticiones")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
