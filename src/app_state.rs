use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use crate::{config::AppConfig, pipeline::Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Pipeline,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}
