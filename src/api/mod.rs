// API endpoint modules
pub mod health;
pub mod tron;

use crate::config::Config;
use crate::services::TronService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tron: Arc<TronService>,
}
