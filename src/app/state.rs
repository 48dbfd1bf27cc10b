//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::session::{ConnectionRegistry, GatewayHandle, PlayerDirectory};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectionRegistry>,
    pub directory: Arc<PlayerDirectory>,
    pub gateway: GatewayHandle,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ConnectionRegistry>,
        directory: Arc<PlayerDirectory>,
        gateway: GatewayHandle,
    ) -> Self {
        Self {
            config,
            registry,
            directory,
            gateway,
        }
    }
}
