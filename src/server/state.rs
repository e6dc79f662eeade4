//! Shared state handed to every request handler.

use crate::config::Settings;
use crate::relay::Relay;
use std::sync::Arc;

/// Read-only state shared by all requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub relay: Relay,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(relay: Relay, settings: Arc<Settings>) -> Self {
        Self { relay, settings }
    }
}
