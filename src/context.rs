use std::sync::Arc;

use crate::{config::Config, gateway::Gateway, session::SessionRegistry};

/// Everything a handler needs, handed to each one through axum state.
///
/// Built once at startup. The session registry is the only mutable part; each
/// signed-in browser gets its own entry there.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub gateway: Arc<dyn Gateway>,
    pub sessions: SessionRegistry,
}

impl AppContext {
    pub fn new(config: Config, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
            sessions: SessionRegistry::new(),
        }
    }
}
