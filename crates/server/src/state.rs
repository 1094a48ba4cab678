use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vmctl_core::{Authenticator, ComputeApi, Config, GenerationApi};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    compute: Arc<dyn ComputeApi>,
    generation: Arc<dyn GenerationApi>,
    /// Cancelled on shutdown; waits run on child tokens.
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        compute: Arc<dyn ComputeApi>,
        generation: Arc<dyn GenerationApi>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            authenticator,
            compute,
            generation,
            shutdown,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn compute(&self) -> &dyn ComputeApi {
        self.compute.as_ref()
    }

    pub fn generation(&self) -> &dyn GenerationApi {
        self.generation.as_ref()
    }

    /// Token for one wait; cancelled with the server.
    pub fn wait_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
