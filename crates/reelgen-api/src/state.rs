//! Application state.

use std::sync::Arc;

use reelgen_orchestrator::Orchestrator;
use reelgen_providers::CredentialStore;
use reelgen_store::{JobStore, ProjectStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub projects: Arc<dyn ProjectStore>,
    pub jobs: Arc<dyn JobStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        projects: Arc<dyn ProjectStore>,
        jobs: Arc<dyn JobStore>,
        credentials: Arc<dyn CredentialStore>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            config,
            projects,
            jobs,
            credentials,
            orchestrator,
        }
    }
}
