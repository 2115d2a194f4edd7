//! Orchestrator error types.

use thiserror::Error;

use reelgen_models::ProjectId;
use reelgen_providers::ProviderError;
use reelgen_store::StoreError;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The job references a project that no longer exists.
    #[error("Project {0} not found")]
    ProjectMissing(ProjectId),
}

impl OrchestratorError {
    /// A lost write lease means another worker owns the job now; the wake
    /// exits quietly instead of reporting a failure.
    pub fn is_lease_lost(&self) -> bool {
        matches!(self, OrchestratorError::Store(StoreError::LeaseLost(_)))
    }
}
