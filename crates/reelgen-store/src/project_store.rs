//! Project store contract: one JSON record per project, owner-namespaced.

use async_trait::async_trait;

use reelgen_models::{Project, ProjectId};

use crate::error::StoreResult;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Create or replace a project record.
    async fn put(&self, project: &Project) -> StoreResult<()>;

    /// Read a project, owner-scoped.
    async fn get(&self, owner_id: &str, project_id: &ProjectId) -> StoreResult<Option<Project>>;
}
