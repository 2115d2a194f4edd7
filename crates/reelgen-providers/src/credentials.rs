//! Credential store contract.
//!
//! Credential lifecycle (signup, rotation, encryption at rest) lives outside
//! the core; this is only the lookup seam the pipeline consumes. Credentials
//! are fetched at each phase entry, held in worker memory, and never written
//! into job records.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ProviderResult;

/// The four provider capabilities the pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Text,
    Image,
    Video,
    Compile,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Text => "text",
            Capability::Image => "image",
            Capability::Video => "video",
            Capability::Compile => "compile",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved credentials for one capability.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    /// Base URL override; adapters fall back to their default when absent.
    pub endpoint: Option<String>,
    pub token: String,
    pub model: Option<String>,
    pub quality: Option<String>,
    pub extra: HashMap<String, String>,
}

impl ProviderCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            token: token.into(),
            model: None,
            quality: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Lookup seam over the external credential store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve an owner's credentials for one capability, or None when the
    /// owner has not configured that provider family.
    async fn lookup(
        &self,
        owner_id: &str,
        capability: Capability,
    ) -> ProviderResult<Option<ProviderCredentials>>;
}

/// In-memory credential store for tests and single-user deployments.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<(String, Capability), ProviderCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        owner_id: impl Into<String>,
        capability: Capability,
        credentials: ProviderCredentials,
    ) {
        self.entries
            .write()
            .await
            .insert((owner_id.into(), capability), credentials);
    }

    pub async fn remove(&self, owner_id: &str, capability: Capability) {
        self.entries
            .write()
            .await
            .remove(&(owner_id.to_string(), capability));
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn lookup(
        &self,
        owner_id: &str,
        capability: Capability,
    ) -> ProviderResult<Option<ProviderCredentials>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(owner_id.to_string(), capability))
            .cloned())
    }
}

/// Environment-backed store for single-user deployments.
///
/// Reads `REELGEN_{CAP}_TOKEN`, `REELGEN_{CAP}_ENDPOINT` and
/// `REELGEN_{CAP}_MODEL` regardless of the owner id.
pub struct EnvCredentialStore;

impl EnvCredentialStore {
    fn var(capability: Capability, suffix: &str) -> Option<String> {
        let key = format!(
            "REELGEN_{}_{}",
            capability.as_str().to_uppercase(),
            suffix
        );
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn lookup(
        &self,
        _owner_id: &str,
        capability: Capability,
    ) -> ProviderResult<Option<ProviderCredentials>> {
        let Some(token) = Self::var(capability, "TOKEN") else {
            return Ok(None);
        };
        let mut creds = ProviderCredentials::new(token);
        creds.endpoint = Self::var(capability, "ENDPOINT");
        creds.model = Self::var(capability, "MODEL");
        creds.quality = Self::var(capability, "QUALITY");
        Ok(Some(creds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_is_owner_scoped() {
        let store = MemoryCredentialStore::new();
        store
            .insert("owner-a", Capability::Image, ProviderCredentials::new("key-a"))
            .await;

        let hit = store.lookup("owner-a", Capability::Image).await.unwrap();
        assert_eq!(hit.unwrap().token, "key-a");

        let miss = store.lookup("owner-b", Capability::Image).await.unwrap();
        assert!(miss.is_none());

        let other_cap = store.lookup("owner-a", Capability::Video).await.unwrap();
        assert!(other_cap.is_none());
    }
}
