use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::Secret;

/// A destination in the secret store. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretTarget {
    name: String,
    owner: String,
    repo: String,
}

impl SecretTarget {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/repo`
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for SecretTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.owner, self.repo, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Classify a failure message from the store. HTTP 403 and GitHub's
    /// "Resource not accessible by integration" both mean the caller lacks
    /// admin rights on the repository.
    pub fn classify(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let lower = detail.to_ascii_lowercase();
        if lower.contains("403") || lower.contains("not accessible") {
            StoreError::PermissionDenied(detail)
        } else {
            StoreError::Other(detail)
        }
    }
}

impl fmt::Debug for dyn SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore").finish()
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Set `target` to `value`, overwriting any previous value.
    async fn update(&self, target: &SecretTarget, value: &Secret) -> Result<(), StoreError>;
}
