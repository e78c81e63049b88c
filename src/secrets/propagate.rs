use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::types::Secret;

use super::store::{SecretStore, SecretTarget, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    PermissionDenied,
    Other(String),
}

/// What happened to one target. Recorded once, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PropagationOutcome {
    Updated,
    Skipped(String),
    Failed(FailureReason),
}

impl PropagationOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, PropagationOutcome::Updated)
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            PropagationOutcome::Failed(FailureReason::PermissionDenied)
        )
    }
}

impl From<StoreError> for PropagationOutcome {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied(_) => {
                PropagationOutcome::Failed(FailureReason::PermissionDenied)
            }
            StoreError::Other(detail) => PropagationOutcome::Failed(FailureReason::Other(detail)),
        }
    }
}

/// Update every target in order, one at a time. Per-target failures become
/// outcomes; this never fails as a whole. `values` maps secret names to the
/// value that target should receive; a target with no bound value is skipped.
pub async fn propagate(
    store: &dyn SecretStore,
    targets: &[SecretTarget],
    values: &HashMap<String, Secret>,
) -> Vec<PropagationOutcome> {
    let mut outcomes = Vec::with_capacity(targets.len());
    for target in targets {
        let Some(value) = values.get(target.name()) else {
            info!(target = %target, "No value to write, skipping");
            outcomes.push(PropagationOutcome::Skipped(format!(
                "no value bound to {}",
                target.name()
            )));
            continue;
        };

        let outcome = match store.update(target, value).await {
            Ok(()) => {
                info!(target = %target, "Updated secret");
                PropagationOutcome::Updated
            }
            Err(err @ StoreError::PermissionDenied(_)) => {
                warn!(
                    target = %target,
                    error = %err,
                    "Cannot update secret: insufficient permissions"
                );
                err.into()
            }
            Err(err) => {
                warn!(target = %target, error = %err, "Failed to update secret");
                err.into()
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

/// Aggregate view over a propagation run, for warnings and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationSummary {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub permission_denied: Vec<String>,
    pub failed: Vec<String>,
}

impl PropagationSummary {
    pub fn new(targets: &[SecretTarget], outcomes: &[PropagationOutcome]) -> Self {
        let mut summary = Self {
            updated: Vec::new(),
            skipped: Vec::new(),
            permission_denied: Vec::new(),
            failed: Vec::new(),
        };
        for (target, outcome) in targets.iter().zip(outcomes) {
            let name = target.name().to_string();
            match outcome {
                PropagationOutcome::Updated => summary.updated.push(name),
                PropagationOutcome::Skipped(_) => summary.skipped.push(name),
                PropagationOutcome::Failed(FailureReason::PermissionDenied) => {
                    summary.permission_denied.push(name)
                }
                PropagationOutcome::Failed(FailureReason::Other(_)) => summary.failed.push(name),
            }
        }
        summary
    }

    pub fn failure_count(&self) -> usize {
        self.permission_denied.len() + self.failed.len()
    }

    /// Fully successful iff every requested target was updated.
    pub fn is_fully_successful(&self) -> bool {
        self.skipped.is_empty() && self.failure_count() == 0
    }

    /// Human-readable warning for a partial propagation, `None` when fully successful.
    pub fn warning(&self) -> Option<String> {
        if self.is_fully_successful() {
            return None;
        }
        let mut parts = Vec::new();
        if !self.permission_denied.is_empty() {
            parts.push(format!(
                "permission denied for {}",
                self.permission_denied.join(", ")
            ));
        }
        if !self.failed.is_empty() {
            parts.push(format!("failed for {}", self.failed.join(", ")));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("skipped {}", self.skipped.join(", ")));
        }
        let mut msg = format!("Secrets were not fully updated: {}.", parts.join("; "));
        if !self.permission_denied.is_empty() {
            msg.push_str(
                " To update secrets automatically, use a personal access token with repository admin rights.",
            );
        }
        Some(msg)
    }
}
