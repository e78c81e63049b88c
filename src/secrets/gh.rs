use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::types::Secret;

use super::store::{SecretStore, SecretTarget, StoreError};

/// Writes repository secrets through the GitHub CLI (`gh secret set`).
///
/// The value is piped on stdin so it never shows up in the process table.
#[derive(Debug, Clone)]
pub struct GhCliStore {
    program: String,
}

impl Default for GhCliStore {
    fn default() -> Self {
        Self::new("gh")
    }
}

impl GhCliStore {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl SecretStore for GhCliStore {
    async fn update(&self, target: &SecretTarget, value: &Secret) -> Result<(), StoreError> {
        debug!(program = %self.program, target = %target, "Running gh secret set");
        let mut child = Command::new(&self.program)
            .args(["secret", "set", target.name(), "--repo"])
            .arg(target.repo_slug())
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StoreError::Other(format!("failed to run {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| StoreError::Other("failed to capture stdin".into()))?;
        // A child that exits early closes its stdin; its exit status tells us why.
        match stdin.write_all(value.expose().as_bytes()).await {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                return Err(StoreError::Other(format!(
                    "failed to write secret to stdin: {e}"
                )));
            }
            _ => {}
        }
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| StoreError::Other(format!("failed to wait for {}: {e}", self.program)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match stderr.trim() {
            "" => format!("{} exited with {}", self.program, output.status),
            msg => value.redact_in(msg),
        };
        Err(StoreError::classify(detail))
    }
}
