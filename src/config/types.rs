use std::path::PathBuf;
use std::time::Duration;

use crate::error::RotateError;
use crate::oauth::token::{DEFAULT_CLIENT_ID, DEFAULT_TIMEOUT, DEFAULT_TOKEN_ENDPOINT};
use crate::output::emitter::DEFAULT_ENV_PREFIX;
use crate::output::OutputChannel;
use crate::secrets::SecretTarget;
use crate::types::Secret;

use super::env::{non_empty, resolve_repo_scope};

pub const DEFAULT_ACCESS_SECRET_NAME: &str = "CLAUDE_ACCESS_TOKEN";
pub const DEFAULT_REFRESH_SECRET_NAME: &str = "CLAUDE_REFRESH_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Structured step output when available, legacy lines otherwise.
    #[default]
    Full,
    /// Structured step output and legacy lines in the same run.
    FullWithLegacy,
    /// Legacy `::set-output` lines only.
    LegacyOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionPolicy {
    /// Failed secret updates are warnings; the rotation still completes.
    #[default]
    Tolerant,
    /// Any failed secret update aborts the run before output is written.
    Strict,
}

/// Unvalidated inputs as they arrive from flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct RotationInputs {
    pub refresh_token: Option<String>,
    pub owner: Option<String>,
    pub repository: Option<String>,
    pub update_secrets: bool,
    pub access_secret_name: Option<String>,
    pub refresh_secret_name: Option<String>,
    pub github_output: Option<PathBuf>,
    pub github_env: Option<PathBuf>,
    pub env_prefix: Option<String>,
    pub output_mode: OutputMode,
    pub permission_policy: PermissionPolicy,
    pub token_endpoint: Option<String>,
    pub client_id: Option<String>,
    pub omit_client_id: bool,
    pub timeout: Option<Duration>,
}

/// Validated configuration for one rotation run.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    pub refresh_token: Secret,
    pub owner: Option<String>,
    pub repo: Option<String>,
    /// Empty when propagation was not requested.
    pub targets: Vec<SecretTarget>,
    pub access_secret_name: String,
    pub refresh_secret_name: String,
    pub github_output: Option<PathBuf>,
    pub github_env: Option<PathBuf>,
    pub env_prefix: String,
    pub output_mode: OutputMode,
    pub permission_policy: PermissionPolicy,
    pub token_endpoint: String,
    pub client_id: Option<String>,
    pub timeout: Duration,
}

impl RotationConfig {
    /// Validate inputs once at the boundary. Fails without touching the network.
    pub fn from_inputs(inputs: RotationInputs) -> Result<Self, RotateError> {
        let refresh_token = Secret::non_empty(inputs.refresh_token)
            .ok_or_else(|| RotateError::MissingInput("CLAUDE_REFRESH_TOKEN".into()))?;

        let (owner, repo) = resolve_repo_scope(
            non_empty(inputs.owner).as_deref(),
            non_empty(inputs.repository).as_deref(),
        );

        let access_secret_name = non_empty(inputs.access_secret_name)
            .unwrap_or_else(|| DEFAULT_ACCESS_SECRET_NAME.to_string());
        let refresh_secret_name = non_empty(inputs.refresh_secret_name)
            .unwrap_or_else(|| DEFAULT_REFRESH_SECRET_NAME.to_string());
        if access_secret_name == refresh_secret_name {
            return Err(RotateError::Config {
                detail: format!(
                    "access and refresh tokens cannot share the secret name {access_secret_name}"
                ),
            });
        }

        let targets = if inputs.update_secrets {
            let owner = owner.as_deref().ok_or_else(|| {
                RotateError::MissingInput("GITHUB_REPOSITORY_OWNER (needed to update secrets)".into())
            })?;
            let repo = repo.as_deref().ok_or_else(|| {
                RotateError::MissingInput("GITHUB_REPOSITORY (needed to update secrets)".into())
            })?;
            vec![
                SecretTarget::new(&access_secret_name, owner, repo),
                SecretTarget::new(&refresh_secret_name, owner, repo),
            ]
        } else {
            Vec::new()
        };

        let token_endpoint = non_empty(inputs.token_endpoint)
            .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string());
        if !token_endpoint.starts_with("https://") && !token_endpoint.starts_with("http://") {
            return Err(RotateError::Config {
                detail: format!("token endpoint must be an http(s) URL, got '{token_endpoint}'"),
            });
        }

        let timeout = inputs.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(RotateError::Config {
                detail: "timeout must be at least one second".into(),
            });
        }

        let client_id = if inputs.omit_client_id {
            None
        } else {
            Some(non_empty(inputs.client_id).unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()))
        };

        Ok(Self {
            refresh_token,
            owner,
            repo,
            targets,
            access_secret_name,
            refresh_secret_name,
            github_output: inputs.github_output.filter(|p| !p.as_os_str().is_empty()),
            github_env: inputs.github_env.filter(|p| !p.as_os_str().is_empty()),
            env_prefix: non_empty(inputs.env_prefix)
                .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_string()),
            output_mode: inputs.output_mode,
            permission_policy: inputs.permission_policy,
            token_endpoint,
            client_id,
            timeout,
        })
    }

    pub fn propagation_requested(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Channels to write, in order, based on the mode and which destination
    /// files the runner provided.
    pub fn output_channels(&self) -> Vec<OutputChannel> {
        let mut channels = Vec::new();
        match (self.output_mode, &self.github_output) {
            (OutputMode::LegacyOnly, _) => {
                channels.push(OutputChannel::Legacy);
                return channels;
            }
            (OutputMode::Full, Some(path)) => {
                channels.push(OutputChannel::StepOutput(path.clone()));
            }
            (OutputMode::FullWithLegacy, Some(path)) => {
                channels.push(OutputChannel::StepOutput(path.clone()));
                channels.push(OutputChannel::Legacy);
            }
            (_, None) => channels.push(OutputChannel::Legacy),
        }
        if let Some(path) = &self.github_env {
            channels.push(OutputChannel::StepEnv(path.clone()));
        }
        channels
    }
}
