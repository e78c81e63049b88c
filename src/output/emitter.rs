use serde::Serialize;
use tracing::debug;

use crate::error::RotateError;
use crate::rotation::RotationResult;
use crate::types::Secret;

use super::channel::OutputChannel;
use super::sink::{CommandKind, CommandSink};

pub const DEFAULT_ENV_PREFIX: &str = "CLAUDE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    /// Number of masking directives issued.
    pub masked: usize,
    pub channels: Vec<&'static str>,
}

/// Reports a rotation on every requested channel. Masking directives for
/// every secret are issued on the sink before any channel is written.
#[derive(Debug)]
pub struct OutputEmitter<S: CommandSink> {
    sink: S,
    env_prefix: String,
}

impl<S: CommandSink> OutputEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Prefix for the variables exported through `GITHUB_ENV`.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Distinct secret values that will become observable: the access token,
    /// and the refresh token when the server rotated it.
    pub fn secrets_to_mask(result: &RotationResult) -> Vec<&Secret> {
        let mut secrets = vec![&result.credential.access_token];
        if result.refresh_rotated && result.refresh_token != result.credential.access_token {
            secrets.push(&result.refresh_token);
        }
        secrets
    }

    pub fn warn(&mut self, message: &str) -> Result<(), RotateError> {
        self.sink
            .emit(CommandKind::Warning, message)
            .map_err(|source| RotateError::OutputWrite {
                channel: "log surface".into(),
                source,
            })
    }

    pub async fn emit(
        &mut self,
        result: &RotationResult,
        channels: &[OutputChannel],
    ) -> Result<EmitReport, RotateError> {
        let masks = Self::secrets_to_mask(result);
        for secret in &masks {
            self.sink
                .emit(CommandKind::AddMask, secret.expose())
                .map_err(|source| RotateError::OutputWrite {
                    channel: "log surface".into(),
                    source,
                })?;
        }

        let expires_at = result.expires_at.to_string();
        let access = result.credential.access_token.expose();
        let refresh = result.refresh_token.expose();

        let mut written = Vec::with_capacity(channels.len());
        for channel in channels {
            let fields = match channel {
                OutputChannel::StepEnv(_) => vec![
                    (format!("{}_ACCESS_TOKEN", self.env_prefix), access),
                    (format!("{}_REFRESH_TOKEN", self.env_prefix), refresh),
                    (format!("{}_EXPIRES_AT", self.env_prefix), expires_at.as_str()),
                ],
                OutputChannel::StepOutput(_) | OutputChannel::Legacy => vec![
                    ("access_token".to_string(), access),
                    ("refresh_token".to_string(), refresh),
                    ("expires_at".to_string(), expires_at.as_str()),
                ],
            };
            channel.write(&fields, &mut self.sink).await?;
            debug!(channel = channel.label(), "Wrote rotated credential");
            written.push(channel.label());
        }

        Ok(EmitReport {
            masked: masks.len(),
            channels: written,
        })
    }
}
