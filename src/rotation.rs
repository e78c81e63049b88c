use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{PermissionPolicy, RotationConfig};
use crate::error::RotateError;
use crate::oauth::expiry::{compute_expiry, now_epoch_seconds, ExpiryTimestamp};
use crate::oauth::token::{AccessCredential, TokenRefresher};
use crate::output::{CommandSink, EmitReport, OutputEmitter};
use crate::secrets::{propagate, PropagationOutcome, PropagationSummary, SecretStore, SecretTarget};
use crate::types::Secret;

/// Everything a rotation produced. Built fresh per run, never persisted.
#[derive(Debug, Clone)]
pub struct RotationResult {
    pub credential: AccessCredential,
    /// Refresh token consumers should use from now on (rotated or original).
    pub refresh_token: Secret,
    pub refresh_rotated: bool,
    pub expires_at: ExpiryTimestamp,
    pub targets: Vec<SecretTarget>,
    /// One per entry in `targets`, same order.
    pub propagation_outcomes: Vec<PropagationOutcome>,
}

impl RotationResult {
    pub fn new(
        credential: AccessCredential,
        original_refresh: &Secret,
        expires_at: ExpiryTimestamp,
        targets: Vec<SecretTarget>,
        propagation_outcomes: Vec<PropagationOutcome>,
    ) -> Self {
        let refresh_token = credential.effective_refresh_token(original_refresh).clone();
        let refresh_rotated = credential.refresh_rotated(original_refresh);
        Self {
            credential,
            refresh_token,
            refresh_rotated,
            expires_at,
            targets,
            propagation_outcomes,
        }
    }

    pub fn propagation_summary(&self) -> PropagationSummary {
        PropagationSummary::new(&self.targets, &self.propagation_outcomes)
    }
}

#[derive(Debug)]
pub struct RotationReport {
    pub result: RotationResult,
    pub emitted: EmitReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Idle,
    Refreshing,
    Refreshed,
    Propagating,
    Emitting,
    Done,
    Failed,
}

impl fmt::Display for RotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RotationState::Idle => "idle",
            RotationState::Refreshing => "refreshing",
            RotationState::Refreshed => "refreshed",
            RotationState::Propagating => "propagating",
            RotationState::Emitting => "emitting",
            RotationState::Done => "done",
            RotationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Runs one rotation: refresh, compute expiry, optionally propagate, emit.
///
/// Single use. Once `run` has been called, later calls return
/// [`RotateError::AlreadyRan`] whatever the first outcome was.
pub struct Rotator<S: CommandSink> {
    config: RotationConfig,
    refresher: TokenRefresher,
    store: Box<dyn SecretStore>,
    emitter: OutputEmitter<S>,
    state: RotationState,
}

impl<S: CommandSink> Rotator<S> {
    pub fn new(
        config: RotationConfig,
        store: Box<dyn SecretStore>,
        sink: S,
    ) -> Result<Self, RotateError> {
        let refresher = TokenRefresher::new(
            config.token_endpoint.clone(),
            config.client_id.clone(),
            config.timeout,
        )?;
        let emitter = OutputEmitter::new(sink).with_env_prefix(config.env_prefix.clone());
        Ok(Self {
            config,
            refresher,
            store,
            emitter,
            state: RotationState::Idle,
        })
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    pub fn emitter(&self) -> &OutputEmitter<S> {
        &self.emitter
    }

    pub fn into_emitter(self) -> OutputEmitter<S> {
        self.emitter
    }

    pub async fn run(&mut self) -> Result<RotationReport, RotateError> {
        self.run_at(now_epoch_seconds()).await
    }

    /// Run with an explicit clock. A rotator runs once; later calls fail.
    pub async fn run_at(&mut self, now: i64) -> Result<RotationReport, RotateError> {
        if self.state != RotationState::Idle {
            return Err(RotateError::AlreadyRan { state: self.state });
        }
        let result = self.drive(now).await;
        if result.is_err() {
            self.transition(RotationState::Failed);
        }
        result
    }

    async fn drive(&mut self, now: i64) -> Result<RotationReport, RotateError> {
        if self.config.refresh_token.is_empty() {
            return Err(RotateError::MissingInput("CLAUDE_REFRESH_TOKEN".into()));
        }

        self.transition(RotationState::Refreshing);
        info!("Refreshing OAuth token");
        let credential = self.refresher.refresh(&self.config.refresh_token).await?;
        self.transition(RotationState::Refreshed);
        info!("Token refreshed successfully");

        let expires_at = compute_expiry(now, credential.expires_in_seconds);
        info!(
            expires_in = credential.expires_in_seconds,
            %expires_at,
            "Token expiry computed"
        );

        // Only targets with a value to write are requested; an unrotated
        // refresh token leaves its secret untouched.
        let values = self.secret_values(&credential);
        let targets: Vec<SecretTarget> = self
            .config
            .targets
            .iter()
            .filter(|target| values.contains_key(target.name()))
            .cloned()
            .collect();
        let outcomes = if targets.is_empty() {
            Vec::new()
        } else {
            self.transition(RotationState::Propagating);
            info!(count = targets.len(), "Updating secrets");
            propagate(self.store.as_ref(), &targets, &values).await
        };

        let result = RotationResult::new(
            credential,
            &self.config.refresh_token,
            expires_at,
            targets,
            outcomes,
        );
        let summary = result.propagation_summary();
        if self.config.permission_policy == PermissionPolicy::Strict && summary.failure_count() > 0
        {
            return Err(RotateError::Propagation {
                failed: summary.failure_count(),
                total: result.targets.len(),
            });
        }

        self.transition(RotationState::Emitting);
        let channels = self.config.output_channels();
        let emitted = self.emitter.emit(&result, &channels).await?;
        if let Some(message) = summary.warning() {
            warn!("{message}");
            self.emitter.warn(&message)?;
        }

        self.transition(RotationState::Done);
        Ok(RotationReport { result, emitted })
    }

    /// The access token always has a destination; the refresh token only when
    /// the server handed out one.
    fn secret_values(&self, credential: &AccessCredential) -> HashMap<String, Secret> {
        let mut values = HashMap::new();
        values.insert(
            self.config.access_secret_name.clone(),
            credential.access_token.clone(),
        );
        if let Some(refresh) = &credential.refresh_token {
            values.insert(self.config.refresh_secret_name.clone(), refresh.clone());
        }
        values
    }

    fn transition(&mut self, next: RotationState) {
        debug!(from = %self.state, to = %next, "Rotation state change");
        self.state = next;
    }
}
