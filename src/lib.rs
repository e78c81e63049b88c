pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;
pub mod output;
pub mod rotation;
pub mod secrets;
pub mod types;

pub use config::{RotationConfig, RotationInputs};
pub use error::{RotateError, TokenRefreshError};
pub use oauth::{AccessCredential, TokenRefresher};
pub use output::{OutputChannel, OutputEmitter, WorkflowCommands};
pub use rotation::{RotationReport, RotationResult, RotationState, Rotator};
pub use secrets::{GhCliStore, PropagationOutcome, SecretStore, SecretTarget};
pub use types::Secret;

/// One-shot convenience function: validate inputs, rotate through the GitHub
/// CLI store, and write workflow commands to stdout.
pub async fn rotate_once(inputs: RotationInputs) -> Result<RotationReport, RotateError> {
    let config = RotationConfig::from_inputs(inputs)?;
    let mut rotator = Rotator::new(
        config,
        Box::new(GhCliStore::default()),
        WorkflowCommands::stdout(),
    )?;
    rotator.run().await
}
