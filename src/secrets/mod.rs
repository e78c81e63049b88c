pub mod gh;
pub mod propagate;
pub mod store;

pub use gh::GhCliStore;
pub use propagate::{propagate, FailureReason, PropagationOutcome, PropagationSummary};
pub use store::{SecretStore, SecretTarget, StoreError};
