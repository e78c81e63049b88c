pub mod env;
pub mod types;

pub use types::{OutputMode, PermissionPolicy, RotationConfig, RotationInputs};
