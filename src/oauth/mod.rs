pub mod expiry;
pub mod token;

pub use expiry::{compute_expiry, ExpiryTimestamp, DEFAULT_EXPIRES_IN_SECS};
pub use token::{AccessCredential, TokenRefresher};
