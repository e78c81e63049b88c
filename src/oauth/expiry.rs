use std::fmt;

use serde::Serialize;

/// Lifetime assumed when the token endpoint omits `expires_in` (8 hours).
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 28_800;

/// Tokens with less than this many seconds left are reported as expiring soon.
pub const EXPIRY_GRACE_SECS: i64 = 300;

/// Absolute expiry as Unix epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ExpiryTimestamp(i64);

impl ExpiryTimestamp {
    pub fn epoch_seconds(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ExpiryTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `now + expires_in`. Pure and total; saturates instead of overflowing.
pub fn compute_expiry(now_epoch_seconds: i64, expires_in_seconds: u64) -> ExpiryTimestamp {
    let delta = i64::try_from(expires_in_seconds).unwrap_or(i64::MAX);
    ExpiryTimestamp(now_epoch_seconds.saturating_add(delta))
}

/// Current wall-clock time in whole epoch seconds (floored).
pub fn now_epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpiryStatus {
    Valid { remaining_secs: i64 },
    ExpiringSoon { remaining_secs: i64 },
    Expired,
}

impl ExpiryStatus {
    pub fn remaining_hours(&self) -> Option<f64> {
        match self {
            ExpiryStatus::Valid { remaining_secs }
            | ExpiryStatus::ExpiringSoon { remaining_secs } => {
                Some(*remaining_secs as f64 / 3600.0)
            }
            ExpiryStatus::Expired => None,
        }
    }
}

/// Classify a previously recorded `expires_at` value (epoch seconds, integer
/// or fractional) against `now`.
pub fn classify_expiry(now_epoch_seconds: i64, expires_at: &str) -> Option<ExpiryStatus> {
    let at: f64 = expires_at.trim().parse().ok()?;
    if !at.is_finite() {
        return None;
    }
    let remaining_secs = at.floor() as i64 - now_epoch_seconds;
    Some(if remaining_secs <= 0 {
        ExpiryStatus::Expired
    } else if remaining_secs > EXPIRY_GRACE_SECS {
        ExpiryStatus::Valid { remaining_secs }
    } else {
        ExpiryStatus::ExpiringSoon { remaining_secs }
    })
}
