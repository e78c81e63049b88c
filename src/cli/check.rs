use std::io::Write;

use colored::Colorize;

use crate::config::RotationConfig;
use crate::error::RotateError;
use crate::oauth::expiry::{classify_expiry, ExpiryStatus};
use crate::oauth::token::TokenRefresher;

/// What the caller currently holds, as reported by the environment.
#[derive(Debug, Clone, Default)]
pub struct CheckInputs {
    pub access_token_set: bool,
    pub expires_at: Option<String>,
}

/// Report on the current credential and try a refresh without emitting
/// anything. Only a masked preview of the new access token is printed.
///
/// The trial refresh is real: a server that rotates refresh tokens
/// invalidates the one passed in, and the replacement is not kept.
pub async fn run_check<W: Write>(
    out: &mut W,
    config: &RotationConfig,
    inputs: &CheckInputs,
    now: i64,
    is_tty: bool,
) -> Result<(), RotateError> {
    let mark = |ok: bool| -> String {
        match (ok, is_tty) {
            (true, true) => "✓".green().to_string(),
            (false, true) => "✗".red().to_string(),
            (true, false) => "✓".to_string(),
            (false, false) => "✗".to_string(),
        }
    };

    writeln!(out, "=== OAuth Token Refresh Check ===")?;
    writeln!(
        out,
        "Access Token: {}",
        if inputs.access_token_set {
            format!("{} Set", mark(true))
        } else {
            format!("{} Not set", mark(false))
        }
    )?;
    writeln!(out, "Refresh Token: {} Set", mark(true))?;
    match &inputs.expires_at {
        Some(at) => writeln!(out, "Expires At: {at}")?,
        None => writeln!(out, "Expires At: {} Not set", mark(false))?,
    }

    if let Some(at) = &inputs.expires_at {
        match classify_expiry(now, at) {
            Some(status @ ExpiryStatus::Valid { .. }) => {
                let hours = status.remaining_hours().unwrap_or_default();
                writeln!(out, "Token expires in {hours:.2} hours")?;
                writeln!(out, "{} Token is still valid", mark(true))?;
            }
            Some(status @ ExpiryStatus::ExpiringSoon { .. }) => {
                let hours = status.remaining_hours().unwrap_or_default();
                writeln!(out, "Token expires in {hours:.2} hours")?;
                writeln!(out, "Token expires soon, refresh recommended")?;
            }
            Some(ExpiryStatus::Expired) => writeln!(out, "Token has expired")?,
            None => writeln!(out, "Could not parse expiration '{at}'")?,
        }
    }

    writeln!(out, "Testing token refresh against {}", config.token_endpoint)?;
    writeln!(
        out,
        "Note: this performs a real refresh and may consume the current refresh token"
    )?;
    let refresher = TokenRefresher::new(
        config.token_endpoint.clone(),
        config.client_id.clone(),
        config.timeout,
    )?;
    let credential = match refresher.refresh(&config.refresh_token).await {
        Ok(c) => c,
        Err(e) => {
            writeln!(out, "{} Token refresh failed", mark(false))?;
            return Err(e.into());
        }
    };

    writeln!(out, "{} Token refresh successful", mark(true))?;
    writeln!(
        out,
        "New access token: {}",
        credential.access_token.preview()
    )?;
    writeln!(
        out,
        "Expires in: {} seconds ({:.2} hours)",
        credential.expires_in_seconds,
        credential.expires_in_seconds as f64 / 3600.0
    )?;
    writeln!(
        out,
        "New refresh token provided: {}",
        if credential.refresh_token.is_some() {
            "Yes"
        } else {
            "No"
        }
    )?;
    if credential.refresh_rotated(&config.refresh_token) {
        writeln!(
            out,
            "{} The refresh token was rotated; the stored one no longer works. Run `tokrot rotate` with a fresh token.",
            mark(false)
        )?;
    }
    Ok(())
}
