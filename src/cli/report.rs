use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::error::RotateError;
use crate::oauth::expiry::ExpiryTimestamp;
use crate::rotation::RotationReport;
use crate::secrets::PropagationOutcome;

#[derive(Debug, Serialize)]
struct TargetReport<'a> {
    secret: &'a str,
    repository: String,
    #[serde(flatten)]
    outcome: &'a PropagationOutcome,
}

/// JSON view of a finished rotation. Holds no secret values.
#[derive(Debug, Serialize)]
struct RotationSummary<'a> {
    expires_at: ExpiryTimestamp,
    expires_in: u64,
    refresh_rotated: bool,
    masked: usize,
    channels: &'a [&'static str],
    fully_propagated: bool,
    propagation: Vec<TargetReport<'a>>,
}

pub fn summary_json(report: &RotationReport) -> serde_json::Value {
    let result = &report.result;
    let summary = RotationSummary {
        expires_at: result.expires_at,
        expires_in: result.credential.expires_in_seconds,
        refresh_rotated: result.refresh_rotated,
        masked: report.emitted.masked,
        channels: &report.emitted.channels,
        fully_propagated: result.propagation_summary().is_fully_successful(),
        propagation: result
            .targets
            .iter()
            .zip(&result.propagation_outcomes)
            .map(|(target, outcome)| TargetReport {
                secret: target.name(),
                repository: target.repo_slug(),
                outcome,
            })
            .collect(),
    };
    serde_json::to_value(&summary).unwrap_or_default()
}

/// Print the outcome of a rotation.
///
/// In JSON mode the summary is a single compact line. Workflow commands for
/// the runner share stdout and always come first, so the summary is the last
/// line of the stream.
pub fn print_report<W: Write>(
    out: &mut W,
    report: &RotationReport,
    json_mode: bool,
    is_tty: bool,
) -> std::io::Result<()> {
    if json_mode {
        let json = serde_json::to_string(&summary_json(report)).unwrap_or_default();
        return writeln!(out, "{json}");
    }

    let result = &report.result;
    let check = if is_tty {
        "✓".green().to_string()
    } else {
        "✓".to_string()
    };
    writeln!(
        out,
        "{check} Token expires in {} seconds (at {})",
        result.credential.expires_in_seconds, result.expires_at
    )?;
    if result.refresh_rotated {
        writeln!(out, "{check} New refresh token issued")?;
    }
    for (target, outcome) in result.targets.iter().zip(&result.propagation_outcomes) {
        let line = match outcome {
            PropagationOutcome::Updated => format!("{check} Updated secret: {}", target.name()),
            PropagationOutcome::Skipped(reason) => {
                format!("- Skipped secret {}: {reason}", target.name())
            }
            PropagationOutcome::Failed(_) => {
                let why = if outcome.is_permission_denied() {
                    "insufficient permissions"
                } else {
                    "update failed"
                };
                let label = format!("✗ Not updated: {} ({why})", target.name());
                if is_tty {
                    label.yellow().to_string()
                } else {
                    label
                }
            }
        };
        writeln!(out, "{line}")?;
    }
    if !report.emitted.channels.is_empty() {
        writeln!(out, "Wrote: {}", report.emitted.channels.join(", "))?;
    }
    Ok(())
}

/// JSON errors follow the same last-line framing as the summary.
pub fn print_error(err: &RotateError, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string(&err.to_json()).unwrap_or_default()
        );
    } else {
        eprintln!("Error: {err}");
        if err.rotation_succeeded() {
            eprintln!("The token was rotated upstream; the new credential may not have been recorded.");
        }
    }
}
