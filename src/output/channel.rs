use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::RotateError;

use super::sink::{CommandKind, CommandSink};

/// Where rotated credentials are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChannel {
    /// Append-only `key=value` step output file (`GITHUB_OUTPUT`).
    StepOutput(PathBuf),
    /// Append-only `NAME=value` file exported to later steps (`GITHUB_ENV`).
    StepEnv(PathBuf),
    /// `::set-output` lines on the log surface, for older runners.
    Legacy,
}

impl OutputChannel {
    pub fn label(&self) -> &'static str {
        match self {
            OutputChannel::StepOutput(_) => "GITHUB_OUTPUT",
            OutputChannel::StepEnv(_) => "GITHUB_ENV",
            OutputChannel::Legacy => "legacy set-output",
        }
    }

    /// Write `fields` as `(key, value)` pairs. File channels get the pairs
    /// in one append so a reader never sees half a record.
    pub(crate) async fn write(
        &self,
        fields: &[(String, &str)],
        sink: &mut dyn CommandSink,
    ) -> Result<(), RotateError> {
        let result = match self {
            OutputChannel::StepOutput(path) | OutputChannel::StepEnv(path) => {
                append_key_values(path, fields).await
            }
            OutputChannel::Legacy => fields.iter().try_for_each(|(name, value)| {
                sink.emit(CommandKind::SetOutput { name: name.as_str() }, value)
            }),
        };
        result.map_err(|source| RotateError::OutputWrite {
            channel: self.label().to_string(),
            source,
        })
    }
}

async fn append_key_values(path: &Path, fields: &[(String, &str)]) -> std::io::Result<()> {
    let mut buf = String::new();
    for (key, value) in fields {
        if value.contains(['\n', '\r']) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("value for {key} spans multiple lines"),
            ));
        }
        buf.push_str(key);
        buf.push('=');
        buf.push_str(value);
        buf.push('\n');
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(buf.as_bytes()).await?;
    file.flush().await
}
