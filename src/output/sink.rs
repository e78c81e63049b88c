use std::io::Write;

/// A workflow command understood by the automation runner's log surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind<'a> {
    /// Hide `payload` from every later log line.
    AddMask,
    /// Legacy single-line step output.
    SetOutput { name: &'a str },
    Warning,
}

/// The log surface. Masking goes through here so it cannot be forgotten
/// by a channel that writes secrets.
pub trait CommandSink {
    fn emit(&mut self, kind: CommandKind<'_>, payload: &str) -> std::io::Result<()>;
}

/// Writes GitHub Actions style `::command::payload` lines.
#[derive(Debug)]
pub struct WorkflowCommands<W: Write> {
    writer: W,
}

impl WorkflowCommands<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> WorkflowCommands<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for WorkflowCommands<W> {
    fn emit(&mut self, kind: CommandKind<'_>, payload: &str) -> std::io::Result<()> {
        let data = escape_data(payload);
        match kind {
            CommandKind::AddMask => writeln!(self.writer, "::add-mask::{data}")?,
            CommandKind::SetOutput { name } => {
                writeln!(self.writer, "::set-output name={name}::{data}")?
            }
            CommandKind::Warning => writeln!(self.writer, "::warning::{data}")?,
        }
        self.writer.flush()
    }
}

/// Escape command data the way the runner expects (`%`, CR, LF).
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}
