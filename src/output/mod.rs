pub mod channel;
pub mod emitter;
pub mod sink;

pub use channel::OutputChannel;
pub use emitter::{EmitReport, OutputEmitter};
pub use sink::{CommandKind, CommandSink, WorkflowCommands};
