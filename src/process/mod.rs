pub mod command;
pub mod events;
pub mod runner;

pub use command::{CapturedOutput, CommandSpec, capture};
pub use events::{NullSink, OperationHandle, OperationReport, ProgressEvent, ProgressSink};
pub use runner::{OperationRequest, ProgressMarker, ProgressRule, launch};
