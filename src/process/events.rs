//! Progress protocol between a running operation and whoever watches it.
//!
//! A mutating operation pushes `Line` and `Progress` events while the
//! external process runs, then exactly one `Finished` event once it has
//! exited. The sink is owned by the operation's worker and dropped right
//! after the terminal event, which closes a channel-backed sink.

use crate::core::{OperationKind, OperationOutcome, Package};
use serde::Serialize;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ProgressEvent {
    Line { line: String },
    Progress { count: u32 },
    Finished(OperationReport),
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Terminal result of one mutating operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationReport {
    pub kind: OperationKind,
    pub package: Package,
    pub outcome: OperationOutcome,
    pub exit_code: Option<i32>,
    pub transcript: String,
}

impl OperationReport {
    /// Report for an operation that failed before any process was launched.
    pub fn failed(kind: OperationKind, package: Package, reason: impl Into<String>) -> Self {
        Self {
            kind,
            package,
            outcome: OperationOutcome::Failed,
            exit_code: None,
            transcript: reason.into(),
        }
    }
}

pub trait ProgressSink: Send {
    fn on_event(&mut self, event: ProgressEvent);
}

impl ProgressSink for Sender<ProgressEvent> {
    fn on_event(&mut self, event: ProgressEvent) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.send(event);
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_event(&mut self, _event: ProgressEvent) {}
}

enum HandleState {
    Running(JoinHandle<OperationReport>),
    Done(OperationReport),
}

/// Handle to an operation running on its own worker.
pub struct OperationHandle {
    kind: OperationKind,
    package: Package,
    state: HandleState,
}

impl OperationHandle {
    pub(crate) fn running(kind: OperationKind, package: Package, worker: JoinHandle<OperationReport>) -> Self {
        Self {
            kind,
            package,
            state: HandleState::Running(worker),
        }
    }

    /// Handle that is already finished; the sink has received its terminal event.
    pub(crate) fn finished(report: OperationReport) -> Self {
        Self {
            kind: report.kind,
            package: report.package.clone(),
            state: HandleState::Done(report),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Running(worker) => worker.is_finished(),
            HandleState::Done(_) => true,
        }
    }

    /// Block until the operation has terminated.
    pub fn wait(self) -> OperationReport {
        match self.state {
            HandleState::Done(report) => report,
            HandleState::Running(worker) => worker.join().unwrap_or_else(|_| {
                OperationReport::failed(
                    self.kind,
                    self.package,
                    "operation worker panicked before reporting a result",
                )
            }),
        }
    }
}
