//! Streaming execution of mutating operations.
//!
//! Launching -> Streaming -> Terminated -> Reported, all on one worker
//! thread per operation. Output segments are forwarded as soon as a newline
//! or carriage return ends them.

use super::command::CommandSpec;
use super::events::{OperationHandle, OperationReport, ProgressEvent, ProgressSink};
use crate::core::{OperationKind, OutcomeRules, Package};
use crate::error::{PkgBridgeError, Result};
use crate::packages::registry::InFlightGuard;
use crate::ui;
use crate::utils::text;
use std::io::{self, BufRead, BufReader};
use std::thread;
use std::time::Duration;

/// Phrase that moves the coarse progress counter to `step`.
#[derive(Debug, Clone, Copy)]
pub struct ProgressMarker {
    pub phrase: &'static str,
    pub step: u32,
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressRule {
    /// Counter jumps forward when a marker phrase shows up.
    Markers(&'static [ProgressMarker]),
    /// Counter ticks once per output line.
    EveryLine,
}

impl ProgressRule {
    /// Highest step the counter can reach, 0 when open-ended.
    pub fn total(&self) -> usize {
        match self {
            Self::Markers(markers) => markers.iter().map(|m| m.step as usize).max().unwrap_or(0),
            Self::EveryLine => 0,
        }
    }

    /// New counter value if `line` advances it.
    pub fn advance(&self, line: &str, current: u32) -> Option<u32> {
        match self {
            Self::Markers(markers) => markers
                .iter()
                .filter(|m| m.step > current && line.contains(m.phrase))
                .map(|m| m.step)
                .max(),
            Self::EveryLine => Some(current + 1),
        }
    }
}

/// Everything the worker needs to run one operation.
pub struct OperationRequest {
    pub kind: OperationKind,
    pub package: Package,
    pub command: CommandSpec,
    pub rules: &'static OutcomeRules,
    pub progress: ProgressRule,
    /// Whether the command runs through the elevation helper.
    pub elevated: bool,
    pub guard: Option<InFlightGuard>,
}

/// Start the operation on its own worker and return immediately.
pub fn launch(request: OperationRequest, sink: Box<dyn ProgressSink>) -> OperationHandle {
    let kind = request.kind;
    let package = request.package.clone();
    ui::verbose(&format!("Launching {} of {}: {}", kind, package.id, request.command.display()));

    let worker = thread::spawn(move || run_to_completion(request, sink));
    OperationHandle::running(kind, package, worker)
}

fn run_to_completion(request: OperationRequest, mut sink: Box<dyn ProgressSink>) -> OperationReport {
    let OperationRequest {
        kind,
        package,
        command,
        rules,
        progress,
        elevated,
        guard,
    } = request;

    let mut transcript = String::new();
    let (exit_code, outcome) = match stream(&command, progress, &mut transcript, sink.as_mut()) {
        Ok(exit_code) => (exit_code, rules.classify(exit_code, &transcript, elevated)),
        Err(e) => {
            transcript.push_str(&e.to_string());
            transcript.push('\n');
            (None, crate::core::OperationOutcome::Failed)
        }
    };

    // Release the package before anyone learns the operation is over.
    drop(guard);

    let report = OperationReport {
        kind,
        package,
        outcome,
        exit_code,
        transcript,
    };
    ui::verbose(&format!(
        "{} of {} finished: {} (exit code {:?})",
        report.kind, report.package.id, report.outcome, report.exit_code
    ));
    sink.on_event(ProgressEvent::Finished(report.clone()));
    report
}

/// Stream output until EOF, then collect the exit code.
fn stream(
    command: &CommandSpec,
    progress: ProgressRule,
    transcript: &mut String,
    sink: &mut dyn ProgressSink,
) -> Result<Option<i32>> {
    let display = command.display();
    let reader = command
        .expression()
        .reader()
        .map_err(|e| PkgBridgeError::SystemCommandFailed {
            command: display.clone(),
            reason: e.to_string(),
        })?;

    let mut buffered = BufReader::new(&reader);
    let mut raw = Vec::new();
    let mut counter = 0u32;

    loop {
        raw.clear();
        let read = read_segment(&mut buffered, &mut raw).map_err(|e| PkgBridgeError::SystemCommandFailed {
            command: display.clone(),
            reason: e.to_string(),
        })?;
        if read == 0 {
            break;
        }

        let line = text::strip_ansi(&String::from_utf8_lossy(&raw)).trim().to_string();
        if line.is_empty() {
            continue;
        }

        transcript.push_str(&line);
        transcript.push('\n');
        let advanced = progress.advance(&line, counter);
        sink.on_event(ProgressEvent::Line { line });
        if let Some(next) = advanced {
            counter = next;
            sink.on_event(ProgressEvent::Progress { count: counter });
        }
    }

    loop {
        match reader.try_wait() {
            Ok(Some(output)) => return Ok(output.status.code()),
            Ok(None) => thread::sleep(Duration::from_millis(50)),
            Err(e) => {
                return Err(PkgBridgeError::SystemCommandFailed {
                    command: display,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Read bytes up to the next `\n` or `\r` (not included).
/// Returns the number of bytes consumed, 0 at EOF.
fn read_segment<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    let mut consumed = 0;
    loop {
        let available = match reader.fill_buf() {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(consumed);
        }

        if let Some(pos) = available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            buf.extend_from_slice(&available[..pos]);
            reader.consume(pos + 1);
            return Ok(consumed + pos + 1);
        }

        let len = available.len();
        buf.extend_from_slice(available);
        reader.consume(len);
        consumed += len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKERS: &[ProgressMarker] = &[
        ProgressMarker { phrase: "Installing", step: 1 },
        ProgressMarker { phrase: "Downloading", step: 4 },
        ProgressMarker { phrase: "was installed successfully!", step: 6 },
    ];

    #[test]
    fn markers_only_move_forward() {
        let rule = ProgressRule::Markers(MARKERS);
        assert_eq!(rule.total(), 6);
        assert_eq!(rule.advance("Installing 'git'", 0), Some(1));
        assert_eq!(rule.advance("Downloading git.zip", 1), Some(4));
        assert_eq!(rule.advance("Installing shim", 4), None);
        assert_eq!(rule.advance("nothing here", 4), None);
    }

    #[test]
    fn every_line_counts() {
        let rule = ProgressRule::EveryLine;
        assert_eq!(rule.total(), 0);
        assert_eq!(rule.advance("anything", 41), Some(42));
    }

    #[test]
    fn segments_split_on_newline_and_carriage_return() {
        let mut input = io::Cursor::new(b"one\r\ntwo\r 50%\r100%\nlast".to_vec());
        let mut segments = Vec::new();
        let mut buf = Vec::new();
        while read_segment(&mut input, &mut buf).expect("read") > 0 {
            segments.push(String::from_utf8_lossy(&buf).into_owned());
            buf.clear();
        }
        assert_eq!(segments, vec!["one", "", "two", " 50%", "100%", "last"]);
    }
}
