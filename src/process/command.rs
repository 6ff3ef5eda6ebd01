use crate::error::{PkgBridgeError, Result};
use crate::ui;
use crate::utils::{sanitize, text};
use std::thread;
use std::time::{Duration, Instant};

/// A fully resolved command line: executable, arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Split a configured executable such as `powershell -Command scoop`
    /// into program and leading arguments.
    pub fn from_executable(executable: &[String]) -> Self {
        let mut parts = executable.iter();
        let mut spec = Self::new(parts.next().cloned().unwrap_or_default());
        spec.args.extend(parts.cloned());
        spec
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Prefix the whole command line with the elevation helper.
    pub fn elevated(self, helper: &str) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: helper.to_string(),
            args,
            env: self.env,
        }
    }

    /// Shell-quoted rendering for logs and transcripts.
    pub fn display(&self) -> String {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        let joined = shlex::try_join(words.clone())
            .unwrap_or_else(|_| words.collect::<Vec<_>>().join(" "));
        sanitize::sanitize_for_display(&joined)
    }

    /// Build the duct expression with stdin closed and stderr merged into stdout.
    pub(crate) fn expression(&self) -> duct::Expression {
        let mut expr = duct::cmd(&self.program, &self.args);
        for (key, value) in &self.env {
            expr = expr.env(key, value);
        }
        expr.stdin_null().stderr_to_stdout().unchecked()
    }
}

/// Output of a finished read query.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    pub exit_code: Option<i32>,
    pub text: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a nonzero exit into an error carrying the last output line.
    pub fn checked(self, spec: &CommandSpec) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let last = self.lines().pop().unwrap_or_default();
        Err(PkgBridgeError::SystemCommandFailed {
            command: spec.display(),
            reason: format!("exit code {:?}: {}", self.exit_code, sanitize::sanitize_for_display(&last)),
        })
    }

    /// Normalized, non-blank output lines.
    pub fn lines(&self) -> Vec<String> {
        self.text
            .lines()
            .map(text::clean_line)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Run a read query to completion, killing it after `timeout`.
pub fn capture(spec: &CommandSpec, timeout: Duration) -> Result<CapturedOutput> {
    let command = spec.display();
    ui::verbose(&format!("Running: {}", command));

    let handle = spec
        .expression()
        .stdout_capture()
        .start()
        .map_err(|e| PkgBridgeError::SystemCommandFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    let start = Instant::now();
    loop {
        match handle.try_wait() {
            Ok(Some(output)) => {
                return Ok(CapturedOutput {
                    exit_code: output.status.code(),
                    text: String::from_utf8_lossy(&output.stdout).into_owned(),
                });
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = handle.kill();
                    return Err(PkgBridgeError::CommandTimedOut {
                        command,
                        seconds: timeout.as_secs(),
                    });
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                return Err(PkgBridgeError::SystemCommandFailed {
                    command,
                    reason: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_prefixes_whole_command() {
        let spec = CommandSpec::new("choco").args(["install", "git", "-y"]).elevated("gsudo");
        assert_eq!(spec.program, "gsudo");
        assert_eq!(spec.args, vec!["choco", "install", "git", "-y"]);
    }

    #[test]
    fn executable_with_leading_arguments() {
        let exe = vec![
            "powershell".to_string(),
            "-Command".to_string(),
            "scoop".to_string(),
        ];
        let spec = CommandSpec::from_executable(&exe).arg("list");
        assert_eq!(spec.program, "powershell");
        assert_eq!(spec.args, vec!["-Command", "scoop", "list"]);
    }

    #[test]
    fn display_quotes_arguments() {
        let spec = CommandSpec::new("winget").args(["search", ""]);
        assert_eq!(spec.display(), "winget search ''");
    }

    #[test]
    fn captured_lines_are_cleaned() {
        let out = CapturedOutput {
            exit_code: Some(0),
            text: "\x1b[32mgit\x1b[0m 2.44\n\n  \r\n 10%\r100% done\n".to_string(),
        };
        assert_eq!(out.lines(), vec!["git 2.44", "100% done"]);
        assert!(out.success());
    }

    #[test]
    fn checked_reports_last_line() {
        let spec = CommandSpec::new("scoop").arg("list");
        let out = CapturedOutput {
            exit_code: Some(1),
            text: "Installed apps:\nERROR something broke\n".to_string(),
        };
        let err = out.checked(&spec).expect_err("nonzero exit");
        assert!(err.to_string().contains("something broke"));
    }

    #[cfg(unix)]
    #[test]
    fn capture_collects_merged_output() {
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let out = capture(&spec, Duration::from_secs(10)).expect("capture");
        assert_eq!(out.exit_code, Some(3));
        assert!(out.text.contains("out"));
        assert!(out.text.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn capture_times_out() {
        let spec = CommandSpec::new("sh").args(["-c", "sleep 5"]);
        let err = capture(&spec, Duration::from_millis(200)).expect_err("timeout");
        assert!(matches!(err, PkgBridgeError::CommandTimedOut { .. }));
    }

    #[test]
    fn missing_program_is_an_error() {
        let spec = CommandSpec::new("pkgbridge-definitely-missing-binary");
        assert!(capture(&spec, Duration::from_secs(5)).is_err());
    }
}
