use crate::cache::CacheStore;
use crate::config::Settings;
use crate::config::settings::{DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_PYPI_URL};
use crate::core::{Backend, ManagerStatus};
use crate::error::Result;
use crate::process::{CapturedOutput, CommandSpec, capture};
use crate::ui;
use std::collections::HashSet;
use std::time::Duration;

/// Read-only environment shared by every backend: disable switches,
/// elevation helper, interpreter paths, timeouts and the cache store.
#[derive(Debug, Clone)]
pub struct BackendContext {
    disabled: HashSet<Backend>,
    elevator: String,
    choco_path: Option<String>,
    python: Option<String>,
    command_timeout: Duration,
    pypi_url: String,
    cache: CacheStore,
}

impl BackendContext {
    pub fn new(cache: CacheStore) -> Self {
        Self {
            disabled: HashSet::new(),
            elevator: default_elevator().to_string(),
            choco_path: None,
            python: None,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            pypi_url: DEFAULT_PYPI_URL.to_string(),
            cache,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut context = Self::new(CacheStore::new(settings.cache_dir()?));
        context.disabled = settings.disabled_backends().into_iter().collect();
        if let Some(elevator) = settings.get("elevator") {
            context.elevator = elevator.to_string();
        }
        context.choco_path = settings.get("choco-path").map(str::to_string);
        context.python = settings.get("python").map(str::to_string);
        context.command_timeout = Duration::from_secs(settings.command_timeout_secs());
        context.pypi_url = settings.pypi_url().to_string();
        Ok(context)
    }

    pub fn with_disabled(mut self, backend: Backend) -> Self {
        self.disabled.insert(backend);
        self
    }

    pub fn with_elevator(mut self, elevator: impl Into<String>) -> Self {
        self.elevator = elevator.into();
        self
    }

    pub fn with_choco_path(mut self, path: impl Into<String>) -> Self {
        self.choco_path = Some(path.into());
        self
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = Some(python.into());
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_pypi_url(mut self, url: impl Into<String>) -> Self {
        self.pypi_url = url.into();
        self
    }

    pub fn is_enabled(&self, backend: Backend) -> bool {
        !self.disabled.contains(&backend)
    }

    pub fn elevator(&self) -> &str {
        &self.elevator
    }

    pub fn choco_path(&self) -> Option<&str> {
        self.choco_path.as_deref()
    }

    pub fn python(&self) -> Option<&str> {
        self.python.as_deref()
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    pub fn pypi_url(&self) -> &str {
        self.pypi_url.trim_end_matches('/')
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Run a read query with the configured timeout.
    pub fn capture(&self, spec: &CommandSpec) -> Result<CapturedOutput> {
        capture(spec, self.command_timeout)
    }

    /// Resolve `executable` on PATH and read its version from line
    /// `version_line` of `version_command`'s output.
    pub fn probe(&self, executable: &str, version_command: &CommandSpec, version_line: usize) -> ManagerStatus {
        let Ok(path) = which::which(executable) else {
            ui::verbose(&format!("{} not found on PATH", executable));
            return ManagerStatus::missing();
        };

        let version = match self.capture(version_command) {
            Ok(output) if output.success() => output
                .lines()
                .get(version_line)
                .cloned()
                .unwrap_or_default(),
            Ok(output) => {
                ui::verbose(&format!(
                    "{} exited with {:?} while reporting its version",
                    executable, output.exit_code
                ));
                return ManagerStatus::missing();
            }
            Err(e) => {
                ui::verbose(&format!("{} is not usable: {}", executable, e));
                return ManagerStatus::missing();
            }
        };

        ManagerStatus {
            found: true,
            version,
            executable: Some(path.display().to_string()),
        }
    }
}

fn default_elevator() -> &'static str {
    if cfg!(windows) { "gsudo" } else { "sudo" }
}
