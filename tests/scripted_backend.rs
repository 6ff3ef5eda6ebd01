// End-to-end operation tests against a scripted backend.
// The backend's "package manager" is a shell snippet, so these only run on unix.
#![cfg(unix)]

use pkgbridge::cache::CacheStore;
use pkgbridge::core::{
    Backend, Capabilities, InstallationOptions, ManagerStatus, OperationKind, OperationOutcome,
    OutcomeRules, Package, PackageDetails, UpgradablePackage,
};
use pkgbridge::error::{PkgBridgeError, Result};
use pkgbridge::packages::{BackendContext, BackendRegistry, PackageManager};
use pkgbridge::process::{CommandSpec, NullSink, ProgressEvent, ProgressMarker, ProgressRule};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

static RULES: OutcomeRules = OutcomeRules {
    success_markers: &["is already installed"],
    // unix exit statuses are 8 bits wide
    restart_exit_codes: &[42],
    elevation_markers: &["requires admin rights"],
    ..OutcomeRules::EXIT_CODE_ONLY
};

static MARKERS: &[ProgressMarker] = &[
    ProgressMarker { phrase: "Downloading", step: 2 },
    ProgressMarker { phrase: "was installed", step: 4 },
];

struct ScriptedManager {
    context: Arc<BackendContext>,
    program: String,
    script: String,
}

impl ScriptedManager {
    fn new(context: Arc<BackendContext>, script: &str) -> Self {
        Self {
            context,
            program: "sh".to_string(),
            script: script.to_string(),
        }
    }
}

impl PackageManager for ScriptedManager {
    fn backend_type(&self) -> Backend {
        Backend::Scoop
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn context(&self) -> &BackendContext {
        &self.context
    }

    fn probe_installation(&self) -> ManagerStatus {
        ManagerStatus {
            found: true,
            version: "1.0".into(),
            executable: Some("sh".into()),
        }
    }

    fn fetch_installed(&self) -> Result<Vec<Package>> {
        Err(PkgBridgeError::Other("listing is broken".into()))
    }

    fn fetch_upgrades(&self) -> Result<Vec<UpgradablePackage>> {
        Ok(Vec::new())
    }

    fn fill_details(&self, details: &mut PackageDetails) -> Result<()> {
        details.description = Some("partially filled".into());
        Err(PkgBridgeError::Other("metadata endpoint down".into()))
    }

    fn base_command(
        &self,
        _kind: OperationKind,
        _package: &Package,
        _options: &InstallationOptions,
    ) -> CommandSpec {
        CommandSpec::new(self.program.as_str()).args(["-c", self.script.as_str()])
    }

    fn translate_options(&self, _kind: OperationKind, _options: &InstallationOptions) -> Vec<String> {
        Vec::new()
    }

    fn outcome_rules(&self, _kind: OperationKind) -> &'static OutcomeRules {
        &RULES
    }

    fn progress_rule(&self, _kind: OperationKind) -> ProgressRule {
        ProgressRule::Markers(MARKERS)
    }
}

fn registry(dir: &TempDir, script: &str) -> BackendRegistry {
    let context = Arc::new(BackendContext::new(CacheStore::new(dir.path())));
    let mut registry = BackendRegistry::new(context.clone());
    registry.register(Arc::new(ScriptedManager::new(context, script)));
    registry
}

fn package() -> Package {
    Package::new("Vlc", "vlc", "3.0.20", "Scoop: extras", Backend::Scoop)
}

fn run(script: &str) -> (OperationOutcome, Vec<ProgressEvent>) {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, script);
    let (tx, rx) = mpsc::channel();
    let report = registry
        .install(&package(), &InstallationOptions::default(), Box::new(tx))
        .unwrap()
        .wait();
    let events: Vec<ProgressEvent> = rx.iter().collect();
    (report.outcome, events)
}

#[test]
fn events_stream_in_order_and_finish_once() {
    let (outcome, events) = run("echo 'Downloading vlc'; echo 'vlc was installed'; exit 0");
    assert_eq!(outcome, OperationOutcome::Succeeded);

    let lines: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Line { line } => Some(line.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(lines, vec!["Downloading vlc", "vlc was installed"]);

    let counts: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { count } => Some(*count),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![2, 4]);

    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.last().unwrap().is_terminal());
}

#[test]
fn exit_codes_and_markers_are_normalized() {
    assert_eq!(run("exit 42").0, OperationOutcome::NeedsRestart);
    assert_eq!(run("echo 'vlc is already installed'; exit 1").0, OperationOutcome::Succeeded);
    assert_eq!(run("echo 'this requires admin rights' >&2; exit 1").0, OperationOutcome::NeedsElevation);
    assert_eq!(run("exit 7").0, OperationOutcome::Failed);
}

#[test]
fn carriage_returns_split_segments() {
    let (_, events) = run("printf 'Downloading 10%%\\rDownloading 100%%\\ndone\\n'");
    let lines: Vec<String> = events
        .into_iter()
        .filter_map(|e| match e {
            ProgressEvent::Line { line } => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(lines, vec!["Downloading 10%", "Downloading 100%", "done"]);
}

#[test]
fn duplicate_operation_is_refused_until_the_first_finishes() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "sleep 1; exit 0");
    let options = InstallationOptions::default();

    let first = registry.install(&package(), &options, Box::new(NullSink)).unwrap();
    assert!(registry.is_in_flight(&package().key()));

    let second = registry.update(&package(), &options, Box::new(NullSink));
    assert!(matches!(second, Err(PkgBridgeError::OperationInProgress(_))));

    assert_eq!(first.wait().outcome, OperationOutcome::Succeeded);
    assert!(!registry.is_in_flight(&package().key()));

    let third = registry.install(&package(), &options, Box::new(NullSink)).unwrap();
    assert!(!third.wait().transcript.contains("in progress"));
}

#[test]
fn other_packages_run_concurrently() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "sleep 1; exit 0");
    let options = InstallationOptions::default();
    let other = Package::new("Git", "git", "2.44.0", "Scoop: main", Backend::Scoop);

    let first = registry.install(&package(), &options, Box::new(NullSink)).unwrap();
    let second = registry.install(&other, &options, Box::new(NullSink)).unwrap();
    assert!(!first.is_finished() || !second.is_finished());
    assert!(first.wait().outcome.is_success());
    assert!(second.wait().outcome.is_success());
}

#[test]
fn missing_executable_finishes_failed() {
    let dir = TempDir::new().unwrap();
    let context = Arc::new(BackendContext::new(CacheStore::new(dir.path())));
    let mut registry = BackendRegistry::new(context.clone());

    let mut missing = ScriptedManager::new(context, "exit 0");
    missing.program = "/nonexistent/pkgbridge-fake-manager".to_string();
    registry.register(Arc::new(missing));
    let (tx, rx) = mpsc::channel();
    let report = registry
        .install(&package(), &InstallationOptions::default(), Box::new(tx))
        .unwrap()
        .wait();

    assert_eq!(report.outcome, OperationOutcome::Failed);
    assert!(report.exit_code.is_none());
    assert!(!report.transcript.is_empty());
    let events: Vec<ProgressEvent> = rx.recv_timeout(Duration::from_secs(5)).into_iter().collect();
    assert!(events[0].is_terminal());
    assert!(!registry.is_in_flight(&package().key()));
}

#[test]
fn read_queries_degrade_instead_of_failing() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir, "exit 0");
    let manager = registry.get(Backend::Scoop).unwrap();

    assert!(manager.list_installed().is_empty());
    assert!(registry.installed_all().is_empty());

    let details = manager.details(&package());
    assert_eq!(details.description.as_deref(), Some("partially filled"));
    assert!(details.author.is_none());
}
