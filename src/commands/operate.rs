//! Install, update and uninstall commands.
//!
//! Operations go through the registry, so a second request for a package
//! that is already being changed is refused. Progress is drawn on stderr,
//! or streamed as JSON lines with `--format json`.

use super::Session;
use crate::cli::args::OperationArgs;
use crate::core::{
    Backend, InstallationOptions, InstallationScope, OperationKind, OperationOutcome, Package,
};
use crate::error::{PkgBridgeError, Result};
use crate::packages::PackageManager;
use crate::process::{OperationReport, ProgressEvent, ProgressSink};
use crate::ui::{self as output, progress::TerminalProgress};
use crate::utils::{machine_output, text};

/// Prints every progress event as one JSON line.
pub struct JsonLinesSink;

impl ProgressSink for JsonLinesSink {
    fn on_event(&mut self, event: ProgressEvent) {
        if let Err(e) = machine_output::emit_json_line(&event) {
            output::verbose(&format!("Could not encode progress event: {}", e));
        }
    }
}

/// Source a package gets when the caller names none and no listing knows it.
fn default_source(backend: Backend) -> &'static str {
    match backend {
        Backend::Winget => "winget",
        Backend::Choco => "chocolatey",
        Backend::Scoop => "Scoop",
        Backend::Pip => "Pip",
    }
}

fn matches(package: &Package, id: &str, source: Option<&str>) -> bool {
    package.id.eq_ignore_ascii_case(id) && source.is_none_or(|s| package.source == s)
}

/// Find the package the caller means: installed packages first when the
/// operation acts on an installed copy, then search results, then a bare
/// package built from the id.
pub fn resolve_package(
    manager: &dyn PackageManager,
    id: &str,
    source: Option<&str>,
    installed_only: bool,
) -> Package {
    let installed = manager.list_installed().into_iter().find(|p| matches(p, id, source));
    if let Some(package) = installed {
        return package;
    }
    if !installed_only
        && let Some(package) = manager.search(id).into_iter().find(|p| matches(p, id, source))
    {
        return package;
    }

    let backend = manager.backend_type();
    Package::new(
        text::format_id_as_name(id),
        id,
        "",
        source.unwrap_or(default_source(backend)),
        backend,
    )
}

pub fn options_from_args(args: &OperationArgs) -> Result<InstallationOptions> {
    let options = InstallationOptions {
        version: args.version.clone(),
        architecture: args.architecture.clone(),
        scope: args.scope.as_deref().map(str::parse::<InstallationScope>).transpose()?,
        run_as_administrator: args.admin,
        interactive: args.interactive,
        skip_hash_check: args.skip_hash,
        remove_data_on_uninstall: args.purge,
        ..Default::default()
    };
    match &args.custom {
        Some(raw) => options.with_custom_parameters(raw),
        None => Ok(options),
    }
}

fn progress_title(kind: OperationKind, package: &Package) -> String {
    let verb = match kind {
        OperationKind::Install => "Installing",
        OperationKind::Update => "Updating",
        OperationKind::Uninstall => "Uninstalling",
    };
    format!("{} {}", verb, package.name)
}

pub fn run(session: &Session, kind: OperationKind, args: &OperationArgs) -> Result<()> {
    let manager = session.registry.by_name(&args.backend)?;
    let options = options_from_args(args)?;
    let package = resolve_package(
        manager.as_ref(),
        &args.id,
        args.source.as_deref(),
        kind != OperationKind::Install,
    );
    output::verbose(&format!("Resolved {} to {}", args.id, package));

    let sink: Box<dyn ProgressSink> = if session.json() {
        Box::new(JsonLinesSink)
    } else {
        let total = manager.progress_rule(kind).total();
        let echo = args.show_output || output::is_verbose();
        Box::new(TerminalProgress::new(&progress_title(kind, &package), total, echo))
    };

    let report = session.registry.start(kind, &package, &options, sink)?.wait();
    summarize(session, &report)
}

fn summarize(session: &Session, report: &OperationReport) -> Result<()> {
    let outcome = report.outcome;
    if !session.json() {
        let message = format!("{}: {}", report.package.name, outcome.describe());
        if outcome.is_success() {
            output::success(&message);
        } else if outcome.needs_elevation() {
            output::warning(&message);
            output::info("Retry with --admin");
        } else {
            output::error(&message);
            let lines: Vec<&str> = report.transcript.lines().collect();
            for line in &lines[lines.len().saturating_sub(5)..] {
                output::indent(line, 1);
            }
        }
    }

    if outcome.is_success() || outcome == OperationOutcome::NoApplicableUpdateFound {
        Ok(())
    } else {
        Err(PkgBridgeError::Other(format!(
            "{} of {} finished with {}",
            report.kind, report.package.id, outcome
        )))
    }
}
