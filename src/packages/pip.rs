//! Pip
//!
//! Pip has no catalog dump, so search runs on demand through the
//! `parse_pip_search` helper, which is installed into the interpreter the
//! first time it is needed. Details come from the PyPI JSON API.

use super::context::BackendContext;
use super::parsing::{Blacklist, TableScanner};
use super::pypi::{self, PypiClient};
use super::traits::PackageManager;
use crate::core::{
    Backend, BackendElevationRule, Capabilities, InstallationOptions, InstallationScope,
    ManagerStatus, OperationKind, OperationOutcome, OutcomeRules, Package, PackageDetails,
    UpgradablePackage,
};
use crate::error::Result;
use crate::process::{CommandSpec, ProgressMarker, ProgressRule};
use crate::ui;
use crate::utils::text;
use std::sync::Arc;

const SOURCE: &str = "Pip";
const SEARCH_HELPER: &str = "parse_pip_search";
const VERSIONS_PREFIX: &str = "Available versions:";
const QUIET_FLAGS: &[&str] = &[
    "--no-input",
    "--no-color",
    "--no-python-version-warning",
    "--no-cache-dir",
];

pub const BLACKLIST: Blacklist = Blacklist {
    names: &["WARNING:", "[notice]", "Package"],
    ids: &["WARNING:", "[notice]", "Package"],
    versions: &["Ignoring", "invalie"],
};

static RULES: OutcomeRules = OutcomeRules {
    backend_elevation: Some(BackendElevationRule {
        marker: "--user",
        unless: &[],
        requires_failure: true,
        skip_when_elevated: false,
        outcome: OperationOutcome::NeedsPipElevation,
    }),
    ..OutcomeRules::EXIT_CODE_ONLY
};

static INSTALL_PROGRESS: &[ProgressMarker] = &[
    ProgressMarker { phrase: "Collecting", step: 1 },
    ProgressMarker { phrase: "Downloading", step: 3 },
    ProgressMarker { phrase: "Installing collected packages", step: 5 },
    ProgressMarker { phrase: "Successfully installed", step: 6 },
];

static UNINSTALL_PROGRESS: &[ProgressMarker] = &[
    ProgressMarker { phrase: "Found existing installation", step: 1 },
    ProgressMarker { phrase: "Uninstalling", step: 3 },
    ProgressMarker { phrase: "Successfully uninstalled", step: 6 },
];

pub struct PipManager {
    context: Arc<BackendContext>,
}

fn default_python() -> &'static str {
    if cfg!(windows) { "python.exe" } else { "python3" }
}

impl PipManager {
    pub fn new(context: Arc<BackendContext>) -> Self {
        Self { context }
    }

    fn python(&self) -> &str {
        self.context.python().unwrap_or(default_python())
    }

    fn pip(&self) -> CommandSpec {
        CommandSpec::new(self.python()).args(["-m", "pip"])
    }

    /// Install the search helper into the interpreter when it is not on PATH.
    fn ensure_search_helper(&self) -> Result<()> {
        if which::which(SEARCH_HELPER).is_ok() {
            return Ok(());
        }
        ui::info(&format!("Installing {}, which pip search needs", SEARCH_HELPER));
        let spec = self
            .pip()
            .args(["install", SEARCH_HELPER])
            .args(common_parameters(OperationKind::Install, &InstallationOptions::default()));
        self.context.capture(&spec)?.checked(&spec)?;
        Ok(())
    }
}

/// Flags every pip operation gets, after the caller's custom parameters.
fn common_parameters(kind: OperationKind, options: &InstallationOptions) -> Vec<String> {
    let mut args: Vec<String> = options.custom_parameters.clone();
    // pip uninstall has no --user flag
    if options.scope == Some(InstallationScope::User) && kind != OperationKind::Uninstall {
        args.push("--user".to_string());
    }
    args.extend(QUIET_FLAGS.iter().map(|flag| flag.to_string()));
    if kind != OperationKind::Uninstall {
        args.extend(["--progress-bar".to_string(), "off".to_string()]);
    }
    args
}

/// Rows after the dashes line, cut by `split`, with at least `min_columns` cells.
fn table_rows(output: &str, min_columns: usize, split: fn(&str) -> Vec<&str>) -> Vec<Vec<String>> {
    let mut scanner = TableScanner::new();
    let mut rows = Vec::new();
    for line in output.lines().map(text::clean_line) {
        let Some(row) = scanner.feed(&line) else {
            continue;
        };
        let cells: Vec<String> = split(row).into_iter().map(str::to_string).collect();
        if cells.len() >= min_columns {
            rows.push(cells);
        }
    }
    rows
}

fn pipe_cells(line: &str) -> Vec<&str> {
    text::split_delimited(line, '|')
}

/// `parse_pip_search <query>`: `name | version | released | description`
pub fn parse_search(output: &str) -> Vec<Package> {
    table_rows(output, 2, pipe_cells)
        .into_iter()
        .filter_map(|cells| {
            let name = text::format_id_as_name(&cells[0]);
            BLACKLIST
                .allows(&name, &cells[0], &[cells[1].as_str()])
                .then(|| Package::new(name, cells[0].as_str(), cells[1].as_str(), SOURCE, Backend::Pip))
        })
        .collect()
}

/// `pip list`
pub fn parse_installed(output: &str) -> Vec<Package> {
    table_rows(output, 2, text::split_whitespace_columns)
        .into_iter()
        .filter_map(|cells| {
            let name = text::format_id_as_name(&cells[0]);
            BLACKLIST
                .allows(&name, &cells[0], &[cells[1].as_str()])
                .then(|| Package::new(name, cells[0].as_str(), cells[1].as_str(), SOURCE, Backend::Pip))
        })
        .collect()
}

/// `pip list --outdated`: `package version latest type`
pub fn parse_upgrades(output: &str) -> Vec<UpgradablePackage> {
    table_rows(output, 3, text::split_whitespace_columns)
        .into_iter()
        .filter_map(|cells| {
            let name = text::format_id_as_name(&cells[0]);
            if !BLACKLIST.allows(&name, &cells[0], &[cells[1].as_str(), cells[2].as_str()]) {
                return None;
            }
            let package = Package::new(name, cells[0].as_str(), cells[1].as_str(), SOURCE, Backend::Pip);
            Some(UpgradablePackage::new(package, cells[2].as_str()))
        })
        .collect()
}

/// `pip index versions <id>`
pub fn parse_versions(output: &str) -> Vec<String> {
    output
        .lines()
        .map(text::clean_line)
        .find_map(|line| {
            let (_, list) = line.split_once(VERSIONS_PREFIX)?;
            Some(
                list.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        })
        .unwrap_or_default()
}

impl PackageManager for PipManager {
    fn backend_type(&self) -> Backend {
        Backend::Pip
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_run_as_admin: true,
            can_skip_integrity_checks: false,
            can_run_interactively: false,
            can_remove_data_on_uninstall: false,
            supports_custom_versions: true,
            supports_custom_architectures: false,
            supports_custom_scopes: true,
        }
    }

    fn context(&self) -> &BackendContext {
        &self.context
    }

    fn probe_installation(&self) -> ManagerStatus {
        self.context.probe(self.python(), &self.pip().arg("-V"), 0)
    }

    fn fetch_search(&self, query: &str) -> Result<Vec<Package>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_search_helper()?;
        let spec = CommandSpec::new(SEARCH_HELPER).arg(query.trim());
        let output = self.context.capture(&spec)?;
        let found = parse_search(&output.text);
        if found.is_empty() {
            output.checked(&spec)?;
        }
        ui::verbose(&format!("Pip: {} results for '{}'", found.len(), query));
        Ok(found)
    }

    fn fetch_installed(&self) -> Result<Vec<Package>> {
        let spec = self.pip().arg("list");
        let output = self.context.capture(&spec)?.checked(&spec)?;
        let installed = parse_installed(&output.text);
        ui::verbose(&format!("Pip: {} installed packages", installed.len()));
        Ok(installed)
    }

    fn fetch_upgrades(&self) -> Result<Vec<UpgradablePackage>> {
        let spec = self.pip().args(["list", "--outdated"]);
        let output = self.context.capture(&spec)?.checked(&spec)?;
        Ok(parse_upgrades(&output.text))
    }

    fn fill_details(&self, details: &mut PackageDetails) -> Result<()> {
        let id = details.package.id.clone();
        pypi::apply_defaults(details);

        let project = PypiClient::new(self.context.pypi_url())?.project(&id)?;
        pypi::apply_project(details, &project);

        let versions = self.pip().args(["index", "versions", id.as_str()]);
        let output = self.context.capture(&versions)?.checked(&versions)?;
        details.versions = parse_versions(&output.text);
        Ok(())
    }

    fn base_command(
        &self,
        kind: OperationKind,
        package: &Package,
        options: &InstallationOptions,
    ) -> CommandSpec {
        let target = match (&options.version, kind) {
            (Some(version), OperationKind::Install | OperationKind::Update) => {
                format!("{}=={}", package.id, version)
            }
            _ => package.id.clone(),
        };
        match kind {
            OperationKind::Install => self.pip().args(["install".to_string(), target]),
            OperationKind::Update => self
                .pip()
                .args(["install".to_string(), target, "--upgrade".to_string()]),
            OperationKind::Uninstall => self
                .pip()
                .args(["uninstall".to_string(), target, "-y".to_string()]),
        }
    }

    fn translate_options(&self, kind: OperationKind, options: &InstallationOptions) -> Vec<String> {
        common_parameters(kind, options)
    }

    fn outcome_rules(&self, _kind: OperationKind) -> &'static OutcomeRules {
        &RULES
    }

    fn progress_rule(&self, kind: OperationKind) -> ProgressRule {
        match kind {
            OperationKind::Uninstall => ProgressRule::Markers(UNINSTALL_PROGRESS),
            _ => ProgressRule::Markers(INSTALL_PROGRESS),
        }
    }
}
