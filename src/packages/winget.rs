//! Windows Package Manager (winget)
//!
//! winget prints fixed-width tables padded to the widest cell, so rows are
//! cut at the offsets of the header words rather than split on whitespace
//! (package names routinely contain spaces). Names and ids that do not fit
//! are truncated with `…`; truncated ids cannot be addressed and are dropped.

use super::context::BackendContext;
use super::parsing::{TableScanner, filled};
use super::traits::PackageManager;
use crate::cache::CacheRow;
use crate::cache::catalog::{AvailableCatalog, CatalogScraper};
use crate::core::{
    Backend, Capabilities, InstallationOptions, ManagerStatus, OperationKind, OutcomeRules,
    Package, PackageDetails, UpgradablePackage,
};
use crate::error::Result;
use crate::process::{CommandSpec, ProgressMarker, ProgressRule};
use crate::ui;
use crate::utils::sanitize;
use crate::utils::text::{self, ColumnLayout};
use std::sync::Arc;

const WINGET: &str = "winget";
const DEFAULT_SOURCE: &str = "winget";
/// Source shown for installed programs winget did not install itself.
pub const LOCAL_SOURCE: &str = "Local PC";
const TRUNCATED: char = '…';

const QUERY_FLAGS: &[&str] = &["--accept-source-agreements", "--disable-interactivity"];

static OPERATION_RULES: OutcomeRules = OutcomeRules {
    restart_exit_codes: &[3010, 1641, -1978334967, -1978334966],
    // ERROR_ELEVATION_REQUIRED and ERROR_ACCESS_DENIED from the installer
    elevation_exit_codes: &[740, 5],
    elevation_markers: &[
        "requires administrator privileges",
        "The requested operation requires elevation",
        "Access is denied",
    ],
    elevation_markers_require_failure: true,
    no_update_markers: &["No applicable update found", "No available upgrade found"],
    no_update_exit_codes: &[-1978335189],
    ..OutcomeRules::EXIT_CODE_ONLY
};

static INSTALL_PROGRESS: &[ProgressMarker] = &[
    ProgressMarker { phrase: "Found", step: 1 },
    ProgressMarker { phrase: "Downloading", step: 2 },
    ProgressMarker { phrase: "Successfully verified installer hash", step: 3 },
    ProgressMarker { phrase: "Starting package install", step: 4 },
    ProgressMarker { phrase: "Successfully installed", step: 6 },
];

static UNINSTALL_PROGRESS: &[ProgressMarker] = &[
    ProgressMarker { phrase: "Found", step: 1 },
    ProgressMarker { phrase: "Starting package uninstall", step: 3 },
    ProgressMarker { phrase: "Successfully uninstalled", step: 6 },
];

pub struct WingetManager {
    context: Arc<BackendContext>,
    catalog: AvailableCatalog,
}

impl WingetManager {
    pub fn new(context: Arc<BackendContext>) -> Self {
        let scraper = Arc::new(WingetScraper {
            context: context.clone(),
        });
        let catalog = AvailableCatalog::new(Backend::Winget, context.cache().clone(), scraper);
        Self { context, catalog }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(WINGET)
    }
}

struct WingetScraper {
    context: Arc<BackendContext>,
}

impl CatalogScraper for WingetScraper {
    fn scrape(&self) -> Result<Vec<CacheRow>> {
        let spec = CommandSpec::new(WINGET)
            .args(["search", "--query", "", "--source", DEFAULT_SOURCE])
            .args(QUERY_FLAGS.iter().copied());
        let output = self.context.capture(&spec)?;
        let rows = parse_search(&output.text);
        // winget exits nonzero when a query matches nothing
        if rows.is_empty() {
            output.checked(&spec)?;
        }
        Ok(rows)
    }

    fn accepts(&self, row: &CacheRow) -> bool {
        !row.id.ends_with(TRUNCATED)
    }
}

/// Rows of every table in `output`, cut by the columns of their header.
fn table_rows(output: &str) -> Vec<Vec<String>> {
    let mut scanner = TableScanner::new();
    let mut header: Option<String> = None;
    let mut layout: Option<ColumnLayout> = None;
    let mut rows = Vec::new();

    for raw in output.lines() {
        let line = text::strip_ansi(text::visible_segment(raw));
        let Some(row) = scanner.feed(line.trim_end()) else {
            continue;
        };
        if scanner.header() != header.as_deref() {
            header = scanner.header().map(str::to_string);
            layout = header.as_deref().and_then(ColumnLayout::from_header);
        }
        if let Some(layout) = &layout {
            rows.push(layout.slice(row).into_iter().map(str::to_string).collect());
        }
    }
    rows
}

/// Name, id and version must all be present and the id must be complete.
fn addressable(cells: &[String]) -> bool {
    cells.len() >= 3
        && filled(&[cells[0].as_str(), cells[1].as_str(), cells[2].as_str()]) == 3
        && !cells[1].ends_with(TRUNCATED)
}

fn source_or(cells: &[String], index: usize, fallback: &str) -> String {
    cells
        .get(index)
        .filter(|cell| !cell.is_empty())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

/// `winget search`: Name, Id, Version, [Match], Source.
pub fn parse_search(output: &str) -> Vec<CacheRow> {
    table_rows(output)
        .into_iter()
        .filter(|cells| addressable(cells))
        .map(|cells| {
            let source = if cells.len() >= 4 {
                source_or(&cells, cells.len() - 1, DEFAULT_SOURCE)
            } else {
                DEFAULT_SOURCE.to_string()
            };
            CacheRow::new(&cells[0], &cells[1], &cells[2], source)
        })
        .collect()
}

/// `winget list`: Name, Id, Version, [Available], Source.
pub fn parse_installed(output: &str) -> Vec<Package> {
    table_rows(output)
        .into_iter()
        .filter(|cells| addressable(cells))
        .map(|cells| {
            let source = match cells.len() {
                0..=3 => LOCAL_SOURCE.to_string(),
                4 => source_or(&cells, 3, LOCAL_SOURCE),
                _ => source_or(&cells, 4, LOCAL_SOURCE),
            };
            Package::new(&cells[0], &cells[1], &cells[2], source, Backend::Winget)
        })
        .collect()
}

/// `winget upgrade`: Name, Id, Version, Available, [Source].
pub fn parse_upgrades(output: &str) -> Vec<UpgradablePackage> {
    table_rows(output)
        .into_iter()
        .filter(|cells| addressable(cells) && cells.len() >= 4 && !cells[3].is_empty())
        .map(|cells| {
            let source = source_or(&cells, 4, DEFAULT_SOURCE);
            let package = Package::new(&cells[0], &cells[1], &cells[2], source, Backend::Winget);
            UpgradablePackage::new(package, &cells[3])
        })
        .collect()
}

/// `winget show --versions`: one version per row under a `Version` header.
pub fn parse_versions(output: &str) -> Vec<String> {
    let mut scanner = TableScanner::new();
    output
        .lines()
        .filter_map(|raw| {
            let line = text::clean_line(raw);
            scanner.feed(&line).map(str::to_string)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowBlock {
    Description,
    ReleaseNotes,
    Tags,
}

const SHOW_KEYS: &[&str] = &[
    "Version",
    "Publisher",
    "Publisher Url",
    "Publisher Support Url",
    "Author",
    "Moniker",
    "Description",
    "Homepage",
    "License",
    "License Url",
    "Privacy Url",
    "Copyright",
    "Release Notes",
    "Release Notes Url",
    "Tags",
    "Installer",
    "Installer Type",
    "Installer Url",
    "Installer SHA256",
    "Release Date",
    "Architecture",
    "Scope",
];

fn show_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    SHOW_KEYS.contains(&key).then(|| (key, value.trim()))
}

fn append_line(target: &mut Option<String>, line: &str) {
    match target {
        Some(existing) if !existing.is_empty() => {
            existing.push('\n');
            existing.push_str(line);
        }
        _ => *target = Some(line.to_string()),
    }
}

/// Fill details from `winget show --id <id> --exact`.
pub fn apply_show(details: &mut PackageDetails, output: &str) {
    let mut block: Option<ShowBlock> = None;

    for raw in output.lines() {
        let line = text::strip_ansi(text::visible_segment(raw));
        let indented = line.starts_with([' ', '\t']);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if !indented
            && let Some(found) = trimmed.strip_prefix("Found ")
        {
            let name = found.rsplit_once(" [").map_or(found, |(name, _)| name);
            details.name = Some(name.trim().to_string());
            block = None;
            continue;
        }

        if let Some((key, value)) = show_field(trimmed) {
            block = None;
            let value = (!value.is_empty()).then(|| value.to_string());
            match key {
                "Publisher" => details.publisher = value,
                "Author" => details.author = value,
                "Homepage" => details.homepage_url = value,
                "License" => details.license = value,
                "License Url" => details.license_url = value,
                "Release Notes Url" => details.release_notes_url = value,
                "Installer Type" => details.installer_type = value,
                "Installer Url" => details.installer_url = value,
                "Installer SHA256" => details.installer_hash = value,
                "Release Date" => details.update_date = value,
                "Architecture" => {
                    if let Some(arch) = value {
                        details.architectures.push(arch);
                    }
                }
                "Scope" => {
                    if let Some(scope) = value {
                        details.scopes.push(scope);
                    }
                }
                "Description" => {
                    details.description = value;
                    block = Some(ShowBlock::Description);
                }
                "Release Notes" => {
                    details.release_notes = value;
                    block = Some(ShowBlock::ReleaseNotes);
                }
                "Tags" => block = Some(ShowBlock::Tags),
                _ => {}
            }
            continue;
        }

        if !indented {
            block = None;
            continue;
        }
        match block {
            Some(ShowBlock::Description) => append_line(&mut details.description, trimmed),
            Some(ShowBlock::ReleaseNotes) => append_line(&mut details.release_notes, trimmed),
            Some(ShowBlock::Tags) => details.push_tag(trimmed),
            None => {}
        }
    }
}

/// Location of the package manifest in the community repository.
pub fn manifest_url(package: &Package) -> Option<String> {
    if package.source != DEFAULT_SOURCE {
        return None;
    }
    let first = package.id.chars().next()?.to_lowercase().to_string();
    Some(format!(
        "https://github.com/microsoft/winget-pkgs/tree/master/manifests/{}/{}",
        first,
        package.id.replace('.', "/")
    ))
}

fn source_args(package: &Package) -> Vec<String> {
    if package.source.is_empty() || package.source == LOCAL_SOURCE {
        Vec::new()
    } else {
        vec!["--source".to_string(), package.source.clone()]
    }
}

impl PackageManager for WingetManager {
    fn backend_type(&self) -> Backend {
        Backend::Winget
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_run_as_admin: true,
            can_skip_integrity_checks: true,
            can_run_interactively: true,
            can_remove_data_on_uninstall: true,
            supports_custom_versions: true,
            supports_custom_architectures: true,
            supports_custom_scopes: true,
        }
    }

    fn context(&self) -> &BackendContext {
        &self.context
    }

    /// winget is started directly, and `Local PC` ids such as `{GUID}` or
    /// `ARP\Machine\X64\Name` go through as one argument.
    fn validate_id(&self, id: &str) -> Result<()> {
        sanitize::validate_argument_id(id)
    }

    fn catalog(&self) -> Option<&AvailableCatalog> {
        Some(&self.catalog)
    }

    fn probe_installation(&self) -> ManagerStatus {
        self.context
            .probe(WINGET, &self.command().arg("--version"), 0)
    }

    fn update_sources(&self) -> Result<()> {
        let spec = self
            .command()
            .args(["source", "update"])
            .arg("--disable-interactivity");
        self.context.capture(&spec)?.checked(&spec)?;
        Ok(())
    }

    fn fetch_search(&self, query: &str) -> Result<Vec<Package>> {
        let spec = self
            .command()
            .args(["search", "--query", query])
            .args(QUERY_FLAGS.iter().copied());
        let output = self.context.capture(&spec)?;
        let found: Vec<Package> = parse_search(&output.text)
            .into_iter()
            .map(|row| row.into_package(Backend::Winget))
            .collect();
        ui::verbose(&format!("winget search '{}': {} packages", query, found.len()));
        Ok(found)
    }

    fn fetch_installed(&self) -> Result<Vec<Package>> {
        let spec = self.command().arg("list").args(QUERY_FLAGS.iter().copied());
        let output = self.context.capture(&spec)?;
        let installed = parse_installed(&output.text);
        if installed.is_empty() {
            output.checked(&spec)?;
        }
        ui::verbose(&format!("winget: {} installed packages", installed.len()));
        Ok(installed)
    }

    fn fetch_upgrades(&self) -> Result<Vec<UpgradablePackage>> {
        let spec = self.command().arg("upgrade").args(QUERY_FLAGS.iter().copied());
        let output = self.context.capture(&spec)?;
        Ok(parse_upgrades(&output.text))
    }

    fn fill_details(&self, details: &mut PackageDetails) -> Result<()> {
        let package = details.package.clone();
        details.manifest_url = manifest_url(&package);

        let show = self
            .command()
            .args(["show", "--id", package.id.as_str(), "--exact"])
            .args(source_args(&package))
            .args(QUERY_FLAGS.iter().copied());
        let output = self.context.capture(&show)?.checked(&show)?;
        apply_show(details, &output.text);

        let versions = show.arg("--versions");
        let output = self.context.capture(&versions)?.checked(&versions)?;
        details.versions = parse_versions(&output.text);
        Ok(())
    }

    fn base_command(
        &self,
        kind: OperationKind,
        package: &Package,
        _options: &InstallationOptions,
    ) -> CommandSpec {
        let verb = match kind {
            OperationKind::Install => "install",
            OperationKind::Update => "upgrade",
            OperationKind::Uninstall => "uninstall",
        };
        let command = self
            .command()
            .args([verb, "--id", package.id.as_str(), "--exact"])
            .args(source_args(package))
            .args(QUERY_FLAGS.iter().copied());

        match kind {
            OperationKind::Uninstall => command,
            _ => command.arg("--accept-package-agreements"),
        }
    }

    fn translate_options(&self, kind: OperationKind, options: &InstallationOptions) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        if kind != OperationKind::Uninstall {
            if let Some(version) = &options.version {
                args.extend(["--version".to_string(), version.clone()]);
            }
            if let Some(arch) = &options.architecture {
                args.extend(["--architecture".to_string(), arch.clone()]);
            }
            if options.skip_hash_check {
                args.push("--ignore-security-hash".to_string());
            }
        }

        if let Some(scope) = options.scope {
            args.extend(["--scope".to_string(), scope.to_string()]);
        }

        if options.interactive {
            args.push("--interactive".to_string());
        } else {
            args.push("--silent".to_string());
        }

        if kind == OperationKind::Uninstall && options.remove_data_on_uninstall {
            args.push("--purge".to_string());
        }

        args.extend(options.custom_parameters.iter().cloned());
        args
    }

    fn outcome_rules(&self, _kind: OperationKind) -> &'static OutcomeRules {
        &OPERATION_RULES
    }

    fn progress_rule(&self, kind: OperationKind) -> ProgressRule {
        match kind {
            OperationKind::Uninstall => ProgressRule::Markers(UNINSTALL_PROGRESS),
            _ => ProgressRule::Markers(INSTALL_PROGRESS),
        }
    }
}
