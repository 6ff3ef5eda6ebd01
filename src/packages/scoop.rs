//! Scoop
//!
//! Tables are whitespace-separated after a dashes line. Package sources carry
//! the bucket (`Scoop: extras`) and, for global installs, a scope marker
//! (`Scoop (Global): main`). Details come from the bucket manifest printed by
//! `scoop cat`, which is JSON.

use super::context::BackendContext;
use super::parsing::{TableScanner, field_value};
use super::traits::PackageManager;
use crate::cache::CacheRow;
use crate::cache::catalog::{AvailableCatalog, CatalogScraper};
use crate::core::{
    Backend, BackendElevationRule, Capabilities, InstallationOptions, InstallationScope,
    ManagerStatus, OperationKind, OperationOutcome, OutcomeRules, Package, PackageDetails,
    UpgradablePackage,
};
use crate::error::Result;
use crate::process::{CommandSpec, ProgressMarker, ProgressRule};
use crate::ui;
use crate::utils::{remote, text};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const SCOOP: &str = "scoop";
const SOURCE: &str = "Scoop";
const GLOBAL_SOURCE: &str = "Scoop (Global)";
const GLOBAL_FLAG: &str = "--global";
const DEFAULT_BUCKET: &str = "main";
const UNKNOWN: &str = "Unknown";

const ELEVATION_MARKERS: &[&str] = &[
    "requires admin rights",
    "requires administrator rights",
    "you need admin rights to install global apps",
];

static INSTALL_RULES: OutcomeRules = OutcomeRules {
    success_markers: &["was installed successfully", "is already installed"],
    restart_exit_codes: &[3010],
    elevation_markers: ELEVATION_MARKERS,
    backend_elevation: Some(BackendElevationRule {
        marker: "-g",
        unless: &["successfully"],
        requires_failure: false,
        skip_when_elevated: true,
        outcome: OperationOutcome::NeedsScoopElevation,
    }),
    no_update_markers: &["Latest versions for all apps are installed"],
    ..OutcomeRules::EXIT_CODE_ONLY
};

static UNINSTALL_RULES: OutcomeRules = OutcomeRules {
    success_markers: &["was uninstalled"],
    restart_exit_codes: &[3010],
    elevation_markers: ELEVATION_MARKERS,
    backend_elevation: Some(BackendElevationRule {
        marker: "-g",
        unless: &["was uninstalled"],
        requires_failure: false,
        skip_when_elevated: true,
        outcome: OperationOutcome::NeedsScoopElevation,
    }),
    ..OutcomeRules::EXIT_CODE_ONLY
};

static INSTALL_PROGRESS: &[ProgressMarker] = &[
    ProgressMarker { phrase: "Installing", step: 1 },
    ProgressMarker { phrase: "Updating", step: 1 },
    ProgressMarker { phrase: "Downloading", step: 4 },
    ProgressMarker { phrase: "] 100%", step: 4 },
    ProgressMarker { phrase: "was installed successfully!", step: 6 },
];

static UNINSTALL_PROGRESS: &[ProgressMarker] = &[
    ProgressMarker { phrase: "Uninstalling", step: 1 },
    ProgressMarker { phrase: "Removing shim for", step: 4 },
    ProgressMarker { phrase: "was uninstalled", step: 6 },
];

/// One entry of `scoop bucket list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoopBucket {
    pub name: String,
    pub source: String,
    pub updated: String,
    pub manifests: String,
}

pub struct ScoopManager {
    context: Arc<BackendContext>,
    catalog: AvailableCatalog,
}

/// Scoop is a PowerShell script; on Windows it is reached through powershell.
fn scoop_command() -> CommandSpec {
    if cfg!(windows) {
        CommandSpec::new("powershell").args(["-ExecutionPolicy", "ByPass", "-Command", SCOOP])
    } else {
        CommandSpec::new(SCOOP)
    }
}

/// `scoop bucket list`
pub fn list_buckets(context: &BackendContext) -> Result<Vec<ScoopBucket>> {
    let spec = scoop_command().args(["bucket", "list"]);
    let output = context.capture(&spec)?.checked(&spec)?;
    Ok(parse_buckets(&output.text))
}

impl ScoopManager {
    pub fn new(context: Arc<BackendContext>) -> Self {
        let scraper = Arc::new(ScoopScraper {
            context: context.clone(),
        });
        let catalog = AvailableCatalog::new(Backend::Scoop, context.cache().clone(), scraper);
        Self { context, catalog }
    }

    /// Buckets known to this Scoop installation.
    pub fn list_buckets(&self) -> Result<Vec<ScoopBucket>> {
        list_buckets(&self.context)
    }

    fn manifest(&self, id: &str) -> Result<ScoopManifest> {
        let spec = scoop_command().args(["cat", id]);
        let output = self.context.capture(&spec)?.checked(&spec)?;
        parse_manifest(&output.text)
    }
}

struct ScoopScraper {
    context: Arc<BackendContext>,
}

impl CatalogScraper for ScoopScraper {
    fn scrape(&self) -> Result<Vec<CacheRow>> {
        let spec = scoop_command().arg("search");
        let output = self.context.capture(&spec)?.checked(&spec)?;
        Ok(parse_search(&output.text))
    }
}

/// Whitespace-split data rows following the dashes line.
fn table_rows(output: &str) -> Vec<String> {
    let mut scanner = TableScanner::new();
    output
        .lines()
        .filter_map(|raw| {
            let line = text::clean_line(raw);
            scanner.feed(&line).map(str::to_string)
        })
        .collect()
}

/// `scoop search`: Name, Version, Source, Binaries
pub fn parse_search(output: &str) -> Vec<CacheRow> {
    table_rows(output)
        .iter()
        .filter_map(|row| {
            let columns = text::split_whitespace_columns(row);
            if columns.len() < 2 {
                return None;
            }
            let source = match columns.get(2) {
                Some(bucket) => format!("{}: {}", SOURCE, bucket),
                None => SOURCE.to_string(),
            };
            Some(CacheRow::new(
                text::format_id_as_name(columns[0]),
                columns[0],
                columns[1],
                source,
            ))
        })
        .collect()
}

/// `scoop list`: Name, Version, Source, Updated, Info
pub fn parse_installed(output: &str) -> Vec<Package> {
    table_rows(output)
        .iter()
        .filter_map(|row| {
            let columns = text::split_whitespace_columns(row);
            if columns.len() < 2 {
                return None;
            }
            let scope = if row.contains("Global") { GLOBAL_SOURCE } else { SOURCE };
            let source = match columns.get(2) {
                Some(bucket) => format!("{}: {}", scope, bucket),
                None => scope.to_string(),
            };
            Some(Package::new(
                text::format_id_as_name(columns[0]),
                columns[0],
                columns[1],
                source,
                Backend::Scoop,
            ))
        })
        .collect()
}

/// `scoop status`: Name, Installed Version, Latest Version, ...
pub fn parse_upgrades(output: &str) -> Vec<UpgradablePackage> {
    table_rows(output)
        .iter()
        .filter_map(|row| {
            let columns = text::split_whitespace_columns(row);
            if columns.len() < 3 {
                return None;
            }
            let package = Package::new(
                text::format_id_as_name(columns[0]),
                columns[0],
                columns[1],
                SOURCE,
                Backend::Scoop,
            );
            Some(UpgradablePackage::new(package, columns[2]))
        })
        .collect()
}

/// `scoop bucket list`: Name, Source, Updated (date and time), Manifests
pub fn parse_buckets(output: &str) -> Vec<ScoopBucket> {
    table_rows(output)
        .iter()
        .filter_map(|row| {
            let columns = text::split_whitespace_columns(row);
            match columns.as_slice() {
                [name, source, date, time, manifests, ..] => Some(ScoopBucket {
                    name: name.to_string(),
                    source: source.to_string(),
                    updated: format!("{} {}", date, time),
                    manifests: manifests.to_string(),
                }),
                [name, source, ..] => Some(ScoopBucket {
                    name: name.to_string(),
                    source: source.to_string(),
                    updated: UNKNOWN.to_string(),
                    manifests: UNKNOWN.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Bucket named by a package source, `main` when the source has none.
pub fn bucket_of(source: &str) -> &str {
    source
        .rsplit_once(": ")
        .map(|(_, bucket)| bucket.trim())
        .filter(|bucket| !bucket.is_empty())
        .unwrap_or(DEFAULT_BUCKET)
}

/// `bucket/` prefix for sources such as `Scoop: extras`.
pub fn bucket_prefix(source: &str) -> String {
    match source.split_once(':') {
        Some((_, bucket)) if !source.contains('/') => {
            format!("{}/", bucket.to_lowercase().replace(' ', ""))
        }
        _ => String::new(),
    }
}

/// Web location of the manifest for `package`.
pub fn manifest_url(package: &Package, buckets: &[ScoopBucket]) -> String {
    let bucket = bucket_of(&package.source);
    let root = buckets
        .iter()
        .find(|known| known.name == bucket)
        .map(|known| known.source.replace(".git", ""))
        .unwrap_or_else(|| format!("https://github.com/ScoopInstaller/{}", bucket));
    let file = package.id.rsplit('/').next().unwrap_or(&package.id);
    format!("{}/blob/master/bucket/{}.json", root, file)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn first(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }

    fn joined(&self) -> String {
        match self {
            Self::One(value) => value.clone(),
            Self::Many(values) => values.join("\n"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ManifestLicense {
    Identifier(String),
    Detailed {
        identifier: Option<String>,
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchitectureEntry {
    pub url: Option<OneOrMany>,
    pub hash: Option<OneOrMany>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Checkver {
    Detailed { url: Option<String> },
    Pattern(serde_json::Value),
}

/// The parts of a Scoop app manifest used for details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoopManifest {
    pub version: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<ManifestLicense>,
    pub notes: Option<OneOrMany>,
    pub url: Option<OneOrMany>,
    pub hash: Option<OneOrMany>,
    #[serde(default)]
    pub architecture: BTreeMap<String, ArchitectureEntry>,
    pub checkver: Option<Checkver>,
    pub innosetup: Option<bool>,
}

pub fn parse_manifest(output: &str) -> Result<ScoopManifest> {
    let json = text::strip_ansi(output);
    let start = json.find('{').unwrap_or(0);
    Ok(serde_json::from_str(&json[start..])?)
}

const HOST_NOISE: &[&str] = &[
    "https://", "http://", "www.", ".com", ".net", ".io", ".org", ".us", ".eu", ".es", ".tk",
    ".co.uk", ".in", ".it", ".fr", ".de", ".kde", ".microsoft",
];

/// Publisher guess from a homepage: the GitHub owner, or the bare domain.
pub fn author_from_homepage(homepage: &str) -> Option<String> {
    if let Some(path) = homepage.split_once("https://github.com/").map(|(_, rest)| rest) {
        return path.split('/').next().filter(|owner| !owner.is_empty()).map(str::to_string);
    }

    let mut host = homepage.to_string();
    for noise in HOST_NOISE {
        host = host.replace(noise, "");
    }
    let domain = host.split('/').next().unwrap_or_default();
    let mut chars = domain.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
}

/// GitHub release page for a GitHub download URL.
pub fn release_page(installer_url: &str) -> Option<String> {
    if !installer_url.contains("github.com") {
        return None;
    }
    let tagged = installer_url.replace("/download/", "/tag/");
    tagged.rsplit_once('/').map(|(page, _)| page.to_string())
}

/// Copy manifest fields into `details`.
pub fn apply_manifest(details: &mut PackageDetails, manifest: &ScoopManifest) {
    if let Some(description) = &manifest.description {
        details.description = Some(description.clone());
    }
    if let Some(version) = &manifest.version
        && !details.versions.contains(version)
    {
        details.versions.push(version.clone());
    }
    if manifest.innosetup == Some(true) {
        details.installer_type = Some("Inno Setup".to_string());
    }
    if let Some(homepage) = &manifest.homepage {
        details.homepage_url = Some(homepage.clone());
        details.author = author_from_homepage(homepage);
    }
    if let Some(notes) = &manifest.notes {
        details.release_notes = Some(notes.joined());
    }
    match &manifest.license {
        Some(ManifestLicense::Identifier(id)) => details.license = Some(id.clone()),
        Some(ManifestLicense::Detailed { identifier, url }) => {
            details.license = identifier.clone();
            details.license_url = url.clone();
        }
        None => {}
    }

    if let Some(url) = &manifest.url {
        details.installer_url = url.first().map(str::to_string);
        details.installer_hash = manifest.hash.as_ref().and_then(|h| h.first()).map(str::to_string);
    } else if let Some(entry) = manifest.architecture.get("64bit") {
        details.installer_url = entry.url.as_ref().and_then(|u| u.first()).map(str::to_string);
        details.installer_hash = entry.hash.as_ref().and_then(|h| h.first()).map(str::to_string);
    }
    if !manifest.architecture.is_empty() {
        details.architectures = manifest.architecture.keys().cloned().collect();
    }

    if let Some(Checkver::Detailed { url: Some(url) }) = &manifest.checkver {
        details.release_notes_url = Some(url.clone());
    }
    if details.release_notes_url.is_none() {
        details.release_notes_url = details.installer_url.as_deref().and_then(release_page);
    }
}

/// "Updated by" / "Updated at" from `scoop info`.
pub fn apply_info(details: &mut PackageDetails, output: &str) {
    for raw in output.lines() {
        let line = text::clean_line(raw);
        if let Some(by) = field_value(&line, "Updated by") {
            details.publisher = Some(by.to_string());
        } else if let Some(at) = field_value(&line, "Updated at") {
            details.update_date = Some(at.to_string());
        }
    }
}

impl PackageManager for ScoopManager {
    fn backend_type(&self) -> Backend {
        Backend::Scoop
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_run_as_admin: true,
            can_skip_integrity_checks: true,
            can_run_interactively: false,
            can_remove_data_on_uninstall: true,
            supports_custom_versions: false,
            supports_custom_architectures: true,
            supports_custom_scopes: true,
        }
    }

    fn context(&self) -> &BackendContext {
        &self.context
    }

    fn catalog(&self) -> Option<&AvailableCatalog> {
        Some(&self.catalog)
    }

    fn probe_installation(&self) -> ManagerStatus {
        // first line is the "Current Scoop version:" banner
        self.context.probe(SCOOP, &scoop_command().arg("--version"), 1)
    }

    fn update_sources(&self) -> Result<()> {
        let spec = scoop_command().arg("update");
        self.context.capture(&spec)?.checked(&spec)?;
        Ok(())
    }

    fn fetch_installed(&self) -> Result<Vec<Package>> {
        let spec = scoop_command().arg("list");
        let output = self.context.capture(&spec)?.checked(&spec)?;
        let installed = parse_installed(&output.text);
        ui::verbose(&format!("Scoop: {} installed packages", installed.len()));
        Ok(installed)
    }

    fn fetch_upgrades(&self) -> Result<Vec<UpgradablePackage>> {
        let spec = scoop_command().arg("status");
        let output = self.context.capture(&spec)?.checked(&spec)?;
        Ok(parse_upgrades(&output.text))
    }

    fn fill_details(&self, details: &mut PackageDetails) -> Result<()> {
        let package = details.package.clone();
        details.scopes = vec!["Local".to_string(), "Global".to_string()];
        details.installer_type = Some("Scoop package".to_string());

        let buckets = self.list_buckets().unwrap_or_else(|e| {
            ui::verbose(&format!("Scoop bucket list unavailable: {}", e));
            Vec::new()
        });
        details.manifest_url = Some(manifest_url(&package, &buckets));

        let manifest = self.manifest(&package.id)?;
        apply_manifest(details, &manifest);

        if let Some(url) = details.installer_url.clone() {
            let size = remote::client(self.context.command_timeout())
                .and_then(|client| remote::content_length_mb(&client, &url));
            match size {
                Ok(mb) => details.installer_size_mb = Some(mb),
                Err(e) => ui::verbose(&format!("Installer size for {} unavailable: {}", package.id, e)),
            }
        }

        let info = scoop_command().args(["info", package.id.as_str()]);
        let output = self.context.capture(&info)?.checked(&info)?;
        apply_info(details, &output.text);
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
            OperationKind::Update => "update",
            OperationKind::Uninstall => "uninstall",
        };
        let target = format!("{}{}", bucket_prefix(&package.source), package.id);
        let command = scoop_command().args([verb.to_string(), target]);

        if kind != OperationKind::Install && package.source.starts_with(GLOBAL_SOURCE) {
            command.arg(GLOBAL_FLAG)
        } else {
            command
        }
    }

    fn translate_options(&self, kind: OperationKind, options: &InstallationOptions) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        if kind != OperationKind::Uninstall
            && let Some(arch) = &options.architecture
        {
            args.extend(["--arch".to_string(), arch.clone()]);
        }
        args.extend(options.custom_parameters.iter().cloned());
        if kind == OperationKind::Install && options.scope == Some(InstallationScope::Machine) {
            args.push(GLOBAL_FLAG.to_string());
        }
        if kind != OperationKind::Uninstall && options.skip_hash_check {
            args.push("--skip-hash-check".to_string());
        }
        if kind == OperationKind::Uninstall && options.remove_data_on_uninstall {
            args.push("--purge".to_string());
        }
        args
    }

    fn elevated_arguments(&self, _kind: OperationKind) -> Vec<String> {
        vec![GLOBAL_FLAG.to_string()]
    }

    fn outcome_rules(&self, kind: OperationKind) -> &'static OutcomeRules {
        match kind {
            OperationKind::Uninstall => &UNINSTALL_RULES,
            _ => &INSTALL_RULES,
        }
    }

    fn progress_rule(&self, kind: OperationKind) -> ProgressRule {
        match kind {
            OperationKind::Uninstall => ProgressRule::Markers(UNINSTALL_PROGRESS),
            _ => ProgressRule::Markers(INSTALL_PROGRESS),
        }
    }
}

#[cfg(test)]
mod tests;
