//! Chocolatey
//!
//! Output is plain whitespace- or pipe-separated text interleaved with
//! banners, summaries and warnings. Noise that happens to have the right
//! column count is filtered through [`BLACKLIST`].

use super::context::BackendContext;
use super::parsing::{Blacklist, field_value};
use super::traits::PackageManager;
use crate::cache::CacheRow;
use crate::cache::catalog::{AvailableCatalog, CatalogScraper};
use crate::core::{
    Backend, Capabilities, InstallationOptions, ManagerStatus, OperationKind, OutcomeRules,
    Package, PackageDetails, UpgradablePackage,
};
use crate::error::Result;
use crate::process::{CommandSpec, ProgressRule};
use crate::ui;
use crate::utils::text;
use std::path::Path;
use std::sync::Arc;

pub const SOURCE: &str = "chocolatey";
const CHOCO: &str = "choco";
const BANNER: &str = "Chocolatey v";

pub const BLACKLIST: Blacklist = Blacklist {
    names: &[
        "Did", "Features?", "Validation", "-", "being", "It", "Error", "L'accs", "Maximum", "This",
        "Output Is Package name ", "'chocolatey'", "Operable",
    ],
    ids: &[
        "Did", "Features?", "Validation", "-", "being", "It", "Error", "L'accs", "Maximum", "This",
        "Output is package name ", "operable", "Invalid",
    ],
    versions: &[
        "Did", "Features?", "Validation", "-", "being", "It", "Error", "L'accs", "Maximum", "This",
        "packages", "current version", "installed version", "is", "program", "validations",
        "argument",
    ],
};

const ELEVATION_MARKERS: &[&str] = &[
    "Run as administrator",
    "The requested operation requires elevation",
    "ERROR: Exception calling \"CreateDirectory\" with \"1\" argument(s): \"Access to the path",
];

static INSTALL_RULES: OutcomeRules = OutcomeRules {
    success_exit_codes: &[1641],
    restart_exit_codes: &[3010],
    elevation_markers: ELEVATION_MARKERS,
    elevation_markers_require_failure: true,
    ..OutcomeRules::EXIT_CODE_ONLY
};

static UNINSTALL_RULES: OutcomeRules = OutcomeRules {
    success_exit_codes: &[1605, 1614, 1641],
    restart_exit_codes: &[3010],
    elevation_markers: &[
        "Run as administrator",
        "The requested operation requires elevation",
    ],
    ..OutcomeRules::EXIT_CODE_ONLY
};

pub struct ChocoManager {
    context: Arc<BackendContext>,
    catalog: AvailableCatalog,
}

impl ChocoManager {
    pub fn new(context: Arc<BackendContext>) -> Self {
        let scraper = Arc::new(ChocoScraper {
            context: context.clone(),
        });
        let catalog = AvailableCatalog::new(Backend::Choco, context.cache().clone(), scraper);
        Self { context, catalog }
    }

    fn command(&self) -> CommandSpec {
        choco_command(&self.context)
    }
}

/// The configured Chocolatey executable. A bundled copy gets
/// `chocolateyinstall` pointed at its own directory.
fn choco_command(context: &BackendContext) -> CommandSpec {
    match context.choco_path() {
        Some(path) => {
            let spec = CommandSpec::new(path);
            match Path::new(path).parent().filter(|dir| !dir.as_os_str().is_empty()) {
                Some(dir) => spec.env("chocolateyinstall", dir.to_string_lossy()),
                None => spec,
            }
        }
        None => CommandSpec::new(CHOCO),
    }
}

struct ChocoScraper {
    context: Arc<BackendContext>,
}

impl CatalogScraper for ChocoScraper {
    fn scrape(&self) -> Result<Vec<CacheRow>> {
        let spec = choco_command(&self.context).args(["search", "*"]);
        let output = self.context.capture(&spec)?.checked(&spec)?;
        Ok(parse_search(&output.text))
    }

    fn accepts(&self, row: &CacheRow) -> bool {
        BLACKLIST.allows(&row.name, &row.id, &[row.version.as_str()])
    }
}

/// `id version ...` rows, as printed by `search` and `list`.
fn id_version_rows(output: &str) -> impl Iterator<Item = (String, String)> + '_ {
    output
        .lines()
        .map(text::clean_line)
        .filter(|line| !line.starts_with(BANNER))
        .filter_map(|line| {
            let columns = text::split_whitespace_columns(&line);
            if columns.len() < 2 {
                return None;
            }
            let id = columns[0].to_string();
            let version = columns[1].to_string();
            let name = text::format_id_as_name(&id);
            BLACKLIST
                .allows(&name, &id, &[&version])
                .then_some((id, version))
        })
}

/// `choco search *`
pub fn parse_search(output: &str) -> Vec<CacheRow> {
    id_version_rows(output)
        .map(|(id, version)| CacheRow::new(text::format_id_as_name(&id), id, version, SOURCE))
        .collect()
}

/// `choco list` (local packages on Chocolatey v2)
pub fn parse_installed(output: &str) -> Vec<Package> {
    id_version_rows(output)
        .map(|(id, version)| {
            Package::new(text::format_id_as_name(&id), id, version, SOURCE, Backend::Choco)
        })
        .collect()
}

/// `choco outdated`: `id|current|available|pinned`
pub fn parse_upgrades(output: &str) -> Vec<UpgradablePackage> {
    output
        .lines()
        .map(text::clean_line)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split('|').collect();
            if columns.len() < 3 {
                return None;
            }
            let (id, version, available) = (columns[0], columns[1], columns[2]);
            let name = text::format_id_as_name(id.trim());
            if !BLACKLIST.allows(&name, id, &[version]) {
                return None;
            }
            let package = Package::new(name, id.trim(), version.trim(), SOURCE, Backend::Choco);
            Some(UpgradablePackage::new(package, available.trim()))
        })
        .collect()
}

/// `choco search --exact <id> --all-versions`
pub fn parse_versions(output: &str, id: &str) -> Vec<String> {
    output
        .lines()
        .map(text::clean_line)
        .filter_map(|line| {
            let columns = text::split_whitespace_columns(&line);
            match columns.as_slice() {
                [first, version, ..] if first.eq_ignore_ascii_case(id) => Some(version.to_string()),
                _ => None,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoBlock {
    Description,
    ReleaseNotes,
}

fn continue_block(target: &mut Option<String>, line: &str) {
    match target {
        Some(existing) if !existing.is_empty() => {
            existing.push('\n');
            existing.push_str(line);
        }
        _ => *target = Some(line.to_string()),
    }
}

/// Fill details from `choco info <id>`. Fields sit one per line behind a
/// single leading space; multi-line values continue with two spaces.
pub fn apply_info(details: &mut PackageDetails, output: &str) {
    let mut block: Option<InfoBlock> = None;

    for raw in output.lines() {
        let line = text::strip_ansi(text::visible_segment(raw));
        let line = line.trim_end();

        if let Some(current) = block {
            if line.starts_with("  ") {
                let content = line.trim();
                match current {
                    InfoBlock::Description => continue_block(&mut details.description, content),
                    InfoBlock::ReleaseNotes => continue_block(&mut details.release_notes, content),
                }
                continue;
            }
            block = None;
        }

        let trimmed = line.trim();
        if let Some(title) = field_value(trimmed, "Title") {
            let mut parts = title.splitn(2, '|');
            if let Some(name) = parts.next().map(str::trim).filter(|n| !n.is_empty()) {
                details.name = Some(name.to_string());
            }
            if let Some(published) = parts.next().and_then(|p| field_value(p, "Published")) {
                details.update_date = Some(published.to_string());
            }
        } else if let Some(author) = field_value(trimmed, "Author") {
            details.author = Some(author.to_string());
        } else if let Some(site) = field_value(trimmed, "Software Site") {
            details.homepage_url = Some(site.to_string());
        } else if let Some(license) = field_value(trimmed, "Software License") {
            details.license_url = Some(license.to_string());
        } else if let Some(checksum) = field_value(trimmed, "Package Checksum") {
            let hash = checksum.replace('\'', "").replace("(SHA512)", "");
            details.installer_hash = Some(hash.trim().to_string());
        } else if let Some(description) = field_value(trimmed, "Description") {
            details.description = (!description.is_empty()).then(|| description.to_string());
            block = Some(InfoBlock::Description);
        } else if let Some(notes) = field_value(trimmed, "Release Notes") {
            if notes.starts_with("http") {
                details.release_notes_url = Some(notes.to_string());
            } else if !notes.is_empty() {
                details.release_notes = Some(notes.to_string());
            }
            block = Some(InfoBlock::ReleaseNotes);
        } else if let Some(tags) = field_value(trimmed, "Tags") {
            for tag in text::split_whitespace_columns(tags) {
                details.push_tag(tag);
            }
        }
    }
}

pub fn manifest_url(id: &str) -> String {
    format!("https://community.chocolatey.org/packages/{}", id)
}

impl PackageManager for ChocoManager {
    fn backend_type(&self) -> Backend {
        Backend::Choco
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_run_as_admin: true,
            can_skip_integrity_checks: true,
            can_run_interactively: true,
            can_remove_data_on_uninstall: false,
            supports_custom_versions: true,
            supports_custom_architectures: true,
            supports_custom_scopes: false,
        }
    }

    fn context(&self) -> &BackendContext {
        &self.context
    }

    fn catalog(&self) -> Option<&AvailableCatalog> {
        Some(&self.catalog)
    }

    fn probe_installation(&self) -> ManagerStatus {
        let executable = self.context.choco_path().unwrap_or(CHOCO);
        self.context.probe(executable, &self.command().arg("-v"), 0)
    }

    fn fetch_installed(&self) -> Result<Vec<Package>> {
        let spec = self.command().arg("list");
        let output = self.context.capture(&spec)?.checked(&spec)?;
        let installed = parse_installed(&output.text);
        ui::verbose(&format!("Chocolatey: {} installed packages", installed.len()));
        Ok(installed)
    }

    fn fetch_upgrades(&self) -> Result<Vec<UpgradablePackage>> {
        let spec = self.command().arg("outdated");
        // outdated exits 2 when upgrades exist
        let output = self.context.capture(&spec)?;
        Ok(parse_upgrades(&output.text))
    }

    fn fill_details(&self, details: &mut PackageDetails) -> Result<()> {
        let id = details.package.id.clone();
        details.manifest_url = Some(manifest_url(&id));
        details.architectures = vec!["x64".to_string(), "x86".to_string()];

        let info = self.command().args(["info", id.as_str()]);
        let output = self.context.capture(&info)?.checked(&info)?;
        apply_info(details, &output.text);

        let versions = self
            .command()
            .args(["search", "--exact", id.as_str(), "--all-versions"]);
        let output = self.context.capture(&versions)?.checked(&versions)?;
        details.versions = parse_versions(&output.text, &id);
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
        self.command().args([verb, package.id.as_str(), "-y"])
    }

    fn translate_options(&self, _kind: OperationKind, options: &InstallationOptions) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        if options.architecture.as_deref() == Some("x86") {
            args.push("--forcex86".to_string());
        }
        args.extend(options.custom_parameters.iter().cloned());
        if options.interactive {
            args.push("--notsilent".to_string());
        }
        if options.skip_hash_check {
            args.extend(["--ignore-checksums".to_string(), "--force".to_string()]);
        }
        if let Some(version) = &options.version {
            args.push(format!("--version={}", version));
            args.push("--allow-downgrade".to_string());
        }
        args
    }

    fn outcome_rules(&self, kind: OperationKind) -> &'static OutcomeRules {
        match kind {
            OperationKind::Uninstall => &UNINSTALL_RULES,
            _ => &INSTALL_RULES,
        }
    }

    fn progress_rule(&self, _kind: OperationKind) -> ProgressRule {
        ProgressRule::EveryLine
    }
}
