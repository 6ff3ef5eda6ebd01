use super::context::BackendContext;
use super::registry::InFlightGuard;
use crate::cache::catalog::{AvailableCatalog, CatalogLoad};
use crate::core::{
    Backend, Capabilities, InstallationOptions, ManagerStatus, OperationKind, OutcomeRules,
    Package, PackageDetails, UpgradablePackage,
};
use crate::error::{PkgBridgeError, Result};
use crate::process::{
    self, CommandSpec, OperationHandle, OperationReport, OperationRequest, ProgressEvent,
    ProgressRule, ProgressSink,
};
use crate::ui;
use crate::utils::sanitize;

/// Uniform contract over one external package manager.
///
/// Implementors provide the fallible `fetch_*` queries and the command
/// plan for each operation. The provided methods add the public contract
/// on top: disabled backends are no-ops, read queries never fail (errors
/// are logged and degrade to empty or partial results), and mutating
/// operations always end in an `OperationOutcome`.
pub trait PackageManager: Send + Sync {
    fn backend_type(&self) -> Backend;
    fn capabilities(&self) -> Capabilities;
    fn context(&self) -> &BackendContext;

    /// Full-catalog backends keep their available packages in the cache store.
    fn catalog(&self) -> Option<&AvailableCatalog> {
        None
    }

    /// Probe the executable. Absence is a normal state, not an error.
    fn probe_installation(&self) -> ManagerStatus;

    /// Refresh server-side source lists; no-op when the backend has none.
    fn update_sources(&self) -> Result<()> {
        Ok(())
    }

    /// Live search. The default filters the cached catalog.
    fn fetch_search(&self, query: &str) -> Result<Vec<Package>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .list_available()
            .into_iter()
            .filter(|p| {
                needle.is_empty()
                    || p.id.to_lowercase().contains(&needle)
                    || p.name.to_lowercase().contains(&needle)
            })
            .collect())
    }

    fn fetch_installed(&self) -> Result<Vec<Package>>;
    fn fetch_upgrades(&self) -> Result<Vec<UpgradablePackage>>;

    /// Fill `details` field by field; whatever was filled before an error is kept.
    fn fill_details(&self, details: &mut PackageDetails) -> Result<()>;

    /// Backend verb plus the package argument, without translated options.
    /// Backends that pin versions inside the package argument read
    /// `options.version` here.
    fn base_command(
        &self,
        kind: OperationKind,
        package: &Package,
        options: &InstallationOptions,
    ) -> CommandSpec;

    /// Map the semantic options onto this backend's flags. Options the
    /// backend does not support are dropped silently.
    fn translate_options(&self, kind: OperationKind, options: &InstallationOptions) -> Vec<String>;

    fn outcome_rules(&self, kind: OperationKind) -> &'static OutcomeRules;
    fn progress_rule(&self, kind: OperationKind) -> ProgressRule;

    /// Reject ids that must not reach this backend's command line. The
    /// default is the strict check for ids that may pass through a shell.
    fn validate_id(&self, id: &str) -> Result<()> {
        sanitize::validate_package_id(id)
    }

    /// Extra arguments appended when the command runs elevated.
    fn elevated_arguments(&self, _kind: OperationKind) -> Vec<String> {
        Vec::new()
    }

    // ---- provided contract ----

    fn is_enabled(&self) -> bool {
        self.context().is_enabled(self.backend_type())
    }

    fn detect_installation(&self) -> ManagerStatus {
        if !self.is_enabled() {
            return ManagerStatus::missing();
        }
        let status = self.probe_installation();
        ui::verbose(&format!(
            "{} found: {} {}",
            self.backend_type().display_name(),
            status.found,
            status.version
        ));
        status
    }

    fn refresh_sources(&self) -> Result<()> {
        if !self.is_enabled() {
            return Err(PkgBridgeError::BackendDisabled(self.backend_type().to_string()));
        }
        self.update_sources()
    }

    /// Available packages with the background refresh handle, if one started.
    fn load_available(&self) -> CatalogLoad {
        match self.catalog() {
            Some(catalog) if self.is_enabled() => catalog.load(),
            _ => CatalogLoad {
                packages: Vec::new(),
                refresh: None,
            },
        }
    }

    fn list_available(&self) -> Vec<Package> {
        self.load_available().packages
    }

    fn search(&self, query: &str) -> Vec<Package> {
        if !self.is_enabled() {
            return Vec::new();
        }
        degrade(self.backend_type(), "search", self.fetch_search(query))
    }

    fn list_installed(&self) -> Vec<Package> {
        if !self.is_enabled() {
            return Vec::new();
        }
        degrade(self.backend_type(), "list installed packages", self.fetch_installed())
    }

    fn list_upgrades(&self) -> Vec<UpgradablePackage> {
        if !self.is_enabled() {
            return Vec::new();
        }
        degrade(self.backend_type(), "list upgrades", self.fetch_upgrades())
    }

    fn details(&self, package: &Package) -> PackageDetails {
        let mut details = PackageDetails::new(package.clone());
        if self.is_enabled()
            && let Err(e) = self.fill_details(&mut details)
        {
            ui::warning(&format!(
                "{}: details for '{}' are incomplete: {}",
                self.backend_type().display_name(),
                package.id,
                e
            ));
        }
        details
    }

    /// Full command line for an operation, elevation included.
    fn operation_command(
        &self,
        kind: OperationKind,
        package: &Package,
        options: &InstallationOptions,
    ) -> Result<CommandSpec> {
        self.validate_id(&package.id)?;
        if let Some(version) = &options.version {
            sanitize::validate_version(version)?;
        }

        let mut command = self
            .base_command(kind, package, options)
            .args(self.translate_options(kind, options));

        if self.runs_elevated(options) {
            for arg in self.elevated_arguments(kind) {
                if !command.args.contains(&arg) {
                    command = command.arg(arg);
                }
            }
            command = command.elevated(self.context().elevator());
        }
        Ok(command)
    }

    fn runs_elevated(&self, options: &InstallationOptions) -> bool {
        options.run_as_administrator && self.capabilities().can_run_as_admin
    }

    fn install(
        &self,
        package: &Package,
        options: &InstallationOptions,
        sink: Box<dyn ProgressSink>,
    ) -> OperationHandle {
        start_operation(self, OperationKind::Install, package, options, sink, None)
    }

    fn update(
        &self,
        package: &Package,
        options: &InstallationOptions,
        sink: Box<dyn ProgressSink>,
    ) -> OperationHandle {
        start_operation(self, OperationKind::Update, package, options, sink, None)
    }

    fn uninstall(
        &self,
        package: &Package,
        options: &InstallationOptions,
        sink: Box<dyn ProgressSink>,
    ) -> OperationHandle {
        start_operation(self, OperationKind::Uninstall, package, options, sink, None)
    }
}

/// Launch a mutating operation, or finish it right away when it cannot run.
pub(crate) fn start_operation<M: PackageManager + ?Sized>(
    manager: &M,
    kind: OperationKind,
    package: &Package,
    options: &InstallationOptions,
    mut sink: Box<dyn ProgressSink>,
    guard: Option<InFlightGuard>,
) -> OperationHandle {
    if !manager.is_enabled() {
        let reason = PkgBridgeError::BackendDisabled(manager.backend_type().to_string());
        return finish_early(OperationReport::failed(kind, package.clone(), reason.to_string()), sink.as_mut());
    }

    let command = match manager.operation_command(kind, package, options) {
        Ok(command) => command,
        Err(e) => {
            return finish_early(OperationReport::failed(kind, package.clone(), e.to_string()), sink.as_mut());
        }
    };

    let request = OperationRequest {
        kind,
        package: package.clone(),
        elevated: manager.runs_elevated(options),
        command,
        rules: manager.outcome_rules(kind),
        progress: manager.progress_rule(kind),
        guard,
    };
    process::launch(request, sink)
}

fn finish_early(report: OperationReport, sink: &mut dyn ProgressSink) -> OperationHandle {
    ui::verbose(&format!("{} of {} not started: {}", report.kind, report.package.id, report.transcript));
    sink.on_event(ProgressEvent::Finished(report.clone()));
    OperationHandle::finished(report)
}

/// Log a failed read query and fall back to an empty result.
pub(crate) fn degrade<T: Default>(backend: Backend, what: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        ui::warning(&format!("{}: could not {}: {}", backend.display_name(), what, e));
        T::default()
    })
}
