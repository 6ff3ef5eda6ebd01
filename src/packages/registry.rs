//! # Backend Registry
//!
//! The set of package managers this process talks to, constructed once at
//! startup and passed by reference to whoever needs it.
//!
//! ## Adding a New Backend
//!
//! 1. Create `src/packages/<backend>.rs` with a manager struct
//! 2. Implement `PackageManager` for it
//! 3. Add `Backend::<Name>` to `core/types.rs`
//! 4. Register it in `BackendRegistry::register_defaults()`
//!
//! Mutating operations dispatched through the registry are serialized per
//! package: while one operation on a `PackageKey` is running, a second
//! request for the same key is refused with `OperationInProgress`.

use super::context::BackendContext;
use super::traits::{PackageManager, start_operation};
use super::{ChocoManager, PipManager, ScoopManager, WingetManager};
use crate::core::{
    Backend, InstallationOptions, ManagerStatus, OperationKind, Package, PackageKey,
    UpgradablePackage,
};
use crate::error::{PkgBridgeError, Result};
use crate::process::{OperationHandle, ProgressSink};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

type InFlightSet = Arc<Mutex<HashSet<PackageKey>>>;

/// Marks a package as busy until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    key: PackageKey,
    set: InFlightSet,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        match self.set.lock() {
            Ok(mut set) => {
                set.remove(&self.key);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(&self.key);
            }
        }
    }
}

/// Registry of package managers
pub struct BackendRegistry {
    context: Arc<BackendContext>,
    managers: BTreeMap<Backend, Arc<dyn PackageManager>>,
    in_flight: InFlightSet,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new(context: Arc<BackendContext>) -> Self {
        Self {
            context,
            managers: BTreeMap::new(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Registry holding winget, Chocolatey, Scoop and pip
    pub fn with_defaults(context: Arc<BackendContext>) -> Self {
        let mut registry = Self::new(context);
        registry.register_defaults();
        registry
    }

    pub fn register_defaults(&mut self) {
        let context = self.context.clone();
        self.register(Arc::new(WingetManager::new(context.clone())));
        self.register(Arc::new(ChocoManager::new(context.clone())));
        self.register(Arc::new(ScoopManager::new(context.clone())));
        self.register(Arc::new(PipManager::new(context)));
    }

    /// Register a manager, replacing any previous one for the same backend
    pub fn register(&mut self, manager: Arc<dyn PackageManager>) {
        self.managers.insert(manager.backend_type(), manager);
    }

    pub fn context(&self) -> &BackendContext {
        &self.context
    }

    pub fn get(&self, backend: Backend) -> Option<Arc<dyn PackageManager>> {
        self.managers.get(&backend).cloned()
    }

    /// Look up a manager by name (`winget`, `choco`, `chocolatey`, `scoop`, `pip`)
    pub fn by_name(&self, name: &str) -> Result<Arc<dyn PackageManager>> {
        let backend: Backend = name.parse()?;
        self.get(backend)
            .ok_or_else(|| PkgBridgeError::UnknownBackend(name.to_string()))
    }

    pub fn registered_backends(&self) -> Vec<Backend> {
        self.managers.keys().copied().collect()
    }

    pub fn managers(&self) -> impl Iterator<Item = &Arc<dyn PackageManager>> {
        self.managers.values()
    }

    /// Managers whose disable switch is off
    pub fn enabled(&self) -> Vec<Arc<dyn PackageManager>> {
        self.managers
            .values()
            .filter(|m| m.is_enabled())
            .cloned()
            .collect()
    }

    pub fn detect_all(&self) -> Vec<(Backend, ManagerStatus)> {
        self.managers
            .par_iter()
            .map(|(backend, manager)| (*backend, manager.detect_installation()))
            .collect()
    }

    pub fn installed_all(&self) -> Vec<Package> {
        self.managers
            .par_iter()
            .flat_map_iter(|(_, manager)| manager.list_installed())
            .collect()
    }

    pub fn upgrades_all(&self) -> Vec<UpgradablePackage> {
        self.managers
            .par_iter()
            .flat_map_iter(|(_, manager)| manager.list_upgrades())
            .collect()
    }

    pub fn search_all(&self, query: &str) -> Vec<Package> {
        self.managers
            .par_iter()
            .flat_map_iter(|(_, manager)| manager.search(query))
            .collect()
    }

    pub fn is_in_flight(&self, key: &PackageKey) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(key))
            .unwrap_or(false)
    }

    fn claim(&self, package: &Package) -> Result<InFlightGuard> {
        let key = package.key();
        let mut set = self
            .in_flight
            .lock()
            .map_err(|e| PkgBridgeError::LockError(e.to_string()))?;

        if !set.insert(key.clone()) {
            return Err(PkgBridgeError::OperationInProgress(key.to_string()));
        }
        Ok(InFlightGuard {
            key,
            set: self.in_flight.clone(),
        })
    }

    /// Dispatch a mutating operation to the package's backend.
    pub fn start(
        &self,
        kind: OperationKind,
        package: &Package,
        options: &InstallationOptions,
        sink: Box<dyn ProgressSink>,
    ) -> Result<OperationHandle> {
        let manager = self
            .get(package.backend)
            .ok_or_else(|| PkgBridgeError::UnknownBackend(package.backend.to_string()))?;
        let guard = self.claim(package)?;
        Ok(start_operation(
            manager.as_ref(),
            kind,
            package,
            options,
            sink,
            Some(guard),
        ))
    }

    pub fn install(
        &self,
        package: &Package,
        options: &InstallationOptions,
        sink: Box<dyn ProgressSink>,
    ) -> Result<OperationHandle> {
        self.start(OperationKind::Install, package, options, sink)
    }

    pub fn update(
        &self,
        package: &Package,
        options: &InstallationOptions,
        sink: Box<dyn ProgressSink>,
    ) -> Result<OperationHandle> {
        self.start(OperationKind::Update, package, options, sink)
    }

    pub fn uninstall(
        &self,
        package: &Package,
        options: &InstallationOptions,
        sink: Box<dyn ProgressSink>,
    ) -> Result<OperationHandle> {
        self.start(OperationKind::Uninstall, package, options, sink)
    }
}
