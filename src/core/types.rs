use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PkgBridgeError;

// Supported backends.
// To add a new package manager, add a variant here and update:
// - Backend::ALL, Backend::display_name(), Backend::from_str()
// - BackendRegistry::register_defaults()
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Winget, // Windows Package Manager (full catalog, cached)
    Choco,  // Chocolatey (full catalog, cached)
    Scoop,  // Scoop buckets (full catalog, cached)
    Pip,    // Python packages (on-demand search)
}

impl Backend {
    pub const ALL: [Backend; 4] = [Backend::Winget, Backend::Choco, Backend::Scoop, Backend::Pip];

    /// Human-facing name, also used for the cache file name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Winget => "Winget",
            Self::Choco => "Chocolatey",
            Self::Scoop => "Scoop",
            Self::Pip => "Pip",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winget => write!(f, "winget"),
            Self::Choco => write!(f, "choco"),
            Self::Scoop => write!(f, "scoop"),
            Self::Pip => write!(f, "pip"),
        }
    }
}

impl FromStr for Backend {
    type Err = PkgBridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "winget" => Ok(Self::Winget),
            "choco" | "chocolatey" => Ok(Self::Choco),
            "scoop" => Ok(Self::Scoop),
            "pip" | "pypi" => Ok(Self::Pip),
            other => Err(PkgBridgeError::UnknownBackend(other.to_string())),
        }
    }
}

/// Effective identity of a package: id + source + owning backend.
/// The display name is deliberately not part of it.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageKey {
    pub backend: Backend,
    pub id: String,
    pub source: String,
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.backend, self.id, self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub id: String,
    pub version: String,
    pub source: String,
    pub backend: Backend,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
        source: impl Into<String>,
        backend: Backend,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            version: version.into(),
            source: source.into(),
            backend,
        }
    }

    pub fn key(&self) -> PackageKey {
        PackageKey {
            backend: self.backend,
            id: self.id.clone(),
            source: self.source.clone(),
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}, {})", self.name, self.id, self.version, self.source)
    }
}

/// A pending-update row produced by the "list upgrades" query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradablePackage {
    #[serde(flatten)]
    pub package: Package,
    pub new_version: String,
}

impl UpgradablePackage {
    pub fn new(package: Package, new_version: impl Into<String>) -> Self {
        Self {
            package,
            new_version: new_version.into(),
        }
    }
}

/// Caller-supplied knobs for install/update/uninstall. Never mutated by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationOptions {
    pub version: Option<String>,
    pub architecture: Option<String>,
    pub scope: Option<InstallationScope>,
    pub custom_parameters: Vec<String>,
    pub run_as_administrator: bool,
    pub interactive: bool,
    pub skip_hash_check: bool,
    pub remove_data_on_uninstall: bool,
}

impl InstallationOptions {
    /// Parse a shell-style custom argument string (`--foo "bar baz"`).
    pub fn with_custom_parameters(mut self, raw: &str) -> crate::error::Result<Self> {
        let args = shlex::split(raw).ok_or_else(|| {
            PkgBridgeError::ConfigError(format!("Unbalanced quotes in custom parameters: {}", raw))
        })?;
        self.custom_parameters = args;
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallationScope {
    User,
    Machine,
}

impl fmt::Display for InstallationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Machine => write!(f, "machine"),
        }
    }
}

impl FromStr for InstallationScope {
    type Err = PkgBridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "local" => Ok(Self::User),
            "machine" | "global" | "system" => Ok(Self::Machine),
            other => Err(PkgBridgeError::ConfigError(format!(
                "Invalid scope '{}'. Valid: user, machine",
                other
            ))),
        }
    }
}

/// Static per-backend feature set. Read-only after construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_run_as_admin: bool,
    pub can_skip_integrity_checks: bool,
    pub can_run_interactively: bool,
    pub can_remove_data_on_uninstall: bool,
    pub supports_custom_versions: bool,
    pub supports_custom_architectures: bool,
    pub supports_custom_scopes: bool,
}

/// Result of probing for a backend executable. Absence is a normal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManagerStatus {
    pub found: bool,
    pub version: String,
    pub executable: Option<String>,
}

impl ManagerStatus {
    pub fn missing() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Install,
    Update,
    Uninstall,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Update => write!(f, "update"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}
