//! Command handlers behind the CLI.
//!
//! Each handler builds on a [`Session`]: settings loaded from disk, the
//! backend context derived from them, and the registry of every backend.

pub mod backends;
pub mod cache;
pub mod operate;
pub mod query;
pub mod settings;
pub mod show;

use crate::cli::args::OutputFormat;
use crate::config::Settings;
use crate::error::Result;
use crate::packages::{BackendContext, BackendRegistry, PackageManager};
use std::sync::Arc;

pub struct Session {
    pub registry: BackendRegistry,
    pub format: OutputFormat,
}

impl Session {
    pub fn load(format: OutputFormat) -> Result<Self> {
        let settings = Settings::load()?;
        let context = BackendContext::from_settings(&settings)?;
        Ok(Self::new(BackendRegistry::with_defaults(Arc::new(context)), format))
    }

    pub fn new(registry: BackendRegistry, format: OutputFormat) -> Self {
        Self { registry, format }
    }

    pub fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Managers named on the command line, or every enabled one when none is.
    pub fn select(&self, names: &[String]) -> Result<Vec<Arc<dyn PackageManager>>> {
        if names.is_empty() {
            return Ok(self.registry.enabled());
        }
        names.iter().map(|name| self.registry.by_name(name)).collect()
    }
}
