//! Available-package catalogs backed by the cache store.
//!
//! A read never waits for the network or a slow scrape when a cached copy
//! exists: the cached rows are returned and a background worker re-scrapes
//! and merges. Only a missing or empty cache forces a synchronous scrape,
//! and that happens at most once per call.

use super::{CacheRow, CacheSnapshot, CacheStore};
use crate::core::{Backend, Package};
use crate::error::Result;
use crate::ui;
use crate::utils::text;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Enumerates a backend's full catalog.
pub trait CatalogScraper: Send + Sync {
    fn scrape(&self) -> Result<Vec<CacheRow>>;

    /// Whether a stored row is a real package. Cache files may be edited by
    /// hand or written by an older build, so rows are re-checked on load.
    fn accepts(&self, _row: &CacheRow) -> bool {
        true
    }
}

/// Result of a catalog read.
pub struct CatalogLoad {
    pub packages: Vec<Package>,
    /// Background refresh started by this read, if any.
    pub refresh: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct AvailableCatalog {
    backend: Backend,
    store: CacheStore,
    scraper: Arc<dyn CatalogScraper>,
}

impl AvailableCatalog {
    pub fn new(backend: Backend, store: CacheStore, scraper: Arc<dyn CatalogScraper>) -> Self {
        Self {
            backend,
            store,
            scraper,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Scrape now and merge into the cache. Returns the cached row count.
    pub fn force_refresh(&self) -> Result<usize> {
        let rows = self.scraper.scrape()?;
        ui::verbose(&format!(
            "Scraped {} {} catalog rows",
            rows.len(),
            self.backend.display_name()
        ));
        self.store.refresh(self.backend, rows)
    }

    pub fn load(&self) -> CatalogLoad {
        if let Some(packages) = self.cached_packages() {
            return CatalogLoad {
                packages,
                refresh: self.spawn_refresh(),
            };
        }

        ui::verbose(&format!(
            "{} catalog cache is empty, refreshing",
            self.backend.display_name()
        ));
        if let Err(e) = self.force_refresh() {
            ui::warning(&format!(
                "Could not build the {} catalog: {}",
                self.backend.display_name(),
                e
            ));
        }

        CatalogLoad {
            packages: self.cached_packages().unwrap_or_default(),
            refresh: None,
        }
    }

    /// Cached packages, leaving any background refresh detached.
    pub fn list(&self) -> Vec<Package> {
        self.load().packages
    }

    fn cached_packages(&self) -> Option<Vec<Package>> {
        match self.store.read(self.backend) {
            Ok(CacheSnapshot::Rows(rows)) => Some(
                rows.into_iter()
                    .filter(|row| self.scraper.accepts(row))
                    .map(|mut row| {
                        if row.name.trim().is_empty() {
                            row.name = text::format_id_as_name(&row.id);
                        }
                        row.into_package(self.backend)
                    })
                    .collect(),
            ),
            Ok(CacheSnapshot::Absent | CacheSnapshot::Empty) => None,
            Err(e) => {
                ui::warning(&format!(
                    "Could not read the {} catalog cache: {}",
                    self.backend.display_name(),
                    e
                ));
                None
            }
        }
    }

    /// Best-effort refresh on a detached worker; failures are only logged.
    pub fn spawn_refresh(&self) -> Option<JoinHandle<()>> {
        let catalog = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-catalog-refresh", self.backend))
            .spawn(move || {
                if let Err(e) = catalog.force_refresh() {
                    ui::warning(&format!(
                        "Background {} catalog refresh failed: {}",
                        catalog.backend.display_name(),
                        e
                    ));
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                ui::warning(&format!("Could not start catalog refresh: {}", e));
                None
            }
        }
    }
}
