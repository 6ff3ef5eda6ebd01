//! # Package Manager Backends
//!
//! One `PackageManager` implementation per external package manager:
//!
//! - **Winget** (`winget.rs`): fixed-width tables, cached full catalog
//! - **Chocolatey** (`choco.rs`): plain and pipe-delimited rows, cached full catalog
//! - **Scoop** (`scoop.rs`): bucket-qualified sources, JSON manifests, cached full catalog
//! - **Pip** (`pip.rs`): on-demand search, PyPI metadata (`pypi.rs`)
//!
//! The trait (`traits.rs`) carries the public contract: disabled backends
//! are no-ops, read queries degrade to empty results, mutating operations
//! always finish with an outcome. Backends only provide the fallible
//! queries and their command plans.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pkgbridge::cache::CacheStore;
//! use pkgbridge::packages::{BackendContext, BackendRegistry, PackageManager};
//! use pkgbridge::core::Backend;
//! use std::sync::Arc;
//!
//! let context = Arc::new(BackendContext::new(CacheStore::new("/tmp/pkgbridge")));
//! let registry = BackendRegistry::with_defaults(context);
//! if let Some(pip) = registry.get(Backend::Pip) {
//!     for package in pip.list_installed() {
//!         println!("{} {}", package.id, package.version);
//!     }
//! }
//! ```

pub mod choco;
pub mod context;
pub mod parsing;
pub mod pip;
pub mod pypi;
pub mod registry;
pub mod scoop;
pub mod traits;
pub mod winget;

pub use choco::ChocoManager;
pub use context::BackendContext;
pub use pip::PipManager;
pub use registry::{BackendRegistry, InFlightGuard};
pub use scoop::{ScoopBucket, ScoopManager};
pub use traits::PackageManager;
pub use winget::WingetManager;
