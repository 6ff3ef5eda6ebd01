//! Read-only listing commands: available, search, installed, upgrades.
//!
//! Queries never fail per backend; a backend that errors contributes nothing
//! and logs a warning.

use super::Session;
use crate::core::{Package, UpgradablePackage};
use crate::error::Result;
use crate::ui as output;
use crate::utils::machine_output;
use colored::Colorize;
use rayon::prelude::*;

pub fn available(session: &Session, backend: &str, refresh: bool) -> Result<()> {
    let manager = session.registry.by_name(backend)?;

    if refresh && let Some(catalog) = manager.catalog() {
        let count = catalog.force_refresh()?;
        output::verbose(&format!("{} catalog now has {} rows", manager.backend_type().display_name(), count));
    }

    let load = manager.load_available();
    let packages = load.packages;
    if let Some(worker) = load.refresh {
        // finish the background merge before the process exits
        let _ = worker.join();
    }
    emit_packages(session, "available", &packages)
}

pub fn search(session: &Session, query: &str, backends: &[String]) -> Result<()> {
    let managers = session.select(backends)?;
    let found: Vec<Package> = managers
        .par_iter()
        .flat_map_iter(|manager| manager.search(query))
        .collect();
    emit_packages(session, "search", &found)
}

pub fn installed(session: &Session, backends: &[String]) -> Result<()> {
    let managers = session.select(backends)?;
    let installed: Vec<Package> = managers
        .par_iter()
        .flat_map_iter(|manager| manager.list_installed())
        .collect();
    emit_packages(session, "installed", &installed)
}

pub fn upgrades(session: &Session, backends: &[String]) -> Result<()> {
    let managers = session.select(backends)?;
    let upgrades: Vec<UpgradablePackage> = managers
        .par_iter()
        .flat_map_iter(|manager| manager.list_upgrades())
        .collect();

    if session.json() {
        return machine_output::emit_json("upgrades", &upgrades, Vec::new());
    }
    if upgrades.is_empty() {
        output::info("Everything is up to date");
        return Ok(());
    }

    output::header(&format!("{} upgrades", upgrades.len()));
    for upgrade in &upgrades {
        let package = &upgrade.package;
        println!(
            "  {:<32} {:<40} {} -> {}  {}",
            package.name.bold(),
            package.id,
            package.version.dimmed(),
            upgrade.new_version.green(),
            package.source.dimmed()
        );
    }
    Ok(())
}

fn emit_packages(session: &Session, command: &str, packages: &[Package]) -> Result<()> {
    if session.json() {
        return machine_output::emit_json(command, packages, Vec::new());
    }
    if packages.is_empty() {
        output::info("No packages found");
        return Ok(());
    }

    output::header(&format!("{} packages", packages.len()));
    for package in packages {
        println!(
            "  {:<32} {:<40} {:<16} {}",
            package.name.bold(),
            package.id,
            package.version,
            package.source.dimmed()
        );
    }
    Ok(())
}
