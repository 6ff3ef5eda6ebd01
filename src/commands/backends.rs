//! Backends command
//!
//! Probes every registered package manager.

use super::Session;
use crate::core::{Backend, Capabilities, ManagerStatus};
use crate::error::Result;
use crate::ui as output;
use crate::utils::machine_output;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BackendReport {
    backend: Backend,
    name: &'static str,
    enabled: bool,
    status: ManagerStatus,
    capabilities: Capabilities,
}

pub fn run(session: &Session) -> Result<()> {
    let registry = &session.registry;
    let statuses = registry.detect_all();

    let reports: Vec<BackendReport> = statuses
        .into_iter()
        .filter_map(|(backend, status)| {
            let manager = registry.get(backend)?;
            Some(BackendReport {
                backend,
                name: backend.display_name(),
                enabled: manager.is_enabled(),
                status,
                capabilities: manager.capabilities(),
            })
        })
        .collect();

    if session.json() {
        return machine_output::emit_json("backends", reports, Vec::new());
    }

    output::header("Package managers");
    for report in &reports {
        let state = if !report.enabled {
            "disabled".dimmed()
        } else if report.status.found {
            "found".green()
        } else {
            "not found".yellow()
        };
        println!(
            "  {:<12} {:<10} {}",
            report.name.bold(),
            state,
            report.status.version.dimmed()
        );
        if let Some(executable) = &report.status.executable {
            output::indent(&executable.dimmed().to_string(), 7);
        }
    }
    Ok(())
}
