//! Cache and source maintenance
//!
//! `cache refresh` rescrapes full catalogs, `cache clear` drops them, and
//! `sources` asks each backend to refresh its own source lists.

use super::Session;
use crate::core::Backend;
use crate::error::Result;
use crate::ui as output;

fn parse_backends(names: &[String]) -> Result<Vec<Backend>> {
    names.iter().map(|name| name.parse()).collect()
}

pub fn refresh(session: &Session, backends: &[String]) -> Result<()> {
    let managers = session.select(backends)?;
    let mut failed = 0;

    for manager in managers {
        let name = manager.backend_type().display_name();
        let Some(catalog) = manager.catalog() else {
            output::verbose(&format!("{} has no cached catalog", name));
            continue;
        };
        match catalog.force_refresh() {
            Ok(rows) => output::success(&format!("{}: {} packages cached", name, rows)),
            Err(e) => {
                output::warning(&format!("{}: refresh failed: {}", name, e));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        output::warning(&format!("{} catalog(s) could not be refreshed", failed));
    }
    Ok(())
}

pub fn clear(session: &Session, backends: &[String]) -> Result<()> {
    let store = session.registry.context().cache();
    let removed = if backends.is_empty() {
        store.clear(None)?
    } else {
        let mut removed = 0;
        for backend in parse_backends(backends)? {
            removed += store.clear(Some(backend))?;
        }
        removed
    };

    if removed == 0 {
        output::info("No cached catalogs to remove");
    } else {
        output::success(&format!("Removed {} cached catalog(s)", removed));
    }
    Ok(())
}

pub fn sources(session: &Session, backends: &[String]) -> Result<()> {
    for manager in session.select(backends)? {
        let name = manager.backend_type().display_name();
        match manager.refresh_sources() {
            Ok(()) => output::success(&format!("{}: sources refreshed", name)),
            Err(e) => output::warning(&format!("{}: {}", name, e)),
        }
    }
    Ok(())
}
