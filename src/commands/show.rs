//! Show command
//!
//! Package details. Whatever a backend could not determine is printed as
//! "Not available".

use super::Session;
use super::operate::resolve_package;
use crate::error::Result;
use crate::packages::{ScoopBucket, scoop};
use crate::ui as output;
use crate::utils::machine_output;
use colored::Colorize;

pub fn run(session: &Session, backend: &str, id: &str, source: Option<&str>) -> Result<()> {
    let manager = session.registry.by_name(backend)?;
    let package = resolve_package(manager.as_ref(), id, source, false);
    let details = manager.details(&package);

    if session.json() {
        return machine_output::emit_json("show", &details, Vec::new());
    }

    output::header(details.display_name());
    for (label, value) in details.fields() {
        if value.contains('\n') {
            println!("{}:", label.bold());
            for line in value.lines() {
                output::indent(line, 1);
            }
        } else {
            output::keyval(label, &value);
        }
    }
    Ok(())
}

/// Scoop buckets known to the local installation.
pub fn buckets(session: &Session) -> Result<()> {
    let scoop = session.registry.by_name("scoop")?;
    let buckets: Vec<ScoopBucket> = if scoop.is_enabled() {
        scoop::list_buckets(session.registry.context())?
    } else {
        output::warning("Scoop is disabled");
        Vec::new()
    };

    if session.json() {
        return machine_output::emit_json("buckets", &buckets, Vec::new());
    }

    output::header(&format!("{} buckets", buckets.len()));
    for bucket in &buckets {
        println!(
            "  {:<16} {:<56} {:<20} {}",
            bucket.name.bold(),
            bucket.source,
            bucket.updated.dimmed(),
            bucket.manifests
        );
    }
    Ok(())
}
