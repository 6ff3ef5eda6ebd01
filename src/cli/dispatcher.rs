//! Command dispatcher
//!
//! Routes CLI commands to their handlers.

use crate::cli::args::{CacheCommand, Cli, Command};
use crate::commands::{self, Session};
use crate::core::OperationKind;
use crate::error::Result;

/// Dispatch the parsed CLI command to the appropriate handler
pub fn dispatch(args: &Cli) -> Result<()> {
    let json = args.global.format == crate::cli::args::OutputFormat::Json;

    // settings must stay usable when the current settings break session setup
    if let Command::Settings { command } = &args.command {
        return commands::settings::run(command, json);
    }

    let session = Session::load(args.global.format)?;

    match &args.command {
        Command::Backends => commands::backends::run(&session),
        Command::Available { backend, refresh } => {
            commands::query::available(&session, backend, *refresh)
        }
        Command::Search { query, backends } => commands::query::search(&session, query, backends),
        Command::Installed { backends } => commands::query::installed(&session, backends),
        Command::Upgrades { backends } => commands::query::upgrades(&session, backends),
        Command::Show {
            backend,
            id,
            source,
        } => commands::show::run(&session, backend, id, source.as_deref()),
        Command::Install(op) => commands::operate::run(&session, OperationKind::Install, op),
        Command::Update(op) => commands::operate::run(&session, OperationKind::Update, op),
        Command::Uninstall(op) => commands::operate::run(&session, OperationKind::Uninstall, op),
        Command::Buckets => commands::show::buckets(&session),
        Command::Sources { backends } => commands::cache::sources(&session, backends),
        Command::Cache { command } => match command {
            CacheCommand::Refresh { backends } => commands::cache::refresh(&session, backends),
            CacheCommand::Clear { backends } => commands::cache::clear(&session, backends),
        },
        Command::Settings { command } => commands::settings::run(command, json),
    }
}
