pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod packages;
pub mod process;
pub mod project_identity;
pub mod ui;
pub mod utils;

use clap::Parser;
use std::process::exit;

/// Run the pkgbridge CLI entrypoint.
pub fn run_cli() {
    let args = cli::args::Cli::parse();
    ui::set_quiet(args.global.quiet);
    ui::set_verbose(args.global.verbose);
    let color = config::Settings::load()
        .ok()
        .and_then(|settings| settings.get("color").map(str::to_string))
        .unwrap_or_default();
    ui::init_colors(&color);

    if let Err(e) = cli::dispatcher::dispatch(&args) {
        ui::error(&format!("{}", e));
        exit(1);
    }
}
