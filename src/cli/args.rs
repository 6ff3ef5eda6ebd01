use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "pkgbridge",
    about = "One front-end for winget, Chocolatey, Scoop and pip",
    long_about = "Query, install, update and remove packages through whichever \
                  package managers are present, with uniform results and outcomes",
    version,
    next_line_help = false,
    term_width = 80
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalFlags {
    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Quiet mode
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show which package managers are present and enabled
    Backends,

    /// List every package a backend can install (cached catalog)
    Available {
        /// Backend name (winget, choco, scoop, pip)
        backend: String,

        /// Rescrape the catalog before listing
        #[arg(long)]
        refresh: bool,
    },

    /// Search packages across backends
    Search {
        query: String,

        /// Only search these backends
        #[arg(short = 'b', long = "backend", value_name = "BACKEND")]
        backends: Vec<String>,
    },

    /// List installed packages
    Installed {
        #[arg(short = 'b', long = "backend", value_name = "BACKEND")]
        backends: Vec<String>,
    },

    /// List packages with a newer version available
    Upgrades {
        #[arg(short = 'b', long = "backend", value_name = "BACKEND")]
        backends: Vec<String>,
    },

    /// Show package details
    Show {
        backend: String,
        id: String,

        /// Source the package comes from (bucket, winget source, ...)
        #[arg(long)]
        source: Option<String>,
    },

    /// Install a package
    Install(OperationArgs),

    /// Update an installed package
    Update(OperationArgs),

    /// Uninstall a package
    Uninstall(OperationArgs),

    /// List Scoop buckets
    Buckets,

    /// Refresh backend source lists
    Sources {
        #[arg(short = 'b', long = "backend", value_name = "BACKEND")]
        backends: Vec<String>,
    },

    /// Manage the available-package cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Manage settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Args, Debug, Clone)]
pub struct OperationArgs {
    /// Backend name (winget, choco, scoop, pip)
    pub backend: String,

    /// Package id
    pub id: String,

    /// Source the package comes from (bucket, winget source, ...)
    #[arg(long)]
    pub source: Option<String>,

    /// Install a specific version
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Target architecture (x64, x86, arm64, 64bit, ...)
    #[arg(long, value_name = "ARCH")]
    pub architecture: Option<String>,

    /// Installation scope (user or machine)
    #[arg(long, value_name = "SCOPE")]
    pub scope: Option<String>,

    /// Extra backend arguments, shell-quoted
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub custom: Option<String>,

    /// Run through the elevation helper
    #[arg(long)]
    pub admin: bool,

    /// Let the installer show its UI
    #[arg(long)]
    pub interactive: bool,

    /// Skip installer hash verification
    #[arg(long)]
    pub skip_hash: bool,

    /// Remove user data on uninstall
    #[arg(long)]
    pub purge: bool,

    /// Echo backend output while the operation runs
    #[arg(long)]
    pub show_output: bool,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Rescrape catalogs now
    Refresh {
        #[arg(short = 'b', long = "backend", value_name = "BACKEND")]
        backends: Vec<String>,
    },

    /// Delete cached catalogs
    Clear {
        #[arg(short = 'b', long = "backend", value_name = "BACKEND")]
        backends: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Show all settings
    Show,

    /// Set a setting value
    Set { key: String, value: String },

    /// Reset a setting to its default
    Reset { key: String },
}

#[cfg(test)]
mod tests;
