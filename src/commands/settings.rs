//! Settings Command
//!
//! Manage pkgbridge settings.

use crate::cli::args::SettingsCommand;
use crate::config::settings::Settings;
use crate::error::Result;
use crate::ui as output;
use crate::utils::machine_output;

pub fn run(command: &SettingsCommand, json: bool) -> Result<()> {
    match command {
        SettingsCommand::Set { key, value } => {
            let mut settings = Settings::load()?;
            settings.set(key, value)?;
            output::success(&format!("Set {} = {}", key, value));
        }
        SettingsCommand::Show => {
            let settings = Settings::load()?;
            if json {
                return machine_output::emit_json("settings", settings.all(), Vec::new());
            }
            show_all_settings(&settings);
        }
        SettingsCommand::Reset { key } => {
            let mut settings = Settings::load()?;
            settings.reset(key)?;
            output::success(&format!("Reset {} to default", key));
        }
    }

    Ok(())
}

fn show_all_settings(settings: &Settings) {
    output::header("Current Settings");
    for (key, value) in settings.all() {
        if value.is_empty() {
            println!("  {}: (default)", key);
        } else {
            println!("  {}: {}", key, value);
        }
    }

    println!();
    output::info(&format!("Stored in {}", settings.path().display()));
    output::info("Valid values:");
    output::indent("disabled: comma list of winget, choco, scoop, pip", 2);
    output::indent("command-timeout: seconds, greater than zero", 2);
    output::indent("color: auto, always, never", 2);
}
