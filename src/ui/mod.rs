use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod progress;

static QUIET: AtomicBool = AtomicBool::new(false);
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Apply the `color` setting (`auto`, `always`, `never`). `auto` leaves the
/// decision to `NO_COLOR`/`CLICOLOR` and terminal detection.
pub fn init_colors(mode: &str) {
    match mode.trim() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => {}
    }
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed) && !is_quiet()
}

pub fn header(title: &str) {
    println!("\n{}", title.bold().underline());
}

pub fn success(msg: &str) {
    if !is_quiet() {
        eprintln!("{} {}", "✓".green().bold(), msg);
    }
}

pub fn info(msg: &str) {
    if !is_quiet() {
        eprintln!("{} {}", "ℹ".blue().bold(), msg);
    }
}

/// Diagnostics only shown with `--verbose`.
pub fn verbose(msg: &str) {
    if is_verbose() {
        eprintln!("{} {}", "·".bright_black(), msg.bright_black());
    }
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

pub fn separator() {
    println!("{}", "─".repeat(60).bright_black());
}

pub fn keyval(key: &str, val: &str) {
    println!("{}: {}", key.bold(), val);
}

pub fn tag(label: &str, val: &str) {
    println!("{} {}", label.bold().white().on_blue(), val);
}

pub fn indent(msg: &str, level: usize) {
    let spaces = " ".repeat(level * 2);
    println!("{}{}", spaces, msg);
}
