use crate::process::events::{ProgressEvent, ProgressSink};
use colored::Colorize;
use std::io::{self, Write};
use std::time::Instant;

/// Progress indicator for a running package operation.
///
/// A `total` of zero means the backend reports an open-ended counter
/// (one tick per output line) and only the count is drawn.
pub struct ProgressBar {
    total: usize,
    current: usize,
    message: String,
    start_time: Instant,
    width: usize,
    drawn: bool,
}

impl ProgressBar {
    pub fn new(total: usize, message: &str) -> Self {
        Self {
            total,
            current: 0,
            message: message.to_string(),
            start_time: Instant::now(),
            width: 30,
            drawn: false,
        }
    }

    /// Set the current progress
    pub fn set(&mut self, value: usize) {
        self.current = if self.total > 0 {
            value.min(self.total)
        } else {
            value
        };
        self.draw();
    }

    /// Erase the bar so a plain line can be printed above it
    pub fn clear(&mut self) {
        if self.drawn {
            eprint!("\r{:width$}\r", "", width = 100);
            io::stderr().flush().unwrap_or(());
            self.drawn = false;
        }
    }

    pub fn finish(&mut self) {
        if self.drawn {
            self.draw();
            eprintln!();
            self.drawn = false;
        }
    }

    fn draw(&mut self) {
        let elapsed = format!("{:.0}s", self.start_time.elapsed().as_secs_f64());

        if self.total == 0 {
            eprint!(
                "\r{} {} {} {}",
                "▸".dimmed(),
                self.message.cyan(),
                self.current.to_string().bold(),
                elapsed.dimmed()
            );
        } else {
            let filled = (self.current * self.width) / self.total;
            let bar = "█".repeat(filled);
            let empty = "░".repeat(self.width.saturating_sub(filled));
            let percent = (self.current * 100) / self.total;

            eprint!(
                "\r{} {} [{}{}] {}% {}",
                "▸".dimmed(),
                self.message.cyan(),
                bar.green(),
                empty.dimmed(),
                percent.to_string().bold(),
                elapsed.dimmed()
            );
        }

        io::stderr().flush().unwrap_or(());
        self.drawn = true;
    }
}

/// Progress sink that renders an operation on the terminal.
pub struct TerminalProgress {
    bar: ProgressBar,
    echo_lines: bool,
}

impl TerminalProgress {
    pub fn new(message: &str, total: usize, echo_lines: bool) -> Self {
        Self {
            bar: ProgressBar::new(total, message),
            echo_lines,
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn on_event(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Line { line } => {
                if self.echo_lines {
                    self.bar.clear();
                    eprintln!("  {}", line.bright_black());
                    self.bar.draw();
                }
            }
            ProgressEvent::Progress { count } => self.bar.set(count as usize),
            ProgressEvent::Finished(_) => self.bar.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_bar_caps_at_total() {
        let mut bar = ProgressBar::new(6, "Installing");
        bar.set(4);
        assert_eq!(bar.current, 4);
        bar.set(10);
        assert_eq!(bar.current, 6);
        bar.finish();
    }

    #[test]
    fn open_ended_bar_counts_freely() {
        let mut bar = ProgressBar::new(0, "Installing");
        bar.set(120);
        assert_eq!(bar.current, 120);
        bar.clear();
        assert!(!bar.drawn);
    }
}
