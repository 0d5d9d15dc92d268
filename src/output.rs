use std::io::{self, Write};
use std::time::Duration;

use colored::Colorize;

use crate::error::HandoffError;
use crate::probe::Reachable;

/// Everything the poller tells the user. Styling and quiet mode live behind this.
pub trait Reporter {
    fn waiting(&mut self, host: &str, targets: &str);
    /// One failed pass.
    fn tick(&mut self);
    fn connected(&mut self, host: &str, reachable: &Reachable, elapsed: Duration, attempts: u32);
    fn timed_out(&mut self, elapsed: Duration, attempts: u32);
    fn interrupted(&mut self, elapsed: Duration, attempts: u32);
    fn handoff_failed(&mut self, err: &HandoffError);
}

/// Colored terminal output. With `quiet` set nothing is printed.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn summary(&self, label: &str, value: impl std::fmt::Display) {
        println!(">> {}: {}", label.cyan(), value);
    }
}

impl Reporter for Console {
    fn waiting(&mut self, host: &str, targets: &str) {
        if self.quiet {
            return;
        }
        print!(
            ">> {} {} ({})",
            "Waiting for".cyan(),
            host.green().bold(),
            targets.yellow()
        );
        let _ = io::stdout().flush();
    }

    fn tick(&mut self) {
        if self.quiet {
            return;
        }
        print!("{}", ".".yellow());
        let _ = io::stdout().flush();
    }

    fn connected(&mut self, host: &str, reachable: &Reachable, elapsed: Duration, attempts: u32) {
        if self.quiet {
            return;
        }
        println!("\n>> {}", "Connection Established!".green().bold());
        self.summary("System", host.green().bold());
        self.summary(
            "Available on",
            format!(
                "{} ({})",
                reachable.port.to_string().green().bold(),
                reachable.service.label().yellow()
            ),
        );
        self.summary("Time elapsed", format_elapsed(elapsed).yellow());
        self.summary("Total attempts", attempts);
    }

    fn timed_out(&mut self, elapsed: Duration, attempts: u32) {
        if self.quiet {
            return;
        }
        println!("\n>> {}", "Timeout reached".yellow());
        self.summary("Time elapsed", format_elapsed(elapsed).yellow());
        self.summary("Total attempts", attempts);
    }

    fn interrupted(&mut self, elapsed: Duration, attempts: u32) {
        if self.quiet {
            return;
        }
        println!("\n>> {}", "Interrupted".yellow());
        self.summary("Time elapsed", format_elapsed(elapsed).yellow());
        self.summary("Total attempts", attempts);
    }

    fn handoff_failed(&mut self, err: &HandoffError) {
        if self.quiet {
            return;
        }
        println!("{} {}", "Error:".red().bold(), err);
    }
}

/// Round to whole seconds and print as `45s`, `1m5s`, `1h2m3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let mut secs = elapsed.as_secs();
    if elapsed.subsec_millis() >= 500 {
        secs += 1;
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}
