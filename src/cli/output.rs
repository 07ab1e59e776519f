use std::sync::OnceLock;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

static VERBOSITY: OnceLock<Verbosity> = OnceLock::new();

/// Set the global verbosity from the `--verbose` / `--quiet` flags.
/// Quiet wins when both are given.
pub fn init(verbose: bool, quiet: bool) {
    let level = if quiet {
        Verbosity::Quiet
    } else if verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let _ = VERBOSITY.set(level);
}

fn verbosity() -> Verbosity {
    VERBOSITY.get().copied().unwrap_or(Verbosity::Normal)
}

/// Print a success message.
pub fn success(msg: &str) {
    if verbosity() != Verbosity::Quiet {
        println!("  {} {}", "✓".green(), msg);
    }
}

/// Print a warning message.
pub fn warning(msg: &str) {
    if verbosity() != Verbosity::Quiet {
        println!("  {} {}", "⚠".yellow(), msg);
    }
}

/// Print an error message. Always shown.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a header line.
pub fn header(msg: &str) {
    if verbosity() != Verbosity::Quiet {
        println!("\n{}", msg.bold());
    }
}

/// Print a detail line, only in verbose mode.
pub fn detail(msg: &str) {
    if verbosity() == Verbosity::Verbose {
        println!("    {}", msg.dimmed());
    }
}

/// Start a spinner with the given message. Hidden in quiet mode.
pub fn spinner(msg: &str) -> ProgressBar {
    if verbosity() == Verbosity::Quiet {
        return ProgressBar::hidden();
    }
    let sp = ProgressBar::new_spinner();
    sp.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    sp.set_message(msg.to_string());
    sp.enable_steady_tick(Duration::from_millis(80));
    sp
}

/// Stop a spinner and replace it with a success line.
pub fn finish_spinner(sp: ProgressBar, msg: &str) {
    sp.finish_and_clear();
    success(msg);
}

/// Stop a spinner without printing anything.
pub fn abandon_spinner(sp: ProgressBar) {
    sp.finish_and_clear();
}
