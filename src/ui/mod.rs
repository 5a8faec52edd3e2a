//! UI/Progress presentation layer
//!
//! All user-facing output goes through the [`Reporter`] trait so commands can
//! run with styled console output, verbose detail, or silently (tests and
//! `--quiet`).

use std::sync::Mutex;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output sink shared by commands and concurrent fetch workers
pub trait Reporter: Send + Sync {
    /// Completed unit of work (stdout)
    fn success(&self, message: &str);

    /// Non-fatal problem (stderr)
    fn warn(&self, message: &str);

    /// Failed unit of work (stderr)
    fn error(&self, message: &str);

    /// Extra information, shown only in verbose mode
    fn detail(&self, message: &str);

    /// A batch of `total` package fetches is starting
    fn start_fetch(&self, total: usize);

    /// One package of the running batch finished
    fn package_done(&self, name: &str);

    fn finish_fetch(&self);
}

/// Styled terminal output with a progress bar during fetches
pub struct ConsoleReporter {
    verbose: bool,
    quiet: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            bar: Mutex::new(None),
        }
    }

    /// Only warnings and errors are printed; no progress bar
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn current_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|bar| bar.clone())
    }

    /// Print above the progress bar when one is active
    fn emit(&self, line: &str, stderr: bool) {
        match self.current_bar() {
            Some(bar) if !bar.is_hidden() => bar.println(line),
            _ if stderr => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let line = Style::new().green().apply_to(message).to_string();
        self.emit(&line, false);
    }

    fn warn(&self, message: &str) {
        let line = Style::new().yellow().apply_to(message).to_string();
        self.emit(&line, true);
    }

    fn error(&self, message: &str) {
        let line = Style::new().red().apply_to(message).to_string();
        self.emit(&line, true);
    }

    fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            let line = Style::new().dim().apply_to(message).to_string();
            self.emit(&line, true);
        }
    }

    fn start_fetch(&self, total: usize) {
        let style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bar = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        bar.set_style(style);
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn package_done(&self, name: &str) {
        if let Some(bar) = self.current_bar() {
            bar.set_message(name.to_string());
            bar.inc(1);
        }
    }

    fn finish_fetch(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

/// No-op reporter
#[cfg(test)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

#[cfg(test)]
impl Reporter for SilentReporter {
    fn success(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}

    fn error(&self, _message: &str) {}

    fn detail(&self, _message: &str) {}

    fn start_fetch(&self, _total: usize) {}

    fn package_done(&self, _name: &str) {}

    fn finish_fetch(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_reporter_no_ops() {
        let reporter = SilentReporter;
        reporter.success("Successfully fetched rake (0.8.7)");
        reporter.warn("warning");
        reporter.error("Can't find package fake");
        reporter.detail("detail");
        reporter.start_fetch(2);
        reporter.package_done("rake");
        reporter.finish_fetch();
    }

    #[test]
    fn test_console_reporter_progress_lifecycle() {
        let reporter = ConsoleReporter::new(false);
        reporter.start_fetch(2);
        reporter.package_done("rake");
        assert_eq!(reporter.current_bar().map(|bar| bar.position()), Some(1));
        reporter.finish_fetch();
        assert!(reporter.current_bar().is_none());
    }

    #[test]
    fn test_quiet_reporter_hides_progress() {
        let reporter = ConsoleReporter::new(true).quiet(true);
        reporter.start_fetch(1);
        assert!(reporter.current_bar().is_some_and(|bar| bar.is_hidden()));
        reporter.finish_fetch();
    }
}
