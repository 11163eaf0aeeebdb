//! Output formatting and progress reporting

use apicov::{AggregateReport, Coverage, CoverageBand, Thresholds};
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

/// Output format for the coverage summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// The aggregate report as JSON
    Json,
}

/// Progress and summary reporter
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    out: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            out: Term::stdout(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` files
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || total == 0 {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print the coverage summary to stdout
    pub fn coverage_summary(&self, report: &AggregateReport, thresholds: &Thresholds) {
        if self.quiet {
            return;
        }
        for line in summary_lines(report, thresholds, self.use_color) {
            let _ = self.out.write_line(&line);
        }
    }

    /// Print raw text to stdout, even in quiet mode
    pub fn print(&self, text: &str) {
        let _ = self.out.write_line(text);
    }
}

/// `NN%`, colored by band when `use_color`
fn format_coverage(coverage: Coverage, thresholds: &Thresholds, use_color: bool) -> String {
    let text = coverage.to_string();
    if !use_color {
        return text;
    }
    let style = match coverage.band(thresholds) {
        Some(CoverageBand::Ok) => Style::new().green(),
        Some(CoverageBand::Warning) => Style::new().yellow(),
        Some(CoverageBand::Critical) => Style::new().red(),
        None => Style::new().dim(),
    };
    style.apply_to(text).to_string()
}

/// Lines of the console summary
#[must_use]
pub fn summary_lines(report: &AggregateReport, thresholds: &Thresholds, use_color: bool) -> Vec<String> {
    let title = if use_color {
        style("Coverage Report").bold().to_string()
    } else {
        "Coverage Report".to_string()
    };
    let total_label = if use_color {
        style("Total:").bold().to_string()
    } else {
        "Total:".to_string()
    };

    let mut lines = vec![
        String::new(),
        title,
        format!(
            "{total_label} {}",
            format_coverage(report.coverage(), thresholds, use_color)
        ),
    ];
    for source in &report.sources {
        lines.push(format!(
            "  {}: {}",
            source.label,
            format_coverage(source.report.coverage(), thresholds, use_color)
        ));
    }
    if !report.skipped.is_empty() {
        lines.push(format!("Skipped: {} observation(s)", report.skipped.len()));
    }
    lines
}
