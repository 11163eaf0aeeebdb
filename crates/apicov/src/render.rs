//! Markdown rendering of an aggregate report.

use crate::accumulator::verb_coverage;
use crate::aggregate::{AggregateReport, Coverage, CoverageBand, Thresholds};
use std::fmt::Write;

/// Base URL of the progress-bar image service
pub const PROGRESS_BAR_URL: &str = "https://progress-bar.xyz";

/// Hex color of a band; grey when there is no percentage
#[must_use]
pub const fn band_color(band: Option<CoverageBand>) -> &'static str {
    match band {
        Some(CoverageBand::Ok) => "5cb85c",
        Some(CoverageBand::Warning) => "f0ad4e",
        Some(CoverageBand::Critical) => "d9534f",
        None => "9e9e9e",
    }
}

/// Progress-bar image URL for `coverage`
#[must_use]
pub fn progress_bar_url(coverage: Coverage, thresholds: &Thresholds) -> String {
    format!(
        "{PROGRESS_BAR_URL}/{}/?color={}&width=500&title={}/{}",
        coverage.percentage().unwrap_or(0),
        band_color(coverage.band(thresholds)),
        coverage.covered,
        coverage.total
    )
}

/// Render the markdown report: title, total, one bar per path, then the
/// skipped observations
#[must_use]
pub fn markdown(report: &AggregateReport, suite: &str, thresholds: &Thresholds) -> String {
    let mut out = String::new();
    let bar = |c: Coverage| format!("![]({})\n\n", progress_bar_url(c, thresholds));

    let _ = write!(out, "# {suite}\n\n");
    out.push_str("## Total:\n");
    out.push_str(&bar(report.coverage()));

    out.push_str("## Channels:\n");
    for (path, verbs) in report.paths.iter() {
        let _ = writeln!(out, "### {path}");
        out.push_str(&bar(verb_coverage(verbs)));
    }

    if !report.skipped.is_empty() {
        out.push_str("## Skipped:\n\n");
        for skip in &report.skipped {
            let _ = writeln!(out, "- {skip}");
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::accumulator::{CoverageReport, SkipReason, SkipRecord};
    use crate::aggregate::merge;
    use crate::contract::ContractSpec;
    use crate::exchange::NormalizedExchange;

    #[test]
    fn test_progress_bar_url() {
        let url = progress_bar_url(Coverage::new(3, 2), &Thresholds::default());
        assert_eq!(
            url,
            "https://progress-bar.xyz/67/?color=f0ad4e&width=500&title=2/3"
        );
    }

    #[test]
    fn test_undefined_percentage_is_grey_zero() {
        let url = progress_bar_url(Coverage::default(), &Thresholds::default());
        assert!(url.starts_with("https://progress-bar.xyz/0/?color=9e9e9e"));
    }

    #[test]
    fn test_markdown_layout() {
        let spec = ContractSpec::new()
            .with_operation("/a", "GET", ["200", "404"])
            .with_operation("/b", "GET", Vec::<String>::new());
        let mut report = CoverageReport::seed(&spec);
        let mut skipped = Vec::new();
        report.apply(
            &[
                NormalizedExchange::new("/b", "GET"),
                NormalizedExchange::new("/c", "GET"),
            ],
            &mut skipped,
        );
        let merged = merge(&[("rest", &report)], skipped);
        let md = markdown(&merged, "Pet API", &Thresholds::default());

        assert!(md.starts_with("# Pet API\n\n## Total:\n![](https://progress-bar.xyz/33/"));
        let a = md.find("### /a").unwrap();
        let b = md.find("### /b").unwrap();
        assert!(a < b);
        assert!(md.contains("color=5cb85c&width=500&title=1/1"));
        assert!(md.contains("## Skipped:"));
        assert!(md.contains(&format!("- {}: GET /c", SkipReason::PathNotFound)));
    }

    #[test]
    fn test_no_skipped_section_when_clean() {
        let merged = merge(&[], Vec::<SkipRecord>::new());
        let md = markdown(&merged, "Empty", &Thresholds::default());
        assert!(!md.contains("Skipped"));
        assert!(md.contains("## Channels:\n"));
    }
}
