//! Report aggregation and threshold classification.
//!
//! Sources never share a report; each one seeds and fills its own
//! [`CoverageReport`]. [`merge`] combines them into an [`AggregateReport`]
//! without touching the inputs.

use crate::accumulator::{CoverageReport, SkipRecord, VerbCoverage};
use crate::ordered_map::OrderedMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Declared and covered discriminator counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    /// Declared discriminators
    pub total: usize,
    /// Observed discriminators
    pub covered: usize,
}

impl Coverage {
    /// Create counts
    #[must_use]
    pub const fn new(total: usize, covered: usize) -> Self {
        Self { total, covered }
    }

    /// Rounded percentage (half up); `None` when nothing is declared
    #[must_use]
    pub fn percentage(&self) -> Option<u32> {
        percentage(self.covered, self.total)
    }

    /// Band of the percentage under `thresholds`
    #[must_use]
    pub fn band(&self, thresholds: &Thresholds) -> Option<CoverageBand> {
        self.percentage().map(|pct| thresholds.classify(pct))
    }
}

impl Add for Coverage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.total + rhs.total, self.covered + rhs.covered)
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentage() {
            Some(pct) => write!(f, "{pct}% ({}/{})", self.covered, self.total),
            None => write!(f, "n/a (0/0)"),
        }
    }
}

/// `round_half_up(100 * covered / total)`, `None` when `total` is zero
#[must_use]
pub fn percentage(covered: usize, total: usize) -> Option<u32> {
    if total == 0 {
        return None;
    }
    let (covered, total) = (covered as u128, total as u128);
    let pct = (200 * covered + total) / (2 * total);
    u32::try_from(pct).ok()
}

/// Percentage boundaries of the coverage bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Lowest percentage rated [`CoverageBand::Ok`]
    pub ok: u32,
    /// Lowest percentage rated [`CoverageBand::Warning`]
    pub warning: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ok: 70,
            warning: 50,
        }
    }
}

impl Thresholds {
    /// Create thresholds; `ok` is expected to be at least `warning`
    #[must_use]
    pub const fn new(ok: u32, warning: u32) -> Self {
        Self { ok, warning }
    }

    /// Band of a percentage
    #[must_use]
    pub const fn classify(&self, percentage: u32) -> CoverageBand {
        if percentage >= self.ok {
            CoverageBand::Ok
        } else if percentage >= self.warning {
            CoverageBand::Warning
        } else {
            CoverageBand::Critical
        }
    }
}

/// Rating of a coverage percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageBand {
    /// At or above the ok threshold
    Ok,
    /// Between the warning and ok thresholds
    Warning,
    /// Below the warning threshold
    Critical,
}

impl fmt::Display for CoverageBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One source's report inside an aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Source label
    pub label: String,
    /// The source's own report
    pub report: CoverageReport,
}

/// Merged coverage of every source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    /// Per-source reports, in merge order
    pub sources: Vec<SourceReport>,
    /// Union of all sources' paths; later sources win on key collisions
    pub paths: OrderedMap<VerbCoverage>,
    /// Every skipped observation
    pub skipped: Vec<SkipRecord>,
    /// Sum of the sources' totals
    pub total: usize,
    /// Sum of the sources' covered totals
    pub total_covered: usize,
}

impl AggregateReport {
    /// Grand totals
    #[must_use]
    pub fn coverage(&self) -> Coverage {
        Coverage::new(self.total, self.total_covered)
    }

    /// Rounded grand percentage, `None` when nothing is declared
    #[must_use]
    pub fn percentage(&self) -> Option<u32> {
        self.coverage().percentage()
    }

    /// Band of the grand percentage
    #[must_use]
    pub fn band(&self, thresholds: &Thresholds) -> Option<CoverageBand> {
        self.coverage().band(thresholds)
    }

    /// Report of the source labelled `label`
    #[must_use]
    pub fn source(&self, label: &str) -> Option<&CoverageReport> {
        self.sources
            .iter()
            .find(|s| s.label == label)
            .map(|s| &s.report)
    }
}

/// Merge per-source reports.
///
/// Path keys present in several sources are overwritten by the later source
/// but keep the position of their first appearance. Grand totals are summed
/// from each source's own totals, so a collision does not hide the earlier
/// source's counts.
#[must_use]
pub fn merge(sources: &[(&str, &CoverageReport)], skipped: Vec<SkipRecord>) -> AggregateReport {
    let mut paths = OrderedMap::new();
    let mut total = 0;
    let mut total_covered = 0;

    for (label, report) in sources {
        for (path, verbs) in report.paths() {
            if paths.insert(path, verbs.clone()).is_some() {
                tracing::debug!(path, source = label, "path overwritten by later source");
            }
        }
        total += report.total();
        total_covered += report.total_covered();
    }

    AggregateReport {
        sources: sources
            .iter()
            .map(|(label, report)| SourceReport {
                label: (*label).to_string(),
                report: (*report).clone(),
            })
            .collect(),
        paths,
        skipped,
        total,
        total_covered,
    }
}
