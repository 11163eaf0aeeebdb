//! Coverage sources.
//!
//! A source pairs a contract with the exchanges observed against it. REST and
//! event sources differ only in how their inputs were produced, so the
//! aggregator sees them all through [`CoverageSource`].

use crate::accumulator::{CoverageReport, SkipRecord};
use crate::aggregate::{merge, AggregateReport};
use crate::contract::ContractSpec;
use crate::exchange::NormalizedExchange;

/// Something that can produce a labelled coverage report
pub trait CoverageSource {
    /// Label used in aggregate reports
    fn label(&self) -> &str;

    /// Zero-coverage report for this source's contract
    fn seed(&self) -> CoverageReport;

    /// Apply this source's observations to `report`
    fn apply(&self, report: &mut CoverageReport, skipped: &mut Vec<SkipRecord>);

    /// Seed and apply in one step
    fn collect(&self) -> SourceOutcome {
        let mut report = self.seed();
        let mut skipped = Vec::new();
        self.apply(&mut report, &mut skipped);
        tracing::info!(
            source = self.label(),
            total = report.total(),
            covered = report.total_covered(),
            skipped = skipped.len(),
            "collected coverage"
        );
        SourceOutcome {
            label: self.label().to_string(),
            report,
            skipped,
        }
    }
}

/// The result of collecting one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// Source label
    pub label: String,
    /// Filled report
    pub report: CoverageReport,
    /// Observations the contract did not account for
    pub skipped: Vec<SkipRecord>,
}

/// A contract and a fixed list of normalized exchanges
#[derive(Debug, Clone)]
pub struct ContractSource {
    label: String,
    contract: ContractSpec,
    exchanges: Vec<NormalizedExchange>,
}

impl ContractSource {
    /// Source with no observations yet
    #[must_use]
    pub fn new(label: impl Into<String>, contract: ContractSpec) -> Self {
        Self {
            label: label.into(),
            contract,
            exchanges: Vec::new(),
        }
    }

    /// Set the observed exchanges
    #[must_use]
    pub fn with_exchanges(mut self, exchanges: Vec<NormalizedExchange>) -> Self {
        self.exchanges = exchanges;
        self
    }

    /// Contract in use
    #[must_use]
    pub fn contract(&self) -> &ContractSpec {
        &self.contract
    }

    /// Observed exchanges
    #[must_use]
    pub fn exchanges(&self) -> &[NormalizedExchange] {
        &self.exchanges
    }
}

impl CoverageSource for ContractSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn seed(&self) -> CoverageReport {
        CoverageReport::seed(&self.contract)
    }

    fn apply(&self, report: &mut CoverageReport, skipped: &mut Vec<SkipRecord>) {
        report.apply(&self.exchanges, skipped);
    }
}

/// Merge collected outcomes, concatenating their skip lists in order
#[must_use]
pub fn aggregate_outcomes(outcomes: &[SourceOutcome]) -> AggregateReport {
    let reports: Vec<(&str, &CoverageReport)> = outcomes
        .iter()
        .map(|o| (o.label.as_str(), &o.report))
        .collect();
    let skipped = outcomes
        .iter()
        .flat_map(|o| o.skipped.iter().cloned())
        .collect();
    merge(&reports, skipped)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::accumulator::SkipReason;

    fn rest() -> ContractSource {
        ContractSource::new(
            "rest",
            ContractSpec::new()
                .with_operation("/pets", "GET", ["200"])
                .with_operation("/pets/{id}", "DELETE", ["204", "404"]),
        )
        .with_exchanges(vec![
            NormalizedExchange::new("/pets", "GET").with_discriminator("200"),
            NormalizedExchange::new("/pets/3", "DELETE").with_discriminator("204"),
            NormalizedExchange::new("/owners", "GET"),
        ])
    }

    fn events() -> ContractSource {
        ContractSource::new(
            "events",
            ContractSpec::new().with_operation("EVENT|pets", "PUBLISH", ["PetAdded", "PetSold"]),
        )
        .with_exchanges(vec![
            NormalizedExchange::new("EVENT|pets", "publish").with_discriminator("PetAdded")
        ])
    }

    #[test]
    fn test_collect() {
        let outcome = rest().collect();
        assert_eq!(outcome.label, "rest");
        assert_eq!(outcome.report.total(), 3);
        assert_eq!(outcome.report.total_covered(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].reason, SkipReason::PathNotFound);
    }

    #[test]
    fn test_aggregate_mixed_sources() {
        let sources: Vec<Box<dyn CoverageSource>> = vec![Box::new(rest()), Box::new(events())];
        let outcomes: Vec<_> = sources.iter().map(|s| s.collect()).collect();
        let merged = aggregate_outcomes(&outcomes);
        assert_eq!(merged.total, 5);
        assert_eq!(merged.total_covered, 3);
        assert_eq!(merged.percentage(), Some(60));
        assert_eq!(merged.skipped.len(), 1);
        let labels: Vec<_> = merged.sources.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["rest", "events"]);
    }

    #[test]
    fn test_source_without_exchanges() {
        let contract = ContractSpec::new().with_operation("/a", "GET", Vec::<String>::new());
        let outcome = ContractSource::new("empty", contract).collect();
        assert_eq!(outcome.report.total_covered(), 0);
        assert!(outcome.skipped.is_empty());
    }
}
