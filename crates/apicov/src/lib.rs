//! apicov: contract coverage for REST and event APIs
//!
//! Measures how much of a declared API contract a test run exercised, by
//! matching recorded traffic against compiled path templates and counting
//! which (path, verb, discriminator) combinations were observed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ ContractSpec │──►│ pattern      │──►│ Coverage     │
//! │ (OpenAPI,    │   │ compile()    │   │ Report::seed │
//! │  AsyncAPI)   │   └──────────────┘   └──────┬───────┘
//! └──────────────┘                             │ apply()
//! ┌──────────────┐   ┌──────────────┐          ▼
//! │ HAR / event  │──►│ exchange     │──►┌──────────────┐   ┌───────────┐
//! │ logs         │   │ Normalizer   │   │ per-source   │──►│ aggregate │
//! └──────────────┘   └──────────────┘   │ reports      │   │ merge()   │
//!                                       └──────────────┘   └───────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use apicov::{ContractSpec, CoverageReport, NormalizedExchange};
//!
//! let spec = ContractSpec::new().with_operation("/users/{id}", "GET", ["200", "404"]);
//! let mut report = CoverageReport::seed(&spec);
//! let mut skipped = Vec::new();
//! report.apply(
//!     &[NormalizedExchange::new("/users/42", "GET").with_discriminator("200")],
//!     &mut skipped,
//! );
//! assert_eq!(report.coverage().percentage(), Some(50));
//! assert!(skipped.is_empty());
//! ```

#![warn(missing_docs)]

pub mod accumulator;
pub mod aggregate;
pub mod contract;
pub mod exchange;
pub mod har;
pub mod ordered_map;
pub mod pattern;
pub mod render;
mod result;
pub mod source;

pub use accumulator::{ApplyOutcome, CoverageEntry, CoverageReport, SkipReason, SkipRecord};
pub use aggregate::{
    merge, percentage, AggregateReport, Coverage, CoverageBand, SourceReport, Thresholds,
};
pub use contract::{AsyncApiDocument, ContractSpec, OpenApiDocument, IMPLICIT_DISCRIMINATOR};
pub use exchange::{
    normalize, parse_event_log, HostOverlap, HostRewriteTable, HostRule, NormalizedExchange,
    Normalizer, RawExchange,
};
pub use har::Har;
pub use ordered_map::OrderedMap;
pub use pattern::{compile, PathPattern, PatternError};
pub use result::{CoverageError, CoverageResult};
pub use source::{aggregate_outcomes, ContractSource, CoverageSource, SourceOutcome};
