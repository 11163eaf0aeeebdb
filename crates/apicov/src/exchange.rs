//! Exchange normalization.
//!
//! Raw captured traffic is turned into [`NormalizedExchange`] tuples that the
//! accumulator can match against a contract:
//!
//! 1. the query string is stripped from the URL,
//! 2. the first host rule whose prefix starts the URL rewrites it into a path
//!    (entries matching no rule are dropped),
//! 3. the verb is upper-cased,
//! 4. duplicates are removed, keeping the first occurrence.
//!
//! Host rules are tried strictly in order. A broad prefix listed before a more
//! specific one shadows it; [`HostRewriteTable::overlaps`] reports such pairs.

use crate::contract::canonical_verb;
use crate::har::{Har, HarEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A normalized observation, ready to be matched against a contract
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedExchange {
    /// Concrete path (or prefixed channel name)
    pub path: String,
    /// Canonical verb
    pub verb: String,
    /// Optional secondary coverage dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
}

impl NormalizedExchange {
    /// Create an exchange without discriminator; the verb is canonicalized
    #[must_use]
    pub fn new(path: impl Into<String>, verb: &str) -> Self {
        Self {
            path: path.into(),
            verb: canonical_verb(verb),
            discriminator: None,
        }
    }

    /// Attach a discriminator
    #[must_use]
    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }
}

impl fmt::Display for NormalizedExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path)?;
        if let Some(d) = &self.discriminator {
            write!(f, " [{d}]")?;
        }
        Ok(())
    }
}

/// One captured request, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExchange {
    /// HTTP method as recorded
    pub method: String,
    /// Full URL, query string included
    pub url: String,
    /// Response status, if the recorder captured one
    pub status: Option<u16>,
}

impl RawExchange {
    /// Create a raw exchange without status
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status: None,
        }
    }

    /// Attach a response status
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Raw exchanges of every entry in a HAR log
    pub fn from_har(har: &Har) -> impl Iterator<Item = Self> + '_ {
        har.entries().iter().map(Self::from)
    }
}

impl From<&HarEntry> for RawExchange {
    fn from(entry: &HarEntry) -> Self {
        Self {
            method: entry.request.method.clone(),
            url: entry.request.url.clone(),
            status: Some(entry.response.status),
        }
    }
}

/// Host prefix and the path prefix that replaces it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRule {
    /// URL prefix to match
    pub host: String,
    /// Replacement for the matched prefix (empty when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl HostRule {
    /// Strip `host` without replacement
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            replacement: None,
        }
    }

    /// Replace `host` with `replacement`
    #[must_use]
    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    /// Rewrite `url` if it starts with this rule's host
    #[must_use]
    pub fn rewrite(&self, url: &str) -> Option<String> {
        url.strip_prefix(self.host.as_str()).map(|rest| {
            let mut path = self.replacement.clone().unwrap_or_default();
            path.push_str(rest);
            path
        })
    }
}

/// Parses `PREFIX` or `PREFIX=REPLACEMENT`
impl FromStr for HostRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, replacement) = match s.split_once('=') {
            Some((host, replacement)) => (host, Some(replacement)),
            None => (s, None),
        };
        if host.is_empty() {
            return Err(format!("empty host prefix in {s:?}"));
        }
        let rule = Self::new(host);
        Ok(match replacement {
            Some(r) => rule.with_replacement(r),
            None => rule,
        })
    }
}

/// An earlier host rule that captures every URL a later rule would
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOverlap {
    /// Index of the rule that wins
    pub earlier: usize,
    /// Index of the rule that is shadowed
    pub later: usize,
    /// Prefix of the winning rule
    pub earlier_host: String,
    /// Prefix of the shadowed rule
    pub later_host: String,
}

impl fmt::Display for HostOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host rule #{} ({}) is shadowed by earlier rule #{} ({})",
            self.later + 1,
            self.later_host,
            self.earlier + 1,
            self.earlier_host
        )
    }
}

/// Ordered host rewrite rules; the first matching prefix wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostRewriteTable {
    rules: Vec<HostRule>,
}

impl HostRewriteTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    #[must_use]
    pub fn with_rule(mut self, rule: HostRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append a rule in place
    pub fn push(&mut self, rule: HostRule) {
        self.rules.push(rule);
    }

    /// Rules in match order
    #[must_use]
    pub fn rules(&self) -> &[HostRule] {
        &self.rules
    }

    /// Whether the table has no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewrite `url` with the first rule whose prefix it starts with
    #[must_use]
    pub fn rewrite(&self, url: &str) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.rewrite(url))
    }

    /// Every pair where an earlier prefix shadows a later, more specific one.
    ///
    /// The later rule can never win for URLs it matches. Ordering is not
    /// changed; callers decide whether to warn or reject.
    #[must_use]
    pub fn overlaps(&self) -> Vec<HostOverlap> {
        let mut overlaps = Vec::new();
        for (later, later_rule) in self.rules.iter().enumerate() {
            for (earlier, earlier_rule) in self.rules[..later].iter().enumerate() {
                if later_rule.host.starts_with(earlier_rule.host.as_str()) {
                    overlaps.push(HostOverlap {
                        earlier,
                        later,
                        earlier_host: earlier_rule.host.clone(),
                        later_host: later_rule.host.clone(),
                    });
                }
            }
        }
        overlaps
    }
}

impl FromIterator<HostRule> for HostRewriteTable {
    fn from_iter<I: IntoIterator<Item = HostRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Turns raw captured traffic into deduplicated exchanges
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    hosts: HostRewriteTable,
    status_discriminator: bool,
}

impl Normalizer {
    /// Create a normalizer for the given host table
    #[must_use]
    pub fn new(hosts: HostRewriteTable) -> Self {
        Self {
            hosts,
            status_discriminator: false,
        }
    }

    /// Use the response status as the exchange discriminator
    #[must_use]
    pub const fn with_status_discriminator(mut self, enabled: bool) -> Self {
        self.status_discriminator = enabled;
        self
    }

    /// Host table in use
    #[must_use]
    pub fn hosts(&self) -> &HostRewriteTable {
        &self.hosts
    }

    /// Normalize one entry; `None` when no host rule matches
    #[must_use]
    pub fn normalize_one(&self, raw: &RawExchange) -> Option<NormalizedExchange> {
        let url = strip_query(&raw.url);
        let Some(path) = self.hosts.rewrite(url) else {
            tracing::debug!(url = %raw.url, "no host rule matches, dropping entry");
            return None;
        };

        let exchange = NormalizedExchange::new(path, &raw.method);
        let status = raw
            .status
            .filter(|status| self.status_discriminator && *status != 0);
        Some(match status {
            Some(status) => exchange.with_discriminator(status.to_string()),
            None => exchange,
        })
    }

    /// Normalize and deduplicate a sequence of entries.
    ///
    /// Entries from several logs should be chained into one call so that
    /// deduplication is global.
    pub fn normalize<I>(&self, raw: I) -> Vec<NormalizedExchange>
    where
        I: IntoIterator<Item = RawExchange>,
    {
        dedup(raw.into_iter().filter_map(|r| self.normalize_one(&r)))
    }
}

/// Normalize `raw` with `include_hosts` and no discriminator
pub fn normalize<I>(raw: I, include_hosts: &HostRewriteTable) -> Vec<NormalizedExchange>
where
    I: IntoIterator<Item = RawExchange>,
{
    Normalizer::new(include_hosts.clone()).normalize(raw)
}

/// Remove duplicate exchanges, keeping the first occurrence and its position
pub fn dedup<I>(exchanges: I) -> Vec<NormalizedExchange>
where
    I: IntoIterator<Item = NormalizedExchange>,
{
    let mut seen = HashSet::new();
    exchanges
        .into_iter()
        .filter(|exchange| seen.insert(exchange.clone()))
        .collect()
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(head, _)| head)
}

/// One line of an event log
#[derive(Debug, Clone, Deserialize)]
struct EventLine {
    #[serde(alias = "path")]
    channel: String,
    verb: String,
    #[serde(default)]
    discriminator: Option<serde_json::Value>,
}

/// Parse a JSON-lines event log into deduplicated exchanges.
///
/// Every line that looks like a JSON object carries `channel` (or `path`),
/// `verb` and an optional `discriminator`; `channel_prefix` is prepended to
/// the channel. Other lines are ignored and malformed objects are skipped with
/// a warning.
pub fn parse_event_log(text: &str, channel_prefix: &str) -> Vec<NormalizedExchange> {
    let exchanges = text.lines().enumerate().filter_map(|(index, line)| {
        let line = line.trim();
        if !(line.starts_with('{') && line.ends_with('}')) {
            return None;
        }
        match serde_json::from_str::<EventLine>(line) {
            Ok(event) => {
                let exchange =
                    NormalizedExchange::new(format!("{channel_prefix}{}", event.channel), &event.verb);
                Some(match event.discriminator {
                    None | Some(serde_json::Value::Null) => exchange,
                    Some(serde_json::Value::String(d)) => exchange.with_discriminator(d),
                    Some(other) => exchange.with_discriminator(other.to_string()),
                })
            }
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping malformed event log line");
                None
            }
        }
    });
    dedup(exchanges)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::har::{HarRequest, HarResponse};

    fn hosts() -> HostRewriteTable {
        HostRewriteTable::new()
            .with_rule(HostRule::new("https://api.example.com"))
            .with_rule(HostRule::new("https://api.example.com/v2").with_replacement("/v2alpha1"))
    }

    mod host_tests {
        use super::*;

        #[test]
        fn test_first_match_not_longest_match() {
            let table = hosts();
            assert_eq!(
                table.rewrite("https://api.example.com/v2/x").as_deref(),
                Some("/v2/x")
            );
        }

        #[test]
        fn test_specific_rule_first_wins() {
            let table = HostRewriteTable::new()
                .with_rule(HostRule::new("https://api.example.com/v2").with_replacement("/v2alpha1"))
                .with_rule(HostRule::new("https://api.example.com"));
            assert_eq!(
                table.rewrite("https://api.example.com/v2/x").as_deref(),
                Some("/v2alpha1/x")
            );
            assert!(table.overlaps().is_empty());
        }

        #[test]
        fn test_unmatched_host() {
            assert!(hosts().rewrite("https://other.example.com/x").is_none());
        }

        #[test]
        fn test_overlap_detection() {
            let overlaps = hosts().overlaps();
            assert_eq!(overlaps.len(), 1);
            assert_eq!(overlaps[0].earlier, 0);
            assert_eq!(overlaps[0].later, 1);
            assert!(overlaps[0].to_string().contains("shadowed"));
        }

        #[test]
        fn test_overlap_reports_every_pair() {
            let table: HostRewriteTable = ["https://a", "https://a.b", "https://a.b.c"]
                .into_iter()
                .map(HostRule::new)
                .collect();
            let pairs: Vec<_> = table
                .overlaps()
                .iter()
                .map(|o| (o.earlier, o.later))
                .collect();
            assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
        }

        #[test]
        fn test_host_rule_from_str() {
            let rule: HostRule = "https://a.example.com=/v2".parse().unwrap();
            assert_eq!(rule.host, "https://a.example.com");
            assert_eq!(rule.replacement.as_deref(), Some("/v2"));

            let rule: HostRule = "https://a.example.com".parse().unwrap();
            assert!(rule.replacement.is_none());

            assert!("=/v2".parse::<HostRule>().is_err());
        }

        #[test]
        fn test_table_deserializes_from_list() {
            let yaml = "- host: https://a\n- host: https://b\n  replacement: /b\n";
            let table: HostRewriteTable = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(table.rules().len(), 2);
            assert_eq!(table.rewrite("https://b/x").as_deref(), Some("/b/x"));
        }
    }

    mod normalize_tests {
        use super::*;

        #[test]
        fn test_query_string_stripped() {
            let out = normalize(
                [RawExchange::new("get", "https://api.example.com/pets?limit=1&x=?")],
                &hosts(),
            );
            assert_eq!(out, vec![NormalizedExchange::new("/pets", "GET")]);
        }

        #[test]
        fn test_unmatched_entries_dropped() {
            let out = normalize(
                [
                    RawExchange::new("GET", "https://cdn.example.com/app.js"),
                    RawExchange::new("GET", "https://api.example.com/pets"),
                ],
                &hosts(),
            );
            assert_eq!(out.len(), 1);
        }

        #[test]
        fn test_dedup_first_occurrence_wins() {
            let out = normalize(
                [
                    RawExchange::new("GET", "https://api.example.com/b"),
                    RawExchange::new("GET", "https://api.example.com/a"),
                    RawExchange::new("get", "https://api.example.com/b?page=2"),
                ],
                &hosts(),
            );
            let paths: Vec<_> = out.iter().map(|e| e.path.as_str()).collect();
            assert_eq!(paths, vec!["/b", "/a"]);
        }

        #[test]
        fn test_dedup_is_global_across_logs() {
            let mut first = Har::new();
            first.add_entry(HarEntry::new(
                HarRequest::get("https://api.example.com/a"),
                HarResponse::ok(),
            ));
            let second = first.clone();
            let out = Normalizer::new(hosts())
                .normalize(RawExchange::from_har(&first).chain(RawExchange::from_har(&second)));
            assert_eq!(out.len(), 1);
        }

        #[test]
        fn test_status_discriminator() {
            let normalizer = Normalizer::new(hosts()).with_status_discriminator(true);
            let out = normalizer.normalize([
                RawExchange::new("GET", "https://api.example.com/a").with_status(200),
                RawExchange::new("GET", "https://api.example.com/a").with_status(404),
                RawExchange::new("GET", "https://api.example.com/a").with_status(0),
            ]);
            let discs: Vec<_> = out.iter().map(|e| e.discriminator.as_deref()).collect();
            assert_eq!(discs, vec![Some("200"), Some("404"), None]);
        }

        #[test]
        fn test_status_ignored_by_default() {
            let out = normalize(
                [RawExchange::new("GET", "https://api.example.com/a").with_status(200)],
                &hosts(),
            );
            assert!(out[0].discriminator.is_none());
        }

        #[test]
        fn test_empty_input() {
            assert!(normalize(Vec::<RawExchange>::new(), &hosts()).is_empty());
        }
    }

    mod event_log_tests {
        use super::*;

        #[test]
        fn test_parse_event_lines() {
            let log = "{\"channel\":\"orders\",\"verb\":\"publish\",\"discriminator\":\"OrderCreated\"}\r\n\
                       {\"channel\":\"orders\",\"verb\":\"publish\",\"discriminator\":\"OrderCreated\"}\r\n\
                       \r\n\
                       {\"path\":\"/pets\",\"verb\":\"get\",\"discriminator\":200}\r\n";
            let out = parse_event_log(log, "EVENT|");
            assert_eq!(out.len(), 2);
            assert_eq!(
                out[0],
                NormalizedExchange::new("EVENT|orders", "PUBLISH").with_discriminator("OrderCreated")
            );
            assert_eq!(out[1].discriminator.as_deref(), Some("200"));
        }

        #[test]
        fn test_malformed_lines_skipped() {
            let log = "garbage\n{not json}\n{\"channel\":\"c\",\"verb\":\"subscribe\"}\n";
            let out = parse_event_log(log, "");
            assert_eq!(out, vec![NormalizedExchange::new("c", "SUBSCRIBE")]);
        }

        #[test]
        fn test_empty_log() {
            assert!(parse_event_log("", "EVENT|").is_empty());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_normalize_output_has_no_duplicates(
                paths in proptest::collection::vec("/[a-c]{1,2}", 0..30),
                verbs in proptest::collection::vec(prop_oneof!["get", "GET", "post"], 0..30),
            ) {
                let raw: Vec<_> = paths
                    .iter()
                    .zip(verbs.iter())
                    .map(|(p, v)| RawExchange::new(v.clone(), format!("https://api.example.com{p}")))
                    .collect();
                let out = normalize(raw, &hosts());
                let unique: HashSet<_> = out.iter().cloned().collect();
                prop_assert_eq!(unique.len(), out.len());
                for exchange in &out {
                    prop_assert_eq!(exchange.verb.clone(), exchange.verb.to_ascii_uppercase());
                }
            }
        }
    }
}
