//! Contract trees.
//!
//! A [`ContractSpec`] is the normalized form of every supported contract
//! document: an ordered mapping of path template to verb to the set of
//! discriminator values declared for that operation.
//!
//! ```text
//! /users/{id}          GET    {200, 404}
//!                      DELETE {}            -> implicit "*"
//! EVENT|orders         PUBLISH {OrderCreated, OrderCancelled}
//! ```
//!
//! Adapters for parsed OpenAPI and AsyncAPI documents live in [`openapi`] and
//! [`asyncapi`]; the tree form deserializes directly from JSON or YAML.

pub mod asyncapi;
pub mod openapi;

pub use asyncapi::{AsyncApiDocument, DISCRIMINATOR_FIELDS, EVENT_CHANNEL_PREFIX};
pub use openapi::OpenApiDocument;

use crate::ordered_map::OrderedMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

/// Discriminator used for operations that declare none
pub const IMPLICIT_DISCRIMINATOR: &str = "*";

/// Verbs that accept any observed method for their path
pub const ANY_VERBS: [&str; 2] = ["X-AMAZON-APIGATEWAY-ANY-METHOD", "ANY"];

/// Canonical (upper-case) spelling of a verb
#[must_use]
pub fn canonical_verb(verb: &str) -> String {
    verb.to_ascii_uppercase()
}

/// Whether a canonical verb is a wildcard verb
#[must_use]
pub fn is_any_verb(verb: &str) -> bool {
    ANY_VERBS.contains(&verb)
}

/// Discriminator sets keyed by canonical verb
pub type VerbMap = OrderedMap<BTreeSet<String>>;

/// Serialized form of a contract tree
type ContractTree = OrderedMap<OrderedMap<BTreeSet<String>>>;

/// Declared paths, verbs and discriminators of one contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ContractTree")]
pub struct ContractSpec {
    paths: OrderedMap<VerbMap>,
}

impl ContractSpec {
    /// Create an empty contract
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`add_operation`](Self::add_operation)
    #[must_use]
    pub fn with_operation<I, D>(mut self, path: &str, verb: &str, discriminators: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        self.add_operation(path, verb, discriminators);
        self
    }

    /// Declare an operation.
    ///
    /// The verb is canonicalized; declaring the same (path, verb) twice unions
    /// the discriminator sets. An empty set means the implicit discriminator.
    pub fn add_operation<I, D>(&mut self, path: &str, verb: &str, discriminators: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        if !self.paths.contains_key(path) {
            let _ = self.paths.insert(path, VerbMap::new());
        }
        let Some(verbs) = self.paths.get_mut(path) else {
            return;
        };

        let verb = canonical_verb(verb);
        let incoming: BTreeSet<String> = discriminators.into_iter().map(Into::into).collect();
        match verbs.get_mut(&verb) {
            Some(existing) => existing.extend(incoming),
            None => {
                let _ = verbs.insert(verb, incoming);
            }
        }
    }

    /// Declare a path with no verbs yet
    pub fn add_path(&mut self, path: &str) {
        if !self.paths.contains_key(path) {
            let _ = self.paths.insert(path, VerbMap::new());
        }
    }

    /// Paths and their verbs, in declaration order
    pub fn paths(&self) -> impl Iterator<Item = (&str, &VerbMap)> {
        self.paths.iter()
    }

    /// Verbs declared for `path`
    #[must_use]
    pub fn verbs(&self, path: &str) -> Option<&VerbMap> {
        self.paths.get(path)
    }

    /// Number of declared path templates
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Number of declared (path, verb) pairs
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(OrderedMap::len).sum()
    }

    /// Whether no path is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl From<ContractTree> for ContractSpec {
    fn from(tree: ContractTree) -> Self {
        let mut spec = Self::new();
        for (path, verbs) in tree.iter() {
            spec.add_path(path);
            for (verb, discriminators) in verbs.iter() {
                spec.add_operation(path, verb, discriminators.iter().cloned());
            }
        }
        spec
    }
}

impl Serialize for ContractSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.paths.serialize(serializer)
    }
}
