//! OpenAPI (Swagger 2 / OpenAPI 3) adapter.
//!
//! Only `paths` is read. Each HTTP method under a path becomes a verb whose
//! discriminators are the declared response codes. `options` operations are
//! skipped (CORS preflight is never part of a test plan), as are path-level
//! keys that are not methods (`parameters`, `summary`, `servers`, ...).

use super::ContractSpec;
use crate::ordered_map::OrderedMap;
use crate::result::{CoverageError, CoverageResult};
use serde::de::IgnoredAny;
use serde::Deserialize;

/// Path-item keys that are operations
const OPERATION_KEYS: [&str; 8] = [
    "get",
    "put",
    "post",
    "delete",
    "head",
    "patch",
    "trace",
    "x-amazon-apigateway-any-method",
];

/// The subset of an OpenAPI document the adapter needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiDocument {
    /// Path templates to path items
    #[serde(default)]
    pub paths: OrderedMap<OrderedMap<PathItemField>>,
}

/// A value under a path item
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathItemField {
    /// Something shaped like an operation
    Operation(Operation),
    /// Anything else (`parameters` arrays, `summary` strings, ...)
    Other(IgnoredAny),
}

/// An operation; only its response codes matter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    /// Response code to response object
    #[serde(default)]
    pub responses: OrderedMap<IgnoredAny>,
}

impl OpenApiDocument {
    /// Parse a JSON document
    pub fn from_json(json: &str) -> CoverageResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Adapt the document into a contract tree, response codes as
    /// discriminators
    pub fn to_contract(&self) -> CoverageResult<ContractSpec> {
        self.adapt(true)
    }

    /// Adapt the document ignoring response codes, so every operation is
    /// covered by a single observation of its verb
    pub fn to_operation_contract(&self) -> CoverageResult<ContractSpec> {
        self.adapt(false)
    }

    fn adapt(&self, response_codes: bool) -> CoverageResult<ContractSpec> {
        let mut spec = ContractSpec::new();
        for (path, item) in self.paths.iter() {
            spec.add_path(path);
            for (key, field) in item.iter() {
                let method = key.to_ascii_lowercase();
                if !OPERATION_KEYS.contains(&method.as_str()) {
                    continue;
                }
                match field {
                    PathItemField::Operation(operation) if response_codes => {
                        spec.add_operation(path, &method, operation.responses.keys());
                    }
                    PathItemField::Operation(_) => {
                        spec.add_operation(path, &method, std::iter::empty::<String>());
                    }
                    PathItemField::Other(_) => {
                        return Err(CoverageError::contract(
                            format!("paths/{path}/{key}"),
                            "operation is not an object",
                        ));
                    }
                }
            }
        }
        tracing::debug!(
            paths = spec.path_count(),
            operations = spec.operation_count(),
            "adapted OpenAPI document"
        );
        Ok(spec)
    }
}
