//! AsyncAPI 2.x adapter.
//!
//! Each channel becomes the path `EVENT|<channel>`, its `publish` and
//! `subscribe` operations become verbs, and the discriminators are the values
//! a message payload may carry in one of [`DISCRIMINATOR_FIELDS`], taken from
//! that property's `const` or `enum`.
//!
//! Local references (`$ref: '#/components/...'`) are resolved against the
//! document; remote references are not.

use super::ContractSpec;
use crate::ordered_map::OrderedMap;
use crate::result::{CoverageError, CoverageResult};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Prefix that namespaces event channels away from REST paths
pub const EVENT_CHANNEL_PREFIX: &str = "EVENT|";

/// Payload properties whose values discriminate messages
pub const DISCRIMINATOR_FIELDS: [&str; 2] = ["name", "eventName"];

/// Operations read from every channel, in this order
const OPERATIONS: [&str; 2] = ["publish", "subscribe"];

/// Reference chains longer than this are treated as cycles
const MAX_REF_DEPTH: usize = 32;

/// The subset of an AsyncAPI document the adapter needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AsyncApiDocument {
    /// Channel name to channel item
    #[serde(default)]
    pub channels: OrderedMap<Map<String, Value>>,
    /// Reusable components, target of local `$ref`s
    #[serde(default)]
    pub components: Value,
}

impl AsyncApiDocument {
    /// Parse a JSON document
    pub fn from_json(json: &str) -> CoverageResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Adapt the document into a contract tree
    pub fn to_contract(&self) -> CoverageResult<ContractSpec> {
        let resolver = RefResolver::new(&self.components);
        let mut spec = ContractSpec::new();

        for (channel, item) in self.channels.iter() {
            let path = format!("{EVENT_CHANNEL_PREFIX}{channel}");
            spec.add_path(&path);
            for operation in OPERATIONS {
                let Some(op) = item.get(operation) else {
                    continue;
                };
                let location = format!("channels/{channel}/{operation}");
                let values = operation_discriminators(&resolver, op, &location)?;
                spec.add_operation(&path, operation, values);
            }
        }

        tracing::debug!(
            channels = spec.path_count(),
            operations = spec.operation_count(),
            "adapted AsyncAPI document"
        );
        Ok(spec)
    }
}

/// Resolves `#/components/...` references
struct RefResolver {
    root: Value,
}

impl RefResolver {
    fn new(components: &Value) -> Self {
        let mut root = Map::new();
        let _ = root.insert("components".to_string(), components.clone());
        Self {
            root: Value::Object(root),
        }
    }

    /// Follow `$ref` until a concrete node is reached
    fn resolve<'a>(&'a self, mut node: &'a Value, location: &str) -> CoverageResult<&'a Value> {
        for _ in 0..MAX_REF_DEPTH {
            let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
                return Ok(node);
            };
            let pointer = reference.strip_prefix('#').ok_or_else(|| {
                CoverageError::contract(location, format!("unsupported reference {reference}"))
            })?;
            node = self.root.pointer(pointer).ok_or_else(|| {
                CoverageError::contract(location, format!("unresolved reference {reference}"))
            })?;
        }
        Err(CoverageError::contract(location, "reference cycle"))
    }
}

fn operation_discriminators(
    resolver: &RefResolver,
    operation: &Value,
    location: &str,
) -> CoverageResult<Vec<String>> {
    let operation = resolver.resolve(operation, location)?;
    let Some(message) = operation.get("message") else {
        return Ok(Vec::new());
    };
    let message = resolver.resolve(message, location)?;

    let messages: Vec<&Value> = match message.get("oneOf").and_then(Value::as_array) {
        Some(alternatives) => alternatives.iter().collect(),
        None => vec![message],
    };

    let mut values = Vec::new();
    for (index, message) in messages.into_iter().enumerate() {
        let location = format!("{location}/message/{index}");
        let message = resolver.resolve(message, &location)?;
        let Some(payload) = message.get("payload") else {
            continue;
        };
        let payload = resolver.resolve(payload, &location)?;
        for (field, schema) in payload_properties(resolver, payload, &location)? {
            if !DISCRIMINATOR_FIELDS.contains(&field.as_str()) {
                continue;
            }
            let location = format!("{location}/payload/properties/{field}");
            let schema = resolver.resolve(schema, &location)?;
            values.extend(discriminator_values(schema, &location)?);
        }
    }
    Ok(values)
}

/// Payload properties, merged from `allOf` members when the payload has none
fn payload_properties<'a>(
    resolver: &'a RefResolver,
    payload: &'a Value,
    location: &str,
) -> CoverageResult<Vec<(String, &'a Value)>> {
    if let Some(properties) = payload.get("properties").and_then(Value::as_object) {
        if !properties.is_empty() {
            return Ok(properties.iter().map(|(k, v)| (k.clone(), v)).collect());
        }
    }

    let mut merged: Vec<(String, &Value)> = Vec::new();
    let members = payload
        .get("allOf")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for member in members {
        let member = resolver.resolve(member, location)?;
        let Some(properties) = member.get("properties").and_then(Value::as_object) else {
            continue;
        };
        for (key, schema) in properties {
            match merged.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = schema,
                None => merged.push((key.clone(), schema)),
            }
        }
    }
    Ok(merged)
}

fn discriminator_values(schema: &Value, location: &str) -> CoverageResult<Vec<String>> {
    if let Some(value) = schema.get("const") {
        return Ok(vec![value_to_string(value)]);
    }
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        return Ok(values.iter().map(value_to_string).collect());
    }
    Err(CoverageError::contract(
        location,
        "Discriminator value not found",
    ))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
