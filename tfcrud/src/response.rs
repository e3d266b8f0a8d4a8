//! Translation of HTTP responses back into resource state

use crate::error::MappingError;
use crate::request::Operation;
use crate::schema::{AttributeSpec, AttributeType, ResourceSchema};
use crate::state::ResourceState;
use crate::types::{AttributePath, Dynamic};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Raw 2xx answer from a backend
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Merge `response` into a new state for `schema`
///
/// `fallback` is what the controller already knows: the submitted
/// attributes on Create and Update, the last known state on Read. The
/// server's value wins for every attribute it returns. Attributes it leaves
/// out keep their fallback value, which is how sensitive inputs survive APIs
/// that never echo them.
pub fn apply(
    schema: &ResourceSchema,
    operation: Operation,
    response: &ApiResponse,
    fallback: &ResourceState,
) -> Result<ResourceState, MappingError> {
    if response.body.trim().is_empty() {
        // 204 on update: the server accepted exactly what was sent
        if operation == Operation::Update && fallback.is_created() {
            return Ok(fallback.clone());
        }
        return Err(MappingError::InvalidJson("empty response body".to_string()));
    }

    let parsed: Value = serde_json::from_str(&response.body)
        .map_err(|e| MappingError::InvalidJson(e.to_string()))?;
    let object = unwrap_envelope(schema, &parsed)?;

    let id = match extract_id(&object, &schema.endpoint.id_path) {
        Some(id) => id,
        None if operation == Operation::Update => fallback.id.clone().ok_or_else(|| {
            MappingError::MissingId(schema.endpoint.id_path_display())
        })?,
        None => return Err(MappingError::MissingId(schema.endpoint.id_path_display())),
    };

    let mut values = HashMap::with_capacity(schema.attributes.len());
    for spec in &schema.attributes {
        let value = match object.get(spec.wire_name()) {
            Some(Value::Null) if spec.sensitive => fallback.get(&spec.name).clone(),
            Some(json) => from_json(&spec.r#type, json, &spec.path())?,
            None => fallback_value(spec, fallback),
        };
        values.insert(spec.name.clone(), value);
    }

    Ok(ResourceState {
        id: Some(id),
        values,
    })
}

fn fallback_value(spec: &AttributeSpec, fallback: &ResourceState) -> Dynamic {
    match fallback.get(&spec.name) {
        // planned computed values are placeholders, never state
        Dynamic::Unknown => Dynamic::Null,
        value => value.clone(),
    }
}

fn unwrap_envelope<'a>(
    schema: &ResourceSchema,
    parsed: &'a Value,
) -> Result<&'a Map<String, Value>, MappingError> {
    let inner = match &schema.endpoint.envelope {
        Some(key) => parsed
            .get(key)
            .ok_or_else(|| MappingError::MissingEnvelope(key.clone()))?,
        None => parsed,
    };
    inner.as_object().ok_or_else(|| {
        MappingError::MissingEnvelope(
            schema
                .endpoint
                .envelope
                .clone()
                .unwrap_or_else(|| "<root>".to_string()),
        )
    })
}

fn extract_id(object: &Map<String, Value>, id_path: &[String]) -> Option<String> {
    let (first, rest) = id_path.split_first()?;
    let mut current = object.get(first)?;
    for segment in rest {
        current = current.get(segment)?;
    }
    match current {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert one JSON value, guided by its declared type
pub(crate) fn from_json(
    kind: &AttributeType,
    value: &Value,
    path: &AttributePath,
) -> Result<Dynamic, MappingError> {
    match (kind, value) {
        (_, Value::Null) => Ok(Dynamic::Null),
        (AttributeType::String, Value::String(s)) => Ok(Dynamic::String(s.clone())),
        (AttributeType::Int, Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .map(Dynamic::Int)
            .ok_or_else(|| mismatch(kind, "non-integer number", path)),
        (AttributeType::Bool, Value::Bool(b)) => Ok(Dynamic::Bool(*b)),
        (AttributeType::List(element), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| from_json(element, item, &path.clone().index(idx as i64)))
            .collect::<Result<Vec<_>, _>>()
            .map(Dynamic::List),
        (AttributeType::Map(element), Value::Object(entries)) => {
            let mut map = HashMap::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key.clone(), from_json(element, item, &path.clone().key(key))?);
            }
            Ok(Dynamic::Map(map))
        }
        (kind, other) => Err(mismatch(kind, json_type_name(other), path)),
    }
}

fn mismatch(kind: &AttributeType, actual: &str, path: &AttributePath) -> MappingError {
    MappingError::TypeMismatch {
        attribute: path.clone(),
        expected: kind.to_string(),
        actual: actual.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
