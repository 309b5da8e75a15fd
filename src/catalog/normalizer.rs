//! Source record normalization

use super::{CanonicalProduct, DatasetSchema};
use crate::error::{ProdexError, Result};
use serde_json::Value;

/// Positional fallback id for records whose id-equivalent is absent
pub fn fallback_id(dataset: &str, ordinal: usize) -> String {
    format!("{}_{}", dataset, ordinal)
}

/// Map one source record onto the canonical product shape.
///
/// Missing optional fields default to the empty string. A missing
/// id-equivalent is recovered with the positional fallback id so the
/// record is preserved; only a record that is not an object at all is
/// rejected as [`ProdexError::MalformedRecord`].
pub fn normalize(
    dataset: &str,
    ordinal: usize,
    record: &Value,
    schema: &DatasetSchema,
) -> Result<CanonicalProduct> {
    let obj = record
        .as_object()
        .ok_or_else(|| ProdexError::MalformedRecord {
            dataset: dataset.to_string(),
            ordinal,
            reason: format!("expected a JSON object, got {}", json_kind(record)),
        })?;

    let id = match obj.get(&schema.id) {
        Some(value) => scalar_to_string(value).unwrap_or_else(|| fallback_id(dataset, ordinal)),
        None => fallback_id(dataset, ordinal),
    };

    Ok(CanonicalProduct {
        id,
        name: text_field(obj, &schema.name),
        brand: text_field(obj, &schema.brand),
        description: text_field(obj, &schema.description),
        categories: text_field(obj, &schema.categories),
        params_text: text_field(obj, &schema.params),
        picture: schema
            .picture
            .as_ref()
            .and_then(|key| obj.get(key))
            .and_then(scalar_to_string),
    })
}

/// Extract a text field, defaulting to the empty string.
///
/// `categories` arrives as either a string or an array of strings
/// depending on the source; arrays are joined with single spaces.
fn text_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(" "),
        Some(value) => scalar_to_string(value).unwrap_or_default(),
        None => String::new(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
