//! Helpers for reading vendor response bodies.

use serde_json::Value as JsonValue;

/// Maximum number of characters of a raw vendor body carried in error details.
pub const DETAILS_LIMIT: usize = 500;

/// A vendor body that is not valid JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedBody {
    pub reason: String,
    /// Leading part of the raw body, at most `DETAILS_LIMIT` characters.
    pub excerpt: String,
}

/// First `limit` characters of `s` (character-, not byte-based).
pub fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

/// Parse a response body read as text.
pub fn parse_body(body: &str) -> Result<JsonValue, MalformedBody> {
    serde_json::from_str(body).map_err(|e| MalformedBody {
        reason: e.to_string(),
        excerpt: truncate_chars(body, DETAILS_LIMIT),
    })
}

/// View a value as an ordered sequence.
///
/// Arrays are returned as-is. Objects whose keys are exactly `"0"`, `"1"`, ...
/// `"n-1"` are returned in index order; some vendors encode lists this way.
/// Anything else is `None`.
pub fn as_sequence(value: &JsonValue) -> Option<Vec<&JsonValue>> {
    match value {
        JsonValue::Array(items) => Some(items.iter().collect()),
        JsonValue::Object(map) => {
            let mut indexed: Vec<(usize, &JsonValue)> = Vec::with_capacity(map.len());
            for (key, item) in map {
                let idx: usize = key.parse().ok()?;
                if idx.to_string() != *key {
                    return None;
                }
                indexed.push((idx, item));
            }
            indexed.sort_by_key(|(idx, _)| *idx);
            if indexed.iter().enumerate().any(|(pos, (idx, _))| pos != *idx) {
                return None;
            }
            Some(indexed.into_iter().map(|(_, item)| item).collect())
        }
        _ => None,
    }
}

/// First element of a sequence-like value (see `as_sequence`).
pub fn first_element(value: &JsonValue) -> Option<&JsonValue> {
    as_sequence(value)?.into_iter().next()
}

/// Copy of an object without the named keys. Non-objects are returned unchanged.
pub fn without_keys(value: &JsonValue, keys: &[&str]) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// String form of a scalar field: vendors send ids both as numbers and strings.
pub fn scalar_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
