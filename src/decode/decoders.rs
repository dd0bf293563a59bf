//! Decoder implementations

use super::types::Decoder;
use crate::error::{Error, Result};
use crate::http::RawPage;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder into any `DeserializeOwned` type
///
/// An optional dot path (`"data.items"`) selects a nested value before
/// deserialization, for endpoints that wrap their listing in an envelope.
pub struct JsonDecoder<T> {
    /// Path to the value to deserialize
    record_path: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    /// Create a decoder for the whole body
    pub fn new() -> Self {
        Self {
            record_path: None,
            _marker: PhantomData,
        }
    }

    /// Create a decoder for the value at `path`
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self {
            record_path: self.record_path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("record_path", &self.record_path)
            .finish()
    }
}

impl<T: DeserializeOwned> Decoder<T> for JsonDecoder<T> {
    fn decode(&self, page: &RawPage) -> Result<T> {
        match &self.record_path {
            None => serde_json::from_slice(&page.body).map_err(|e| Error::Decode {
                message: format!("Failed to parse JSON: {e}"),
            }),
            Some(path) => {
                let value: Value = serde_json::from_slice(&page.body).map_err(|e| {
                    Error::Decode {
                        message: format!("Failed to parse JSON: {e}"),
                    }
                })?;
                let selected = extract_simple_path(&value, path).ok_or_else(|| {
                    Error::decode(format!("Path '{path}' not found in response"))
                })?;
                serde_json::from_value(selected).map_err(|e| Error::Decode {
                    message: format!("Failed to deserialize '{path}': {e}"),
                })
            }
        }
    }
}

/// Untyped JSON decoder
pub type ValueDecoder = JsonDecoder<Value>;

// ============================================================================
// Callback Decoder
// ============================================================================

/// Decoder backed by a caller-supplied function
///
/// Used when a body needs custom handling, e.g. schema validation before
/// it is accepted.
pub struct FnDecoder<F> {
    decode: F,
}

impl<F> FnDecoder<F> {
    /// Wrap a decoding function
    pub fn new(decode: F) -> Self {
        Self { decode }
    }
}

impl<F> fmt::Debug for FnDecoder<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDecoder").finish_non_exhaustive()
    }
}

impl<T, F> Decoder<T> for FnDecoder<F>
where
    F: Fn(&RawPage) -> Result<T> + Send + Sync,
{
    fn decode(&self, page: &RawPage) -> Result<T> {
        (self.decode)(page)
    }
}

// ============================================================================
// Path Helpers
// ============================================================================

/// Extract a value using dot notation with optional array indexing
fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value.clone());
    }

    let mut current = value;
    for part in path.split('.') {
        // "items[0]" or "items[-1]"
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index = index_str.parse::<i64>().ok()?;
            let Value::Array(arr) = current else {
                return None;
            };
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                arr.len() as i64 + index
            } else {
                index
            };
            current = arr.get(usize::try_from(idx).ok()?)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}
