//! JSON serialization of metamodel objects.
//!
//! Encoding and decoding walk the registered metadata, so any registered
//! object can be written and read without per-type code:
//!
//! ```ignore
//! let text = metamodel_json::to_string(&registry, &person)?;
//! let back: Person = metamodel_json::from_str(&registry, &text)?;
//! ```
//!
//! Objects map to JSON objects keyed by field name. Enums are written by
//! name, date-times as `YYYY-MM-DD HH:MM:SS`, and polymorphic values carry
//! an `@type` key naming their registered type.

pub mod decoder;
pub mod encoder;
pub mod options;
pub mod resolver;

#[cfg(test)]
mod fixtures;

pub use decoder::JsonDecoder;
pub use encoder::JsonEncoder;
pub use options::{JsonOptions, TYPE_KEY};
pub use resolver::TypeMap;

use metamodel_core::{DataErrorKind, Error, FieldType, Object, Registry, Result, TypeResolver};
use serde_json::Value as JsonValue;

/// Malformed or unrepresentable JSON text.
pub(crate) fn format_error(err: &serde_json::Error) -> Error {
    Error::data(DataErrorKind::FormatError, err.to_string())
}

fn parse(text: &str) -> Result<JsonValue> {
    serde_json::from_str(text).map_err(|e| format_error(&e))
}

pub fn to_value(registry: &Registry, object: &dyn Object) -> Result<JsonValue> {
    to_value_with(registry, object, &JsonOptions::default())
}

pub fn to_value_with(
    registry: &Registry,
    object: &dyn Object,
    options: &JsonOptions,
) -> Result<JsonValue> {
    let json = JsonEncoder::new(registry, options).encode(object)?;
    tracing::trace!(type_key = %options.type_key, "Encoded object");
    Ok(json)
}

pub fn to_string(registry: &Registry, object: &dyn Object) -> Result<String> {
    to_string_with(registry, object, &JsonOptions::default())
}

pub fn to_string_with(
    registry: &Registry,
    object: &dyn Object,
    options: &JsonOptions,
) -> Result<String> {
    let json = to_value_with(registry, object, options)?;
    let text = if options.pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    text.map_err(|e| format_error(&e))
}

/// Decode `json` into an existing object; fields absent from `json` are
/// resolved by their mandatoriness.
pub fn decode_into(
    registry: &Registry,
    resolver: &dyn TypeResolver,
    options: &JsonOptions,
    json: &JsonValue,
    object: &mut dyn Object,
) -> Result<()> {
    let source = json
        .as_object()
        .ok_or_else(|| decoder::kind_mismatch(FieldType::Object, json))?;
    JsonDecoder::new(registry, options, source)
        .resolver(resolver)
        .decode(object)
        .inspect_err(|e| tracing::debug!(error = %e, "JSON decode failed"))
}

pub fn from_value<T: Object + Default>(registry: &Registry, json: &JsonValue) -> Result<T> {
    from_value_with(registry, registry, &JsonOptions::default(), json)
}

pub fn from_value_with<T: Object + Default>(
    registry: &Registry,
    resolver: &dyn TypeResolver,
    options: &JsonOptions,
    json: &JsonValue,
) -> Result<T> {
    let mut object = T::default();
    decode_into(registry, resolver, options, json, &mut object)?;
    Ok(object)
}

pub fn from_str<T: Object + Default>(registry: &Registry, text: &str) -> Result<T> {
    from_value(registry, &parse(text)?)
}

pub fn from_str_with<T: Object + Default>(
    registry: &Registry,
    resolver: &dyn TypeResolver,
    options: &JsonOptions,
    text: &str,
) -> Result<T> {
    from_value_with(registry, resolver, options, &parse(text)?)
}
