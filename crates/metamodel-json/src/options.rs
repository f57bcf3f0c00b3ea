//! Serializer settings.

use metamodel_core::{ConfigError, Error, Result};
use serde::Deserialize;

/// Default key naming the concrete type of a polymorphic value.
pub const TYPE_KEY: &str = "@type";

/// Options shared by [`JsonEncoder`](crate::JsonEncoder) and
/// [`JsonDecoder`](crate::JsonDecoder).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonOptions {
    /// Discriminant key written into polymorphic objects
    pub type_key: String,
    /// Write unset nullables and empty variants as `null` instead of
    /// omitting them
    pub emit_nulls: bool,
    /// Indent the output of [`to_string`](crate::to_string)
    pub pretty: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            type_key: TYPE_KEY.to_string(),
            emit_nulls: true,
            pretty: false,
        }
    }
}

impl JsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_key(mut self, key: impl Into<String>) -> Self {
        self.type_key = key.into();
        self
    }

    pub fn emit_nulls(mut self, emit: bool) -> Self {
        self.emit_nulls = emit;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("invalid JSON options: {}", e),
                source: Some(Box::new(e)),
            })
        })
    }
}
