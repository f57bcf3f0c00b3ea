//! Decoding JSON trees into objects.

use crate::encoder::Slot;
use crate::options::JsonOptions;
use metamodel_core::{
    DataErrorKind, DateTime, Error, FieldType, FieldVisitor, MetaField, Object, Registry, Result,
    TypeResolver, UsageErrorKind, Value, enum_from_string,
};
use serde_json::{Map, Value as JsonValue};

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

pub(crate) fn kind_mismatch(expected: FieldType, json: &JsonValue) -> Error {
    Error::data(
        DataErrorKind::TypeMismatch(expected),
        format!("expected {}, found JSON {}", expected, json_kind(json)),
    )
}

fn integer(json: &JsonValue, target: FieldType) -> Result<Value> {
    let value = if let Some(n) = json.as_i64() {
        Value::Int64(n)
    } else if let Some(n) = json.as_u64() {
        Value::Uint64(n)
    } else {
        return Err(kind_mismatch(target, json));
    };
    value.coerce_integer(target)
}

/// [`FieldVisitor`] filling an object from one JSON map.
///
/// Keys are matched to field names exactly. A field without a key is
/// resolved by its mandatoriness; a failing field aborts the walk and
/// leaves the fields decoded before it assigned.
pub struct JsonDecoder<'a> {
    registry: &'a Registry,
    resolver: &'a dyn TypeResolver,
    options: &'a JsonOptions,
    source: &'a Map<String, JsonValue>,
}

impl<'a> JsonDecoder<'a> {
    /// Decoder resolving polymorphic values through `registry` itself.
    pub fn new(
        registry: &'a Registry,
        options: &'a JsonOptions,
        source: &'a Map<String, JsonValue>,
    ) -> Self {
        Self {
            registry,
            resolver: registry,
            options,
            source,
        }
    }

    /// Resolve polymorphic values through `resolver` instead.
    pub fn resolver(mut self, resolver: &'a dyn TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Decode the source into `object` with the metadata of its dynamic type.
    pub fn decode(&mut self, object: &mut dyn Object) -> Result<()> {
        let registry = self.registry;
        let meta = registry.meta_for(object)?;
        meta.visit(object, self)
    }

    fn decode_object(&self, json: &JsonValue, mut target: Box<dyn Object>) -> Result<Box<dyn Object>> {
        let source = json
            .as_object()
            .ok_or_else(|| kind_mismatch(FieldType::Object, json))?;
        let meta = self.registry.meta_for(target.as_ref())?;
        let mut nested = JsonDecoder {
            registry: self.registry,
            resolver: self.resolver,
            options: self.options,
            source,
        };
        meta.visit(target.as_mut(), &mut nested)?;
        Ok(target)
    }

    fn instance_of(&self, slot: Slot) -> Result<Box<dyn Object>> {
        slot.object_type
            .and_then(|key| self.registry.meta_by_type(key))
            .map(|meta| meta.create_instance())
            .ok_or_else(|| {
                Error::usage(
                    UsageErrorKind::UnregisteredType,
                    "nested object type is not registered",
                )
            })
    }

    /// Decode `json` for `slot`. `current` is the value already held by an
    /// object field, which is decoded in place.
    #[allow(clippy::cast_possible_truncation)]
    fn decode_value(&self, json: &JsonValue, slot: Slot, current: Option<Value>) -> Result<Value> {
        if json.is_null() {
            return match slot.field_type {
                _ if slot.nullable => Ok(Value::Null),
                FieldType::Array => Ok(Value::Array(Vec::new())),
                FieldType::Variant => Ok(Value::Null),
                FieldType::DateTime => Ok(Value::DateTime(DateTime::default())),
                other => Err(kind_mismatch(other, json)),
            };
        }

        match slot.field_type {
            FieldType::Bool => json
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| kind_mismatch(FieldType::Bool, json)),
            FieldType::Int32 | FieldType::Uint32 | FieldType::Int64 | FieldType::Uint64 => {
                integer(json, slot.field_type)
            }
            FieldType::Float => json
                .as_f64()
                .map(|f| Value::Float(f as f32))
                .ok_or_else(|| kind_mismatch(FieldType::Float, json)),
            FieldType::Double => json
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| kind_mismatch(FieldType::Double, json)),
            FieldType::String => json
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| kind_mismatch(FieldType::String, json)),
            FieldType::Enum => self.enumeration(json, slot),
            FieldType::DateTime => {
                let text = json
                    .as_str()
                    .ok_or_else(|| kind_mismatch(FieldType::DateTime, json))?;
                DateTime::parse(text).map(Value::DateTime)
            }
            FieldType::Object => {
                let target = match current {
                    Some(Value::Object(object)) => object,
                    _ => self.instance_of(slot)?,
                };
                self.decode_object(json, target).map(Value::Object)
            }
            FieldType::Array => {
                let element = slot.element()?;
                let items = json
                    .as_array()
                    .ok_or_else(|| kind_mismatch(FieldType::Array, json))?;
                items
                    .iter()
                    .map(|item| self.decode_value(item, element, None))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            FieldType::Variant => self.variant(json),
        }
    }

    fn enumeration(&self, json: &JsonValue, slot: Slot) -> Result<Value> {
        let Some(descriptor) = slot.descriptor else {
            return integer(json, FieldType::Enum);
        };
        match json {
            JsonValue::String(name) => enum_from_string(descriptor, name).map(Value::Enum),
            JsonValue::Number(_) => {
                let bits = json
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| kind_mismatch(FieldType::Enum, json))?;
                descriptor.check(bits).map(Value::Enum)
            }
            _ => Err(kind_mismatch(FieldType::Enum, json)),
        }
    }

    fn variant(&self, json: &JsonValue) -> Result<Value> {
        let source = json
            .as_object()
            .ok_or_else(|| kind_mismatch(FieldType::Variant, json))?;
        let key = &self.options.type_key;
        let Some(name) = source.get(key).and_then(JsonValue::as_str) else {
            return Err(Error::data(
                DataErrorKind::UnknownType(String::new()),
                format!("polymorphic value has no '{}' key", key),
            ));
        };
        let instance = self.resolver.create_instance(name).ok_or_else(|| {
            Error::data(
                DataErrorKind::UnknownType(name.to_string()),
                format!("type '{}' cannot be resolved", name),
            )
        })?;
        self.decode_object(json, instance).map(Value::Object)
    }
}

impl FieldVisitor for JsonDecoder<'_> {
    fn visit_field(&mut self, object: &mut dyn Object, field: &MetaField) -> Result<()> {
        let Some(json) = self.source.get(field.name()) else {
            return field.resolve_absent(object);
        };
        let current = if field.field_type() == FieldType::Object {
            Some(field.get(object)?)
        } else {
            None
        };
        let value = self
            .decode_value(json, Slot::of_field(field), current)
            .map_err(|e| e.in_field(field.name()))?;
        field.set(object, value)
    }
}

impl std::fmt::Debug for JsonDecoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("options", &self.options)
            .field("keys", &self.source.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Access, Circle, Color, Drawing, Point, Square, registry, sample};
    use crate::{JsonEncoder, TypeMap};
    use metamodel_core::{Month, Nullable, Variant};
    use serde_json::json;

    fn decode_with(
        json: &JsonValue,
        options: &JsonOptions,
        resolver: Option<&dyn TypeResolver>,
        target: &mut Drawing,
    ) -> Result<()> {
        let registry = registry();
        let source = json.as_object().unwrap();
        let mut decoder = JsonDecoder::new(&registry, options, source);
        if let Some(resolver) = resolver {
            decoder = decoder.resolver(resolver);
        }
        decoder.decode(target)
    }

    fn decode(json: JsonValue) -> Result<Drawing> {
        let mut drawing = Drawing::default();
        decode_with(&json, &JsonOptions::default(), None, &mut drawing)?;
        Ok(drawing)
    }

    fn field_of(err: &Error) -> Option<&str> {
        match err {
            Error::Data(e) => e.field.as_deref(),
            _ => None,
        }
    }

    #[test]
    fn test_round_trip() {
        let registry = registry();
        let options = JsonOptions::default();
        let original = sample();
        let json = JsonEncoder::new(&registry, &options).encode(&original).unwrap();
        assert_eq!(decode(json).unwrap(), original);
    }

    #[test]
    fn test_round_trip_without_nulls() {
        let registry = registry();
        let options = JsonOptions::new().emit_nulls(false);
        let original = Drawing {
            primary: Variant::empty(),
            origin: Nullable::null(),
            ..sample()
        };
        let json = JsonEncoder::new(&registry, &options).encode(&original).unwrap();
        let mut decoded = Drawing::default();
        decode_with(&json, &options, None, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_enum_by_name_or_number() {
        let by_name = decode(json!({ "color": "Blue", "access": "Read|Exec" })).unwrap();
        let by_number = decode(json!({ "color": 4, "access": 5 })).unwrap();
        assert_eq!(by_name.color, Color::Blue);
        assert_eq!(by_name.access, Access::Read as u32 | Access::Exec as u32);
        assert_eq!(by_name, by_number);
    }

    #[test]
    fn test_unknown_enum_name_and_value() {
        let err = decode(json!({ "color": "Purple" })).unwrap_err();
        assert_eq!(
            err.data_kind(),
            Some(&DataErrorKind::UnknownEnumName("Purple".to_string()))
        );
        assert_eq!(field_of(&err), Some("color"));

        let err = decode(json!({ "color": 3 })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::UnknownEnumValue(3)));

        let err = decode(json!({ "palette": ["Red", 8] })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::UnknownEnumValue(8)));
        assert_eq!(field_of(&err), Some("palette"));
    }

    #[test]
    fn test_scalar_kind_mismatch() {
        let err = decode(json!({ "count": "3" })).unwrap_err();
        assert_eq!(
            err.data_kind(),
            Some(&DataErrorKind::TypeMismatch(FieldType::Uint64))
        );
        assert_eq!(field_of(&err), Some("count"));

        let err = decode(json!({ "visible": 1 })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::TypeMismatch(FieldType::Bool)));

        let err = decode(json!({ "title": null })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::TypeMismatch(FieldType::String)));
    }

    #[test]
    fn test_integer_range_is_checked() {
        let err = decode(json!({ "offset": 1_i64 << 40 })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::TypeMismatch(FieldType::Int32)));
        let err = decode(json!({ "count": -1 })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::TypeMismatch(FieldType::Uint64)));
        let drawing = decode(json!({ "count": u64::MAX, "ratio": 2 })).unwrap();
        assert_eq!(drawing.count, u64::MAX);
        assert!((drawing.ratio - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nullable_null_unsets() {
        let mut drawing = sample();
        drawing.layer = Nullable::new(4);
        decode_with(
            &json!({ "layer": null, "origin": null }),
            &JsonOptions::default(),
            None,
            &mut drawing,
        )
        .unwrap();
        assert!(!drawing.layer.is_set());
        assert!(!drawing.origin.is_set());
        // non-null sources still have to match the element type
        let err = decode(json!({ "layer": "x" })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::TypeMismatch(FieldType::Int64)));
    }

    #[test]
    fn test_arrays_resize_to_source() {
        let mut drawing = sample();
        decode_with(
            &json!({ "tags": ["only"], "points": null, "scores": [null, null, 3] }),
            &JsonOptions::default(),
            None,
            &mut drawing,
        )
        .unwrap();
        assert_eq!(drawing.tags, vec!["only".to_string()]);
        assert!(drawing.points.is_empty());
        assert_eq!(
            drawing.scores,
            vec![Nullable::null(), Nullable::null(), Nullable::new(3)]
        );
    }

    #[test]
    fn test_nullable_array_elements_both_ways() {
        let registry = registry();
        let options = JsonOptions::new().emit_nulls(false);
        let original = Drawing {
            scores: vec![Nullable::null(), Nullable::new(-2), Nullable::null()],
            ..sample()
        };
        let json = JsonEncoder::new(&registry, &options).encode(&original).unwrap();
        // element nulls survive even when null fields are omitted
        assert_eq!(json["scores"], json!([null, -2, null]));

        let mut decoded = Drawing::default();
        decode_with(&json, &options, None, &mut decoded).unwrap();
        assert_eq!(decoded.scores, original.scores);

        let err = decode(json!({ "scores": [1, "two"] })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::TypeMismatch(FieldType::Int32)));
        assert_eq!(field_of(&err), Some("scores"));
    }

    #[test]
    fn test_nested_object_decodes_in_place() {
        let mut drawing = sample();
        decode_with(
            &json!({ "origin": { "x": 9.0 } }),
            &JsonOptions::default(),
            None,
            &mut drawing,
        )
        .unwrap();
        assert_eq!(*drawing.origin.get().unwrap(), Point { x: 9.0, y: 5.0 });
    }

    #[test]
    fn test_variant_resolves_concrete_type() {
        let drawing = decode(json!({
            "primary": { "@type": "Square", "side": 3.0 },
            "shapes": [{ "@type": "Circle", "radius": 1.0, "center": { "x": 0.0, "y": 0.0 } }, null]
        }))
        .unwrap();
        assert_eq!(drawing.primary.downcast_ref::<Square>(), Some(&Square { side: 3.0 }));
        assert!(drawing.shapes[0].downcast_ref::<Circle>().is_some());
        assert!(drawing.shapes[1].is_empty());

        let registry = registry();
        let options = JsonOptions::default();
        let again = JsonEncoder::new(&registry, &options).encode(&drawing).unwrap();
        assert_eq!(again["primary"]["@type"], "Square");
    }

    #[test]
    fn test_variant_without_discriminant_fails() {
        let err = decode(json!({ "primary": { "side": 3.0 } })).unwrap_err();
        assert!(matches!(err.data_kind(), Some(DataErrorKind::UnknownType(_))));
        assert_eq!(field_of(&err), Some("primary"));

        let err = decode(json!({ "primary": { "@type": "Hexagon" } })).unwrap_err();
        assert_eq!(
            err.data_kind(),
            Some(&DataErrorKind::UnknownType("Hexagon".to_string()))
        );
    }

    #[test]
    fn test_resolver_limits_types() {
        let circles_only = TypeMap::new().insert::<Circle>("Circle");
        let mut drawing = Drawing::default();
        let err = decode_with(
            &json!({ "primary": { "@type": "Square", "side": 1.0 } }),
            &JsonOptions::default(),
            Some(&circles_only),
            &mut drawing,
        )
        .unwrap_err();
        assert_eq!(
            err.data_kind(),
            Some(&DataErrorKind::UnknownType("Square".to_string()))
        );
    }

    #[test]
    fn test_custom_type_key() {
        let options = JsonOptions::new().type_key("$kind");
        let mut drawing = Drawing::default();
        decode_with(
            &json!({ "primary": { "$kind": "Square", "side": 1.0 } }),
            &options,
            None,
            &mut drawing,
        )
        .unwrap();
        assert!(drawing.primary.downcast_ref::<Square>().is_some());
    }

    #[test]
    fn test_datetime_format() {
        let drawing = decode(json!({ "created": "1999-12-31 23:59:58" })).unwrap();
        assert_eq!(drawing.created.month(), Month::December);
        let err = decode(json!({ "created": "31/12/1999" })).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::FormatError));
        assert_eq!(field_of(&err), Some("created"));
    }

    #[test]
    fn test_failure_keeps_earlier_fields() {
        let mut drawing = sample();
        let err = decode_with(
            &json!({ "title": "changed", "count": "bad", "offset": 1 }),
            &JsonOptions::default(),
            None,
            &mut drawing,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Data(_)));
        assert_eq!(drawing.title, "changed");
        assert_eq!(drawing.count, 3);
        assert_eq!(drawing.offset, -7);
    }
}
