//! Encoding objects into JSON trees.

use crate::options::JsonOptions;
use metamodel_core::{
    ArrayInfo, DataErrorKind, EnumDescriptor, Error, FieldInspector, FieldType, MetaField,
    MetaObject, Object, Registry, Result, TypeKey, Value, enum_to_string,
};
use serde_json::{Map, Number, Value as JsonValue};

/// Type context of one encoded or decoded value: a field, or an element of
/// an array field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub field_type: FieldType,
    pub nullable: bool,
    pub descriptor: Option<&'static EnumDescriptor>,
    pub object_type: Option<TypeKey>,
    pub array: Option<ArrayInfo>,
}

impl Slot {
    pub(crate) fn of_field(field: &MetaField) -> Self {
        Self {
            field_type: field.field_type(),
            nullable: field.is_nullable(),
            descriptor: field.enum_descriptor(),
            object_type: field.object_type(),
            array: field.array_info().copied(),
        }
    }

    /// Context of the elements of an array slot.
    pub(crate) fn element(&self) -> Result<Self> {
        let info = self.array.ok_or_else(|| {
            Error::data(
                DataErrorKind::TypeMismatch(FieldType::Array),
                "array field has no element description",
            )
        })?;
        if info.element_type == FieldType::Array {
            return Err(Error::data(
                DataErrorKind::UnsupportedNesting,
                "arrays of arrays are not supported",
            ));
        }
        Ok(Self {
            field_type: info.element_type,
            nullable: info.element_nullable > 0,
            descriptor: info.element_enum,
            object_type: info.element_object,
            array: None,
        })
    }
}

fn number(value: f64) -> Result<JsonValue> {
    Number::from_f64(value).map(JsonValue::Number).ok_or_else(|| {
        Error::data(
            DataErrorKind::FormatError,
            format!("{} has no JSON representation", value),
        )
    })
}

/// [`FieldInspector`] collecting the fields of one object into a JSON map.
///
/// Nested objects are written by fresh encoders sharing the registry and
/// options; polymorphic values additionally carry the type key.
#[derive(Debug)]
pub struct JsonEncoder<'a> {
    registry: &'a Registry,
    options: &'a JsonOptions,
    output: Map<String, JsonValue>,
}

impl<'a> JsonEncoder<'a> {
    pub fn new(registry: &'a Registry, options: &'a JsonOptions) -> Self {
        Self {
            registry,
            options,
            output: Map::new(),
        }
    }

    /// Encode `object` with the metadata of its dynamic type.
    pub fn encode(&self, object: &dyn Object) -> Result<JsonValue> {
        let meta = self.registry.meta_for(object)?;
        self.encode_object(object, meta, false)
    }

    /// Fields collected so far by [`MetaObject::inspect`].
    pub fn into_map(self) -> Map<String, JsonValue> {
        self.output
    }

    fn encode_object(&self, object: &dyn Object, meta: &MetaObject, tagged: bool) -> Result<JsonValue> {
        let mut nested = JsonEncoder::new(self.registry, self.options);
        if tagged {
            nested.output.insert(
                self.options.type_key.clone(),
                JsonValue::String(meta.name().to_string()),
            );
        }
        meta.inspect(object, &mut nested)?;
        Ok(JsonValue::Object(nested.output))
    }

    fn encode_value(&self, value: Value, slot: Slot) -> Result<JsonValue> {
        Ok(match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Int32(n) => n.into(),
            Value::Uint32(n) => n.into(),
            Value::Int64(n) => n.into(),
            Value::Uint64(n) => n.into(),
            Value::Float(f) => number(f64::from(f))?,
            Value::Double(f) => number(f)?,
            Value::String(s) => JsonValue::String(s),
            Value::Enum(bits) => match slot.descriptor {
                Some(descriptor) => JsonValue::String(enum_to_string(descriptor, bits)?.into_owned()),
                None => bits.into(),
            },
            Value::DateTime(dt) => JsonValue::String(dt.to_string()),
            Value::Object(object) => {
                let meta = self.registry.meta_for(object.as_ref())?;
                self.encode_object(object.as_ref(), meta, slot.field_type == FieldType::Variant)?
            }
            Value::Array(items) => {
                let element = slot.element()?;
                let items = items
                    .into_iter()
                    .map(|item| self.encode_value(item, element))
                    .collect::<Result<Vec<_>>>()?;
                JsonValue::Array(items)
            }
        })
    }
}

impl FieldInspector for JsonEncoder<'_> {
    fn inspect_field(&mut self, object: &dyn Object, field: &MetaField) -> Result<()> {
        let value = field.get(object)?;
        if value.is_null() && !self.options.emit_nulls {
            return Ok(());
        }
        let json = self
            .encode_value(value, Slot::of_field(field))
            .map_err(|e| e.in_field(field.name()))?;
        self.output.insert(field.name().to_string(), json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Drawing, Grid, Point, registry, sample};
    use serde_json::json;

    fn encode(object: &dyn Object, options: &JsonOptions) -> Result<JsonValue> {
        let registry = registry();
        JsonEncoder::new(&registry, options).encode(object)
    }

    #[test]
    fn test_encode_every_field_kind() {
        let json = encode(&sample(), &JsonOptions::default()).unwrap();
        assert_eq!(
            json,
            json!({
                "title": "plan",
                "count": 3,
                "offset": -7,
                "serial": -9_000_000_000_i64,
                "flags": 17,
                "ratio": 0.5,
                "weight": 2.25,
                "visible": true,
                "layer": null,
                "created": "2020-01-02 03:04:05",
                "color": "Green",
                "access": "Read|Write",
                "tags": ["a", "b"],
                "palette": ["Red", "Blue"],
                "scores": [1, null],
                "points": [{ "x": 1.0, "y": 2.0 }],
                "origin": { "x": 0.0, "y": 5.0 },
                "primary": {
                    "@type": "Circle",
                    "center": { "x": 1.0, "y": 1.0 },
                    "radius": 1.5
                },
                "shapes": [{ "@type": "Square", "side": 2.0 }, null]
            })
        );
    }

    #[test]
    fn test_omitting_nulls_and_custom_type_key() {
        let options = JsonOptions::new().emit_nulls(false).type_key("$kind");
        let json = encode(&sample(), &options).unwrap();
        let map = json.as_object().unwrap();
        assert!(!map.contains_key("layer"));
        assert_eq!(map["primary"]["$kind"], "Circle");
        assert!(map["primary"].get("@type").is_none());
        // nulls inside arrays keep their position
        assert_eq!(map["scores"], json!([1, null]));
    }

    #[test]
    fn test_unknown_enum_bits_fail_in_field() {
        let drawing = Drawing {
            access: 8,
            ..sample()
        };
        let err = encode(&drawing, &JsonOptions::default()).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::UnknownEnumValue(8)));
        match err {
            Error::Data(e) => assert_eq!(e.field.as_deref(), Some("access")),
            other => panic!("expected a data error, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_arrays_are_rejected() {
        let grid = Grid {
            rows: vec![vec![1, 2]],
        };
        let err = encode(&grid, &JsonOptions::default()).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::UnsupportedNesting));
    }

    #[test]
    fn test_non_finite_floats_fail() {
        let err = encode(&Point { x: f64::NAN, y: 0.0 }, &JsonOptions::default()).unwrap_err();
        assert_eq!(err.data_kind(), Some(&DataErrorKind::FormatError));
    }
}
