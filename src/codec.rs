//! Conversions between native [`Value`]s and the wire [`TypedValue`] form.

use serde_json::Value as JsonValue;

use crate::{wire::TypedValue, Result, TursoError, Value};

/// Encodes a native value into its wire form.
///
/// Integers and floats use their plain base-10 text. Non-finite floats have
/// no SQLite representation and are rejected.
pub fn encode_value(value: Value) -> Result<TypedValue> {
    if let Value::Float(float) = value {
        if !float.is_finite() {
            return Err(TursoError::unsupported(format!(
                "non-finite {} {float}",
                value.kind()
            )));
        }
    }
    match value {
        Value::Null => Ok(TypedValue::Null {}),
        Value::Integer(value) => Ok(TypedValue::Integer {
            value: value.to_string(),
        }),
        Value::Float(value) => Ok(TypedValue::Float {
            value: value.to_string(),
        }),
        Value::Text(value) => Ok(TypedValue::Text { value }),
        Value::BlobBase64(base64) => Ok(TypedValue::Blob { base64 }),
    }
}

/// Encodes a dynamically typed JSON scalar. Arrays and objects fail with
/// [`TursoError::UnsupportedArgumentType`].
pub fn encode_json(value: JsonValue) -> Result<TypedValue> {
    Value::try_from(value).and_then(encode_value)
}

pub(crate) fn encode_all(values: Vec<Value>) -> Result<Vec<TypedValue>> {
    values.into_iter().map(encode_value).collect()
}

/// Decodes a wire value back into a native one.
///
/// This is the inverse of [`encode_value`] except for booleans, which come
/// back as `Integer(0)` or `Integer(1)`.
pub fn decode_value(value: TypedValue) -> Result<Value> {
    match value {
        TypedValue::Null {} => Ok(Value::Null),
        TypedValue::Integer { value } => value
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|err| TursoError::Decode(format!("invalid integer value '{value}': {err}"))),
        TypedValue::Float { value } => value
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|err| TursoError::Decode(format!("invalid float value '{value}': {err}"))),
        TypedValue::Text { value } => Ok(Value::Text(value)),
        TypedValue::Blob { base64 } => Ok(Value::BlobBase64(base64)),
    }
}

/// Unwraps a response cell without coercing it.
///
/// Tagged cells yield their `value` (or `base64` for blobs, `null` for the
/// null kind). Bare scalars and unrecognised objects are returned as-is.
pub fn decode_cell(cell: &JsonValue) -> JsonValue {
    let JsonValue::Object(fields) = cell else {
        return cell.clone();
    };
    if let Some(value) = fields.get("value") {
        return value.clone();
    }
    match fields.get("type").and_then(JsonValue::as_str) {
        Some("null") => JsonValue::Null,
        Some("blob") => fields.get("base64").cloned().unwrap_or(JsonValue::Null),
        _ => cell.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{codec, wire::TypedValue, TursoError, Value};

    #[test]
    fn typed_round_trip() {
        let values = [
            Value::Null,
            Value::Integer(-17),
            Value::Float(3.5),
            Value::Text("héllo".to_owned()),
            Value::BlobBase64("AQID".to_owned()),
        ];
        for value in values {
            let encoded = codec::encode_value(value.clone()).expect("must encode");
            assert_eq!(codec::decode_value(encoded).expect("must decode"), value);
        }
    }

    #[test]
    fn bool_round_trips_as_integer() {
        let encoded = codec::encode_value(true.into()).expect("must encode");
        assert_eq!(
            encoded,
            TypedValue::Integer {
                value: "1".to_owned()
            }
        );
        assert_eq!(codec::decode_value(encoded).unwrap(), Value::Integer(1));
    }

    #[test]
    fn rejects_non_finite_float() {
        let err = codec::encode_value(Value::float(f64::NAN)).expect_err("must fail");
        assert!(matches!(
            err,
            TursoError::UnsupportedArgumentType { ref kind } if kind == "non-finite float NaN"
        ));
    }

    #[test]
    fn encode_json_rejects_object() {
        let err = codec::encode_json(json!({"nested": true})).expect_err("must fail");
        assert!(matches!(err, TursoError::UnsupportedArgumentType { .. }));
    }

    #[test]
    fn encode_json_float_uses_plain_text() {
        let encoded = codec::encode_json(json!(0.25)).expect("must encode");
        assert_eq!(
            encoded,
            TypedValue::Float {
                value: "0.25".to_owned()
            }
        );
    }

    #[test]
    fn decode_integer_parse_error() {
        let value = TypedValue::Integer {
            value: "nope".to_owned(),
        };
        let err = codec::decode_value(value).expect_err("must fail");
        assert!(matches!(err, TursoError::Decode(_)));
    }

    #[test]
    fn decode_cell_unwraps_without_coercion() {
        assert_eq!(
            codec::decode_cell(&json!({"type": "integer", "value": "1"})),
            json!("1")
        );
        assert_eq!(codec::decode_cell(&json!({"type": "null"})), json!(null));
        assert_eq!(
            codec::decode_cell(&json!({"type": "blob", "base64": "AQID"})),
            json!("AQID")
        );
    }

    #[test]
    fn decode_cell_passes_bare_scalars_through() {
        assert_eq!(codec::decode_cell(&json!(7)), json!(7));
        assert_eq!(codec::decode_cell(&json!("x")), json!("x"));
        assert_eq!(codec::decode_cell(&json!({"odd": 1})), json!({"odd": 1}));
    }
}
