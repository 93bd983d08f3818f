use serde_json::Value as JsonValue;

use crate::TursoError;

/// A native statement argument.
///
/// Booleans have no wire kind of their own: `true`/`false` convert to
/// `Integer(1)`/`Integer(0)`, so they cannot be told apart from integers once
/// encoded.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    BlobBase64(String),
}

impl Value {
    pub fn null() -> Self {
        Self::Null
    }

    pub fn integer(value: i64) -> Self {
        Self::Integer(value)
    }

    pub fn float(value: f64) -> Self {
        Self::Float(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn blob_base64(value: impl Into<String>) -> Self {
        Self::BlobBase64(value.into())
    }

    /// Short name of the value's kind, as it appears in
    /// [`TursoError::UnsupportedArgumentType`] messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::BlobBase64(_) => "blob",
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Integer(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<u64> for Value {
    type Error = TursoError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self::Integer)
            .map_err(|_| TursoError::unsupported(format!("u64 {value} exceeds i64 range")))
    }
}

/// Converts a dynamically typed JSON value into an argument.
///
/// Only scalars are accepted; arrays and objects have no wire representation.
impl TryFrom<JsonValue> for Value {
    type Error = TursoError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(flag) => Ok(flag.into()),
            JsonValue::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Ok(Self::Integer(int))
                } else if let Some(uint) = number.as_u64() {
                    Self::try_from(uint)
                } else {
                    number
                        .as_f64()
                        .map(Self::Float)
                        .ok_or_else(|| TursoError::unsupported(format!("number {number}")))
                }
            }
            JsonValue::String(text) => Ok(Self::Text(text)),
            JsonValue::Array(_) => Err(TursoError::unsupported("array")),
            JsonValue::Object(_) => Err(TursoError::unsupported("object")),
        }
    }
}
