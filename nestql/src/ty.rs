//!
//! Column types: how Rust values are bound as parameters,
//! and how they are read back out of a JSON row payload.
//!

use chrono::NaiveDate;
use serde_json::Value as Json;

/// A parameter value bound to a statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F64(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value as it would appear in a row payload.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(value) => Json::Bool(*value),
            Value::I16(value) => Json::from(*value),
            Value::I32(value) => Json::from(*value),
            Value::I64(value) => Json::from(*value),
            Value::F64(value) => Json::from(*value),
            Value::Text(value) => Json::String(value.clone()),
            Value::Date(value) => Json::String(value.format(DATE_FORMAT).to_string()),
        }
    }

    /// Read a value without knowing the column type.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(value) => Value::Bool(*value),
            Json::Number(number) => match number.as_i64() {
                Some(value) => Value::I64(value),
                None => Value::F64(number.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(value) => Value::Text(value.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Any Rust type that can be stored in, and projected out of, a column.
pub trait Type: Sized + Send + Sync + 'static {
    /// Decode from one element of a row payload.
    fn from_json(json: &Json) -> Result<Self, String>;

    fn into_value(self) -> Value;
}

fn unexpected(expected: &str, json: &Json) -> String {
    format!("expected {}, found `{}`", expected, json)
}

impl Type for bool {
    fn from_json(json: &Json) -> Result<Self, String> {
        match json {
            Json::Bool(value) => Ok(*value),
            // SQLite has no boolean storage class
            Json::Number(number) => match number.as_i64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(unexpected("bool", json)),
            },
            _ => Err(unexpected("bool", json)),
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! integer_type {
    ($ty:ty, $variant:ident) => {
        impl Type for $ty {
            fn from_json(json: &Json) -> Result<Self, String> {
                json.as_i64()
                    .and_then(|value| <$ty>::try_from(value).ok())
                    .ok_or_else(|| unexpected(stringify!($ty), json))
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

integer_type!(i16, I16);
integer_type!(i32, I32);
integer_type!(i64, I64);

impl Type for f64 {
    fn from_json(json: &Json) -> Result<Self, String> {
        json.as_f64().ok_or_else(|| unexpected("f64", json))
    }

    fn into_value(self) -> Value {
        Value::F64(self)
    }
}

impl Type for String {
    fn from_json(json: &Json) -> Result<Self, String> {
        json.as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| unexpected("string", json))
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl Type for NaiveDate {
    fn from_json(json: &Json) -> Result<Self, String> {
        let text = json.as_str().ok_or_else(|| unexpected("date", json))?;
        // PostgreSQL renders timestamps with a time part; only the date is kept.
        let date_part = text.get(..10).unwrap_or(text);
        NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|err| format!("{}: {}", err, text))
    }

    fn into_value(self) -> Value {
        Value::Date(self)
    }
}

impl<T: Type> Type for Option<T> {
    fn from_json(json: &Json) -> Result<Self, String> {
        match json {
            Json::Null => Ok(None),
            json => T::from_json(json).map(Some),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

/// Rust values that may be bound to a column of type `Ty`.
pub trait Bind<Ty> {
    fn bind_value(self) -> Value;
}

macro_rules! bind_as_self {
    ($($ty:ty),*) => {
        $(
            impl Bind<$ty> for $ty {
                fn bind_value(self) -> Value {
                    Type::into_value(self)
                }
            }

            impl Bind<Option<$ty>> for $ty {
                fn bind_value(self) -> Value {
                    Type::into_value(self)
                }
            }

            impl Bind<Option<$ty>> for Option<$ty> {
                fn bind_value(self) -> Value {
                    Type::into_value(self)
                }
            }
        )*
    };
}

bind_as_self!(bool, i16, i32, i64, f64, String, NaiveDate);

impl<'a> Bind<String> for &'a str {
    fn bind_value(self) -> Value {
        Value::Text(self.to_owned())
    }
}

impl<'a> Bind<Option<String>> for &'a str {
    fn bind_value(self) -> Value {
        Value::Text(self.to_owned())
    }
}

impl<'a> Bind<Option<String>> for Option<&'a str> {
    fn bind_value(self) -> Value {
        self.map(|text| Value::Text(text.to_owned()))
            .unwrap_or(Value::Null)
    }
}
