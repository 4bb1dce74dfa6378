//! SQLite storage classes and conversions between Rust values and them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// The storage class a column is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageType {
    /// SQL type name used in CREATE TABLE.
    pub fn as_sql(&self) -> &'static str {
        match self {
            StorageType::Integer => "INTEGER",
            StorageType::Real => "REAL",
            StorageType::Text => "TEXT",
            StorageType::Blob => "BLOB",
        }
    }

    /// Whether a value stored as `found` may be written to a column of this type.
    ///
    /// Integers widen into REAL columns; every other class must match exactly.
    pub fn accepts(&self, found: StorageType) -> bool {
        *self == found || (*self == StorageType::Real && found == StorageType::Integer)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A dynamically typed SQLite value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Storage class of this value, `None` for NULL.
    pub fn storage_type(&self) -> Option<StorageType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(StorageType::Integer),
            Value::Real(_) => Some(StorageType::Real),
            Value::Text(_) => Some(StorageType::Text),
            Value::Blob(_) => Some(StorageType::Blob),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.storage_type() {
            Some(storage) => storage.as_sql(),
            None => "NULL",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Apply the engine's column affinity for a value read from `expected`.
    pub fn coerce(self, expected: StorageType) -> Value {
        match (expected, self) {
            (StorageType::Real, Value::Integer(v)) => Value::Real(v as f64),
            (_, value) => value,
        }
    }
}

/// Conversion of a borrowed Rust value into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// A Rust type that maps onto one column.
///
/// `STORAGE` is the declared storage class; `NULLABLE` is true only for
/// `Option<T>`, which makes the column nullable in CREATE TABLE.
pub trait SqlType: ToValue + Sized {
    const STORAGE: StorageType;
    const NULLABLE: bool = false;

    /// Convert a value read from the engine, handing it back on mismatch.
    fn from_value(value: Value) -> Result<Self, Value>;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: SqlType> SqlType for Option<T> {
    const STORAGE: StorageType = T::STORAGE;
    const NULLABLE: bool = true;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

macro_rules! impl_integer {
    ($($ty:ty),* $(,)?) => {$(
        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::Integer(i64::from(*self))
            }
        }

        impl SqlType for $ty {
            const STORAGE: StorageType = StorageType::Integer;

            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::Integer(v) => <$ty>::try_from(v).map_err(|_| Value::Integer(v)),
                    other => Err(other),
                }
            }
        }
    )*};
}

impl_integer!(i8, i16, i32, i64, u8, u16, u32);

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl SqlType for bool {
    const STORAGE: StorageType = StorageType::Integer;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Integer(v) => Ok(v != 0),
            other => Err(other),
        }
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Real(*self)
    }
}

impl SqlType for f64 {
    const STORAGE: StorageType = StorageType::Real;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => Err(other),
        }
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }
}

impl SqlType for f32 {
    const STORAGE: StorageType = StorageType::Real;

    fn from_value(value: Value) -> Result<Self, Value> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl SqlType for String {
    const STORAGE: StorageType = StorageType::Text;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }
}

impl SqlType for Vec<u8> {
    const STORAGE: StorageType = StorageType::Blob;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Blob(v) => Ok(v),
            other => Err(other),
        }
    }
}

// ==================== Text-encoded types ====================

/// Declare a type stored as TEXT through `Display`-like formatting and parsing.
macro_rules! impl_text_encoded {
    ($ty:ty, |$v:ident| $encode:expr, |$s:ident| $decode:expr) => {
        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                let $v = self;
                Value::Text($encode)
            }
        }

        impl SqlType for $ty {
            const STORAGE: StorageType = StorageType::Text;

            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::Text($s) => match $decode {
                        Ok(parsed) => Ok(parsed),
                        Err(_) => Err(Value::Text($s)),
                    },
                    other => Err(other),
                }
            }
        }
    };
}

impl_text_encoded!(
    NaiveDate,
    |v| v.format("%Y-%m-%d").to_string(),
    |s| NaiveDate::parse_from_str(&s, "%Y-%m-%d")
);

impl_text_encoded!(
    NaiveDateTime,
    |v| v.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
    |s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
);

impl_text_encoded!(
    DateTime<Utc>,
    |v| v.to_rfc3339(),
    |s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc))
);

impl_text_encoded!(Uuid, |v| v.hyphenated().to_string(), |s| Uuid::parse_str(&s));

impl_text_encoded!(
    serde_json::Value,
    |v| v.to_string(),
    |s| serde_json::from_str::<serde_json::Value>(&s)
);
