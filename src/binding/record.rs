//! Field-descriptor tables for record types.
//!
//! A [`Shape`] lists a record's fields with their normalized names and typed
//! accessors. It is built once per type by the [`record!`](crate::record)
//! macro and looked up by normalized name when binding rows or resolving
//! placeholders.

use crate::error::{MapperError, MapperResult};
use crate::models::Value;
use crate::statement::normalize_field_name;
use std::collections::HashMap;

/// Conversion from a decoded column into a field type.
pub trait FromValue: Sized {
    /// `field` is only used for error messages.
    fn from_value(value: Value, field: &str) -> MapperResult<Self>;

    /// Name reported in conversion errors.
    fn type_name() -> &'static str;
}

/// Conversion from a field into a bound parameter.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

fn mismatch<T: FromValue>(value: &Value, field: &str) -> MapperError {
    MapperError::conversion(field, T::type_name(), value.type_name())
}

impl FromValue for Value {
    fn from_value(value: Value, _field: &str) -> MapperResult<Self> {
        Ok(value)
    }

    fn type_name() -> &'static str {
        "value"
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for i64 {
    fn from_value(value: Value, field: &str) -> MapperResult<Self> {
        match value {
            Value::Int(v) => Ok(v),
            Value::Bool(v) => Ok(i64::from(v)),
            other => Err(mismatch::<Self>(&other, field)),
        }
    }

    fn type_name() -> &'static str {
        "i64"
    }
}

impl FromValue for i32 {
    fn from_value(value: Value, field: &str) -> MapperResult<Self> {
        match value {
            Value::Int(v) => i32::try_from(v)
                .map_err(|_| MapperError::conversion(field, "i32", format!("out-of-range int {}", v))),
            Value::Bool(v) => Ok(i32::from(v)),
            other => Err(mismatch::<Self>(&other, field)),
        }
    }

    fn type_name() -> &'static str {
        "i32"
    }
}

impl FromValue for f64 {
    fn from_value(value: Value, field: &str) -> MapperResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(mismatch::<Self>(&other, field)),
        }
    }

    fn type_name() -> &'static str {
        "f64"
    }
}

impl FromValue for bool {
    fn from_value(value: Value, field: &str) -> MapperResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            // SQLite stores booleans as 0/1
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => Err(mismatch::<Self>(&other, field)),
        }
    }

    fn type_name() -> &'static str {
        "bool"
    }
}

impl FromValue for String {
    fn from_value(value: Value, field: &str) -> MapperResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch::<Self>(&other, field)),
        }
    }

    fn type_name() -> &'static str {
        "String"
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value, field: &str) -> MapperResult<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => Err(mismatch::<Self>(&other, field)),
        }
    }

    fn type_name() -> &'static str {
        "Vec<u8>"
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, field: &str) -> MapperResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, field).map(Some),
        }
    }

    fn type_name() -> &'static str {
        T::type_name()
    }
}

impl ToValue for i64 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
}

impl ToValue for i32 {
    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map(ToValue::to_value).unwrap_or(Value::Null)
    }
}

/// One field of a record type.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    /// Name with underscores stripped, lower-cased.
    pub normalized: String,
    pub type_name: &'static str,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, Value) -> MapperResult<()>,
}

impl<T> FieldDescriptor<T> {
    pub fn new(
        name: &'static str,
        type_name: &'static str,
        get: fn(&T) -> Value,
        set: fn(&mut T, Value) -> MapperResult<()>,
    ) -> Self {
        Self {
            name,
            normalized: normalize_field_name(name),
            type_name,
            get,
            set,
        }
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// The field table of a record type.
#[derive(Debug)]
pub struct Shape<T> {
    name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
    by_normalized: HashMap<String, usize>,
}

impl<T> Shape<T> {
    /// When two fields normalize to the same name the first one wins.
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor<T>>) -> Self {
        let mut by_normalized = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            by_normalized.entry(field.normalized.clone()).or_insert(idx);
        }
        Self {
            name,
            fields,
            by_normalized,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    /// Look a field up by any spelling of its name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.by_normalized
            .get(&normalize_field_name(name))
            .map(|&idx| &self.fields[idx])
    }
}

/// A plain data type rows bind onto and parameters resolve from.
///
/// Implemented through [`record!`](crate::record).
pub trait Record: Default + Send + Sync + 'static {
    fn shape() -> &'static Shape<Self>;
}

/// Declare a struct together with its [`Record`] implementation.
///
/// ```ignore
/// sqlmapper::record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Employee {
///         pub employee_id: i64,
///         pub first_name: String,
///         pub email: Option<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $field_ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$field_meta])* $field_vis $field : $field_ty, )*
        }

        impl $crate::binding::Record for $name {
            fn shape() -> &'static $crate::binding::Shape<Self> {
                static SHAPE: ::std::sync::OnceLock<$crate::binding::Shape<$name>> =
                    ::std::sync::OnceLock::new();
                SHAPE.get_or_init(|| {
                    $crate::binding::Shape::new(
                        stringify!($name),
                        vec![
                            $(
                                $crate::binding::FieldDescriptor::new(
                                    stringify!($field),
                                    stringify!($field_ty),
                                    |record: &$name| $crate::binding::ToValue::to_value(&record.$field),
                                    |record: &mut $name, value: $crate::models::Value| {
                                        record.$field = <$field_ty as $crate::binding::FromValue>::from_value(
                                            value,
                                            stringify!($field),
                                        )?;
                                        Ok(())
                                    },
                                ),
                            )*
                        ],
                    )
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Sample {
            sample_id: i64,
            display_name: String,
            ratio: Option<f64>,
        }
    }

    #[test]
    fn test_shape_lookup_by_any_spelling() {
        let shape = Sample::shape();
        assert_eq!(shape.name(), "Sample");
        assert_eq!(shape.fields().len(), 3);
        assert_eq!(shape.field("SAMPLE_ID").unwrap().name, "sample_id");
        assert_eq!(shape.field("displayName").unwrap().name, "display_name");
        assert!(shape.field("missing").is_none());
    }

    #[test]
    fn test_field_accessors() {
        let shape = Sample::shape();
        let mut sample = Sample::default();
        (shape.field("sampleId").unwrap().set)(&mut sample, Value::Int(7)).unwrap();
        (shape.field("ratio").unwrap().set)(&mut sample, Value::Int(2)).unwrap();
        assert_eq!(sample.sample_id, 7);
        assert_eq!(sample.ratio, Some(2.0));
        assert_eq!((shape.field("ratio").unwrap().get)(&sample), Value::Float(2.0));

        (shape.field("ratio").unwrap().set)(&mut sample, Value::Null).unwrap();
        assert_eq!(sample.ratio, None);
    }

    #[test]
    fn test_null_into_required_field_fails() {
        let shape = Sample::shape();
        let mut sample = Sample::default();
        let err = (shape.field("display_name").unwrap().set)(&mut sample, Value::Null).unwrap_err();
        assert!(matches!(err, MapperError::Conversion { .. }));
        assert!(err.to_string().contains("display_name"));
    }

    #[test]
    fn test_scalar_conversions() {
        assert!(bool::from_value(Value::Int(1), "active").unwrap());
        assert!(bool::from_value(Value::Int(5), "active").is_err());
        assert!(i32::from_value(Value::Int(i64::MAX), "n").is_err());
        assert_eq!(i32::from_value(Value::Int(-3), "n").unwrap(), -3);
        assert!(String::from_value(Value::Int(3), "s").is_err());
        assert_eq!(Some(5i64).to_value(), Value::Int(5));
        assert_eq!(None::<i64>.to_value(), Value::Null);
    }
}
