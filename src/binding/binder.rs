//! Row materialization.
//!
//! Each column binds to the field with the same normalized name, after the
//! result map (if any) has renamed it. A column without a matching field is an
//! error rather than being silently dropped.

use crate::binding::record::{FromValue, Record};
use crate::error::{MapperError, MapperResult};
use crate::models::{Row, Value};
use crate::statement::{ParameterType, ResultMap, normalize_field_name};

/// Types a result row can be bound onto.
pub trait FromRow: Sized + Send {
    /// Type checked against the statement's declared result type.
    fn row_type() -> ParameterType;

    fn from_row(row: &Row, result_map: Option<&ResultMap>) -> MapperResult<Self>;
}

impl<T: Record> FromRow for T {
    fn row_type() -> ParameterType {
        ParameterType::Record(T::shape().name().to_string())
    }

    fn from_row(row: &Row, result_map: Option<&ResultMap>) -> MapperResult<Self> {
        bind_record(row, result_map)
    }
}

/// Bind one row onto a fresh record.
pub fn bind_record<R: Record>(row: &Row, result_map: Option<&ResultMap>) -> MapperResult<R> {
    let shape = R::shape();
    let mut record = R::default();
    for (column, value) in row.iter() {
        let property = result_map
            .and_then(|map| map.property_for(column))
            .unwrap_or(column);
        let field = shape
            .field(property)
            .ok_or_else(|| MapperError::unknown_field(column, shape.name()))?;
        (field.set)(&mut record, value.clone())?;
    }
    Ok(record)
}

/// Bind every row, in order.
pub fn bind_rows<R: FromRow>(rows: &[Row], result_map: Option<&ResultMap>) -> MapperResult<Vec<R>> {
    rows.iter().map(|row| R::from_row(row, result_map)).collect()
}

fn single_column<'a>(row: &'a Row, expected: &str) -> MapperResult<(&'a str, &'a Value)> {
    let mut columns = row.iter();
    match (columns.next(), columns.next()) {
        (Some(column), None) => Ok(column),
        _ => Err(MapperError::conversion(
            row.column_names().join(", "),
            expected,
            format!("a row of {} columns", row.len()),
        )),
    }
}

macro_rules! scalar_from_row {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn row_type() -> ParameterType {
                    ParameterType::$kind
                }

                fn from_row(row: &Row, _result_map: Option<&ResultMap>) -> MapperResult<Self> {
                    let (column, value) = single_column(row, stringify!($ty))?;
                    <$ty as FromValue>::from_value(value.clone(), column)
                }
            }
        )*
    };
}

scalar_from_row! {
    i32 => Integer,
    i64 => Integer,
    f64 => Float,
    bool => Bool,
    String => Text,
    Vec<u8> => Bytes,
}

/// Pick the generated key for `key_field` out of a generated-key row: the
/// column whose normalized name matches, else the only column.
pub fn generated_key(keys: &Row, key_field: &str) -> MapperResult<Value> {
    let wanted = normalize_field_name(key_field);
    if let Some((_, value)) = keys
        .iter()
        .find(|(column, _)| normalize_field_name(column) == wanted)
    {
        return Ok(value.clone());
    }
    match single_column(keys, "generated key") {
        Ok((_, value)) => Ok(value.clone()),
        Err(_) => Err(MapperError::unknown_field(key_field, "generated keys")),
    }
}
