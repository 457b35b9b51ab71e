//! Statement parameters.
//!
//! A parameter resolves the normalized field names of a compiled statement
//! into bound values, renders its cache key, and receives generated keys.
//! Every [`Record`] is a parameter; so are the common scalars, which bind the
//! same value to every placeholder, and `()` for statements without any.

use crate::binding::record::{Record, ToValue};
use crate::cache::CacheKey;
use crate::error::{MapperError, MapperResult};
use crate::models::Value;
use crate::statement::ParameterType;

pub trait Parameter: Send + Sync {
    /// Type checked against the statement's declared parameter type. `None`
    /// means "no parameter".
    fn parameter_type() -> Option<ParameterType>
    where
        Self: Sized;

    /// Value bound for the normalized placeholder name `field`.
    fn resolve(&self, field: &str) -> MapperResult<Value>;

    /// Canonical rendering used as the cache key of cacheable SELECTs.
    fn cache_key(&self) -> CacheKey;

    /// Write a generated key back onto the normalized field `field`.
    fn set_generated_key(&mut self, field: &str, key: Value) -> MapperResult<()>;
}

impl<T: Record> Parameter for T {
    fn parameter_type() -> Option<ParameterType> {
        Some(ParameterType::Record(T::shape().name().to_string()))
    }

    fn resolve(&self, field: &str) -> MapperResult<Value> {
        let shape = T::shape();
        shape
            .field(field)
            .map(|descriptor| (descriptor.get)(self))
            .ok_or_else(|| MapperError::unknown_field(field, shape.name()))
    }

    fn cache_key(&self) -> CacheKey {
        let shape = T::shape();
        let values: Vec<(&str, Value)> = shape
            .fields()
            .iter()
            .map(|descriptor| (descriptor.name, (descriptor.get)(self)))
            .collect();
        CacheKey::new(format!("{}{:?}", shape.name(), values))
    }

    fn set_generated_key(&mut self, field: &str, key: Value) -> MapperResult<()> {
        let shape = T::shape();
        let descriptor = shape
            .field(field)
            .ok_or_else(|| MapperError::unknown_field(field, shape.name()))?;
        (descriptor.set)(self, key)
    }
}

macro_rules! scalar_parameter {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Parameter for $ty {
                fn parameter_type() -> Option<ParameterType> {
                    Some(ParameterType::$kind)
                }

                fn resolve(&self, _field: &str) -> MapperResult<Value> {
                    Ok(self.to_value())
                }

                fn cache_key(&self) -> CacheKey {
                    CacheKey::new(format!("{:?}", self.to_value()))
                }

                fn set_generated_key(&mut self, field: &str, _key: Value) -> MapperResult<()> {
                    Err(MapperError::configuration(format!(
                        "Cannot write generated key '{}' back onto a {} parameter",
                        field,
                        stringify!($ty)
                    )))
                }
            }
        )*
    };
}

scalar_parameter! {
    i32 => Integer,
    i64 => Integer,
    f64 => Float,
    bool => Bool,
    String => Text,
    Vec<u8> => Bytes,
}

impl Parameter for () {
    fn parameter_type() -> Option<ParameterType> {
        None
    }

    fn resolve(&self, field: &str) -> MapperResult<Value> {
        Err(MapperError::configuration(format!(
            "Placeholder '{}' needs a parameter but none was supplied",
            field
        )))
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey::new("()")
    }

    fn set_generated_key(&mut self, field: &str, _key: Value) -> MapperResult<()> {
        Err(MapperError::configuration(format!(
            "Cannot write generated key '{}' without a parameter",
            field
        )))
    }
}

/// Resolve every placeholder of a compiled statement, in order.
pub fn bind_parameters<P: Parameter + ?Sized>(param: &P, fields: &[String]) -> MapperResult<Vec<Value>> {
    fields.iter().map(|field| param.resolve(field)).collect()
}
