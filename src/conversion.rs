//! Type conversion for literal property values.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BoxError;
use crate::value::Literal;

/// Converts literals to field types other than their natural type.
pub trait ConversionService: Send + Sync {
    fn can_convert(&self, source: TypeId, target: TypeId) -> bool;

    /// Converts `value` to the type with id `target`, boxed.
    fn convert(&self, value: &Literal, target: TypeId) -> Result<Box<dyn Any + Send>, BoxError>;
}

type ConverterFn = dyn Fn(&dyn Any) -> Result<Box<dyn Any + Send>, BoxError> + Send + Sync;

/// Converter table keyed by `(source, target)` type ids.
///
/// Starts with string-to-scalar parsing, integer narrowing and widening,
/// and scalar-to-string formatting. Further converters can be added.
///
/// ```rust
/// use ferrous_lifecycle::{ConversionService, DefaultConversionService, Literal};
/// use std::any::TypeId;
///
/// let service = DefaultConversionService::new();
/// let port = service.convert(&Literal::from("8080"), TypeId::of::<u16>()).unwrap();
/// assert_eq!(*port.downcast::<u16>().unwrap(), 8080);
/// ```
#[derive(Clone)]
pub struct DefaultConversionService {
    converters: HashMap<(TypeId, TypeId), Arc<ConverterFn>>,
}

macro_rules! parse_from_string {
    ($service:ident, $($target:ty),+) => {
        $(
            $service.add_converter::<String, $target, _>(|s: &String| {
                s.trim().parse::<$target>().map_err(|e| -> BoxError {
                    format!("'{}' is not a valid {}: {}", s, stringify!($target), e).into()
                })
            });
        )+
    };
}

macro_rules! from_integer {
    ($service:ident, $($target:ty),+) => {
        $(
            $service.add_converter::<i64, $target, _>(|v: &i64| {
                <$target>::try_from(*v).map_err(|e| -> BoxError {
                    format!("{} out of range for {}: {}", v, stringify!($target), e).into()
                })
            });
        )+
    };
}

impl DefaultConversionService {
    /// Service with the built-in converters.
    pub fn new() -> Self {
        let mut service = Self::empty();
        parse_from_string!(service, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char);
        from_integer!(service, i8, i16, i32, isize, u8, u16, u32, u64, usize);
        service.add_converter::<i64, f64, _>(|v: &i64| Ok(*v as f64));
        service.add_converter::<i64, f32, _>(|v: &i64| Ok(*v as f32));
        service.add_converter::<f64, f32, _>(|v: &f64| Ok(*v as f32));
        service.add_converter::<i64, String, _>(|v: &i64| Ok(v.to_string()));
        service.add_converter::<f64, String, _>(|v: &f64| Ok(v.to_string()));
        service.add_converter::<bool, String, _>(|v: &bool| Ok(v.to_string()));
        service
    }

    /// Service without any converters.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Adds or replaces the converter from `S` to `T`.
    pub fn add_converter<S, T, F>(&mut self, f: F)
    where
        S: Any,
        T: Any + Send,
        F: Fn(&S) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let converter = move |value: &dyn Any| -> Result<Box<dyn Any + Send>, BoxError> {
            let source = value
                .downcast_ref::<S>()
                .ok_or_else(|| -> BoxError { "converter received a value of another type".into() })?;
            Ok(Box::new(f(source)?))
        };
        self.converters
            .insert((TypeId::of::<S>(), TypeId::of::<T>()), Arc::new(converter));
    }
}

impl Default for DefaultConversionService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefaultConversionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultConversionService")
            .field("converters", &self.converters.len())
            .finish()
    }
}

fn literal_as_any(value: &Literal) -> &dyn Any {
    match value {
        Literal::Str(s) => s,
        Literal::Int(i) => i,
        Literal::Float(f) => f,
        Literal::Bool(b) => b,
    }
}

impl ConversionService for DefaultConversionService {
    fn can_convert(&self, source: TypeId, target: TypeId) -> bool {
        self.converters.contains_key(&(source, target))
    }

    fn convert(&self, value: &Literal, target: TypeId) -> Result<Box<dyn Any + Send>, BoxError> {
        let converter = self
            .converters
            .get(&(value.natural_type_id(), target))
            .ok_or_else(|| -> BoxError { format!("no converter from {}", value.natural_type_name()).into() })?;
        converter(literal_as_any(value))
    }
}
