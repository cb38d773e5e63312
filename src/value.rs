//! Property specifications carried by blueprints.

use std::any::{Any, TypeId};
use std::fmt;

use smallvec::SmallVec;

use crate::conversion::ConversionService;
use crate::error::{ContainerError, ContainerResult};

/// A literal scalar property value.
///
/// Each literal has a natural Rust type (`String`, `i64`, `f64`, `bool`).
/// Assigning it to a field of another type goes through the container's
/// [`ConversionService`].
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Literal {
    /// Type id of the literal's natural Rust type.
    pub fn natural_type_id(&self) -> TypeId {
        match self {
            Literal::Str(_) => TypeId::of::<String>(),
            Literal::Int(_) => TypeId::of::<i64>(),
            Literal::Float(_) => TypeId::of::<f64>(),
            Literal::Bool(_) => TypeId::of::<bool>(),
        }
    }

    pub fn natural_type_name(&self) -> &'static str {
        match self {
            Literal::Str(_) => std::any::type_name::<String>(),
            Literal::Int(_) => "i64",
            Literal::Float(_) => "f64",
            Literal::Bool(_) => "bool",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    fn into_any(self) -> Box<dyn Any + Send> {
        match self {
            Literal::Str(s) => Box::new(s),
            Literal::Int(i) => Box::new(i),
            Literal::Float(f) => Box::new(f),
            Literal::Bool(b) => Box::new(b),
        }
    }

    /// Produces a value of the field type `V`.
    ///
    /// The literal is assigned unchanged when `V` is its natural type. Otherwise
    /// the conversion service is asked; when it is absent or declines, the
    /// assignment fails with a conversion error.
    pub fn coerce<V: Any>(&self, conversion: Option<&dyn ConversionService>) -> ContainerResult<V> {
        let target = TypeId::of::<V>();
        if self.natural_type_id() == target {
            if let Ok(value) = self.clone().into_any().downcast::<V>() {
                return Ok(*value);
            }
        }

        let mismatch = |message: String| ContainerError::Conversion {
            source_type: self.natural_type_name(),
            target_type: std::any::type_name::<V>(),
            message,
        };

        match conversion {
            Some(service) if service.can_convert(self.natural_type_id(), target) => {
                let converted = service
                    .convert(self, target)
                    .map_err(|e| mismatch(e.to_string()))?;
                converted
                    .downcast::<V>()
                    .map(|v| *v)
                    .map_err(|_| mismatch("converter produced a value of another type".to_string()))
            }
            Some(_) => Err(mismatch("no converter registered".to_string())),
            None => Err(mismatch("no conversion service available".to_string())),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => f.write_str(s),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value as i64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

/// Value of a property: a literal scalar or a reference to another blueprint.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Literal(Literal),
    /// Reference to another blueprint by name; creates a dependency edge
    Reference(String),
}

impl PropertyValue {
    pub fn reference(name: impl Into<String>) -> Self {
        PropertyValue::Reference(name.into())
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, PropertyValue::Reference(_))
    }
}

impl<L: Into<Literal>> From<L> for PropertyValue {
    fn from(value: L) -> Self {
        PropertyValue::Literal(value.into())
    }
}

/// A named property with its value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: String,
    pub value: PropertyValue,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn literal(name: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::new(name, PropertyValue::Literal(value.into()))
    }

    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, PropertyValue::Reference(target.into()))
    }
}

/// Ordered set of property specs, unique by name.
///
/// ```rust
/// use ferrous_lifecycle::{PropertySpec, PropertyValues};
///
/// let mut values = PropertyValues::new();
/// values.add(PropertySpec::literal("brand", "porsche"));
/// values.add(PropertySpec::literal("doors", 2));
/// values.add(PropertySpec::literal("brand", "lamborghini"));
///
/// assert_eq!(values.len(), 2);
/// assert_eq!(values.iter().next().unwrap().name, "brand");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValues {
    specs: SmallVec<[PropertySpec; 4]>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spec, overwriting an existing spec with the same name in place.
    pub fn add(&mut self, spec: PropertySpec) {
        match self.specs.iter_mut().find(|existing| existing.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertySpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertySpec> {
        let pos = self.specs.iter().position(|spec| spec.name == name)?;
        Some(self.specs.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertySpec> {
        self.specs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PropertySpec> {
        self.specs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<PropertySpec> for PropertyValues {
    fn from_iter<I: IntoIterator<Item = PropertySpec>>(iter: I) -> Self {
        let mut values = PropertyValues::new();
        for spec in iter {
            values.add(spec);
        }
        values
    }
}

impl<'a> IntoIterator for &'a PropertyValues {
    type Item = &'a PropertySpec;
    type IntoIter = std::slice::Iter<'a, PropertySpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
