//! Blueprints: declarative descriptions of how to build one named component.

use crate::component::ComponentType;
use crate::scope::Scope;
use crate::value::{PropertySpec, PropertyValue, PropertyValues};

/// How to build one component.
///
/// The shape of a blueprint is fixed once registered; hooks may only rewrite
/// its property values, and they do so on a copy.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Blueprint, ComponentType, Scope, Shared};
///
/// #[derive(Default)]
/// struct Wheel { size: i64 }
///
/// let ty = ComponentType::builder::<Wheel>()
///     .property("size", |w: &mut Wheel, v: i64| w.size = v)
///     .build();
///
/// let blueprint = Blueprint::new(ty)
///     .with_scope(Scope::Prototype)
///     .with_literal("size", 18)
///     .with_init("check");
///
/// assert!(!blueprint.is_singleton());
/// assert_eq!(blueprint.init_operation(), Some("check"));
/// ```
#[derive(Debug, Clone)]
pub struct Blueprint {
    ty: ComponentType,
    scope: Scope,
    lazy: bool,
    properties: PropertyValues,
    init_operation: Option<String>,
    teardown_operation: Option<String>,
}

impl Blueprint {
    pub fn new(ty: ComponentType) -> Self {
        Self {
            ty,
            scope: Scope::Singleton,
            lazy: false,
            properties: PropertyValues::new(),
            init_operation: None,
            teardown_operation: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_property(mut self, spec: PropertySpec) -> Self {
        self.properties.add(spec);
        self
    }

    pub fn with_literal(self, name: &str, value: impl Into<crate::value::Literal>) -> Self {
        self.with_property(PropertySpec::literal(name, value))
    }

    pub fn with_reference(self, name: &str, target: &str) -> Self {
        self.with_property(PropertySpec::new(name, PropertyValue::reference(target)))
    }

    pub fn with_properties(mut self, properties: PropertyValues) -> Self {
        self.properties = properties;
        self
    }

    /// Declares an init operation by name. Empty names are ignored.
    pub fn with_init(mut self, operation: &str) -> Self {
        self.init_operation = Some(operation.to_string()).filter(|s| !s.is_empty());
        self
    }

    /// Declares a teardown operation by name. Empty names are ignored.
    pub fn with_teardown(mut self, operation: &str) -> Self {
        self.teardown_operation = Some(operation.to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn component_type(&self) -> &ComponentType {
        &self.ty
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }

    pub fn is_prototype(&self) -> bool {
        !self.is_singleton()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Whether the blueprint's product is itself a factory.
    pub fn is_factory(&self) -> bool {
        self.ty.is_factory()
    }

    pub fn properties(&self) -> &PropertyValues {
        &self.properties
    }

    /// Mutable access for in-place rewrites before any component is built.
    pub fn properties_mut(&mut self) -> &mut PropertyValues {
        &mut self.properties
    }

    pub fn init_operation(&self) -> Option<&str> {
        self.init_operation.as_deref()
    }

    pub fn teardown_operation(&self) -> Option<&str> {
        self.teardown_operation.as_deref()
    }

    /// Whether a teardown applies: declared by name or by the type's contract.
    pub fn has_teardown(&self) -> bool {
        self.teardown_operation.is_some() || self.ty.is_disposable()
    }
}
