//! Autowiring hook: turns a component type's injection points into
//! property specs ahead of generic population.

use crate::component::{InjectionKind, Instance};
use crate::engine::LifecycleEngine;
use crate::error::{BoxError, ContainerError};
use crate::pipeline::LifecycleHook;
use crate::value::{PropertySpec, PropertyValue, PropertyValues};

/// Name under which the autowiring hook is registered.
pub const AUTOWIRED_PROCESSOR: &str = "autowired-processor";

/// Builds the autowiring hook.
///
/// For every injection point of the component's type that has no explicit
/// property spec:
/// - a value expression is folded through the string resolution chain and
///   becomes a string literal;
/// - an autowired field becomes a reference to the single blueprint carrying
///   the field's type;
/// - a qualified field becomes a reference to the named blueprint.
///
/// Explicit property specs win over injection points of the same name.
pub struct AutowiredProcessor;

impl AutowiredProcessor {
    pub fn hook() -> LifecycleHook {
        LifecycleHook::new(AUTOWIRED_PROCESSOR).before_population(Self::inject)
    }

    fn inject(
        engine: &LifecycleEngine,
        mut values: PropertyValues,
        _instance: &Instance,
        name: &str,
    ) -> Result<PropertyValues, BoxError> {
        let blueprint = engine.blueprint(name)?;
        for point in blueprint.component_type().injection_points() {
            if values.get(&point.field).is_some() {
                continue;
            }
            let value = match &point.kind {
                InjectionKind::Value(expression) => {
                    PropertyValue::from(engine.resolve_embedded_value(expression)?)
                }
                InjectionKind::ByType { type_id, type_name } => {
                    let mut candidates = engine.names_for_type_id(*type_id);
                    if candidates.len() != 1 {
                        return Err(Box::new(ContainerError::NoUniqueComponent {
                            capability: *type_name,
                            candidates,
                        }));
                    }
                    PropertyValue::Reference(candidates.remove(0))
                }
                InjectionKind::Qualified(target) => PropertyValue::Reference(target.clone()),
            };
            tracing::trace!(component = name, field = %point.field, "injection point resolved");
            values.add(PropertySpec::new(point.field.clone(), value));
        }
        Ok(values)
    }
}
