//! `${key}` placeholder substitution backed by a properties table.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::engine::LifecycleEngine;
use crate::error::{ContainerError, ContainerResult};
use crate::traits::{BlueprintPostProcessor, StringValueResolver};
use crate::value::{Literal, PropertyValue};

const PREFIX: &str = "${";
const SUFFIX: &str = "}";

/// Key/value table in `.properties` syntax.
///
/// Lines are `key=value` or `key: value`; lines starting with `#` or `!`
/// are comments. Keys and values are trimmed.
///
/// ```
/// use ferrous_lifecycle::Properties;
///
/// let props = Properties::parse("# car\nbrand = lamborghini\nseats: 2\n");
/// assert_eq!(props.get("brand"), Some("lamborghini"));
/// assert_eq!(props.get("seats"), Some("2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let split = line.find(|c| c == '=' || c == ':');
            let (key, value) = match split {
                Some(pos) => (&line[..pos], &line[pos + 1..]),
                None => (line, ""),
            };
            props.set(key.trim(), value.trim());
        }
        props
    }

    /// Reads and parses a properties file.
    pub fn load(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContainerError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(Self::parse(&text))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replaces every `${key}` in `value` with its property.
///
/// An unterminated `${` is left as is; an unknown key is an error.
pub fn resolve_placeholders(value: &str, properties: &Properties) -> ContainerResult<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find(PREFIX) {
        let after = &rest[start + PREFIX.len()..];
        let Some(end) = after.find(SUFFIX) else {
            break;
        };
        let key = &after[..end];
        let replacement = properties
            .get(key)
            .ok_or_else(|| ContainerError::Placeholder(key.to_string()))?;
        out.push_str(&rest[..start]);
        out.push_str(replacement);
        rest = &after[end + SUFFIX.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Substitutes placeholders in literal string properties of every blueprint,
/// then joins the string resolution chain so injected `${...}` values resolve
/// against the same table.
#[derive(Debug, Clone)]
pub struct PlaceholderConfigurer {
    properties: Arc<Properties>,
}

impl PlaceholderConfigurer {
    pub fn new(properties: Properties) -> Self {
        Self {
            properties: Arc::new(properties),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        Ok(Self::new(Properties::load(path)?))
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

impl BlueprintPostProcessor for PlaceholderConfigurer {
    fn post_process(&self, engine: &LifecycleEngine) -> ContainerResult<()> {
        for name in engine.blueprint_names() {
            let blueprint = engine.blueprint(&name)?;
            let needs_rewrite = blueprint.properties().iter().any(|spec| {
                matches!(&spec.value, PropertyValue::Literal(Literal::Str(s)) if s.contains(PREFIX))
            });
            if !needs_rewrite {
                continue;
            }

            engine.update_blueprint(&name, |bp| -> ContainerResult<()> {
                for spec in bp.properties_mut().iter_mut() {
                    if let PropertyValue::Literal(Literal::Str(s)) = &mut spec.value {
                        *s = resolve_placeholders(s, &self.properties)?;
                    }
                }
                Ok(())
            })??;
            tracing::debug!(component = %name, "placeholders resolved");
        }

        let properties = self.properties.clone();
        engine.add_embedded_value_resolver(Arc::new(PlaceholderResolver { properties }));
        Ok(())
    }
}

struct PlaceholderResolver {
    properties: Arc<Properties>,
}

impl StringValueResolver for PlaceholderResolver {
    fn resolve(&self, value: &str) -> ContainerResult<String> {
        resolve_placeholders(value, &self.properties)
    }
}
