//! Blueprint documents in JSON or YAML.
//!
//! ```yaml
//! component_scan:
//!   - my_app::services
//! components:
//!   - name: car
//!     type: Car
//!     scope: prototype
//!     init: start
//!     properties:
//!       - name: brand
//!         value: porsche
//!       - name: engine
//!         ref: engine
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::blueprint::Blueprint;
use crate::catalog::{default_component_name, TypeCatalog};
use crate::engine::LifecycleEngine;
use crate::error::{ContainerError, ContainerResult};
use crate::scan::ComponentScanner;
use crate::scope::Scope;
use crate::value::{Literal, PropertySpec, PropertyValue};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    component_scan: Vec<String>,
    #[serde(default)]
    components: Vec<ComponentDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComponentDoc {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    lazy: bool,
    #[serde(default)]
    init: Option<String>,
    #[serde(default)]
    teardown: Option<String>,
    #[serde(default)]
    properties: Vec<PropertyDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropertyDoc {
    name: String,
    #[serde(default)]
    value: Option<ScalarDoc>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScalarDoc {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<ScalarDoc> for Literal {
    fn from(doc: ScalarDoc) -> Self {
        match doc {
            ScalarDoc::Bool(b) => Literal::Bool(b),
            ScalarDoc::Int(i) => Literal::Int(i),
            ScalarDoc::Float(f) => Literal::Float(f),
            ScalarDoc::Str(s) => Literal::Str(s),
        }
    }
}

/// Loads blueprint documents into an engine.
///
/// Type names resolve through the [`TypeCatalog`]. Registration follows the
/// engine's duplicate policy, like every other registration source.
pub struct BlueprintReader<'a> {
    engine: &'a LifecycleEngine,
    catalog: &'a TypeCatalog,
}

impl<'a> BlueprintReader<'a> {
    pub fn new(engine: &'a LifecycleEngine, catalog: &'a TypeCatalog) -> Self {
        Self { engine, catalog }
    }

    /// Loads a JSON document; returns the number of blueprints registered.
    pub fn load_json_str(&self, document: &str) -> ContainerResult<usize> {
        let doc: Document =
            serde_json::from_str(document).map_err(|e| ContainerError::Config(format!("invalid JSON document: {}", e)))?;
        self.load_document(doc)
    }

    /// Loads a YAML document; returns the number of blueprints registered.
    pub fn load_yaml_str(&self, document: &str) -> ContainerResult<usize> {
        let doc: Document =
            serde_yaml::from_str(document).map_err(|e| ContainerError::Config(format!("invalid YAML document: {}", e)))?;
        self.load_document(doc)
    }

    /// Loads a file, choosing the format by extension (`.json`, `.yaml`, `.yml`).
    pub fn load_path(&self, path: impl AsRef<Path>) -> ContainerResult<usize> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContainerError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.load_json_str(&text),
            Some("yaml") | Some("yml") => self.load_yaml_str(&text),
            _ => Err(ContainerError::Config(format!(
                "unsupported document format: {}",
                path.display()
            ))),
        }
    }

    fn load_document(&self, doc: Document) -> ContainerResult<usize> {
        let mut registered = 0;
        if !doc.component_scan.is_empty() {
            let namespaces: Vec<&str> = doc.component_scan.iter().map(String::as_str).collect();
            registered += ComponentScanner::new(self.engine, self.catalog).scan(&namespaces)?;
        }
        for component in doc.components {
            let (name, blueprint) = self.blueprint_from(component)?;
            tracing::debug!(component = %name, "loaded blueprint");
            self.engine.register(&name, blueprint)?;
            registered += 1;
        }
        Ok(registered)
    }

    fn blueprint_from(&self, doc: ComponentDoc) -> ContainerResult<(String, Blueprint)> {
        let ty = self
            .catalog
            .resolve(&doc.type_name)
            .ok_or_else(|| ContainerError::Config(format!("unknown component type '{}'", doc.type_name)))?;

        let name = doc
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_component_name(ty));
        let scope: Scope = doc.scope.as_deref().unwrap_or_default().parse()?;

        let mut blueprint = Blueprint::new(ty.clone()).with_scope(scope).with_lazy(doc.lazy);
        if let Some(init) = &doc.init {
            blueprint = blueprint.with_init(init);
        }
        if let Some(teardown) = &doc.teardown {
            blueprint = blueprint.with_teardown(teardown);
        }

        for property in doc.properties {
            let value = match (property.value, property.reference) {
                (Some(value), None) => PropertyValue::Literal(value.into()),
                (None, Some(reference)) => PropertyValue::Reference(reference),
                _ => {
                    return Err(ContainerError::Config(format!(
                        "property '{}' of '{}' needs exactly one of 'value' or 'ref'",
                        property.name, name
                    )))
                }
            };
            blueprint = blueprint.with_property(PropertySpec::new(property.name, value));
        }

        Ok((name, blueprint))
    }
}
