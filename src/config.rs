//! Container settings.
//!
//! Settings can be built in code, read from environment variables prefixed
//! with `FERROUS_LIFECYCLE_`, or deserialized from a JSON or YAML document.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

/// What happens when a blueprint name is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum DuplicatePolicy {
    /// The later registration replaces the earlier one
    #[default]
    Overwrite,
    /// The later registration fails with `DuplicateName`
    Reject,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Overwrite => f.write_str("overwrite"),
            DuplicatePolicy::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(ContainerError::Config(format!("unknown duplicate policy '{}'", other))),
        }
    }
}

/// Engine-wide settings.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{ContainerSettings, DuplicatePolicy};
///
/// let settings = ContainerSettings::default()
///     .with_duplicate_policy(DuplicatePolicy::Reject)
///     .with_max_creation_depth(64);
///
/// assert!(settings.allow_circular_references);
/// assert_eq!(settings.max_creation_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerSettings {
    pub duplicate_policy: DuplicatePolicy,
    /// Expose early references so singleton cycles resolve
    pub allow_circular_references: bool,
    /// Maximum nesting of component creations on one thread
    pub max_creation_depth: usize,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Overwrite,
            allow_circular_references: true,
            max_creation_depth: 1024,
        }
    }
}

impl ContainerSettings {
    /// Prefix of the environment variables read by [`from_env`](Self::from_env).
    pub const ENV_PREFIX: &'static str = "FERROUS_LIFECYCLE";

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    pub fn with_max_creation_depth(mut self, depth: usize) -> Self {
        self.max_creation_depth = depth;
        self
    }

    /// Reads settings from `FERROUS_LIFECYCLE_*` variables; unset keys keep
    /// their defaults.
    pub fn from_env() -> ContainerResult<Self> {
        Self::from_source(&EnvironmentSource::with_prefix(Self::ENV_PREFIX))
    }

    /// Reads settings from any key/value source.
    pub fn from_source(source: &dyn SettingsSource) -> ContainerResult<Self> {
        let mut settings = Self::default();
        if let Some(policy) = source.get("duplicate_policy") {
            settings.duplicate_policy = policy.parse()?;
        }
        if let Some(allow) = source.get("allow_circular_references") {
            settings.allow_circular_references = parse_value("allow_circular_references", &allow)?;
        }
        if let Some(depth) = source.get("max_creation_depth") {
            settings.max_creation_depth = parse_value("max_creation_depth", &depth)?;
        }
        Ok(settings)
    }

    #[cfg(feature = "config")]
    pub fn from_json_str(document: &str) -> ContainerResult<Self> {
        serde_json::from_str(document).map_err(|e| ContainerError::Config(format!("invalid settings: {}", e)))
    }

    #[cfg(feature = "config")]
    pub fn from_yaml_str(document: &str) -> ContainerResult<Self> {
        serde_yaml::from_str(document).map_err(|e| ContainerError::Config(format!("invalid settings: {}", e)))
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> ContainerResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ContainerError::Config(format!("invalid value '{}' for {}", raw, key)))
}

/// Source of raw settings values.
pub trait SettingsSource: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
}

/// Environment variable source
#[derive(Debug, Default)]
pub struct EnvironmentSource {
    prefix: Option<String>,
}

impl EnvironmentSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl SettingsSource for EnvironmentSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(self.env_key(key)).ok()
    }
}

impl SettingsSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_source_overrides_defaults() {
        let mut source = HashMap::new();
        source.insert("duplicate_policy".to_string(), "Reject".to_string());
        source.insert("max_creation_depth".to_string(), "16".to_string());

        let settings = ContainerSettings::from_source(&source).unwrap();
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(settings.max_creation_depth, 16);
        assert!(settings.allow_circular_references);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let mut source = HashMap::new();
        source.insert("allow_circular_references".to_string(), "sometimes".to_string());
        assert!(matches!(
            ContainerSettings::from_source(&source),
            Err(ContainerError::Config(_))
        ));

        assert!("keep-both".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn env_key_uses_prefix() {
        let source = EnvironmentSource::with_prefix("ferrous_lifecycle");
        assert_eq!(source.env_key("max_creation_depth"), "FERROUS_LIFECYCLE_MAX_CREATION_DEPTH");
    }

    #[cfg(feature = "config")]
    #[test]
    fn partial_documents_fill_defaults() {
        let settings = ContainerSettings::from_json_str(r#"{ "allow_circular_references": false }"#).unwrap();
        assert!(!settings.allow_circular_references);
        assert_eq!(settings.max_creation_depth, 1024);

        let settings = ContainerSettings::from_yaml_str("duplicate_policy: reject\n").unwrap();
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::Reject);
    }
}
