//! Component scope definitions.

use std::fmt;
use std::str::FromStr;

use crate::error::ContainerError;

/// Component scopes controlling instance caching behavior
///
/// # Scope Characteristics
///
/// - **Singleton**: built once per container, cached in the singleton cache,
///   eligible for early exposure during cycles and for teardown at shutdown
/// - **Prototype**: built fresh on every lookup, never cached, teardown not
///   tracked
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::Scope;
///
/// assert_eq!("prototype".parse::<Scope>().unwrap(), Scope::Prototype);
/// assert_eq!(Scope::default(), Scope::Singleton);
/// assert!("request".parse::<Scope>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Scope {
    /// Single instance per container, cached until shutdown
    #[default]
    Singleton,
    /// New instance per lookup, never cached
    Prototype,
}

impl Scope {
    pub fn is_singleton(self) -> bool {
        self == Scope::Singleton
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Singleton => "singleton",
            Scope::Prototype => "prototype",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // an empty scope attribute means the default
            "" | "singleton" => Ok(Scope::Singleton),
            "prototype" => Ok(Scope::Prototype),
            other => Err(ContainerError::Config(format!("unknown scope '{}'", other))),
        }
    }
}
