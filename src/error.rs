//! Error types for the lifecycle container.

use std::fmt;

use crate::pipeline::HookStage;

/// Boxed error returned by user-supplied callbacks (init and teardown
/// operations, factory products, hooks, converters).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Container errors
///
/// Every failure surfaces synchronously to the caller of `get_bean` and
/// friends. Failures are never memoized: a failed build leaves no cache trace,
/// so the next lookup attempts a full rebuild.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{ContainerError, LifecycleEngine};
///
/// let engine = LifecycleEngine::new();
/// match engine.get_bean("missing") {
///     Err(ContainerError::NotFound(name)) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// No blueprint is registered under the name
    #[error("No component named '{0}' is defined")]
    NotFound(String),

    /// A blueprint with the same name already exists and the registry rejects overwrites
    #[error("Component name '{0}' is already registered")]
    DuplicateName(String),

    /// Instantiation, population or initialization of a component failed
    #[error("Error creating component '{name}': {source}")]
    Build {
        name: String,
        #[source]
        source: Box<ContainerError>,
    },

    /// An extension hook failed
    #[error("Hook '{hook}' failed during {stage} of component '{component}': {source}")]
    Processing {
        hook: String,
        stage: HookStage,
        component: String,
        #[source]
        source: BoxError,
    },

    /// One or more teardown operations failed
    #[error(transparent)]
    Destruction(#[from] DestructionError),

    /// The instance did not have the requested type
    #[error("Component '{name}' is not of required type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// A property spec names a field with no setter in the assignment table
    #[error("Component '{component}' has no writable property '{property}'")]
    UnknownProperty { component: String, property: String },

    /// A declared init/teardown operation name is not known to the component type
    #[error("Could not find an operation named '{operation}' on component '{component}'")]
    UnknownOperation { component: String, operation: String },

    /// A user-supplied lifecycle operation returned an error
    #[error("Operation '{operation}' of component '{component}' failed: {source}")]
    Operation {
        component: String,
        operation: String,
        #[source]
        source: BoxError,
    },

    /// Singular lookup by capability matched zero or several blueprints
    #[error("Expected single component of type {capability} but found {}: {}", .candidates.len(), .candidates.join(", "))]
    NoUniqueComponent {
        capability: &'static str,
        candidates: Vec<String>,
    },

    /// `&name` was requested for a component that is not a factory
    #[error("Component '{0}' is not a factory")]
    NotAFactory(String),

    /// A component re-entered its own construction without an early reference to break the cycle
    #[error("Circular reference: {}", .0.join(" -> "))]
    Circular(Vec<String>),

    /// Maximum creation depth exceeded
    #[error("Max creation depth {0} exceeded")]
    DepthExceeded(usize),

    /// A literal could not be converted to the field's declared type
    #[error("Cannot convert {source_type} to {target_type}: {message}")]
    Conversion {
        source_type: &'static str,
        target_type: &'static str,
        message: String,
    },

    /// A `${...}` placeholder had no value
    #[error("Could not resolve placeholder '{0}'")]
    Placeholder(String),

    /// Invalid blueprint document or settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// A container handle outlived its container
    #[error("Container has been dropped")]
    ContainerDropped,
}

impl ContainerError {
    /// Wraps a failure into a build error carrying the component name.
    pub fn build(name: impl Into<String>, source: ContainerError) -> Self {
        ContainerError::Build {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Walks nested build errors down to the first non-build cause.
    ///
    /// ```rust
    /// use ferrous_lifecycle::ContainerError;
    ///
    /// let err = ContainerError::build("a", ContainerError::build("b", ContainerError::NotFound("c".into())));
    /// assert!(matches!(err.root_cause(), ContainerError::NotFound(name) if name == "c"));
    /// ```
    pub fn root_cause(&self) -> &ContainerError {
        let mut current = self;
        while let ContainerError::Build { source, .. } = current {
            current = source;
        }
        current
    }
}

/// A single failed teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Component whose teardown failed
    pub name: String,
    /// Rendered cause
    pub message: String,
}

/// Teardown failures collected by `destroy_all`.
///
/// A failing teardown never prevents the remaining registered teardowns from
/// running; all failures are reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestructionError {
    pub failures: Vec<TeardownFailure>,
}

impl DestructionError {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.failures.push(TeardownFailure {
            name: name.into(),
            message: message.into(),
        });
    }
}

impl fmt::Display for DestructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} teardown(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; '{}': {}", failure.name, failure.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for DestructionError {}

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;
