//! Error types for planning and production.

use std::fmt;
use std::sync::Arc;

use crate::key::Key;

/// Boxed error produced by user factories and release hooks.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while planning an object graph or producing instances.
///
/// Planning errors (`MissingDependency`, `CircularDependency`,
/// `ConflictingBindings`, `AxisConflict`) are detected before any user
/// factory runs. The remaining kinds surface at production or lookup time.
/// Every variant carries the keys needed to diagnose the failure without
/// reading library internals.
///
/// # Examples
///
/// ```
/// use kiln_di::{DiError, Injector, Key, Module, ProduceOptions};
///
/// struct Database;
///
/// // Planning an empty module against a root fails before anything runs.
/// let err = Injector::new()
///     .plan(&Module::new(), vec![Key::of::<Database>()], &ProduceOptions::default())
///     .unwrap_err();
/// match err {
///     DiError::MissingDependency { key, .. } => assert_eq!(key, Key::of::<Database>()),
///     other => panic!("unexpected error: {other}"),
/// }
/// ```
#[derive(Clone)]
pub enum DiError {
    /// No binding exists for a key reachable from the roots.
    MissingDependency {
        /// The key nothing binds.
        key: Key,
        /// The key whose binding required it, if it was not itself a root.
        required_by: Option<Key>,
    },
    /// A dependency chain closed on itself.
    CircularDependency {
        /// The cycle in traversal order; first and last entries are equal.
        cycle: Vec<Key>,
    },
    /// More than one equally specific binding survived filtering for a key.
    ConflictingBindings {
        /// The contested key.
        key: Key,
        /// Human-readable descriptions of the surviving candidates.
        bindings: Vec<String>,
    },
    /// Every candidate matching the base activation was ruled out by
    /// choices fixed earlier on the dependency path.
    AxisConflict {
        /// The key with no admissible candidate.
        key: Key,
        /// The key whose binding required it, if it was not itself a root.
        required_by: Option<Key>,
        /// Rendered description of the path constraints that rejected it.
        constraint: String,
    },
    /// A functoid or binding could not be assembled (e.g. dependency-key
    /// count does not match the callable's arity).
    FunctoidConstruction {
        /// What went wrong.
        reason: String,
    },
    /// A locator lookup found no value for the key.
    InstanceNotFound {
        /// The key that was looked up.
        key: Key,
    },
    /// A stored value could not be downcast to the requested type.
    TypeMismatch {
        /// The key whose value had an unexpected type.
        key: Key,
    },
    /// One or more release hooks failed during `Locator::close`.
    AggregateCleanup {
        /// Every release-time error, in the order the hooks ran.
        errors: Vec<Arc<dyn std::error::Error + Send + Sync>>,
    },
    /// A user factory failed while producing the value for a key.
    ProducerFailure {
        /// The key whose construction failed.
        key: Key,
        /// The underlying factory error.
        reason: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// Production was cancelled before it completed.
    Cancelled,
}

impl DiError {
    pub(crate) fn producer(key: Key, reason: FactoryError) -> Self {
        DiError::ProducerFailure { key, reason: Arc::from(reason) }
    }

    pub(crate) fn producer_msg(key: Key, message: impl Into<String>) -> Self {
        DiError::producer(key, message.into().into())
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::MissingDependency { key, required_by: Some(by) } => {
                write!(f, "no binding for {} (required by {})", key, by)
            }
            DiError::MissingDependency { key, required_by: None } => {
                write!(f, "no binding for {}", key)
            }
            DiError::CircularDependency { cycle } => {
                write!(f, "circular dependency: ")?;
                for (i, key) in cycle.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{}", key)?;
                }
                Ok(())
            }
            DiError::ConflictingBindings { key, bindings } => {
                write!(f, "conflicting bindings for {}: {}", key, bindings.join("; "))
            }
            DiError::AxisConflict { key, required_by: Some(by), constraint } => {
                write!(f, "axis conflict at {} (required by {}): {}", key, by, constraint)
            }
            DiError::AxisConflict { key, required_by: None, constraint } => {
                write!(f, "axis conflict at {}: {}", key, constraint)
            }
            DiError::FunctoidConstruction { reason } => {
                write!(f, "functoid construction failed: {}", reason)
            }
            DiError::InstanceNotFound { key } => write!(f, "no instance for {}", key),
            DiError::TypeMismatch { key } => {
                write!(f, "value for {} has an unexpected type", key)
            }
            DiError::AggregateCleanup { errors } => {
                write!(f, "{} release hook(s) failed during close", errors.len())?;
                for e in errors {
                    write!(f, "; {}", e)?;
                }
                Ok(())
            }
            DiError::ProducerFailure { key, reason } => {
                write!(f, "producing {} failed: {}", key, reason)
            }
            DiError::Cancelled => write!(f, "production was cancelled"),
        }
    }
}

impl fmt::Debug for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DiError({})", self)
    }
}

impl std::error::Error for DiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiError::ProducerFailure { reason, .. } => {
                let source: &(dyn std::error::Error + 'static) = reason.as_ref();
                Some(source)
            }
            _ => None,
        }
    }
}

/// Result type for planning, production, and lookup operations.
pub type DiResult<T> = Result<T, DiError>;
