//! Errors produced by registration, resolution and wiring.
//!
//! Every failure surfaces as a [`WireError`]. Callers that need to branch on
//! the failure should match on [`WireError::kind`] rather than on the
//! rendered message.

use core::fmt;

use crate::key::Key;

/// Boxed error returned by producers, wired functions and after-wire hooks.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

// ─────────────────────────────────────────────────────────────────────────────
// ResolutionPath
// ─────────────────────────────────────────────────────────────────────────────

/// The chain of fields and providers that led to a failure.
///
/// Rendered as `Target.field "name"->Type->...`, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPath(Vec<String>);

impl ResolutionPath {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, segment: String) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }

    /// Returns the path segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if the failure happened at the top level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResolutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("->"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ErrorKind
// ─────────────────────────────────────────────────────────────────────────────

/// Sentinel identifying the category of a [`WireError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No provider matches the requested key.
    ProviderNotFound,
    /// A provider is already registered under the key.
    ProviderAlreadyExists,
    /// More than one provider satisfies a capability request.
    MultipleProvidersFound,
    /// The provider cannot be registered in its current shape.
    InvalidProviderShape,
    /// The wire target cannot be wired in its current shape.
    InvalidWireTargetShape,
    /// A provider depends on itself, directly or transitively.
    CircularDependency,
    /// A named provider does not produce the requested type.
    TypeMismatch,
    /// A producer body reported an error.
    ProviderFailed,
    /// A wired function or after-wire hook reported an error.
    TargetFailed,
}

// ─────────────────────────────────────────────────────────────────────────────
// WireError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while registering providers or wiring targets.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// No provider was found for the key.
    #[error("no provider was found for {key}: {path}")]
    ProviderNotFound {
        /// The requested key.
        key: Key,
        /// Where the request originated.
        path: ResolutionPath,
    },

    /// A provider is already registered under the key.
    #[error("a provider is already registered for {key}")]
    ProviderAlreadyExists {
        /// The occupied key.
        key: Key,
    },

    /// Several type-keyed providers satisfy the requested capability.
    #[error("multiple providers found for {key} [{names}]: {path}", names = .candidates.join(", "))]
    MultipleProvidersFound {
        /// The requested capability.
        key: Key,
        /// Produced type names of the matching providers.
        candidates: Vec<&'static str>,
        /// Where the request originated.
        path: ResolutionPath,
    },

    /// The provider's produced type cannot be registered.
    #[error("invalid provider shape: {0}")]
    InvalidProviderShape(String),

    /// The target cannot be wired.
    #[error("invalid wire target shape: {0}")]
    InvalidWireTargetShape(String),

    /// A provider was requested while it was already being produced.
    #[error("circular dependency detected: {path}")]
    CircularDependency {
        /// The cycle, ending at the repeated provider.
        path: ResolutionPath,
    },

    /// A named provider exists but does not produce the requested type.
    #[error("provider {key} produces {found}, which cannot be used as {expected}: {path}")]
    TypeMismatch {
        /// The requested key.
        key: Key,
        /// The requested type.
        expected: &'static str,
        /// The type the provider produces.
        found: &'static str,
        /// Where the request originated.
        path: ResolutionPath,
    },

    /// A producer body returned an error.
    #[error("provider for {key} failed: {path}")]
    ProviderFailed {
        /// The provider that failed.
        key: Key,
        /// Where the request originated.
        path: ResolutionPath,
        /// The producer's error.
        #[source]
        source: BoxError,
    },

    /// A wired function or after-wire hook returned an error.
    #[error("wire target {target} failed")]
    TargetFailed {
        /// The target type name.
        target: &'static str,
        /// The target's error.
        #[source]
        source: BoxError,
    },
}

impl WireError {
    /// Returns the sentinel for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderNotFound { .. } => ErrorKind::ProviderNotFound,
            Self::ProviderAlreadyExists { .. } => ErrorKind::ProviderAlreadyExists,
            Self::MultipleProvidersFound { .. } => ErrorKind::MultipleProvidersFound,
            Self::InvalidProviderShape(_) => ErrorKind::InvalidProviderShape,
            Self::InvalidWireTargetShape(_) => ErrorKind::InvalidWireTargetShape,
            Self::CircularDependency { .. } => ErrorKind::CircularDependency,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::ProviderFailed { .. } => ErrorKind::ProviderFailed,
            Self::TargetFailed { .. } => ErrorKind::TargetFailed,
        }
    }

    /// Returns the resolution path, if the error carries one.
    #[must_use]
    pub fn path(&self) -> Option<&ResolutionPath> {
        match self {
            Self::ProviderNotFound { path, .. }
            | Self::MultipleProvidersFound { path, .. }
            | Self::CircularDependency { path }
            | Self::TypeMismatch { path, .. }
            | Self::ProviderFailed { path, .. } => Some(path),
            Self::ProviderAlreadyExists { .. }
            | Self::InvalidProviderShape(_)
            | Self::InvalidWireTargetShape(_)
            | Self::TargetFailed { .. } => None,
        }
    }
}
