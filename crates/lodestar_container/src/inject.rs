//! Injectable parameter and field types.
//!
//! A type implementing [`Inject`] knows how to obtain itself from a
//! [`Resolver`]. Factory parameters, wired function parameters and wired
//! struct fields are all expressed in these terms.
//!
//! # Built-in Implementations
//!
//! - `Arc<T>` - a required dependency, by type or by name
//! - `Option<Arc<T>>` - an optional dependency, `None` when nothing is registered
//! - [`NamedCollection<T>`] - every named provider that can be viewed as `T`
//!
//! `T` may be a concrete type or a capability type such as `dyn Greeter`.

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use variadics_please::all_tuples;

use crate::dry_run::Slot;
use crate::error::WireError;
use crate::key::NamedKey;
use crate::resolver::Resolver;

/// Every named provider viewable as `T`, keyed by name.
pub type NamedCollection<T> = HashMap<NamedKey, Arc<T>>;

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// How a single dependency should be looked up.
///
/// The default request resolves by type and honours the provider's lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Request<'a> {
    name: Option<&'a str>,
    transient: bool,
}

impl<'a> Request<'a> {
    /// A by-type request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: None,
            transient: false,
        }
    }

    /// Looks the dependency up by name. An empty name keeps the by-type lookup.
    #[must_use]
    pub const fn named(mut self, name: &'a str) -> Self {
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Produces a fresh instance even if the provider is a singleton.
    #[must_use]
    pub const fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Returns the requested name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.name
    }

    /// Returns `true` if the request bypasses the singleton cache.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

impl fmt::Display for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "\"{name}\"")?,
            None => f.write_str("<by type>")?,
        }
        if self.transient {
            f.write_str(",transient")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inject
// ─────────────────────────────────────────────────────────────────────────────

/// A type that can be obtained from a [`Resolver`].
pub trait Inject: Sized + 'static {
    /// Resolves the value.
    ///
    /// Returns [`Slot::Placeholder`] during a dry run.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the dependency cannot be resolved.
    fn inject(resolver: &mut Resolver<'_>, request: &Request<'_>) -> Result<Slot<Self>, WireError>;
}

impl<T: ?Sized + 'static> Inject for Arc<T> {
    fn inject(resolver: &mut Resolver<'_>, request: &Request<'_>) -> Result<Slot<Self>, WireError> {
        resolver.resolve::<T>(request)
    }
}

impl<T: ?Sized + 'static> Inject for Option<Arc<T>> {
    fn inject(resolver: &mut Resolver<'_>, request: &Request<'_>) -> Result<Slot<Self>, WireError> {
        resolver.resolve_optional::<T>(request)
    }
}

impl<T: ?Sized + 'static> Inject for NamedCollection<T> {
    fn inject(resolver: &mut Resolver<'_>, request: &Request<'_>) -> Result<Slot<Self>, WireError> {
        if let Some(name) = request.name() {
            return Err(WireError::InvalidWireTargetShape(format!(
                "named collection of {} cannot be requested by name \"{name}\"",
                core::any::type_name::<T>()
            )));
        }
        resolver.resolve_collection::<T>(request.is_transient())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InjectParams
// ─────────────────────────────────────────────────────────────────────────────

/// A tuple of [`Inject`] parameters, resolved by type in order.
pub trait InjectParams: Sized + 'static {
    /// Resolves every parameter.
    ///
    /// During a dry run every parameter is still resolved, so all structural
    /// errors surface, but the result is [`Slot::Placeholder`].
    ///
    /// # Errors
    ///
    /// Returns the first [`WireError`] encountered.
    fn inject_all(resolver: &mut Resolver<'_>) -> Result<Slot<Self>, WireError>;
}

impl InjectParams for () {
    fn inject_all(resolver: &mut Resolver<'_>) -> Result<Slot<Self>, WireError> {
        if resolver.mode().is_dry_run() {
            return Ok(Slot::Placeholder);
        }
        Ok(Slot::Filled(()))
    }
}

macro_rules! impl_inject_params {
    ($(($P:ident, $p:ident)),*) => {
        impl<$($P: Inject),*> InjectParams for ($($P,)*) {
            fn inject_all(resolver: &mut Resolver<'_>) -> Result<Slot<Self>, WireError> {
                let request = Request::new();
                $(let $p = $P::inject(resolver, &request)?;)*

                if resolver.mode().is_dry_run() {
                    return Ok(Slot::Placeholder);
                }
                match ($($p,)*) {
                    ($(Slot::Filled($p),)*) => Ok(Slot::Filled(($($p,)*))),
                    _ => Ok(Slot::Placeholder),
                }
            }
        }
    };
}

all_tuples!(impl_inject_params, 1, 8, P, p);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_means_by_type() {
        assert_eq!(Request::new().named(""), Request::new());
        assert_eq!(Request::new().named("count").name(), Some("count"));
    }

    #[test]
    fn request_display() {
        assert_eq!(Request::new().to_string(), "<by type>");
        assert_eq!(
            Request::new().named("count").transient().to_string(),
            "\"count\",transient"
        );
    }
}
