//! Wiring targets: structs with injectable fields and functions with
//! injectable parameters.
//!
//! # Struct targets
//!
//! A struct target implements [`Wire`], usually through
//! `#[derive(Wire)]`. The implementation is a field table: for each wired
//! field it asks the [`FieldWirer`] for a value described by a [`FieldSpec`]
//! and assigns it. During a dry run the wirer returns `None` and the field is
//! left untouched.
//!
//! ```
//! use lodestar_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Settings {
//!     retries: u32,
//! }
//!
//! #[derive(Default)]
//! struct Client {
//!     settings: Option<Arc<Settings>>,
//! }
//!
//! impl Wire for Client {
//!     fn wire_fields(&mut self, wirer: &mut FieldWirer<'_, '_>) -> Result<(), WireError> {
//!         if let Some(settings) = wirer.field::<Arc<Settings>>(FieldSpec::new("settings"))? {
//!             self.settings = Some(settings);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut container = Container::new();
//! container
//!     .register_by_type(Provider::value(Settings { retries: 3 }))
//!     .unwrap();
//!
//! let mut client = Client::default();
//! container.wire(&mut client).unwrap();
//! assert_eq!(client.settings.unwrap().retries, 3);
//! ```
//!
//! # Function targets
//!
//! Any `FnOnce` taking one to eight [`Inject`] parameters and returning `()`
//! or `Result<(), E>` can be wired with
//! [`Container::wire_fn`](crate::container::Container::wire_fn).

use variadics_please::all_tuples;

use crate::cleanup::Cleanup;
use crate::dry_run::{Mode, Slot};
use crate::error::{BoxError, WireError};
use crate::inject::{Inject, InjectParams, Request};
use crate::resolver::Resolver;

// ─────────────────────────────────────────────────────────────────────────────
// FieldSpec
// ─────────────────────────────────────────────────────────────────────────────

/// How one field of a struct target is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    field: &'static str,
    name: Option<&'static str>,
    transient: bool,
}

impl FieldSpec {
    /// Wires `field` by its declared type.
    #[must_use]
    pub const fn new(field: &'static str) -> Self {
        Self {
            field,
            name: None,
            transient: false,
        }
    }

    /// Wires the field from the provider registered under `name`.
    ///
    /// An empty name keeps the by-type lookup.
    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Wires the field with a fresh instance even if the provider is a
    /// singleton.
    #[must_use]
    pub const fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Returns the provider name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Returns `true` if the field bypasses the singleton cache.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    fn request(&self) -> Request<'static> {
        let request = match self.name {
            Some(name) => Request::new().named(name),
            None => Request::new(),
        };
        if self.transient {
            request.transient()
        } else {
            request
        }
    }

    fn segment(&self, target: &str) -> String {
        match self.name {
            Some(name) => format!("{target}.{} \"{name}\"", self.field),
            None => format!("{target}.{}", self.field),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FieldWirer
// ─────────────────────────────────────────────────────────────────────────────

/// Resolves field values for a [`Wire`] implementation.
pub struct FieldWirer<'r, 'c> {
    resolver: &'r mut Resolver<'c>,
    target: &'static str,
}

impl<'r, 'c> FieldWirer<'r, 'c> {
    pub(crate) fn new(resolver: &'r mut Resolver<'c>, target: &'static str) -> Self {
        Self { resolver, target }
    }

    /// Returns the target type name.
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Returns whether values are being produced or only checked.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.resolver.mode()
    }

    /// Resolves the value for one field.
    ///
    /// Returns `Ok(None)` during a dry run, after every check has passed.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the field's dependency cannot be resolved.
    pub fn field<F: Inject>(&mut self, spec: FieldSpec) -> Result<Option<F>, WireError> {
        let request = spec.request();
        self.resolver
            .scoped(spec.segment(self.target), |resolver| {
                F::inject(resolver, &request)
            })
            .map(Slot::into_option)
    }
}

impl core::fmt::Debug for FieldWirer<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FieldWirer")
            .field("target", &self.target)
            .field("resolver", &self.resolver)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire / AfterWire
// ─────────────────────────────────────────────────────────────────────────────

/// A struct whose fields can be wired by a container.
///
/// Usually derived; see the crate-level `Wire` derive macro.
pub trait Wire {
    /// Resolves and assigns every wired field.
    ///
    /// # Errors
    ///
    /// Returns the first [`WireError`] raised by the [`FieldWirer`].
    fn wire_fields(&mut self, wirer: &mut FieldWirer<'_, '_>) -> Result<(), WireError>;

    /// Returns the hook to run once all fields are wired, if the target has
    /// one.
    fn after_wire_hook(&mut self) -> Option<&mut dyn AfterWire> {
        None
    }
}

/// A hook run once after a struct target's fields are wired.
///
/// Not run during a dry run.
pub trait AfterWire {
    /// Finishes initialization.
    ///
    /// A returned cleanup runs after the cleanups of the wired dependencies.
    ///
    /// # Errors
    ///
    /// An error fails the wiring with [`WireError::TargetFailed`] and rolls
    /// back the dependencies acquired for it.
    fn after_wire(&mut self) -> Result<Option<Cleanup>, BoxError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Function targets
// ─────────────────────────────────────────────────────────────────────────────

/// Return types allowed for wired functions.
pub trait WireOutcome {
    /// Converts the return value into a wiring result.
    ///
    /// # Errors
    ///
    /// Returns the function's own error.
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl WireOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> WireOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// A function whose parameters can be wired.
///
/// Implemented for `FnOnce(P..) -> Out` with up to eight [`Inject`]
/// parameters and `Out: WireOutcome`. The zero-parameter implementation
/// exists so the shape can be rejected at call time.
pub trait IntoWireFn<Marker> {
    /// Number of parameters.
    const ARITY: usize;

    /// The injected parameters as a tuple.
    type Params: InjectParams;

    /// Calls the function with resolved parameters.
    ///
    /// # Errors
    ///
    /// Returns the function's own error.
    fn invoke(self, params: Self::Params) -> Result<(), BoxError>;
}

macro_rules! count_one {
    ($P:ident) => {
        1
    };
}

macro_rules! impl_into_wire_fn {
    ($(($P:ident, $p:ident)),*) => {
        impl<Func, Out, $($P),*> IntoWireFn<fn($($P,)*) -> Out> for Func
        where
            Func: FnOnce($($P),*) -> Out,
            Out: WireOutcome,
            $($P: Inject,)*
        {
            const ARITY: usize = 0 $(+ count_one!($P))*;

            type Params = ($($P,)*);

            fn invoke(self, params: Self::Params) -> Result<(), BoxError> {
                let ($($p,)*) = params;
                (self)($($p),*).into_outcome()
            }
        }
    };
}

all_tuples!(impl_into_wire_fn, 0, 8, P, p);
