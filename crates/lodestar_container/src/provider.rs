//! Providers: the values and factories a container can hand out.
//!
//! A [`Provider<T>`] describes how to produce a `T`: from a constant value or
//! from a factory function whose parameters are themselves injected. The
//! provider also carries its [`Lifecycle`] and the capability types it can be
//! viewed as.
//!
//! # Factory shapes
//!
//! | Constructor | Factory signature |
//! |-------------|-------------------|
//! | [`Provider::factory`] | `Fn(P..) -> T` |
//! | [`Provider::try_factory`] | `Fn(P..) -> Result<T, E>` |
//! | [`Provider::factory_with_cleanup`] | `Fn(P..) -> (T, Cleanup)` |
//! | [`Provider::try_factory_with_cleanup`] | `Fn(P..) -> Result<(T, Cleanup), E>` |
//!
//! Each `P` implements [`Inject`](crate::inject::Inject); up to eight
//! parameters are supported.
//!
//! # Example
//!
//! ```
//! use lodestar_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Message(String);
//!
//! struct Polite {
//!     message: Arc<Message>,
//! }
//!
//! impl Greeter for Polite {
//!     fn greet(&self) -> String {
//!         format!("{}, please", self.message.0)
//!     }
//! }
//!
//! let mut container = Container::new();
//! container
//!     .register_by_type(Provider::value(Message("hello".into())))
//!     .unwrap();
//! container
//!     .register_by_type(
//!         Provider::factory(|message: Arc<Message>| Polite { message })
//!             .implements::<dyn Greeter>(|it| it as Arc<dyn Greeter>),
//!     )
//!     .unwrap();
//!
//! let (greeter, _cleanup) = container.resolve::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "hello, please");
//! ```

use core::any::Any;
use core::marker::PhantomData;
use std::sync::Arc;

use variadics_please::all_tuples;

use crate::cleanup::Cleanup;
use crate::dry_run::Slot;
use crate::error::{BoxError, WireError};
use crate::inject::{Inject, InjectParams};
use crate::key::TypeKey;
use crate::resolver::Resolver;

/// A produced value, type-erased.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

type Caster = Box<dyn Fn(Instance) -> Option<Box<dyn Any>> + Send + Sync>;

pub(crate) type Producer =
    Box<dyn Fn(&mut Resolver<'_>) -> Result<Slot<Produced>, ProduceError> + Send + Sync>;

/// Output of a producer run.
pub(crate) struct Produced {
    pub(crate) instance: Instance,
    pub(crate) cleanup: Option<Cleanup>,
}

/// Why a producer run did not produce.
pub(crate) enum ProduceError {
    /// A parameter could not be resolved.
    Wire(WireError),
    /// The producer body reported an error.
    Failed(BoxError),
}

impl From<WireError> for ProduceError {
    fn from(err: WireError) -> Self {
        Self::Wire(err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// How long a produced value lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Produced once, cached, and reused until teardown.
    #[default]
    Singleton,
    /// Produced afresh for every resolution, never cached.
    Transient,
}

// ─────────────────────────────────────────────────────────────────────────────
// Views
// ─────────────────────────────────────────────────────────────────────────────

/// One type a produced instance can be handed out as.
pub(crate) struct View {
    pub(crate) key: TypeKey,
    cast: Caster,
}

impl View {
    fn of_self<T: Send + Sync + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            cast: Box::new(|instance: Instance| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|it| Box::new(it) as Box<dyn Any>)
            }),
        }
    }

    /// Casts an instance to `Arc<I>`, where `I` is this view's type.
    pub(crate) fn cast<I: ?Sized + 'static>(&self, instance: Instance) -> Option<Arc<I>> {
        (self.cast)(instance)
            .and_then(|boxed| boxed.downcast::<Arc<I>>().ok())
            .map(|boxed| *boxed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Factory
// ─────────────────────────────────────────────────────────────────────────────

/// A function whose parameters can be injected.
///
/// Implemented for `Fn(P..) -> Out` with up to eight [`Inject`] parameters.
/// The `Marker` type parameter keeps the per-arity implementations apart.
pub trait Factory<Marker>: Send + Sync + 'static {
    /// The injected parameters as a tuple.
    type Params: InjectParams;
    /// The function's return type.
    type Output;

    /// Calls the function with resolved parameters.
    fn call(&self, params: Self::Params) -> Self::Output;
}

macro_rules! impl_factory {
    ($(($P:ident, $p:ident)),*) => {
        impl<Func, Out, $($P),*> Factory<fn($($P,)*) -> Out> for Func
        where
            Func: Fn($($P),*) -> Out + Send + Sync + 'static,
            $($P: Inject,)*
        {
            type Params = ($($P,)*);
            type Output = Out;

            fn call(&self, params: Self::Params) -> Out {
                let ($($p,)*) = params;
                (self)($($p),*)
            }
        }
    };
}

all_tuples!(impl_factory, 0, 8, P, p);

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Describes how to produce a `T`.
///
/// Providers default to [`Lifecycle::Singleton`] and can always be resolved
/// as `T` itself. Use [`implements`](Self::implements) to make them
/// resolvable as capability types as well.
pub struct Provider<T> {
    producer: Producer,
    lifecycle: Lifecycle,
    views: Vec<View>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Provider<T> {
    fn from_producer(producer: Producer) -> Self {
        Self {
            producer,
            lifecycle: Lifecycle::Singleton,
            views: vec![View::of_self::<T>()],
            _marker: PhantomData,
        }
    }

    fn from_factory<F, M>(
        factory: F,
        split: fn(F::Output) -> Result<(T, Option<Cleanup>), BoxError>,
    ) -> Self
    where
        F: Factory<M>,
        M: 'static,
    {
        Self::from_producer(Box::new(move |resolver: &mut Resolver<'_>| {
            let Slot::Filled(params) = <F::Params as InjectParams>::inject_all(resolver)? else {
                return Ok(Slot::Placeholder);
            };
            let (value, cleanup) = split(factory.call(params)).map_err(ProduceError::Failed)?;
            Ok(Slot::Filled(Produced {
                instance: Arc::new(value),
                cleanup,
            }))
        }))
    }

    /// A provider handing out a constant value.
    #[must_use]
    pub fn value(value: T) -> Self {
        let instance: Instance = Arc::new(value);
        Self::from_producer(Box::new(move |resolver: &mut Resolver<'_>| {
            if resolver.mode().is_dry_run() {
                return Ok(Slot::Placeholder);
            }
            Ok(Slot::Filled(Produced {
                instance: Arc::clone(&instance),
                cleanup: None,
            }))
        }))
    }

    /// A provider calling an infallible factory.
    #[must_use]
    pub fn factory<F, M>(factory: F) -> Self
    where
        F: Factory<M, Output = T>,
        M: 'static,
    {
        Self::from_factory(factory, |value| Ok((value, None)))
    }

    /// A provider calling a fallible factory.
    ///
    /// A factory error fails the resolution with
    /// [`WireError::ProviderFailed`].
    #[must_use]
    pub fn try_factory<F, M, E>(factory: F) -> Self
    where
        F: Factory<M, Output = Result<T, E>>,
        M: 'static,
        E: Into<BoxError> + 'static,
    {
        Self::from_factory(factory, |result| {
            result.map(|value| (value, None)).map_err(Into::into)
        })
    }

    /// A provider calling a factory that also returns a release callback.
    #[must_use]
    pub fn factory_with_cleanup<F, M>(factory: F) -> Self
    where
        F: Factory<M, Output = (T, Cleanup)>,
        M: 'static,
    {
        Self::from_factory(factory, |(value, cleanup)| Ok((value, Some(cleanup))))
    }

    /// A provider calling a fallible factory that also returns a release
    /// callback.
    #[must_use]
    pub fn try_factory_with_cleanup<F, M, E>(factory: F) -> Self
    where
        F: Factory<M, Output = Result<(T, Cleanup), E>>,
        M: 'static,
        E: Into<BoxError> + 'static,
    {
        Self::from_factory(factory, |result| {
            result
                .map(|(value, cleanup)| (value, Some(cleanup)))
                .map_err(Into::into)
        })
    }

    /// Produces a new value on every resolution instead of caching one.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.lifecycle = Lifecycle::Transient;
        self
    }

    /// Makes the provider resolvable as the capability type `I`.
    ///
    /// `cast` is usually the unsizing coercion `|it| it as Arc<dyn I>`.
    /// Declaring the same capability twice keeps the last cast.
    #[must_use]
    pub fn implements<I: ?Sized + 'static>(
        mut self,
        cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    ) -> Self {
        let key = TypeKey::of::<I>();
        self.views.retain(|view| view.key != key);
        self.views.push(View {
            key,
            cast: Box::new(move |instance: Instance| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|it| Box::new(cast(it)) as Box<dyn Any>)
            }),
        });
        self
    }

    /// Returns the lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Erases the produced type.
    #[must_use]
    pub fn into_any(self) -> AnyProvider {
        AnyProvider {
            producer: self.producer,
            produced: TypeKey::of::<T>(),
            lifecycle: self.lifecycle,
            views: self.views,
        }
    }
}

impl<T> core::fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Provider")
            .field("produced", &core::any::type_name::<T>())
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AnyProvider
// ─────────────────────────────────────────────────────────────────────────────

/// A [`Provider`] with its produced type erased, ready for registration.
pub struct AnyProvider {
    pub(crate) producer: Producer,
    pub(crate) produced: TypeKey,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) views: Vec<View>,
}

impl AnyProvider {
    /// Returns the produced type.
    #[must_use]
    pub fn produced(&self) -> TypeKey {
        self.produced
    }

    /// Returns the lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns `true` if the provider can be resolved as `key`.
    #[must_use]
    pub fn satisfies(&self, key: TypeKey) -> bool {
        self.views.iter().any(|view| view.key == key)
    }
}

impl<T: Send + Sync + 'static> From<Provider<T>> for AnyProvider {
    fn from(provider: Provider<T>) -> Self {
        provider.into_any()
    }
}

impl core::fmt::Debug for AnyProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnyProvider")
            .field("produced", &self.produced)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
