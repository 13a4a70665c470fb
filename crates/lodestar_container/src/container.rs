//! The container: registration, resolution, wiring and teardown.
//!
//! [`Container`] is the public entry point. Registration takes `&mut self`
//! and never runs a producer. Resolution and wiring take `&self`; they touch
//! only the per-provider singleton caches. [`Container::teardown`] releases
//! every cached singleton in reverse creation order.
//!
//! # Example
//!
//! ```
//! use lodestar_container::prelude::*;
//! use std::sync::Arc;
//!
//! let mut container = Container::new();
//! container.register_named("count", Provider::value(5_u32)).unwrap();
//!
//! let (count, _cleanup) = container.resolve_named::<u32>("count").unwrap();
//! assert_eq!(*count, 5);
//!
//! let cleanup = container
//!     .wire_fn(|count: Arc<u32>| assert_eq!(*count, 5))
//!     .unwrap();
//! cleanup.run();
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cleanup::{Cleanup, CleanupChain};
use crate::dry_run::{Mode, Slot};
use crate::error::WireError;
use crate::inject::{InjectParams, NamedCollection, Request};
use crate::key::{NamedKey, TypeKey};
use crate::module::Module;
use crate::provider::AnyProvider;
use crate::registry::{DescriptorId, Registry};
use crate::resolver::Resolver;
use crate::wire::{FieldWirer, IntoWireFn, Wire};

/// A dependency-resolution and object-lifecycle container.
#[derive(Debug, Default)]
pub struct Container {
    registry: Registry,
    /// Singletons in creation order, for teardown.
    created: Mutex<Vec<DescriptorId>>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────

    /// Registers a provider under `name`.
    ///
    /// An empty name registers the provider by its produced type instead.
    ///
    /// # Errors
    ///
    /// - [`WireError::ProviderAlreadyExists`] if the key is taken
    /// - [`WireError::InvalidProviderShape`] if the produced type is `()` or
    ///   [`Cleanup`]
    ///
    /// The container is unchanged on error.
    pub fn register_named(
        &mut self,
        name: impl Into<NamedKey>,
        provider: impl Into<AnyProvider>,
    ) -> Result<(), WireError> {
        let name = Some(name.into()).filter(|name| !name.is_empty());
        let provider = provider.into();
        let produced = provider.produced();
        let id = self.registry.insert(name, provider)?;
        tracing::debug!(
            provider = %self.registry.descriptor(id).label(),
            produced = %produced,
            "registered provider"
        );
        Ok(())
    }

    /// Registers a provider under the type it produces.
    ///
    /// # Errors
    ///
    /// Same as [`register_named`](Self::register_named).
    pub fn register_by_type(&mut self, provider: impl Into<AnyProvider>) -> Result<(), WireError> {
        self.register_named("", provider)
    }

    /// Registers several named providers at once.
    ///
    /// Either every entry is registered or, on error, none is. Duplicate
    /// names within the batch are rejected too.
    ///
    /// # Errors
    ///
    /// Same as [`register_named`](Self::register_named).
    pub fn register_all_named<N, I>(&mut self, entries: I) -> Result<(), WireError>
    where
        N: Into<NamedKey>,
        I: IntoIterator<Item = (N, AnyProvider)>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, provider)| (Some(name.into()).filter(|name| !name.is_empty()), provider))
            .collect();
        let ids = self.registry.insert_batch(entries)?;
        tracing::debug!(count = ids.len(), "registered providers");
        Ok(())
    }

    /// Registers several providers under their produced types at once.
    ///
    /// # Errors
    ///
    /// Same as [`register_all_named`](Self::register_all_named).
    pub fn register_all_by_type<I>(&mut self, providers: I) -> Result<(), WireError>
    where
        I: IntoIterator<Item = AnyProvider>,
    {
        let entries = providers
            .into_iter()
            .map(|provider| (None, provider))
            .collect();
        let ids = self.registry.insert_batch(entries)?;
        tracing::debug!(count = ids.len(), "registered providers");
        Ok(())
    }

    /// Installs a module.
    ///
    /// # Errors
    ///
    /// Returns the module's first registration error.
    pub fn install(&mut self, module: impl Module) -> Result<(), WireError> {
        self.install_ref(&module)
    }

    pub(crate) fn install_ref<M: Module + ?Sized>(&mut self, module: &M) -> Result<(), WireError> {
        tracing::debug!(module = module.name(), "installing module");
        module.register(self)
    }

    /// Returns `true` if a provider is registered under `name`.
    #[must_use]
    pub fn contains_named(&self, name: &str) -> bool {
        self.registry.named(name).is_some()
    }

    /// Returns `true` if an unnamed provider produces exactly `T`.
    #[must_use]
    pub fn contains_type<T: ?Sized + 'static>(&self) -> bool {
        self.registry.typed(TypeKey::of::<T>()).is_some()
    }

    /// Returns `true` if the provider registered under `name` holds a cached
    /// singleton.
    #[must_use]
    pub fn is_cached_named(&self, name: &str) -> bool {
        self.registry
            .named(name)
            .is_some_and(|id| self.registry.descriptor(id).is_cached())
    }

    /// Returns `true` if the unnamed provider of `T` holds a cached singleton.
    #[must_use]
    pub fn is_cached_type<T: ?Sized + 'static>(&self) -> bool {
        self.registry
            .typed(TypeKey::of::<T>())
            .is_some_and(|id| self.registry.descriptor(id).is_cached())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────

    /// Resolves `T` by type.
    ///
    /// `T` may be a concrete type or a capability such as `dyn Greeter`. The
    /// returned cleanup releases what this call acquired, with the same
    /// ownership rules as [`wire`](Self::wire).
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn resolve<T: ?Sized + 'static>(&self) -> Result<(Arc<T>, Cleanup), WireError> {
        self.resolve_request::<T>(&Request::new())
    }

    /// Resolves the provider registered under `name` as `T`.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn resolve_named<T: ?Sized + 'static>(
        &self,
        name: &str,
    ) -> Result<(Arc<T>, Cleanup), WireError> {
        self.resolve_request::<T>(&Request::new().named(name))
    }

    /// Resolves `T` as described by `request`.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn resolve_request<T: ?Sized + 'static>(
        &self,
        request: &Request<'_>,
    ) -> Result<(Arc<T>, Cleanup), WireError> {
        self.run_live(|resolver| resolver.resolve::<T>(request))
    }

    /// Resolves every named provider viewable as `T`.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_collection`].
    pub fn resolve_all<T: ?Sized + 'static>(
        &self,
    ) -> Result<(NamedCollection<T>, Cleanup), WireError> {
        self.run_live(|resolver| resolver.resolve_collection::<T>(false))
    }

    /// Checks that `T` could be resolved as described by `request`, without
    /// running any producer.
    ///
    /// # Errors
    ///
    /// Every error [`resolve_request`](Self::resolve_request) could return,
    /// except errors reported by producer bodies.
    pub fn check_request<T: ?Sized + 'static>(&self, request: &Request<'_>) -> Result<(), WireError> {
        let mut resolver = Resolver::new(self, Mode::DryRun);
        resolver.resolve::<T>(request).map(|_| ())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Wiring
    // ─────────────────────────────────────────────────────────────────────

    /// Wires every field of `target`, then runs its after-wire hook.
    ///
    /// The returned cleanup releases the dependencies acquired for the
    /// target in reverse order, then whatever the hook returned. Running it
    /// releases singletons too, whether this call created them or found them
    /// cached, and every released singleton is evicted: the next resolution
    /// produces a new instance instead of handing out a released one.
    /// Singletons whose cleanup never ran are released by
    /// [`teardown`](Self::teardown).
    ///
    /// # Errors
    ///
    /// Returns the first resolution error, or [`WireError::TargetFailed`] if
    /// the hook fails. Instances created by this call before the failure are
    /// released at every depth of the graph and singletons among them are
    /// evicted. Singletons that were already cached stay cached and are not
    /// released.
    pub fn wire<T: Wire>(&self, target: &mut T) -> Result<Cleanup, WireError> {
        self.wire_target(target, Mode::Live)
    }

    /// Checks that every field of `target` could be wired.
    ///
    /// No producer runs, no field is assigned, no hook runs and no cache is
    /// touched. The returned cleanup does nothing.
    ///
    /// # Errors
    ///
    /// Every error [`wire`](Self::wire) could return, except errors reported
    /// by producer bodies or the hook.
    pub fn dry_run<T: Wire>(&self, target: &mut T) -> Result<Cleanup, WireError> {
        self.wire_target(target, Mode::DryRun)
    }

    /// Resolves the parameters of `function` and calls it.
    ///
    /// A parameter of type [`NamedCollection<T>`] receives every named
    /// provider viewable as `T`.
    ///
    /// # Errors
    ///
    /// - [`WireError::InvalidWireTargetShape`] if `function` takes no
    ///   parameters
    /// - the first resolution error
    /// - [`WireError::TargetFailed`] if `function` returns an error
    pub fn wire_fn<F, M>(&self, function: F) -> Result<Cleanup, WireError>
    where
        F: IntoWireFn<M>,
    {
        self.wire_function(function, Mode::Live)
    }

    /// Checks that the parameters of `function` could be resolved, without
    /// calling it.
    ///
    /// # Errors
    ///
    /// Every error [`wire_fn`](Self::wire_fn) could return, except errors
    /// reported by producer bodies or `function` itself.
    pub fn dry_run_fn<F, M>(&self, function: F) -> Result<Cleanup, WireError>
    where
        F: IntoWireFn<M>,
    {
        self.wire_function(function, Mode::DryRun)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────

    /// Releases every cached singleton, most recently created first.
    ///
    /// Singletons already released through a returned cleanup were evicted
    /// at that point and are skipped. Registrations stay in place, so the
    /// next resolution produces new instances.
    pub fn teardown(&mut self) {
        let created = core::mem::take(self.created.get_mut());
        tracing::debug!(count = created.len(), "tearing down container");

        for id in created.into_iter().rev() {
            if let Some(cleanup) = self.registry.descriptor(id).take_cached() {
                cleanup.run();
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn record_created(&self, id: DescriptorId) {
        let mut created = self.created.lock();
        created.retain(|created| *created != id);
        created.push(id);
    }

    /// Forgets a singleton created by a failed attempt.
    ///
    /// Its cleanup has already run during rollback, which also cleared its
    /// cache slot.
    pub(crate) fn evict(&self, id: DescriptorId) {
        drop(self.registry.descriptor(id).take_cached());
        self.created.lock().retain(|created| *created != id);
        tracing::debug!(
            provider = %self.registry.descriptor(id).label(),
            "evicted singleton"
        );
    }

    fn roll_back(&self, chain: CleanupChain, err: &WireError) {
        if !chain.is_empty() {
            tracing::warn!(
                error = %err,
                acquired = chain.len(),
                "rolling back failed wiring"
            );
        }
        chain.rollback(|id| self.evict(id));
    }

    fn run_live<V>(
        &self,
        resolve: impl FnOnce(&mut Resolver<'_>) -> Result<Slot<V>, WireError>,
    ) -> Result<(V, Cleanup), WireError> {
        let mut resolver = Resolver::new(self, Mode::Live);
        let result = resolve(&mut resolver);
        let chain = resolver.into_chain();

        match result {
            Ok(Slot::Filled(value)) => Ok((value, chain.compose(None))),
            Ok(Slot::Placeholder) => unreachable!("live resolution never yields a placeholder"),
            Err(err) => {
                self.roll_back(chain, &err);
                Err(err)
            }
        }
    }

    fn wire_target<T: Wire>(&self, target: &mut T, mode: Mode) -> Result<Cleanup, WireError> {
        let name = core::any::type_name::<T>();
        let mut resolver = Resolver::new(self, mode);
        let wired = target.wire_fields(&mut FieldWirer::new(&mut resolver, name));
        let chain = resolver.into_chain();

        if let Err(err) = wired {
            self.roll_back(chain, &err);
            return Err(err);
        }
        if mode.is_dry_run() {
            return Ok(Cleanup::noop());
        }

        let own = match target.after_wire_hook().map(|hook| hook.after_wire()) {
            None => None,
            Some(Ok(own)) => own,
            Some(Err(source)) => {
                let err = WireError::TargetFailed {
                    target: name,
                    source,
                };
                self.roll_back(chain, &err);
                return Err(err);
            }
        };

        tracing::debug!(wire_target = name, acquired = chain.len(), "wired target");
        Ok(chain.compose(own))
    }

    fn wire_function<F, M>(&self, function: F, mode: Mode) -> Result<Cleanup, WireError>
    where
        F: IntoWireFn<M>,
    {
        let name = core::any::type_name::<F>();
        if F::ARITY == 0 {
            return Err(WireError::InvalidWireTargetShape(format!(
                "{name} must take at least one parameter"
            )));
        }

        let mut resolver = Resolver::new(self, mode);
        let params = resolver.scoped(name.to_owned(), |resolver| {
            <F::Params as InjectParams>::inject_all(resolver)
        });
        let chain = resolver.into_chain();

        let params = match params {
            Ok(Slot::Filled(params)) => params,
            Ok(Slot::Placeholder) => return Ok(Cleanup::noop()),
            Err(err) => {
                self.roll_back(chain, &err);
                return Err(err);
            }
        };

        if let Err(source) = function.invoke(params) {
            let err = WireError::TargetFailed {
                target: name,
                source,
            };
            self.roll_back(chain, &err);
            return Err(err);
        }

        tracing::debug!(wire_target = name, acquired = chain.len(), "wired function");
        Ok(chain.compose(None))
    }
}
