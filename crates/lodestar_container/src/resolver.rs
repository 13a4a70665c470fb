//! Recursive dependency resolution.
//!
//! A [`Resolver`] lives for one top-level call (`resolve`, `wire`,
//! `dry_run`, ...). It tracks the path that led to the current request, the
//! providers currently being produced, and the cleanups acquired so far.
//!
//! # Lookup
//!
//! 1. A named request looks the name up directly. The provider must be
//!    viewable as the requested type.
//! 2. A by-type request first looks for an unnamed provider producing exactly
//!    that type.
//! 3. Otherwise every unnamed provider declaring the type as a capability is
//!    a candidate. Exactly one must match.
//!
//! # Production
//!
//! Singletons are produced once and cached, unless the request is transient
//! or the resolver is in [`Mode::DryRun`]. Each production gets a fresh
//! [`CleanupChain`] for the dependencies it resolves. If production fails,
//! that chain is rolled back before the error propagates. On success it is
//! composed into the produced instance's cleanup, keeping each child's
//! origin so a later rollback of the caller can still tell created
//! dependencies from shared ones.

use std::sync::Arc;

use crate::cleanup::CleanupChain;
use crate::container::Container;
use crate::dry_run::{Mode, Slot};
use crate::error::{ResolutionPath, WireError};
use crate::inject::{NamedCollection, Request};
use crate::key::{Key, NamedKey, TypeKey};
use crate::provider::{Instance, Lifecycle, ProduceError, Produced};
use crate::registry::DescriptorId;

/// Resolution state for one top-level container call.
pub struct Resolver<'c> {
    container: &'c Container,
    mode: Mode,
    path: ResolutionPath,
    active: Vec<DescriptorId>,
    chain: CleanupChain,
}

impl<'c> Resolver<'c> {
    pub(crate) fn new(container: &'c Container, mode: Mode) -> Self {
        Self {
            container,
            mode,
            path: ResolutionPath::new(),
            active: Vec::new(),
            chain: CleanupChain::new(),
        }
    }

    /// Returns whether this resolution is live or a dry run.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the path of the request currently being resolved.
    #[must_use]
    pub fn path(&self) -> &ResolutionPath {
        &self.path
    }

    /// Resolves a single dependency as `Arc<T>`.
    ///
    /// # Errors
    ///
    /// - [`WireError::ProviderNotFound`] if nothing matches
    /// - [`WireError::MultipleProvidersFound`] if a capability is ambiguous
    /// - [`WireError::TypeMismatch`] if a named provider is not a `T`
    /// - any error raised while producing the provider's own dependencies
    pub fn resolve<T: ?Sized + 'static>(
        &mut self,
        request: &Request<'_>,
    ) -> Result<Slot<Arc<T>>, WireError> {
        let (id, key) = self.lookup(TypeKey::of::<T>(), request)?;
        self.produce::<T>(id, key, request.is_transient())
    }

    /// Resolves a dependency that may be absent.
    ///
    /// Only a missing provider maps to `None`; every other error propagates.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve), except
    /// [`WireError::ProviderNotFound`] for the requested key itself.
    pub fn resolve_optional<T: ?Sized + 'static>(
        &mut self,
        request: &Request<'_>,
    ) -> Result<Slot<Option<Arc<T>>>, WireError> {
        match self.lookup(TypeKey::of::<T>(), request) {
            Ok((id, key)) => Ok(self.produce::<T>(id, key, request.is_transient())?.map(Some)),
            Err(WireError::ProviderNotFound { .. }) if self.mode.is_dry_run() => {
                Ok(Slot::Placeholder)
            }
            Err(WireError::ProviderNotFound { .. }) => Ok(Slot::Filled(None)),
            Err(err) => Err(err),
        }
    }

    /// Resolves every named provider viewable as `T`.
    ///
    /// Unnamed providers never take part. Providers whose type is neither `T`
    /// nor declares `T` as a capability are skipped even if their name would
    /// otherwise fit.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::ProviderNotFound`] for an empty collection, or the
    /// first error raised while producing a member.
    pub fn resolve_collection<T: ?Sized + 'static>(
        &mut self,
        transient: bool,
    ) -> Result<Slot<NamedCollection<T>>, WireError> {
        let wanted = TypeKey::of::<T>();
        let container = self.container;
        let members: Vec<(DescriptorId, NamedKey)> = container
            .registry()
            .iter()
            .filter(|(_, descriptor)| descriptor.satisfies(wanted))
            .filter_map(|(id, descriptor)| descriptor.name().map(|name| (id, name.clone())))
            .collect();

        if members.is_empty() {
            return Err(WireError::ProviderNotFound {
                key: Key::Collection(wanted),
                path: self.path.clone(),
            });
        }

        let mut collection = NamedCollection::with_capacity(members.len());
        let mut complete = true;
        for (id, name) in members {
            match self.produce::<T>(id, Key::Name(name.clone()), transient)? {
                Slot::Filled(value) => {
                    collection.insert(name, value);
                }
                Slot::Placeholder => complete = false,
            }
        }

        Ok(if complete {
            Slot::Filled(collection)
        } else {
            Slot::Placeholder
        })
    }

    /// Runs `f` with `segment` appended to the resolution path.
    pub(crate) fn scoped<R>(&mut self, segment: String, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    /// Hands over the cleanups acquired by this resolution.
    pub(crate) fn into_chain(self) -> CleanupChain {
        self.chain
    }

    fn lookup(
        &self,
        wanted: TypeKey,
        request: &Request<'_>,
    ) -> Result<(DescriptorId, Key), WireError> {
        let registry = self.container.registry();

        if let Some(name) = request.name() {
            let key = Key::Name(NamedKey::new(name));
            let Some(id) = registry.named(name) else {
                return Err(WireError::ProviderNotFound {
                    key,
                    path: self.path.clone(),
                });
            };
            let descriptor = registry.descriptor(id);
            if !descriptor.satisfies(wanted) {
                return Err(WireError::TypeMismatch {
                    key,
                    expected: wanted.type_name(),
                    found: descriptor.produced().type_name(),
                    path: self.path.clone(),
                });
            }
            return Ok((id, key));
        }

        let key = Key::Type(wanted);
        if let Some(id) = registry.typed(wanted) {
            return Ok((id, key));
        }

        let candidates: Vec<DescriptorId> = registry
            .iter()
            .filter(|(_, descriptor)| descriptor.name().is_none() && descriptor.satisfies(wanted))
            .map(|(id, _)| id)
            .collect();

        match candidates.as_slice() {
            [] => Err(WireError::ProviderNotFound {
                key,
                path: self.path.clone(),
            }),
            [id] => Ok((*id, key)),
            _ => Err(WireError::MultipleProvidersFound {
                key,
                candidates: candidates
                    .iter()
                    .map(|id| registry.descriptor(*id).produced().type_name())
                    .collect(),
                path: self.path.clone(),
            }),
        }
    }

    fn produce<T: ?Sized + 'static>(
        &mut self,
        id: DescriptorId,
        key: Key,
        transient: bool,
    ) -> Result<Slot<Arc<T>>, WireError> {
        let container = self.container;
        let Slot::Filled(instance) = self.instantiate(id, &key, transient)? else {
            return Ok(Slot::Placeholder);
        };

        let descriptor = container.registry().descriptor(id);
        descriptor
            .cast::<T>(instance)
            .map(Slot::Filled)
            .ok_or_else(|| WireError::TypeMismatch {
                key,
                expected: core::any::type_name::<T>(),
                found: descriptor.produced().type_name(),
                path: self.path.clone(),
            })
    }

    fn instantiate(
        &mut self,
        id: DescriptorId,
        key: &Key,
        transient: bool,
    ) -> Result<Slot<Instance>, WireError> {
        let label = self.container.registry().descriptor(id).label();
        self.scoped(label, |resolver| resolver.instantiate_in_scope(id, key, transient))
    }

    fn instantiate_in_scope(
        &mut self,
        id: DescriptorId,
        key: &Key,
        transient: bool,
    ) -> Result<Slot<Instance>, WireError> {
        let container = self.container;
        let descriptor = container.registry().descriptor(id);

        if self.active.contains(&id) {
            return Err(WireError::CircularDependency {
                path: self.path.clone(),
            });
        }

        let cacheable = !self.mode.is_dry_run()
            && !transient
            && descriptor.lifecycle() == Lifecycle::Singleton;

        if cacheable && let Some((instance, cleanup)) = descriptor.cached() {
            tracing::trace!(provider = %key, "reusing cached singleton");
            self.chain.push_shared(cleanup);
            return Ok(Slot::Filled(instance));
        }

        self.active.push(id);
        let parent = core::mem::take(&mut self.chain);
        let produced = descriptor.produce(self);
        let children = core::mem::replace(&mut self.chain, parent);
        self.active.pop();

        let produced = match produced {
            Ok(produced) => produced,
            Err(err) => {
                if !children.is_empty() {
                    tracing::warn!(
                        provider = %key,
                        acquired = children.len(),
                        "rolling back partially produced dependencies"
                    );
                }
                children.rollback(|evicted| container.evict(evicted));
                return Err(match err {
                    ProduceError::Wire(err) => err,
                    ProduceError::Failed(source) => WireError::ProviderFailed {
                        key: key.clone(),
                        path: self.path.clone(),
                        source,
                    },
                });
            }
        };

        let Slot::Filled(Produced { instance, cleanup }) = produced else {
            return Ok(Slot::Placeholder);
        };

        if cacheable {
            let cleanup = children.compose_cached(cleanup, descriptor.uncache(&instance));
            descriptor.store(Arc::clone(&instance), cleanup.clone());
            container.record_created(id);
            self.chain.push_created(cleanup, Some(id));
            tracing::debug!(provider = %key, "created singleton");
        } else {
            self.chain.push_created(children.compose(cleanup), None);
            tracing::trace!(provider = %key, "created instance");
        }

        Ok(Slot::Filled(instance))
    }
}

impl core::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resolver")
            .field("mode", &self.mode)
            .field("path", &self.path)
            .field("acquired", &self.chain.len())
            .finish_non_exhaustive()
    }
}
