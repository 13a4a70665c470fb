//! Provider descriptors and their lookup tables.
//!
//! The [`Registry`] owns one [`Descriptor`] per registered provider. Named
//! registrations are reachable only through the name table; unnamed ones only
//! through the produced-type table. Both tables reject occupied keys.

use std::sync::{Arc, Weak};

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;

use crate::cleanup::{Cleanup, CleanupFn};
use crate::dry_run::Slot;
use crate::error::WireError;
use crate::key::{Key, NamedKey, TypeKey};
use crate::provider::{AnyProvider, Instance, Lifecycle, ProduceError, Produced, Producer, View};
use crate::resolver::Resolver;

/// Index of a descriptor within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(usize);

impl DescriptorId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the registration index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Descriptor
// ─────────────────────────────────────────────────────────────────────────────

struct Cached {
    instance: Instance,
    cleanup: Cleanup,
}

/// A registered provider together with its singleton cache.
pub struct Descriptor {
    name: Option<NamedKey>,
    produced: TypeKey,
    lifecycle: Lifecycle,
    producer: Producer,
    views: Vec<View>,
    cache: Arc<Mutex<Option<Cached>>>,
}

impl Descriptor {
    fn new(name: Option<NamedKey>, provider: AnyProvider) -> Self {
        Self {
            name,
            produced: provider.produced,
            lifecycle: provider.lifecycle,
            producer: provider.producer,
            views: provider.views,
            cache: Arc::default(),
        }
    }

    /// Returns the registration name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&NamedKey> {
        self.name.as_ref()
    }

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

    /// Returns `true` if instances can be handed out as `key`.
    #[must_use]
    pub fn satisfies(&self, key: TypeKey) -> bool {
        self.views.iter().any(|view| view.key == key)
    }

    /// Returns `true` if a singleton instance is cached.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.lock().is_some()
    }

    /// Path segment identifying this descriptor.
    pub(crate) fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("\"{name}\" ({})", self.produced),
            None => self.produced.to_string(),
        }
    }

    pub(crate) fn produce(&self, resolver: &mut Resolver<'_>) -> Result<Slot<Produced>, ProduceError> {
        (self.producer)(resolver)
    }

    pub(crate) fn cached(&self) -> Option<(Instance, Cleanup)> {
        self.cache
            .lock()
            .as_ref()
            .map(|cached| (Arc::clone(&cached.instance), cached.cleanup.clone()))
    }

    pub(crate) fn store(&self, instance: Instance, cleanup: Cleanup) {
        *self.cache.lock() = Some(Cached { instance, cleanup });
    }

    /// Returns a callback that clears the cache if it still holds `instance`.
    ///
    /// The callback holds the cache weakly and ignores any instance cached
    /// after `instance` was evicted.
    pub(crate) fn uncache(&self, instance: &Instance) -> CleanupFn {
        let slot = Arc::downgrade(&self.cache);
        let instance = Arc::downgrade(instance);
        Box::new(move || {
            let Some(slot) = slot.upgrade() else {
                return;
            };
            let evicted = {
                let mut slot = slot.lock();
                let holds = slot.as_ref().is_some_and(|cached| {
                    Weak::ptr_eq(&Arc::downgrade(&cached.instance), &instance)
                });
                if holds { slot.take() } else { None }
            };
            drop(evicted);
        })
    }

    /// Clears the cache, returning the cleanup of the evicted instance.
    pub(crate) fn take_cached(&self) -> Option<Cleanup> {
        self.cache.lock().take().map(|cached| cached.cleanup)
    }

    /// Hands an instance out as `T`, if `T` is one of its views.
    pub(crate) fn cast<T: ?Sized + 'static>(&self, instance: Instance) -> Option<Arc<T>> {
        let key = TypeKey::of::<T>();
        self.views
            .iter()
            .find(|view| view.key == key)
            .and_then(|view| view.cast::<T>(instance))
    }
}

impl core::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("produced", &self.produced)
            .field("lifecycle", &self.lifecycle)
            .field("cached", &self.is_cached())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Storage for provider descriptors.
///
/// Registration never runs a producer. Descriptors are never removed; only
/// their caches are cleared on teardown.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: Vec<Descriptor>,
    by_name: HashMap<NamedKey, DescriptorId>,
    by_type: HashMap<TypeKey, DescriptorId>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Looks a descriptor up by name.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<DescriptorId> {
        self.by_name.get(name).copied()
    }

    /// Looks an unnamed descriptor up by the exact type it produces.
    #[must_use]
    pub fn typed(&self, key: TypeKey) -> Option<DescriptorId> {
        self.by_type.get(&key).copied()
    }

    /// Returns the descriptor for an id minted by this registry.
    #[must_use]
    pub fn descriptor(&self, id: DescriptorId) -> &Descriptor {
        &self.descriptors[id.0]
    }

    /// Iterates descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (DescriptorId, &Descriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (DescriptorId::new(index), descriptor))
    }

    /// Registers a provider under a name, or under its produced type when
    /// `name` is `None`.
    pub(crate) fn insert(
        &mut self,
        name: Option<NamedKey>,
        provider: AnyProvider,
    ) -> Result<DescriptorId, WireError> {
        self.validate(name.as_ref(), &provider)?;
        Ok(self.insert_unchecked(name, provider))
    }

    /// Registers a batch of providers, or none of them.
    pub(crate) fn insert_batch(
        &mut self,
        entries: Vec<(Option<NamedKey>, AnyProvider)>,
    ) -> Result<Vec<DescriptorId>, WireError> {
        let mut names = HashSet::new();
        let mut types = HashSet::new();
        for (name, provider) in &entries {
            self.validate(name.as_ref(), provider)?;
            let fresh = match name {
                Some(name) => names.insert(name.clone()),
                None => types.insert(provider.produced),
            };
            if !fresh {
                return Err(WireError::ProviderAlreadyExists {
                    key: registration_key(name.as_ref(), provider),
                });
            }
        }

        Ok(entries
            .into_iter()
            .map(|(name, provider)| self.insert_unchecked(name, provider))
            .collect())
    }

    fn validate(&self, name: Option<&NamedKey>, provider: &AnyProvider) -> Result<(), WireError> {
        let produced = provider.produced;
        if produced == TypeKey::of::<()>() || produced == TypeKey::of::<Cleanup>() {
            return Err(WireError::InvalidProviderShape(format!(
                "{} cannot be provided as a value",
                produced.type_name()
            )));
        }

        let occupied = match name {
            Some(name) => self.by_name.contains_key(name),
            None => self.by_type.contains_key(&produced),
        };
        if occupied {
            return Err(WireError::ProviderAlreadyExists {
                key: registration_key(name, provider),
            });
        }
        Ok(())
    }

    fn insert_unchecked(&mut self, name: Option<NamedKey>, provider: AnyProvider) -> DescriptorId {
        let id = DescriptorId::new(self.descriptors.len());
        match &name {
            Some(name) => {
                self.by_name.insert(name.clone(), id);
            }
            None => {
                self.by_type.insert(provider.produced, id);
            }
        }
        self.descriptors.push(Descriptor::new(name, provider));
        id
    }
}

fn registration_key(name: Option<&NamedKey>, provider: &AnyProvider) -> Key {
    match name {
        Some(name) => Key::Name(name.clone()),
        None => Key::Type(provider.produced),
    }
}
