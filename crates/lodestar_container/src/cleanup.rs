//! Release callbacks and their composition.
//!
//! A [`Cleanup`] releases whatever a provider acquired when it produced a
//! value. Cleanups are idempotent: the underlying callback runs at most once
//! no matter how many clones of the handle are invoked.
//!
//! [`CleanupChain`] collects the cleanups acquired while resolving one node of
//! the dependency graph, in acquisition order. On success the chain is
//! composed into the node's own cleanup; on failure it is rolled back.
//!
//! A composed cleanup keeps its children together with how each one was
//! acquired, so a rollback can walk the whole tree: instances created by the
//! failed attempt are released and evicted at every depth, while singletons
//! that were already cached are left untouched.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::DescriptorId;

pub(crate) type CleanupFn = Box<dyn FnOnce() + Send + 'static>;

// ─────────────────────────────────────────────────────────────────────────────
// Cleanup
// ─────────────────────────────────────────────────────────────────────────────

/// An idempotent release callback.
///
/// Clones share state, so invoking any clone exhausts all of them.
///
/// # Example
///
/// ```
/// use lodestar_container::cleanup::Cleanup;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
/// let cleanup = Cleanup::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// cleanup.run();
/// cleanup.clone().run();
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone, Default)]
pub struct Cleanup {
    state: Arc<Mutex<Option<Release>>>,
}

/// Pending work of a cleanup that has not run yet.
struct Release {
    /// Clears the singleton cache slot holding the released instance.
    uncache: Option<CleanupFn>,
    /// Cleanups of the dependencies acquired while producing the instance.
    children: Vec<Entry>,
    own: Option<CleanupFn>,
}

impl Release {
    fn run(self) {
        if let Some(uncache) = self.uncache {
            uncache();
        }
        for child in self.children.into_iter().rev() {
            child.cleanup.run();
        }
        if let Some(own) = self.own {
            own();
        }
    }

    fn roll_back(self, evict: &mut dyn FnMut(DescriptorId)) {
        if let Some(uncache) = self.uncache {
            uncache();
        }
        roll_back_entries(self.children, evict);
        if let Some(own) = self.own {
            own();
        }
    }
}

impl Cleanup {
    /// Wraps a release callback.
    #[must_use]
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self::from_release(Release {
            uncache: None,
            children: Vec::new(),
            own: Some(Box::new(callback)),
        })
    }

    /// Returns a cleanup that does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    fn from_release(release: Release) -> Self {
        Self {
            state: Arc::new(Mutex::new(Some(release))),
        }
    }

    /// Runs the callback if it has not run yet.
    ///
    /// A composed cleanup releases everything it was composed from, cached
    /// singletons included. Each released singleton leaves the cache.
    pub fn run(&self) {
        // Release the lock before calling out, the callback may run other cleanups.
        let release = self.state.lock().take();
        if let Some(release) = release {
            release.run();
        }
    }

    /// Undoes a failed attempt below this cleanup.
    ///
    /// Created descendants are rolled back depth first and the ids of created
    /// singletons are handed to `evict`. Shared descendants are not touched.
    fn roll_back(&self, evict: &mut dyn FnMut(DescriptorId)) {
        let release = self.state.lock().take();
        if let Some(release) = release {
            release.roll_back(evict);
        }
    }

    /// Returns `true` once the callback has run, or if there never was one.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state.lock().is_none()
    }

    /// Returns `true` if both handles share the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl core::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cleanup")
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CleanupChain
// ─────────────────────────────────────────────────────────────────────────────

/// How a chain entry came to be part of the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// The instance was created by this attempt. Singletons carry their id so
    /// rollback can evict them from the cache.
    Created(Option<DescriptorId>),
    /// The instance came from the singleton cache and is owned by the container.
    Shared,
}

#[derive(Debug)]
struct Entry {
    cleanup: Cleanup,
    origin: Origin,
}

fn roll_back_entries(entries: Vec<Entry>, evict: &mut dyn FnMut(DescriptorId)) {
    for entry in entries.into_iter().rev() {
        if let Origin::Created(singleton) = entry.origin {
            entry.cleanup.roll_back(evict);
            if let Some(id) = singleton {
                evict(id);
            }
        }
    }
}

/// Cleanups acquired while resolving one node, in acquisition order.
#[derive(Debug, Default)]
pub struct CleanupChain {
    entries: Vec<Entry>,
}

impl CleanupChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the cleanup of an instance created during this attempt.
    pub(crate) fn push_created(&mut self, cleanup: Cleanup, singleton: Option<DescriptorId>) {
        self.entries.push(Entry {
            cleanup,
            origin: Origin::Created(singleton),
        });
    }

    /// Records the cleanup of a cached singleton reused by this attempt.
    pub(crate) fn push_shared(&mut self, cleanup: Cleanup) {
        self.entries.push(Entry {
            cleanup,
            origin: Origin::Shared,
        });
    }

    /// Returns the number of acquired cleanups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was acquired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Composes the chain and the node's own cleanup into one [`Cleanup`].
    ///
    /// The result runs the acquired cleanups in reverse acquisition order,
    /// then `own`.
    #[must_use]
    pub fn compose(self, own: Option<Cleanup>) -> Cleanup {
        if self.entries.is_empty() {
            return own.unwrap_or_default();
        }
        self.into_release(own, None)
    }

    /// Composes the cleanup of a singleton about to be cached.
    ///
    /// `uncache` runs first whenever the result is released, so a released
    /// singleton is never handed out again.
    pub(crate) fn compose_cached(self, own: Option<Cleanup>, uncache: CleanupFn) -> Cleanup {
        self.into_release(own, Some(uncache))
    }

    fn into_release(self, own: Option<Cleanup>, uncache: Option<CleanupFn>) -> Cleanup {
        Cleanup::from_release(Release {
            uncache,
            children: self.entries,
            own: own.map(|own| Box::new(move || own.run()) as CleanupFn),
        })
    }

    /// Undoes the acquisitions of a failed attempt.
    ///
    /// Cleanups of instances created by this attempt run in reverse order,
    /// including those nested below other created instances, and every newly
    /// cached singleton is handed to `evict`. Cleanups of singletons that
    /// were already cached are left to the container.
    pub(crate) fn rollback(self, mut evict: impl FnMut(DescriptorId)) {
        roll_back_entries(self.entries, &mut evict);
    }
}
