//! The dependency-resolution and object-lifecycle engine of Lodestar.
//!
//! `lodestar_container` provides:
//!
//! - [`container`] - The [`Container`](container::Container) facade: registration, wiring, teardown
//! - [`provider`] - Providers, factories and lifecycles
//! - [`registry`] - Provider descriptors and lookup tables
//! - [`resolver`] - Recursive resolution with capability matching and singleton caching
//! - [`mod@wire`] - Struct and function wiring targets
//! - [`inject`] - Injectable parameter and field types
//! - [`cleanup`] - Idempotent release callbacks and their composition
//! - [`dry_run`] - Validation-only resolution
//! - [`module`] - Reusable bundles of registrations
//! - [`key`] - Provider keys
//! - [`error`] - Error types
//! - [`macro@Wire`] - Derive macro generating struct field tables
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
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! #[derive(Default, Wire)]
//! struct App {
//!     #[wire(name = "count")]
//!     count: Option<Arc<u32>>,
//!     #[wire]
//!     greeter: Option<Arc<dyn Greeter>>,
//! }
//!
//! let mut container = Container::new();
//! container.register_named("count", Provider::value(5_u32)).unwrap();
//! container
//!     .register_by_type(Provider::value(English).implements::<dyn Greeter>(|it| it as Arc<dyn Greeter>))
//!     .unwrap();
//!
//! let mut app = App::default();
//! container.dry_run(&mut app).unwrap();
//! assert!(app.count.is_none());
//!
//! let cleanup = container.wire(&mut app).unwrap();
//! assert_eq!(app.count.as_deref(), Some(&5));
//! assert_eq!(app.greeter.as_ref().map(|g| g.greet()).as_deref(), Some("hello"));
//!
//! cleanup.run();
//! container.teardown();
//! ```

// Self-reference so `#[derive(Wire)]` output can use `lodestar_container::` paths
// within this crate.
extern crate self as lodestar_container;

/// Idempotent release callbacks and their composition.
pub mod cleanup;

/// The container facade.
pub mod container;

/// Validation-only resolution.
pub mod dry_run;

/// Error types.
pub mod error;

/// Injectable parameter and field types.
pub mod inject;

/// Provider keys.
pub mod key;

/// Reusable bundles of registrations.
pub mod module;

/// Providers, factories and lifecycles.
pub mod provider;

/// Provider descriptors and lookup tables.
pub mod registry;

/// Recursive resolution.
pub mod resolver;

/// Struct and function wiring targets.
pub mod wire;

/// Re-export the `#[derive(Wire)]` macro.
pub use lodestar_container_macros::Wire;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::Wire;
    pub use crate::cleanup::Cleanup;
    pub use crate::container::Container;
    pub use crate::dry_run::{Mode, Slot};
    pub use crate::error::{BoxError, ErrorKind, WireError};
    pub use crate::inject::{Inject, NamedCollection, Request};
    pub use crate::key::{Key, NamedKey, TypeKey};
    pub use crate::module::Module;
    pub use crate::provider::{AnyProvider, Lifecycle, Provider};
    pub use crate::wire::{AfterWire, FieldSpec, FieldWirer, Wire};
}
