//! A small dependency-injection container for Rust applications.
//!
//! Register providers, wire structs and functions, and tear everything down
//! in reverse creation order. See [`lodestar_container`] for the details.

pub use lodestar_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lodestar_internal::prelude::*;
}
