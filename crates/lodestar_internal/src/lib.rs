//! # Lodestar Internal Library
//!
//! Re-exports the core Lodestar crates for convenience.

/// Provider registry, resolver and wiring engine.
pub use lodestar_container;

/// Tracing subscriber module.
pub use lodestar_tracing;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lodestar_container::prelude::*;
    pub use lodestar_tracing::{TracingConfig, TracingFormat, TracingModule};
}
