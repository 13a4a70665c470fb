//! Structured logging for applications assembled with `lodestar_container`.
//!
//! [`TracingModule`] is installed like any other module. It contributes a
//! [`TracingConfig`] singleton whose producer installs the global
//! subscriber, so logging starts the first time anything depends on the
//! config and stops being announced when the container is torn down.
//! [`TracingModule::init`] does the same without a container.
//!
//! # Example
//!
//! ```
//! use lodestar_container::prelude::*;
//! use lodestar_tracing::{TracingConfig, TracingFormat, TracingModule};
//! use std::sync::Arc;
//! use tracing::Level;
//!
//! let mut container = Container::new();
//! container
//!     .install(
//!         TracingModule::default()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Compact),
//!     )
//!     .unwrap();
//!
//! container
//!     .wire_fn(|config: Arc<TracingConfig>| {
//!         if config.level >= Level::DEBUG {
//!             tracing::debug!(format = ?config.format, "debug logging enabled");
//!         }
//!     })
//!     .unwrap();
//!
//! container.teardown();
//! ```

use lodestar_container::cleanup::Cleanup;
use lodestar_container::container::Container;
use lodestar_container::error::WireError;
use lodestar_container::module::Module;
use lodestar_container::provider::Provider;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line, colored output.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per event.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing configuration, registered by type.
///
/// Providers and wiring targets can depend on it to adapt their logging to
/// the configured level.
///
/// # Example
///
/// ```
/// use lodestar_container::prelude::*;
/// use lodestar_tracing::{TracingConfig, TracingModule};
/// use std::sync::Arc;
/// use tracing::Level;
///
/// struct Worker {
///     verbose: bool,
/// }
///
/// let mut container = Container::new();
/// container.install(TracingModule::new()).unwrap();
/// container
///     .register_by_type(Provider::factory(|config: Arc<TracingConfig>| Worker {
///         verbose: config.level >= Level::DEBUG,
///     }))
///     .unwrap();
///
/// let (worker, _cleanup) = container.resolve::<Worker>().unwrap();
/// assert!(!worker.verbose);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// Most verbose level emitted.
    pub level: Level,
    /// Rendering of log lines.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingModule
// ─────────────────────────────────────────────────────────────────────────────

/// Installs a global `tracing` subscriber on behalf of a container.
///
/// Installing the module only registers [`TracingConfig`]. The subscriber
/// is set up when something first depends on that config, so modules
/// installed later can still be resolved first without logging.
///
/// | Provider | Key | Lifecycle |
/// |----------|-----|-----------|
/// | [`TracingConfig`] | by type | Singleton |
///
/// ```
/// use lodestar_tracing::{TracingModule, TracingFormat};
/// use tracing::Level;
///
/// let local = TracingModule::default()
///     .with_level(Level::DEBUG)
///     .with_span_events(true);
///
/// let deployed = TracingModule::default()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("lodestar_container=info,my_app=debug");
/// ```
///
/// A module without an explicit filter reads `RUST_LOG` and falls back to
/// its level when the variable is unset or invalid.
#[derive(Debug, Clone)]
pub struct TracingModule {
    level: Level,
    format: TracingFormat,
    /// `target=level` directives, overriding `RUST_LOG`.
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingModule {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::default(),
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingModule {
    /// Same as [`TracingModule::default`]: `INFO`, pretty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the most verbose level that is emitted.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets how log lines are rendered.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Uses `target=level,...` directives instead of `RUST_LOG`.
    ///
    /// Directives that fail to parse fall back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Also logs when spans are entered and exited.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the configuration exposed to the container.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.as_str());
        match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }

    /// Installs the global subscriber.
    ///
    /// Returns `false`, and changes nothing, if the process already has one.
    pub fn init(&self) -> bool {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        let fmt = tracing_subscriber::fmt::layer();
        let output = match self.format {
            TracingFormat::Pretty => fmt.pretty().with_span_events(span_events).boxed(),
            TracingFormat::Compact => fmt.compact().with_span_events(span_events).boxed(),
            TracingFormat::Json => fmt.json().with_span_events(span_events).boxed(),
        };

        let installed = tracing_subscriber::registry()
            .with(self.env_filter())
            .with(output)
            .try_init()
            .is_ok();
        if installed {
            tracing::info!(level = %self.level, format = ?self.format, "tracing initialized");
        }
        installed
    }
}

impl Module for TracingModule {
    fn register(&self, container: &mut Container) -> Result<(), WireError> {
        let module = self.clone();
        container.register_by_type(Provider::factory_with_cleanup(move || {
            module.init();
            let cleanup = Cleanup::new(|| tracing::info!("tracing shutting down"));
            (module.config(), cleanup)
        }))
    }

    fn name(&self) -> &str {
        "lodestar::tracing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_container::error::ErrorKind;

    #[test]
    fn config_reflects_builder() {
        let module = TracingModule::new()
            .with_level(Level::TRACE)
            .with_format(TracingFormat::Json)
            .with_span_events(true);

        assert_eq!(
            module.config(),
            TracingConfig {
                level: Level::TRACE,
                format: TracingFormat::Json,
            }
        );
        assert_eq!(TracingModule::new().config().format, TracingFormat::Pretty);
    }

    #[test]
    fn second_init_leaves_subscriber_in_place() {
        TracingModule::new().with_format(TracingFormat::Compact).init();
        assert!(!TracingModule::new().init());
    }

    #[test]
    fn config_is_a_container_singleton() {
        let mut container = Container::new();
        container
            .install(TracingModule::new().with_format(TracingFormat::Compact))
            .unwrap();
        assert!(container.contains_type::<TracingConfig>());
        assert!(!container.is_cached_type::<TracingConfig>());

        let (first, _) = container.resolve::<TracingConfig>().unwrap();
        let (second, _) = container.resolve::<TracingConfig>().unwrap();
        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(first.format, TracingFormat::Compact);

        container.teardown();
        assert!(!container.is_cached_type::<TracingConfig>());
        assert!(container.contains_type::<TracingConfig>());
    }

    #[test]
    fn installing_twice_is_rejected() {
        let mut container = Container::new();
        container.install(TracingModule::new()).unwrap();

        let err = container.install(TracingModule::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderAlreadyExists);
    }
}
