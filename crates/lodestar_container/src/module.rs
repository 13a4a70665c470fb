//! Modules: reusable bundles of registrations.
//!
//! A [`Module`] groups the providers of one feature so they can be installed
//! into a container in a single call. Tuples of modules are modules too and
//! install their members in order.
//!
//! # Example
//!
//! ```
//! use lodestar_container::prelude::*;
//!
//! struct DatabaseUrl(String);
//!
//! struct StorageModule {
//!     url: String,
//! }
//!
//! impl Module for StorageModule {
//!     fn register(&self, container: &mut Container) -> Result<(), WireError> {
//!         container.register_by_type(Provider::value(DatabaseUrl(self.url.clone())))
//!     }
//! }
//!
//! let mut container = Container::new();
//! container
//!     .install(StorageModule { url: "memory://".into() })
//!     .unwrap();
//! assert!(container.contains_type::<DatabaseUrl>());
//! ```

use variadics_please::all_tuples;

use crate::container::Container;
use crate::error::WireError;

/// A bundle of provider registrations.
pub trait Module {
    /// Registers this module's providers.
    ///
    /// # Errors
    ///
    /// Returns the first registration error. Registrations made before the
    /// failure stay in place.
    fn register(&self, container: &mut Container) -> Result<(), WireError>;

    /// Returns the module name used in logs.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}

macro_rules! impl_module_tuple {
    ($(($M:ident, $m:ident)),*) => {
        impl<$($M: Module),*> Module for ($($M,)*) {
            fn register(&self, container: &mut Container) -> Result<(), WireError> {
                let ($($m,)*) = self;
                $(container.install_ref($m)?;)*
                Ok(())
            }
        }
    };
}

all_tuples!(impl_module_tuple, 1, 8, M, m);
