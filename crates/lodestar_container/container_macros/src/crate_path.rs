//! Where generated `Wire` impls find `lodestar_container`.
//!
//! The derive runs inside whatever crate uses it, so the path it emits has
//! to match that crate's manifest. Users may depend on `lodestar_container`
//! directly, under its own name or a renamed one, or only on the `lodestar`
//! umbrella that re-exports it. `lodestar_container` itself gets the plain
//! name through `extern crate self as lodestar_container`.

use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Path prefix for `lodestar_container` items in generated code.
///
/// Falls back to the bare crate name when neither crate shows up in the
/// manifest, which leaves the compiler to report the missing dependency.
pub(crate) fn lodestar_container_path() -> TokenStream {
    if let Ok(found) = crate_name("lodestar_container") {
        return dependency_ident(found, "lodestar_container");
    }
    if let Ok(FoundCrate::Name(umbrella)) = crate_name("lodestar") {
        let umbrella = format_ident!("{umbrella}");
        return quote!(#umbrella::lodestar_container);
    }
    quote!(lodestar_container)
}

/// The identifier a dependency is reachable under from the calling crate.
fn dependency_ident(found: FoundCrate, own_name: &str) -> TokenStream {
    let ident = match found {
        FoundCrate::Itself => format_ident!("{own_name}"),
        FoundCrate::Name(name) => format_ident!("{name}"),
    };
    quote!(#ident)
}
