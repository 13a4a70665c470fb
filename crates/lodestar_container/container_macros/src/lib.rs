//! Procedural macros for the `lodestar_container` crate.
//!
//! This crate provides `#[derive(Wire)]`, which compiles `#[wire]` field
//! markers into a per-type field table.
//!
//! # Example
//!
//! ```ignore
//! use lodestar_container::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Default, Wire)]
//! #[wire(after_wire)]
//! struct Service {
//!     #[wire("count")]
//!     count: Option<Arc<u32>>,
//!     #[wire(transient)]
//!     clock: Option<Arc<dyn Clock>>,
//! }
//! ```

mod crate_path;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, Index, LitStr, Member, Meta,
    PathArguments, Type, TypePath, parse_macro_input,
};

/// Derives `Wire` for a struct.
///
/// # Field markers
///
/// Only fields carrying `#[wire]` are wired. The marker accepts:
///
/// | Marker | Meaning |
/// |--------|---------|
/// | `#[wire]` | Resolve by the field's type |
/// | `#[wire(name = "x")]` | Resolve the provider registered as `"x"` |
/// | `#[wire(transient)]` | Produce a fresh instance, bypassing the singleton cache |
/// | `#[wire(optional)]` | `Option<Arc<T>>` field left `None` when nothing is registered |
/// | `#[wire(setter)]` | Assign through `self.set_<field>(value)` |
/// | `#[wire(setter = "apply")]` | Assign through `self.apply(value)` |
/// | `#[wire("x,transient")]` | Name and modifiers as one payload; an empty name resolves by type |
///
/// A field of type `Option<X>` is wired as a required `X` and assigned
/// `Some(value)`, so the target can be built before wiring. Setters receive
/// the resolved `X`.
///
/// # Struct markers
///
/// `#[wire(after_wire)]` runs the type's `AfterWire` implementation once all
/// fields are wired.
///
/// # Generated Code
///
/// ```ignore
/// #[derive(Wire)]
/// struct Bar {
///     #[wire("foo")]
///     foo: Option<Arc<Foo>>,
/// }
/// ```
///
/// expands to:
///
/// ```ignore
/// impl Wire for Bar {
///     fn wire_fields(&mut self, wirer: &mut FieldWirer<'_, '_>) -> Result<(), WireError> {
///         if let Some(value) = wirer.field::<Arc<Foo>>(FieldSpec::new("foo").named("foo"))? {
///             self.foo = Some(value);
///         }
///         Ok(())
///     }
/// }
/// ```
#[proc_macro_derive(Wire, attributes(wire))]
pub fn derive_wire(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_wire(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_wire(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let lc = crate_path::lodestar_container_path();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(data) => {
            return Err(syn::Error::new_spanned(
                data.enum_token,
                "`Wire` can only be derived for structs",
            ));
        }
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "`Wire` can only be derived for structs",
            ));
        }
    };

    let after_wire = parse_struct_attrs(&input.attrs)?;

    let mut statements = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let Some(attr) = field.attrs.iter().find(|attr| attr.path().is_ident("wire")) else {
            continue;
        };
        let options = parse_field_attr(attr)?;

        let (member, label) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
            None => (Member::Unnamed(Index::from(index)), index.to_string()),
        };

        statements.push(field_statement(&lc, &member, &label, &field.ty, &options)?);
    }

    let wirer = if statements.is_empty() {
        format_ident!("_wirer")
    } else {
        format_ident!("wirer")
    };

    let hook = after_wire.then(|| {
        quote! {
            fn after_wire_hook(&mut self) -> ::core::option::Option<&mut dyn #lc::wire::AfterWire> {
                ::core::option::Option::Some(self)
            }
        }
    });

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #lc::wire::Wire for #name #ty_generics #where_clause {
            fn wire_fields(
                &mut self,
                #wirer: &mut #lc::wire::FieldWirer<'_, '_>,
            ) -> ::core::result::Result<(), #lc::error::WireError> {
                #(#statements)*
                ::core::result::Result::Ok(())
            }

            #hook
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Attribute parsing
// ─────────────────────────────────────────────────────────────────────────────

/// How the resolved value reaches the field.
enum Setter {
    /// `self.set_<field>(value)`.
    Conventional,
    /// `self.<method>(value)`.
    Named(Ident),
}

#[derive(Default)]
struct FieldOptions {
    name: Option<String>,
    transient: bool,
    optional: bool,
    setter: Option<Setter>,
}

fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut after_wire = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("wire")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("after_wire") {
                after_wire = true;
                Ok(())
            } else {
                Err(meta.error("unsupported struct option; expected `after_wire`"))
            }
        })?;
    }
    Ok(after_wire)
}

fn parse_field_attr(attr: &Attribute) -> syn::Result<FieldOptions> {
    let list = match &attr.meta {
        Meta::Path(_) => return Ok(FieldOptions::default()),
        Meta::List(list) => list,
        Meta::NameValue(meta) => {
            return Err(syn::Error::new_spanned(
                meta,
                "expected `#[wire]`, `#[wire(...)]` or `#[wire(\"name,transient\")]`",
            ));
        }
    };

    if let Ok(payload) = syn::parse2::<LitStr>(list.tokens.clone()) {
        return parse_payload(&payload);
    }

    let mut options = FieldOptions::default();
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            let name: LitStr = meta.value()?.parse()?;
            options.name = Some(name.value());
        } else if meta.path.is_ident("transient") {
            options.transient = true;
        } else if meta.path.is_ident("optional") {
            options.optional = true;
        } else if meta.path.is_ident("setter") {
            options.setter = Some(if meta.input.peek(syn::Token![=]) {
                let method: LitStr = meta.value()?.parse()?;
                Setter::Named(method.parse()?)
            } else {
                Setter::Conventional
            });
        } else {
            return Err(meta.error(
                "unsupported wire option; expected `name`, `transient`, `optional` or `setter`",
            ));
        }
        Ok(())
    })?;
    Ok(options)
}

/// Parses the `"name,modifier,..."` payload form.
fn parse_payload(payload: &LitStr) -> syn::Result<FieldOptions> {
    let value = payload.value();
    let mut parts = value.split(',').map(str::trim);

    let mut options = FieldOptions {
        name: parts.next().filter(|name| !name.is_empty()).map(str::to_owned),
        ..FieldOptions::default()
    };
    for modifier in parts {
        match modifier {
            "transient" => options.transient = true,
            "optional" => options.optional = true,
            other => {
                return Err(syn::Error::new_spanned(
                    payload,
                    format!("unknown wire modifier `{other}`; expected `transient` or `optional`"),
                ));
            }
        }
    }
    Ok(options)
}

// ─────────────────────────────────────────────────────────────────────────────
// Code generation
// ─────────────────────────────────────────────────────────────────────────────

fn field_statement(
    lc: &TokenStream2,
    member: &Member,
    label: &str,
    ty: &Type,
    options: &FieldOptions,
) -> syn::Result<TokenStream2> {
    let mut spec = quote!(#lc::wire::FieldSpec::new(#label));
    if let Some(name) = &options.name {
        spec = quote!(#spec.named(#name));
    }
    if options.transient {
        spec = quote!(#spec.transient());
    }

    // Optional fields inject `Option<Arc<T>>` as declared; other `Option<X>`
    // fields inject a required `X`.
    let (inject_ty, value) = match option_inner(ty) {
        Some(_) if options.optional => (ty, quote!(value)),
        Some(inner) => (inner, quote!(::core::option::Option::Some(value))),
        None if options.optional => {
            return Err(syn::Error::new_spanned(
                ty,
                "`optional` fields must have type `Option<Arc<T>>`",
            ));
        }
        None => (ty, quote!(value)),
    };

    let assign = match &options.setter {
        Some(Setter::Conventional) => {
            let method = Ident::new(&format!("set_{label}"), Span::call_site());
            quote!(self.#method(value);)
        }
        Some(Setter::Named(method)) => quote!(self.#method(value);),
        None => quote!(self.#member = #value;),
    };

    Ok(quote! {
        if let ::core::option::Option::Some(value) = wirer.field::<#inject_ty>(#spec)? {
            #assign
        }
    })
}

/// Returns `X` if `ty` is spelled `Option<X>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };
    let segment = path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match (args.args.len(), args.args.first()) {
        (1, Some(GenericArgument::Type(inner))) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_with_name_and_transient() {
        let options = parse_payload(&LitStr::new("count, transient", Span::call_site())).unwrap();
        assert_eq!(options.name.as_deref(), Some("count"));
        assert!(options.transient);
        assert!(!options.optional);
    }

    #[test]
    fn empty_payload_resolves_by_type() {
        let options = parse_payload(&LitStr::new("", Span::call_site())).unwrap();
        assert!(options.name.is_none());
        assert!(!options.transient);

        let options = parse_payload(&LitStr::new(",transient", Span::call_site())).unwrap();
        assert!(options.name.is_none());
        assert!(options.transient);
    }

    #[test]
    fn unknown_modifier_is_rejected() {
        assert!(parse_payload(&LitStr::new("count,eager", Span::call_site())).is_err());
    }

    #[test]
    fn option_inner_detects_option() {
        let ty: Type = syn::parse_quote!(Option<Arc<dyn Greeter>>);
        let inner = option_inner(&ty).map(|inner| quote!(#inner).to_string());
        assert_eq!(inner, Some(quote!(Arc<dyn Greeter>).to_string()));

        let ty: Type = syn::parse_quote!(Arc<u32>);
        assert!(option_inner(&ty).is_none());
    }

    fn expansion_error(input: &DeriveInput) -> String {
        match expand_wire(input) {
            Ok(tokens) => panic!("expected an error, got `{tokens}`"),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn enums_and_unions_are_rejected() {
        let input: DeriveInput = syn::parse_quote! {
            enum Mode {
                Live,
            }
        };
        assert_eq!(expansion_error(&input), "`Wire` can only be derived for structs");

        let input: DeriveInput = syn::parse_quote! {
            union Bits {
                int: u32,
                float: f32,
            }
        };
        assert_eq!(expansion_error(&input), "`Wire` can only be derived for structs");
    }

    #[test]
    fn unknown_field_option_is_rejected() {
        let input: DeriveInput = syn::parse_quote! {
            struct Service {
                #[wire(eager)]
                limit: Option<u32>,
            }
        };
        assert!(expansion_error(&input).starts_with("unsupported wire option"));
    }

    #[test]
    fn unknown_struct_option_is_rejected() {
        let input: DeriveInput = syn::parse_quote! {
            #[wire(before_wire)]
            struct Service {
                #[wire]
                limit: Option<u32>,
            }
        };
        assert!(expansion_error(&input).starts_with("unsupported struct option"));
    }

    #[test]
    fn optional_requires_an_option_field() {
        let input: DeriveInput = syn::parse_quote! {
            struct Service {
                #[wire(optional)]
                limit: u32,
            }
        };
        assert_eq!(
            expansion_error(&input),
            "`optional` fields must have type `Option<Arc<T>>`"
        );

        let input: DeriveInput = syn::parse_quote! {
            struct Service {
                #[wire("limit,optional")]
                limit: Option<Arc<u32>>,
            }
        };
        assert!(expand_wire(&input).is_ok());
    }

    #[test]
    fn name_value_marker_is_rejected() {
        let input: DeriveInput = syn::parse_quote! {
            struct Service {
                #[wire = "limit"]
                limit: Option<u32>,
            }
        };
        assert!(expansion_error(&input).starts_with("expected `#[wire]`"));
    }
}
