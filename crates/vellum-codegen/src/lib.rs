// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, ExprPath, Fields, LitStr, Type};

/// Capability implemented on top of `Described`.
#[derive(Clone, Copy)]
enum Capability {
    /// Stored by identity, referenced through `Ref<T>` / `Link<T>`.
    Persistent,
    /// Stored inline inside the containing object.
    Embedded,
}

/// How the zero-argument constructor is obtained.
enum ConstructorSpec {
    /// `<Self as Default>::default`
    Default,
    /// `#[persist(constructor = "path")]`
    Infallible(ExprPath),
    /// `#[persist(try_constructor = "path")]`
    Fallible(ExprPath),
    /// `#[persist(no_constructor)]`
    Absent,
}

/// Container-level `#[persist(...)]` options.
struct ContainerAttrs {
    name: Option<LitStr>,
    constructor: ConstructorSpec,
}

/// Field-level `#[persist(...)]` options.
#[derive(Default)]
struct FieldAttrs {
    base: bool,
    transient: bool,
    opaque: bool,
}

/// `#[derive(Persistent)]`: layout table + object-reference capability
///
/// Generates `vellum::Described` (catalog name and layout, built once per
/// process) and `vellum::Persistent`.
///
/// Container options:
/// - `#[persist(name = "app::Point")]` catalog name (default: module path + ident)
/// - `#[persist(constructor = "path::to::fn")]` zero-argument constructor
/// - `#[persist(try_constructor = "path::to::fn")]` constructor returning `Result`
/// - `#[persist(no_constructor)]` type cannot be instantiated by the store
///
/// Without a constructor option the type must implement `Default`.
///
/// Field options:
/// - `#[persist(base)]` the field holds the parent level of the type
/// - `#[persist(transient)]` never stored
/// - `#[persist(opaque)]` classified by the active fallback policy
///
/// Example:
/// ```ignore
/// use vellum::Persistent;
///
/// #[derive(Default, Persistent)]
/// struct Node {
///     label: String,
///     next: vellum::Ref<Node>,
///     #[persist(transient)]
///     visits: std::cell::Cell<u32>,
/// }
/// ```
#[proc_macro_derive(Persistent, attributes(persist))]
pub fn derive_persistent(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input, Capability::Persistent)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// `#[derive(Embedded)]`: layout table + embedded-value capability
///
/// Same options as `#[derive(Persistent)]`. The type also implements
/// `vellum::Shaped`, so it can be used directly as a field of another type.
#[proc_macro_derive(Embedded, attributes(persist))]
pub fn derive_embedded(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input, Capability::Embedded)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput, capability: Capability) -> syn::Result<TokenStream2> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Generic types cannot be described: the catalog name must be unique",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Only named fields are supported",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(input, "Only structs are supported")),
    };

    let container = parse_container_attrs(input)?;

    let mut base: Option<&Type> = None;
    let mut field_layouts = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "Field must have a name"));
        };
        let attrs = parse_field_attrs(field)?;
        let ty = &field.ty;

        if attrs.base {
            if base.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "Only one #[persist(base)] field is allowed",
                ));
            }
            base = Some(ty);
            continue;
        }

        let name = field_ident.unraw().to_string();
        let layout = if attrs.transient || attrs.opaque {
            let rendered = quote!(#ty).to_string().replace(' ', "");
            quote! {
                ::vellum::FieldLayout::new(
                    #name,
                    ::vellum::Shape::Opaque(::std::sync::Arc::from(#rendered)),
                )
            }
        } else {
            quote! {
                ::vellum::FieldLayout::new(#name, <#ty as ::vellum::Shaped>::shape())
            }
        };
        field_layouts.push(if attrs.transient {
            quote!(#layout.transient())
        } else {
            layout
        });
    }

    let type_name = match &container.name {
        Some(name) => quote!(#name),
        None => quote!(concat!(module_path!(), "::", stringify!(#ident))),
    };

    let base_call = base.map(|ty| {
        quote! {
            .base(<#ty as ::vellum::Described>::layout())
        }
    });

    let constructor_call = match &container.constructor {
        ConstructorSpec::Default => Some(quote! {
            .constructor(::vellum::Constructor::new(<Self as ::core::default::Default>::default))
        }),
        ConstructorSpec::Infallible(path) => Some(quote! {
            .constructor(::vellum::Constructor::new(#path))
        }),
        ConstructorSpec::Fallible(path) => Some(quote! {
            .constructor(::vellum::Constructor::fallible(#path))
        }),
        ConstructorSpec::Absent => None,
    };

    let capability_impl = match capability {
        Capability::Persistent => quote! {
            impl ::vellum::Persistent for #ident {}
        },
        Capability::Embedded => quote! {
            impl ::vellum::Embedded for #ident {}

            impl ::vellum::Shaped for #ident {
                fn shape() -> ::vellum::Shape {
                    ::vellum::Shape::Value(<Self as ::vellum::Described>::layout())
                }
            }
        },
    };

    Ok(quote! {
        impl ::vellum::Described for #ident {
            const TYPE_NAME: &'static str = #type_name;

            fn layout() -> ::std::sync::Arc<::vellum::TypeLayout> {
                static LAYOUT: ::std::sync::OnceLock<::std::sync::Arc<::vellum::TypeLayout>> =
                    ::std::sync::OnceLock::new();
                ::std::sync::Arc::clone(LAYOUT.get_or_init(|| {
                    ::vellum::TypeLayout::builder(<Self as ::vellum::Described>::TYPE_NAME)
                        #base_call
                        #(.field(#field_layouts))*
                        #constructor_call
                        .build()
                }))
            }
        }

        #capability_impl
    })
}

fn parse_container_attrs(input: &DeriveInput) -> syn::Result<ContainerAttrs> {
    let mut attrs = ContainerAttrs {
        name: None,
        constructor: ConstructorSpec::Default,
    };
    let mut constructor_set = false;

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("persist")) {
        attr.parse_nested_meta(|meta| {
            let spec = if meta.path.is_ident("name") {
                attrs.name = Some(meta.value()?.parse()?);
                return Ok(());
            } else if meta.path.is_ident("constructor") {
                let path: LitStr = meta.value()?.parse()?;
                ConstructorSpec::Infallible(path.parse()?)
            } else if meta.path.is_ident("try_constructor") {
                let path: LitStr = meta.value()?.parse()?;
                ConstructorSpec::Fallible(path.parse()?)
            } else if meta.path.is_ident("no_constructor") {
                ConstructorSpec::Absent
            } else {
                return Err(meta.error("unknown persist option"));
            };

            if constructor_set {
                return Err(meta.error("constructor specified more than once"));
            }
            constructor_set = true;
            attrs.constructor = spec;
            Ok(())
        })?;
    }

    Ok(attrs)
}

fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("persist")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("base") {
                attrs.base = true;
            } else if meta.path.is_ident("transient") {
                attrs.transient = true;
            } else if meta.path.is_ident("opaque") {
                attrs.opaque = true;
            } else {
                return Err(meta.error("unknown persist field option"));
            }
            Ok(())
        })?;
    }

    if attrs.base && (attrs.transient || attrs.opaque) {
        return Err(syn::Error::new_spanned(
            field,
            "#[persist(base)] cannot be combined with other options",
        ));
    }
    Ok(attrs)
}
