//! Procedural macros for the docrepo project.
//!
//! # `Entity`
//!
//! Derives `docrepo::document::Entity` for structs with named fields.
//!
//! - The identifier is the field marked `#[entity(id)]`, or the field named `id`.
//!   Its type must convert into `bson::Bson`, and it should be renamed to `_id`
//!   for serde.
//! - The entity name defaults to the struct name and can be overridden with
//!   `#[entity(name = "...")]` on the struct. It is the key used to resolve the
//!   collection binding from settings.
//!
//! ```ignore
//! use docrepo::Entity;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
//! #[entity(name = "Customer")]
//! pub struct CustomerRecord {
//!     #[entity(id)]
//!     #[serde(rename = "_id")]
//!     pub key: String,
//!     pub name: String,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_macros;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match expand_entity(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_entity(ast: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ast,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new_spanned(ast, "Entity can only be derived for structs")),
    };

    let mut entity_name = name.to_string();
    for attr in &ast.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let s: LitStr = meta.value()?.parse()?;
                    entity_name = s.value();
                    Ok(())
                } else {
                    Err(meta.error("unknown entity attribute, expected `name`"))
                }
            })?;
        }
    }

    let mut marked = None;
    for field in fields {
        for attr in &field.attrs {
            if !attr.path().is_ident("entity") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    if marked.is_some() {
                        return Err(meta.error("multiple #[entity(id)] fields"));
                    }
                    marked = field.ident.clone();
                    Ok(())
                } else {
                    Err(meta.error("unknown entity field attribute, expected `id`"))
                }
            })?;
        }
    }

    let id_field = marked
        .or_else(|| {
            fields
                .iter()
                .filter_map(|field| field.ident.clone())
                .find(|ident| ident == "id")
        })
        .ok_or_else(|| {
            syn::Error::new_spanned(ast, "no identifier field: add `id` or mark one with #[entity(id)]")
        })?;

    Ok(quote! {
        impl #impl_generics ::docrepo::document::Entity for #name #ty_generics #where_clause {
            fn id(&self) -> ::docrepo::bson::Bson {
                ::docrepo::bson::Bson::from(::std::clone::Clone::clone(&self.#id_field))
            }

            fn entity_name() -> &'static str {
                #entity_name
            }
        }
    })
}
