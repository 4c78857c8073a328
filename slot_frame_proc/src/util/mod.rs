mod paths;

pub use paths::*;

use heck::ToSnakeCase;
use proc_macro2::{Ident, TokenStream};
use proc_macro_crate::{crate_name, FoundCrate};
use proc_macro_error2::abort;
use quote::{format_ident, quote};
use syn::{
    parse_quote, Attribute, Data, DataStruct, DeriveInput, Expr, ExprLit, Generics, Lit, Meta,
    MetaNameValue, Variant,
};

pub fn get_crate_name() -> TokenStream {
    let generator_crate = crate_name("slot_frame").expect("Could not find `slot_frame`");
    match generator_crate {
        FoundCrate::Itself => quote! { slot_frame },
        FoundCrate::Name(name) => {
            let ident = format_ident!("{}", name);
            quote! { ::#ident }
        }
    }
}

/// The trimmed doc comment lines of an item, as a `Vec<String>` expression.
pub fn get_docs<'a>(attrs: impl IntoIterator<Item = &'a Attribute>) -> Expr {
    let doc_strings = attrs
        .into_iter()
        .filter(|a| a.path().is_ident("doc"))
        .map(|a: &'a Attribute| {
            if let Meta::NameValue(MetaNameValue {
                value:
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(str), ..
                    }),
                ..
            }) = &a.meta
            {
                str.value().trim().to_string()
            } else {
                abort!(a, "Expected doc attribute to be a name value pair")
            }
        })
        .collect::<Vec<_>>();
    parse_quote! { vec![#(#doc_strings.to_string()),*] }
}

/// Removes every attribute named `name` from `attrs`, returning them in order.
pub fn strip_attributes(attrs: &mut Vec<Attribute>, name: &str) -> Vec<Attribute> {
    let mut removed = vec![];
    attrs.retain(|attr| {
        if attr.path().is_ident(name) {
            removed.push(attr.clone());
            false
        } else {
            true
        }
    });
    removed
}

pub fn find_attr<'a>(
    attrs: &'a [Attribute],
    name: &'a str,
) -> impl Iterator<Item = &'a Attribute> {
    attrs.iter().filter(move |attr| attr.path().is_ident(name))
}

pub fn reject_generics(generics: &Generics, error: &str) {
    if !generics.params.is_empty() {
        abort!(generics, error);
    }
}

pub fn ensure_data_struct<'a>(input: &'a DeriveInput, error: &str) -> &'a DataStruct {
    match &input.data {
        Data::Struct(data_struct) => data_struct,
        Data::Enum(e) => abort!(e.enum_token, error),
        Data::Union(u) => abort!(u.union_token, error),
    }
}

pub fn enum_discriminants<'a>(
    variants: impl Iterator<Item = &'a Variant> + 'a,
) -> impl Iterator<Item = Expr> + 'a {
    let mut next_discriminant: Expr = parse_quote!(0);
    variants.map(move |variant| {
        let discriminant = if let Some((_, ref discriminant)) = variant.discriminant {
            discriminant.clone()
        } else {
            next_discriminant.clone()
        };
        next_discriminant = parse_quote! { #discriminant + 1 };
        discriminant
    })
}

/// Wraps `body` in a hidden module, so `#[cfg]`-gated impls don't leak unused imports.
pub fn ignore_cfg_module(ident: &Ident, suffix: &str, body: TokenStream) -> TokenStream {
    if body.is_empty() {
        return TokenStream::new();
    }
    let module_name = format_ident!("_{}{suffix}", ident.to_string().to_snake_case());
    quote! {
        #[allow(unexpected_cfgs)]
        #[doc(hidden)]
        mod #module_name {
            use super::*;
            #body
        }
        #[allow(unused_imports)]
        pub use #module_name::*;
    }
}

/// Gates `tokens` on IDL generation being enabled for the crate being expanded.
pub fn idl_gated(tokens: TokenStream) -> TokenStream {
    quote! {
        #[cfg(all(feature = "idl", not(target_os = "solana")))]
        #[automatically_derived]
        #tokens
    }
}
