use itertools::Itertools;
use proc_macro2::TokenStream;
use proc_macro_error2::{abort, ResultExt};
use quote::quote;
use sha2::{Digest, Sha256};
use syn::{parse::Parser, parse2, parse_quote, Fields, ItemEnum, LitInt, LitStr};

use crate::util::{
    enum_discriminants, get_docs, idl_gated, ignore_cfg_module, reject_generics,
    strip_attributes, Paths,
};

#[derive(Debug, Default)]
struct FrameErrorArgs {
    offset: Option<LitInt>,
    skip_idl: bool,
}

impl FrameErrorArgs {
    fn parse(args: TokenStream) -> Self {
        let mut out = Self::default();
        syn::meta::parser(|meta| {
            if meta.path.is_ident("offset") {
                out.offset = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("skip_idl") {
                out.skip_idl = true;
            } else {
                return Err(meta.error("expected `offset = <int>` or `skip_idl`"));
            }
            Ok(())
        })
        .parse2(args)
        .unwrap_or_abort();
        out
    }

    /// The explicit offset, or one derived from the name of the crate being compiled.
    fn offset(&self) -> LitInt {
        if let Some(offset) = &self.offset {
            return offset.clone();
        }
        let crate_name = std::env::var("CARGO_PKG_NAME").unwrap_or_default();
        let digest = Sha256::digest(crate_name.as_bytes());
        let offset = u16::from_le_bytes([digest[0], digest[1]]);
        parse_quote!(#offset)
    }
}

const ERROR_MESSAGE_ATTR: &str =
    "Each variant must have an attribute in the format `#[msg(\"My error message\")]`";

pub fn frame_error_impl(mut item: ItemEnum, args: TokenStream) -> TokenStream {
    Paths!(crate_name, prelude);

    let args = FrameErrorArgs::parse(args);
    reject_generics(&item.generics, "Generics are not supported for frame_error");

    let ident = &item.ident;
    let offset = args.offset();
    let offset = quote!(((#offset as u32) << 16));
    let discriminants = enum_discriminants(item.variants.iter())
        .map(|disc| parse_quote!((#offset + #disc)))
        .collect_vec();

    let messages = item
        .variants
        .iter_mut()
        .zip_eq(discriminants)
        .map(|(variant, disc)| {
            if !matches!(variant.fields, Fields::Unit) {
                abort!(variant.fields, "frame_error enums must have unit variants");
            }
            let Some((message_attr,)) = strip_attributes(&mut variant.attrs, "msg")
                .into_iter()
                .collect_tuple()
            else {
                abort!(variant, ERROR_MESSAGE_ATTR);
            };
            variant.discriminant = Some((parse_quote!(=), disc));
            let list = message_attr
                .meta
                .require_list()
                .expect_or_abort(ERROR_MESSAGE_ATTR);
            parse2::<LitStr>(list.tokens.clone())
                .expect_or_abort("Failed to parse error message as a string literal")
        })
        .collect_vec();
    let variant_idents = item.variants.iter().map(|v| v.ident.clone()).collect_vec();

    let frame_error_impl = quote! {
        #[automatically_derived]
        impl #prelude::FrameError for #ident {
            fn code(&self) -> u32 {
                *self as u32
            }
            fn name(&self) -> #crate_name::alloc::borrow::Cow<'static, str> {
                match self {
                    #(Self::#variant_idents => #messages),*
                }
                .into()
            }
        }
    };

    let display_impl = quote! {
        #[automatically_derived]
        impl ::core::fmt::Display for #ident {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self {
                    #(Self::#variant_idents => f.write_str(#messages)),*
                }
            }
        }
    };

    let idl_impl = (!args.skip_idl).then(|| {
        let error_nodes = item.variants.iter().zip(&messages).map(|(variant, message)| {
            let variant_ident = &variant.ident;
            let name = variant_ident.to_string();
            let docs = get_docs(&variant.attrs);
            let message = message.value();
            quote! {
                #prelude::ErrorNode {
                    name: #name.to_string(),
                    code: #ident::#variant_ident as u32,
                    message: #message.to_string(),
                    docs: #docs,
                }
            }
        });
        let errors_to_idl = idl_gated(quote! {
            impl #prelude::ErrorsToIdl for #ident {
                fn errors_to_idl(idl_definition: &mut #prelude::IdlDefinition) -> #prelude::IdlResult<()> {
                    idl_definition.errors.extend([#(#error_nodes,)*]);
                    Ok(())
                }
            }
        });
        ignore_cfg_module(ident, "_errors_to_idl", errors_to_idl)
    });

    quote!(
        #[repr(u32)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        #item

        #frame_error_impl

        #display_impl

        #idl_impl
    )
}
