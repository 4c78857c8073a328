use proc_macro2::TokenStream;
use proc_macro_error2::ResultExt;
use quote::quote;
use syn::DeriveInput;

use crate::{
    hash::{tag_tokens, SIGHASH_EVENT_NAMESPACE},
    type_to_idl::gated_type_to_idl,
    util::{find_attr, reject_generics, Paths},
};

pub fn derive_event_impl(input: DeriveInput) -> TokenStream {
    Paths!(prelude, tag);
    reject_generics(&input.generics, "Generics are not supported for Event");

    let mut skip_idl = false;
    for attr in find_attr(&input.attrs, "event") {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip_idl") {
                skip_idl = true;
                Ok(())
            } else {
                Err(meta.error("expected `skip_idl`"))
            }
        })
        .unwrap_or_abort();
    }

    let ident = &input.ident;
    let name = ident.to_string();
    let event_tag = tag_tokens(SIGHASH_EVENT_NAMESPACE, &name);
    let idl_impl = (!skip_idl).then(|| gated_type_to_idl(&input));

    quote! {
        #[automatically_derived]
        impl #prelude::Event for #ident {
            const NAME: &'static str = #name;
            const TAG: #tag = #event_tag;
        }

        #idl_impl
    }
}
