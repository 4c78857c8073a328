use crate::util::get_crate_name;
use proc_macro2::TokenStream;
use quote::quote;

#[derive(Debug, Clone)]
pub struct Paths {
    pub crate_name: TokenStream,
    pub prelude: TokenStream,

    pub size_of: TokenStream,

    // schema
    pub account_schema: TokenStream,
    pub slot_def: TokenStream,
    pub slot_type: TokenStream,
    pub account_view: TokenStream,
    pub tag: TokenStream,

    // idl
    pub idl_definition: TokenStream,
    pub idl_result: TokenStream,
    pub idl_type_def: TokenStream,
    pub type_to_idl: TokenStream,
}

macro_rules! paths_macro {
    ($($name:ident $(: $rename:ident)? $(,)?)*) => {
        let Paths {
            $($name $(: $rename)? ,)*
            ..
        } = Default::default();
    };
}

pub(crate) use paths_macro as Paths;

impl Default for Paths {
    fn default() -> Self {
        let crate_name = get_crate_name();
        let prelude = quote! { #crate_name::__private::macro_prelude };
        Self {
            crate_name,

            size_of: quote! { ::core::mem::size_of },

            account_schema: quote! { #prelude::AccountSchema },
            slot_def: quote! { #prelude::SlotDef },
            slot_type: quote! { #prelude::SlotType },
            account_view: quote! { #prelude::AccountView },
            tag: quote! { #prelude::Tag },

            idl_definition: quote! { #prelude::IdlDefinition },
            idl_result: quote! { #prelude::IdlResult },
            idl_type_def: quote! { #prelude::IdlTypeDef },
            type_to_idl: quote! { #prelude::TypeToIdl },

            prelude,
        }
    }
}
