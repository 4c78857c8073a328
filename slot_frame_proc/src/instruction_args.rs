use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use proc_macro_error2::{abort_call_site, ResultExt};
use quote::quote;
use syn::{DeriveInput, LitStr, Type};

use crate::{
    hash::{tag_tokens, SIGHASH_GLOBAL_NAMESPACE},
    type_to_idl::gated_type_to_idl,
    util::{find_attr, reject_generics, Paths},
};

#[derive(Default)]
struct InstructionArgsArgs {
    accounts: Option<Type>,
    name: Option<LitStr>,
    skip_validation: bool,
    skip_idl: bool,
}

pub fn derive_instruction_args_impl(input: DeriveInput) -> TokenStream {
    Paths!(prelude, tag);
    reject_generics(
        &input.generics,
        "Generics are not supported for InstructionArgs",
    );

    let mut args = InstructionArgsArgs::default();
    for attr in find_attr(&input.attrs, "ix") {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("accounts") {
                args.accounts = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("skip_validation") {
                args.skip_validation = true;
            } else if meta.path.is_ident("skip_idl") {
                args.skip_idl = true;
            } else {
                return Err(meta.error(
                    "expected `accounts = <ty>`, `name = \"...\"`, `skip_validation` or `skip_idl`",
                ));
            }
            Ok(())
        })
        .unwrap_or_abort();
    }

    let Some(accounts) = args.accounts else {
        abort_call_site!("InstructionArgs requires `#[ix(accounts = <ty>)]`");
    };
    let ident = &input.ident;
    let name = args
        .name
        .map_or_else(|| ident.to_string().to_snake_case(), |name| name.value());
    let ix_tag = tag_tokens(SIGHASH_GLOBAL_NAMESPACE, &name);
    let validate = !args.skip_validation;
    let idl_impl = (!args.skip_idl).then(|| gated_type_to_idl(&input));

    quote! {
        #[automatically_derived]
        impl #prelude::InstructionArgs for #ident {
            const NAME: &'static str = #name;
            const TAG: #tag = #ix_tag;
            const VALIDATE: bool = #validate;
            type Accounts = #accounts;
        }

        #idl_impl
    }
}
