use proc_macro2::TokenStream;
use proc_macro_error2::{abort, ResultExt};
use quote::quote;
use syn::{parse_quote, DeriveInput, Fields, Type};

use crate::{
    hash::{tag_tokens, SIGHASH_ACCOUNT_NAMESPACE},
    type_to_idl::gated_type_to_idl,
    util::{ensure_data_struct, find_attr, reject_generics, Paths},
};

#[derive(Default)]
struct RecordArgs {
    program: Option<Type>,
    skip_idl: bool,
}

pub fn derive_record_impl(input: DeriveInput) -> TokenStream {
    Paths!(prelude, size_of, tag);
    reject_generics(&input.generics, "Generics are not supported for Record");
    let data_struct = ensure_data_struct(&input, "Record can only be derived for structs");
    let Fields::Named(fields) = &data_struct.fields else {
        abort!(data_struct.fields, "Record fields must be named");
    };

    let mut args = RecordArgs::default();
    for attr in find_attr(&input.attrs, "record") {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("program") {
                args.program = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("skip_idl") {
                args.skip_idl = true;
            } else {
                return Err(meta.error("expected `program = <ty>` or `skip_idl`"));
            }
            Ok(())
        })
        .unwrap_or_abort();
    }

    let ident = &input.ident;
    let name = ident.to_string();
    let record_tag = tag_tokens(SIGHASH_ACCOUNT_NAMESPACE, &name);
    let program = args
        .program
        .unwrap_or_else(|| parse_quote!(crate::SlotFrameDeclaredProgram));
    let record_fields = fields.named.iter().map(|field| {
        let field_ident = field.ident.as_ref().expect("Named field");
        let field_name = field_ident.to_string();
        let ty = &field.ty;
        quote! {
            #prelude::RecordField {
                name: #field_name,
                offset: ::core::mem::offset_of!(#ident, #field_ident),
                size: #size_of::<#ty>(),
            }
        }
    });
    let idl_impl = (!args.skip_idl).then(|| gated_type_to_idl(&input));

    quote! {
        #[automatically_derived]
        impl #prelude::Record for #ident {
            const NAME: &'static str = #name;
            const TAG: #tag = #record_tag;
            const FIELDS: &'static [#prelude::RecordField] = &[#(#record_fields),*];
            type OwnerProgram = #program;
        }

        #idl_impl
    }
}
