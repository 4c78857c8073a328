use proc_macro2::TokenStream;
use proc_macro_error2::abort;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::util::{get_docs, idl_gated, ignore_cfg_module, reject_generics, Paths};

fn fields_to_idl(fields: &Fields) -> TokenStream {
    Paths!(prelude, type_to_idl);
    let fields = fields.iter().map(|field| {
        let ty = &field.ty;
        let docs = get_docs(&field.attrs);
        let name = match &field.ident {
            Some(ident) => {
                let name = ident.to_string();
                quote!(Some(#name.to_string()))
            }
            None => quote!(None),
        };
        quote! {
            #prelude::IdlStructField {
                name: #name,
                docs: #docs,
                type_def: <#ty as #type_to_idl>::type_to_idl(idl_definition)?,
            }
        }
    });
    quote! { #prelude::IdlTypeDef::Struct(vec![#(#fields),*]) }
}

/// The structural definition of `input` plus its registration under its short name.
pub fn type_to_idl_body(input: &DeriveInput) -> TokenStream {
    Paths!(prelude, type_to_idl, idl_definition, idl_result, idl_type_def);
    reject_generics(&input.generics, "Generics are not supported for IDL types");

    let ident = &input.ident;
    let name = ident.to_string();
    let docs = get_docs(&input.attrs);

    let type_def = match &input.data {
        Data::Struct(data_struct) => fields_to_idl(&data_struct.fields),
        Data::Enum(data_enum) => {
            if data_enum.variants.len() > usize::from(u8::MAX) + 1 {
                abort!(data_enum.variants, "Enums may have at most 256 variants");
            }
            let variants = data_enum.variants.iter().enumerate().map(|(index, variant)| {
                let discriminant = u8::try_from(index).expect("Checked above");
                let variant_name = variant.ident.to_string();
                let variant_docs = get_docs(&variant.attrs);
                let variant_def = match &variant.fields {
                    Fields::Unit => quote!(None),
                    fields => {
                        let def = fields_to_idl(fields);
                        quote!(Some(#def))
                    }
                };
                quote! {
                    #prelude::IdlEnumVariant {
                        name: #variant_name.to_string(),
                        discriminant: #discriminant,
                        docs: #variant_docs,
                        type_def: #variant_def,
                    }
                }
            });
            quote! { #prelude::IdlTypeDef::Enum { variants: vec![#(#variants),*] } }
        }
        Data::Union(u) => abort!(u.union_token, "IDL types cannot be unions"),
    };

    quote! {
        impl #type_to_idl for #ident {
            fn type_def(idl_definition: &mut #idl_definition) -> #idl_result<#idl_type_def> {
                Ok(#type_def)
            }

            fn type_to_idl(idl_definition: &mut #idl_definition) -> #idl_result<#idl_type_def> {
                let source = #prelude::item_source::<Self>();
                if let Some(existing) = idl_definition.registered_type(#name, &source) {
                    return Ok(existing);
                }
                let type_def = Self::type_def(idl_definition)?;
                Ok(idl_definition.add_type(#prelude::IdlType {
                    name: #name.to_string(),
                    source,
                    docs: #docs,
                    type_def,
                })?)
            }
        }
    }
}

/// A [`type_to_idl_body`] impl, compiled only when IDL generation is enabled.
pub fn gated_type_to_idl(input: &DeriveInput) -> TokenStream {
    ignore_cfg_module(
        &input.ident,
        "_type_to_idl",
        idl_gated(type_to_idl_body(input)),
    )
}

pub fn derive_type_to_idl_impl(input: DeriveInput) -> TokenStream {
    gated_type_to_idl(&input)
}
