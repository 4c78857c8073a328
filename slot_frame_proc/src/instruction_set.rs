use itertools::Itertools;
use proc_macro2::TokenStream;
use proc_macro_error2::{abort, ResultExt};
use quote::quote;
use syn::{Fields, FieldsUnnamed, ItemEnum};

use crate::util::{find_attr, idl_gated, ignore_cfg_module, reject_generics, Paths};

pub fn instruction_set_impl(item: ItemEnum) -> TokenStream {
    Paths!(crate_name, prelude);
    reject_generics(&item.generics, "Generics are not supported for InstructionSet");

    let mut skip_idl = false;
    for attr in find_attr(&item.attrs, "ix_set") {
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

    let ident = &item.ident;
    let variant_tys = item
        .variants
        .iter()
        .map(|v| {
            const UNNAMED_ERROR: &str = "Each variant must have a single unnamed field";
            let unnamed_fields = match &v.fields {
                Fields::Unnamed(FieldsUnnamed { unnamed, .. }) => unnamed,
                _ => abort!(v.fields, UNNAMED_ERROR),
            };
            if unnamed_fields.len() != 1 {
                abort!(unnamed_fields, UNNAMED_ERROR);
            }
            &unnamed_fields[0].ty
        })
        .collect_vec();

    let idl_impl = (!skip_idl).then(|| {
        ignore_cfg_module(
            ident,
            "_instruction_set_to_idl",
            idl_gated(quote! {
                impl #prelude::InstructionSetToIdl for #ident {
                    fn instruction_set_to_idl(
                        idl_definition: &mut #prelude::IdlDefinition,
                    ) -> #prelude::IdlResult<()> {
                        #(
                            <#variant_tys as #prelude::InstructionToIdl>::instruction_to_idl(idl_definition)?;
                        )*
                        Ok(())
                    }
                }
            }),
        )
    });

    quote! {
        #[automatically_derived]
        impl #prelude::InstructionSet for #ident {
            const ROUTES: &'static [#prelude::Route] = &[
                #(#prelude::Route::new::<#variant_tys>(),)*
            ];
        }

        #crate_name::static_assertions::const_assert!(
            #prelude::tags_unique(<#ident as #prelude::InstructionSet>::ROUTES)
        );

        #idl_impl
    }
}
