use proc_macro2::{Ident, TokenStream};
use proc_macro_error2::{abort, ResultExt};
use quote::quote;
use syn::{
    bracketed, meta::ParseNestedMeta, punctuated::Punctuated, token::Comma, DeriveInput, Expr,
    ExprLit, Fields, Lit, Type,
};

use crate::util::{
    ensure_data_struct, find_attr, get_docs, idl_gated, ignore_cfg_module, reject_generics, Paths,
};

enum SeedArg {
    Const(Expr),
    Slot(Ident),
}

#[derive(Default)]
struct SlotArgs {
    has_one: Vec<(String, Ident)>,
    seeds: Option<Vec<SeedArg>>,
    bump: Option<Ident>,
    init: Option<(Ident, Option<Expr>)>,
    close: Option<Ident>,
    address: Option<Expr>,
    owner: Option<Expr>,
}

struct SlotField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    args: SlotArgs,
}

fn parse_seeds(meta: &ParseNestedMeta) -> syn::Result<Vec<SeedArg>> {
    let value = meta.value()?;
    let content;
    bracketed!(content in value);
    let exprs = Punctuated::<Expr, Comma>::parse_terminated(&content)?;
    Ok(exprs
        .into_iter()
        .map(|expr| match expr {
            Expr::Path(path) if path.qself.is_none() && path.path.get_ident().is_some() => {
                let ident = path.path.get_ident().cloned().expect("Checked above");
                if ident.to_string().chars().all(|c| !c.is_lowercase()) {
                    SeedArg::Const(Expr::Path(path))
                } else {
                    SeedArg::Slot(ident)
                }
            }
            expr => SeedArg::Const(expr),
        })
        .collect())
}

fn parse_slot_args(field: &syn::Field) -> SlotArgs {
    let mut args = SlotArgs::default();
    for attr in find_attr(&field.attrs, "slot") {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("has_one") {
                if meta.input.peek(syn::Token![=]) {
                    let slot: Ident = meta.value()?.parse()?;
                    args.has_one.push((slot.to_string(), slot));
                } else {
                    meta.parse_nested_meta(|inner| {
                        let Some(record_field) = inner.path.get_ident() else {
                            return Err(inner.error("expected `<field> = <slot>`"));
                        };
                        let slot: Ident = inner.value()?.parse()?;
                        args.has_one.push((record_field.to_string(), slot));
                        Ok(())
                    })?;
                }
            } else if meta.path.is_ident("seeds") {
                args.seeds = Some(parse_seeds(&meta)?);
            } else if meta.path.is_ident("bump") {
                args.bump = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("init") {
                let mut payer = None;
                let mut space = None;
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("payer") {
                        payer = Some(inner.value()?.parse()?);
                    } else if inner.path.is_ident("space") {
                        space = Some(inner.value()?.parse()?);
                    } else {
                        return Err(inner.error("expected `payer = <slot>` or `space = <expr>`"));
                    }
                    Ok(())
                })?;
                let Some(payer) = payer else {
                    return Err(meta.error("init requires a `payer`"));
                };
                args.init = Some((payer, space));
            } else if meta.path.is_ident("close") {
                args.close = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("address") {
                args.address = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("owner") {
                args.owner = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error(
                    "expected one of `has_one`, `seeds`, `bump`, `init`, `close`, `address`, `owner`",
                ));
            }
            Ok(())
        })
        .unwrap_or_abort();
    }
    if args.bump.is_some() && args.seeds.is_none() {
        abort!(field, "`bump` requires `seeds`");
    }
    args
}

pub fn derive_accounts_impl(input: DeriveInput) -> TokenStream {
    Paths!(prelude, account_schema, slot_def, slot_type, account_view);
    reject_generics(&input.generics, "Generics are not supported for Accounts");
    let data_struct = ensure_data_struct(&input, "Accounts can only be derived for structs");
    let Fields::Named(named) = &data_struct.fields else {
        abort!(data_struct.fields, "Accounts fields must be named");
    };

    let fields = named
        .named
        .iter()
        .map(|field| SlotField {
            ident: field.ident.as_ref().expect("Named field"),
            ty: &field.ty,
            args: parse_slot_args(field),
        })
        .collect::<Vec<_>>();

    let index_of = |slot: &Ident| -> usize {
        fields
            .iter()
            .position(|field| field.ident == slot)
            .unwrap_or_else(|| abort!(slot, "No slot named `{}` in this schema", slot))
    };

    let slot_defs = fields.iter().map(|field| {
        let SlotField { ident, ty, args } = field;
        let name = ident.to_string();
        let mut def = quote! { #slot_def::of::<#ty>(#name) };

        if !args.has_one.is_empty() {
            let has_one = args.has_one.iter().map(|(record_field, slot)| {
                let target = index_of(slot);
                quote! { #prelude::HasOne::new::<#ty>(#record_field, #target) }
            });
            def = quote! { #def.with_has_one(const { &[#(#has_one),*] }) };
        }
        if let Some(seeds) = &args.seeds {
            let seeds = seeds.iter().map(|seed| match seed {
                SeedArg::Slot(slot) => {
                    let index = index_of(slot);
                    quote! { #prelude::Seed::Slot(#index) }
                }
                SeedArg::Const(Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                })) => quote! { #prelude::Seed::Const(#lit.as_bytes()) },
                SeedArg::Const(expr) => quote! { #prelude::Seed::Const(#expr) },
            });
            let bump = match &args.bump {
                Some(bump) => {
                    let bump = bump.to_string();
                    quote! { #prelude::Bump::field::<#ty>(#bump) }
                }
                None => quote! { #prelude::Bump::Canonical },
            };
            def = quote! {
                #def.with_seeds(#prelude::Seeds {
                    seeds: const { &[#(#seeds),*] },
                    bump: #bump,
                })
            };
        }
        if let Some((payer, space)) = &args.init {
            let payer = index_of(payer);
            let space = match space {
                Some(space) => quote!(Some(#space)),
                None => quote!(None),
            };
            def = quote! { #def.with_init(#payer, #space) };
        }
        if let Some(destination) = &args.close {
            let destination = index_of(destination);
            def = quote! { #def.with_close(#destination) };
        }
        if let Some(address) = &args.address {
            def = quote! { #def.with_address(#address) };
        }
        if let Some(owner) = &args.owner {
            def = quote! { #def.with_owner(#owner) };
        }
        def
    });

    let ident = &input.ident;
    let field_idents = fields.iter().map(|field| field.ident);
    let field_tys = fields.iter().map(|field| field.ty);
    let indices = 0..fields.len();

    let idl_slots = fields.iter().enumerate().map(|(index, field)| {
        let ty = field.ty;
        let docs = get_docs(&named.named[index].attrs);
        quote! {
            #prelude::slot_to_idl(
                slots,
                &slots[#index],
                <#ty as #prelude::SlotToIdl>::record_to_idl(idl_definition)?,
                #docs,
            )?
        }
    });
    let idl_impl = idl_gated(quote! {
        impl #prelude::AccountSchemaToIdl for #ident {
            fn account_schema_to_idl(
                idl_definition: &mut #prelude::IdlDefinition,
            ) -> #prelude::IdlResult<Vec<#prelude::IdlSlot>> {
                let slots = <Self as #account_schema>::SLOTS;
                Ok(vec![#(#idl_slots),*])
            }
        }
    });
    let idl_impl = ignore_cfg_module(ident, "_account_schema_to_idl", idl_impl);

    quote! {
        #[automatically_derived]
        impl #account_schema for #ident {
            const SLOTS: &'static [#slot_def] = &[#(#slot_defs),*];

            fn from_views(views: &[#account_view]) -> Self {
                Self {
                    #(#field_idents: <#field_tys as #slot_type>::from_view(views[#indices]),)*
                }
            }
        }

        #idl_impl
    }
}
