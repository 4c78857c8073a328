use proc_macro2::TokenStream;
use proc_macro_error2::{abort, abort_call_site, ResultExt};
use quote::{quote, ToTokens};
use syn::{
    bracketed, parse_quote, punctuated::Punctuated, token::Comma, DeriveInput, Expr, ExprLit, Lit,
    Type,
};

use crate::{
    address::decode_address,
    util::{ensure_data_struct, find_attr, get_docs, idl_gated, reject_generics, Paths},
};

#[derive(Default)]
struct ProgramArgs {
    instruction_set: Option<Type>,
    id: Option<Expr>,
    errors: Option<Type>,
    events: Vec<Type>,
    no_entrypoint: bool,
    no_setup: bool,
    skip_idl: bool,
}

fn set_once<T: ToTokens>(slot: &mut Option<T>, value: T, name: &str) {
    if slot.is_some() {
        abort!(value, "Duplicate `{}` argument", name);
    }
    *slot = Some(value);
}

pub fn program_impl(input: DeriveInput) -> TokenStream {
    Paths!(crate_name, prelude);
    ensure_data_struct(&input, "SlotFrameProgram can only be derived for structs");
    reject_generics(&input.generics, "Generics are not supported for SlotFrameProgram");

    let mut args = ProgramArgs::default();
    // Arguments may be split across several attributes for conditional compilation.
    for attr in find_attr(&input.attrs, "program") {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("instruction_set") {
                set_once(&mut args.instruction_set, meta.value()?.parse()?, "instruction_set");
            } else if meta.path.is_ident("id") {
                set_once(&mut args.id, meta.value()?.parse()?, "id");
            } else if meta.path.is_ident("errors") {
                set_once(&mut args.errors, meta.value()?.parse()?, "errors");
            } else if meta.path.is_ident("events") {
                let value = meta.value()?;
                let content;
                bracketed!(content in value);
                args.events
                    .extend(Punctuated::<Type, Comma>::parse_terminated(&content)?);
            } else if meta.path.is_ident("no_entrypoint") {
                args.no_entrypoint = true;
            } else if meta.path.is_ident("no_setup") {
                args.no_setup = true;
            } else if meta.path.is_ident("skip_idl") {
                args.skip_idl = true;
            } else {
                return Err(meta.error("unknown program argument"));
            }
            Ok(())
        })
        .unwrap_or_abort();
    }

    let Some(program_id) = args.id else {
        abort_call_site!("expected an `id` program argument");
    };
    let Some(instruction_set) = args.instruction_set else {
        abort_call_site!("expected an `instruction_set` program argument");
    };
    let program_id = match program_id {
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => decode_address(&lit).unwrap_or_abort(),
        e => e.to_token_stream(),
    };

    let ident = &input.ident;
    let entrypoint = (!args.no_entrypoint).then(|| {
        quote! { #crate_name::slot_frame_entrypoint!(#ident); }
    });
    let program_setup = (!args.no_setup).then(|| {
        quote! { #crate_name::program_setup!(#ident); }
    });

    let idl_impl = (!args.skip_idl).then(|| {
        let docs = get_docs(&input.attrs);
        let errors = args.errors.unwrap_or_else(|| parse_quote!(()));
        let events = &args.events;
        idl_gated(quote! {
            impl #prelude::ProgramToIdl for #ident {
                type Errors = #errors;

                fn crate_metadata() -> #prelude::CrateMetadata {
                    let mut metadata = #crate_name::crate_metadata!();
                    metadata.docs = #docs;
                    metadata
                }

                #[allow(unused_variables)]
                fn events_to_idl(
                    idl_definition: &mut #prelude::IdlDefinition,
                ) -> #prelude::IdlResult<()> {
                    #(<#events as #prelude::EventToIdl>::event_to_idl(idl_definition)?;)*
                    Ok(())
                }
            }
        })
    });

    quote! {
        #[automatically_derived]
        impl #prelude::SlotFrameProgram for #ident {
            type InstructionSet = #instruction_set;
            const ID: #prelude::Address = #program_id;
        }
        #program_setup
        #entrypoint

        #idl_impl
    }
}
