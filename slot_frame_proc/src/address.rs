use crate::util::get_crate_name;
use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    Expr, LitByte, LitStr,
};

/// Either a base58 string literal, decoded during expansion, or an expression evaluating to an
/// `Address`.
pub struct AddressInput(TokenStream);

impl Parse for AddressInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let id = if input.peek(LitStr) {
            let literal: LitStr = input.parse()?;
            decode_address(&literal)?
        } else {
            let expr: Expr = input.parse()?;
            quote! { #expr }
        };
        if !input.is_empty() {
            let stream: TokenStream = input.parse()?;
            return Err(syn::Error::new_spanned(stream, "unexpected token"));
        }
        Ok(Self(id))
    }
}

impl ToTokens for AddressInput {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(self.0.clone());
    }
}

/// A const `Address` expression for a base58 literal.
pub fn decode_address(literal: &LitStr) -> syn::Result<TokenStream> {
    let crate_name = get_crate_name();
    let decoded = bs58::decode(literal.value())
        .into_vec()
        .map_err(|_| syn::Error::new_spanned(literal, "failed to decode base58 string"))?;
    let array = <[u8; 32]>::try_from(decoded.as_slice()).map_err(|_| {
        syn::Error::new_spanned(
            literal,
            format!("address array is not 32 bytes long: len={}", decoded.len()),
        )
    })?;
    let bytes = array.iter().map(|b| LitByte::new(*b, Span::call_site()));
    Ok(quote! {
        #crate_name::solana_address::Address::new_from_array([#(#bytes,)*])
    })
}
