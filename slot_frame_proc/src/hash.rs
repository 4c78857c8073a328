use crate::util::Paths;
use itertools::Itertools;
use proc_macro2::{Literal, TokenStream};
use proc_macro_error2::abort;
use quote::quote;
use sha2::{Digest, Sha256};
use syn::{punctuated::Punctuated, token::Comma, LitStr};

pub const SIGHASH_GLOBAL_NAMESPACE: &str = "global";
pub const SIGHASH_ACCOUNT_NAMESPACE: &str = "account";
pub const SIGHASH_EVENT_NAMESPACE: &str = "event";

/// The first 8 bytes of `sha256(preimage)`.
pub fn hash_str(preimage: &str) -> [u8; 8] {
    let digest = Sha256::digest(preimage.as_bytes());
    let mut tag = [0; 8];
    tag.copy_from_slice(&digest[..8]);
    tag
}

/// `hash` as an array expression of `u8` literals.
pub fn hash_tts(hash: &[u8; 8]) -> TokenStream {
    let bytes = hash.iter().copied().map(Literal::u8_unsuffixed);
    quote! { [#(#bytes),*] }
}

/// A `Tag` constant for `name` under `namespace`, hashed during expansion.
pub fn tag_tokens(namespace: &str, name: &str) -> TokenStream {
    Paths!(tag);
    let bytes = hash_tts(&hash_str(&format!("{namespace}:{name}")));
    quote! { #tag::new(#bytes) }
}

pub fn sighash_impl(args: Punctuated<LitStr, Comma>) -> TokenStream {
    if args.is_empty() {
        abort!(args, "sighash! needs at least a namespace and a name");
    }
    let preimage = args.iter().map(LitStr::value).join(":");
    hash_tts(&hash_str(&preimage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn matches_published_instruction_discriminator() {
        assert_eq!(
            hash_str("global:initialize"),
            [175, 175, 109, 31, 13, 152, 155, 237]
        );
    }

    #[test]
    fn hash_tokens_are_an_array_literal() {
        let tokens = hash_tts(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let array: syn::ExprArray = syn::parse2(tokens).expect("array expression");
        assert_eq!(array.elems.len(), 8);
    }
}
