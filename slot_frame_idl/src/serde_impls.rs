//! Addresses are written as base58 strings so the document stays readable and matches what
//! explorers and wallets display.

use solana_address::Address;
use std::str::FromStr;

fn parse_address<E: serde::de::Error>(value: &str) -> Result<Address, E> {
    Address::from_str(value)
        .map_err(|e| E::custom(format!("invalid base58 address `{value}`: {e:?}")))
}

pub mod serde_base58_address {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_address::Address;

    pub fn serialize<S: Serializer>(val: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(val)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_address(&s)
    }
}

pub mod serde_base58_address_option {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_address::Address;

    pub fn serialize<S: Serializer>(
        val: &Option<Address>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match val {
            Some(address) => serializer.serialize_some(&address.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Address>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::parse_address(&s))
            .transpose()
    }
}
