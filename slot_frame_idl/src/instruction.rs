use crate::{
    seeds::IdlSeeds, serde_impls::serde_base58_address_option, ty::IdlTypeDef, IdlDiscriminant,
    ItemDescription,
};
use serde::{Deserialize, Serialize};
use solana_address::Address;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlInstruction {
    pub name: String,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub docs: ItemDescription,
    pub discriminator: IdlDiscriminant,
    /// Whether the program validates the declared constraints before running the handler
    pub validated: bool,
    pub accounts: Vec<IdlSlot>,
    pub args: IdlTypeDef,
}

/// One declared account position of an instruction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct IdlSlot {
    pub name: String,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub docs: ItemDescription,
    pub writable: bool,
    pub signer: bool,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub executable: bool,
    /// The exact data length, `None` for variable sized slots
    pub size: Option<usize>,
    #[serde(
        with = "serde_base58_address_option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub address: Option<Address>,
    #[serde(
        with = "serde_base58_address_option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub owner: Option<Address>,
    /// The name of the record stored in this account
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub record: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seeds: Option<IdlSeeds>,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub has_one: Vec<IdlHasOne>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub init: Option<IdlInit>,
    /// The slot receiving the balance when this slot is closed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub close: Option<String>,
}

/// A record field that must equal another slot's address.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlHasOne {
    pub field: String,
    pub slot: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlInit {
    pub payer: String,
    pub space: usize,
}
