use serde::{Deserialize, Serialize};

/// The seeds of a derived address. Only constants and other slots' addresses are supported, so
/// clients can always find the address from the instruction's accounts alone.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlSeeds {
    pub seeds: Vec<IdlSeed>,
    pub bump: IdlBump,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IdlSeed {
    /// A constant seed
    Const(Vec<u8>),
    /// The address of another slot in the same instruction
    Slot(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IdlBump {
    /// The canonical bump found by searching downwards from 255
    Canonical,
    /// The bump stored in a field of the account's own record
    Field(String),
}
