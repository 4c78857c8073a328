use crate::{ty::IdlTypeDef, IdlDiscriminant};
use serde::{Deserialize, Serialize};

/// A record type stored in program owned accounts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlAccount {
    pub name: String,
    pub discriminator: IdlDiscriminant,
    /// Length of the account data including the discriminator
    pub size: usize,
    pub type_def: IdlTypeDef,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlEvent {
    pub name: String,
    pub discriminator: IdlDiscriminant,
    pub type_def: IdlTypeDef,
}
