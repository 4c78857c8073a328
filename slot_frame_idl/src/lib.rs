//! The interface description document emitted for `slot_frame` programs.
//!
//! The document is built once per build by walking a program's declarations and is consumed by
//! client generators. Composite types live in a single registry keyed by their short name, so a
//! type used by several instructions, accounts or events is described exactly once.
extern crate alloc;
extern crate core;

pub mod account;
pub mod instruction;
pub mod seeds;
pub mod serde_impls;
pub mod ty;

use crate::serde_impls::serde_base58_address;
use account::{IdlAccount, IdlEvent};
use instruction::IdlInstruction;
pub use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use solana_address::Address;
use std::{any::type_name, collections::BTreeMap};
use ty::{IdlType, IdlTypeDef};

pub fn idl_spec_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION"))
        .expect("Invalid package version. This should never happen.")
}

pub type IdlDiscriminant = Vec<u8>;

pub type Result<T> = std::result::Result<T, Error>;

/// A source of an item in the IDL, found using the `item_source` function
pub type ItemSource = String;
pub type ItemDescription = Vec<String>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlMetadata {
    /// Version of the `IdlDefinition`
    pub idl_spec: Version,
    #[serde(flatten)]
    pub crate_metadata: CrateMetadata,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CrateMetadata {
    /// Version of the program
    pub version: Version,
    /// Name of the program
    pub name: String,
    pub docs: ItemDescription,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub repository: Option<String>,
}

impl Default for CrateMetadata {
    fn default() -> Self {
        Self {
            version: Version::new(0, 0, 0),
            name: String::new(),
            docs: Vec::new(),
            description: None,
            homepage: None,
            license: None,
            repository: None,
        }
    }
}

impl Default for IdlMetadata {
    fn default() -> Self {
        Self {
            idl_spec: idl_spec_version(),
            crate_metadata: CrateMetadata::default(),
        }
    }
}

/// A single program error, as `(name, code)` plus its message.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorNode {
    pub name: String,
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub docs: ItemDescription,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IdlDefinition {
    #[serde(with = "serde_base58_address")]
    pub address: Address,
    pub metadata: IdlMetadata,
    pub instructions: Vec<IdlInstruction>,
    pub accounts: BTreeMap<String, IdlAccount>,
    pub types: BTreeMap<String, IdlType>,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub events: BTreeMap<String, IdlEvent>,
    pub errors: Vec<ErrorNode>,
}

impl IdlDefinition {
    /// Adds an instruction. Instructions are unique by name and discriminator.
    pub fn add_instruction(&mut self, instruction: IdlInstruction) -> Result<()> {
        if let Some(existing) = self.find_instruction(&instruction.name) {
            if existing == &instruction {
                return Ok(());
            }
            return Err(Error::DuplicateInstruction(instruction.name));
        }
        if let Some(existing) = self
            .instructions
            .iter()
            .find(|ix| ix.discriminator == instruction.discriminator)
        {
            return Err(Error::DuplicateDiscriminator {
                first: existing.name.clone(),
                second: instruction.name,
            });
        }
        self.instructions.push(instruction);
        Ok(())
    }

    /// Registers a type under its short name and returns a reference to it.
    ///
    /// Registering the same source twice is a no-op. Registering a different source under an
    /// existing name fails with [`Error::DuplicateTypeName`].
    pub fn add_type(&mut self, ty: IdlType) -> Result<IdlTypeDef> {
        let name = ty.name.clone();
        match self.types.get(&name) {
            Some(existing) if existing.source == ty.source => {}
            Some(existing) => {
                return Err(Error::DuplicateTypeName {
                    name,
                    first: existing.source.clone(),
                    second: ty.source,
                })
            }
            None => {
                self.types.insert(name.clone(), ty);
            }
        }
        Ok(IdlTypeDef::Defined(name))
    }

    /// Returns the reference for an already registered type, so derives can skip walking a type
    /// twice (and terminate on recursive types).
    #[must_use]
    pub fn registered_type(&self, name: &str, source: &str) -> Option<IdlTypeDef> {
        self.types
            .get(name)
            .filter(|ty| ty.source == source)
            .map(|_| IdlTypeDef::Defined(name.to_string()))
    }

    pub fn add_account(&mut self, account: IdlAccount) -> Result<()> {
        match self.accounts.get(&account.name) {
            Some(existing) if existing == &account => Ok(()),
            Some(_) => Err(Error::DuplicateAccount(account.name)),
            None => {
                self.accounts.insert(account.name.clone(), account);
                Ok(())
            }
        }
    }

    pub fn add_event(&mut self, event: IdlEvent) -> Result<()> {
        match self.events.get(&event.name) {
            Some(existing) if existing == &event => Ok(()),
            Some(_) => Err(Error::DuplicateEvent(event.name)),
            None => {
                self.events.insert(event.name.clone(), event);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn find_instruction(&self, name: &str) -> Option<&IdlInstruction> {
        self.instructions.iter().find(|ix| ix.name == name)
    }

    pub fn find_type(&self, name: &str) -> Result<&IdlType> {
        self.types
            .get(name)
            .ok_or_else(|| Error::TypeNotFound(name.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Gets the type name stripped of generics
#[must_use]
pub fn item_source<T: ?Sized>() -> String {
    let mut to_return = String::new();
    let mut open_count = 0;
    for char in type_name::<T>().chars() {
        if char == '<' {
            open_count += 1;
        }
        if open_count == 0 {
            to_return.push(char);
        }
        if char == '>' {
            open_count -= 1;
        }
        assert!(open_count >= 0, "Mismatched generics in type name");
    }

    to_return
}

/// The last path segment of an item source.
#[must_use]
pub fn short_name(source: &str) -> &str {
    source.rsplit("::").next().unwrap_or(source)
}

// Serde helper function
fn is_default<T: Default + PartialEq>(t: &T) -> bool {
    t == &T::default()
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Type name `{name}` is defined by both `{first}` and `{second}`")]
    DuplicateTypeName {
        name: String,
        first: ItemSource,
        second: ItemSource,
    },
    #[error("Instruction `{0}` is defined twice with different contents")]
    DuplicateInstruction(String),
    #[error("Instructions `{first}` and `{second}` share a discriminator")]
    DuplicateDiscriminator { first: String, second: String },
    #[error("Account `{0}` is defined twice with different contents")]
    DuplicateAccount(String),
    #[error("Event `{0}` is defined twice with different contents")]
    DuplicateEvent(String),
    #[error("Type not found in IDL definition: {0}")]
    TypeNotFound(String),
    #[error("Slot `{slot}` references unknown slot index {index}")]
    UnknownSlot { slot: String, index: usize },
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Custom Error: {0}")]
    Custom(String),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ty::IdlStructField;
    use pretty_assertions::assert_eq;

    /// Tests that the idl_spec_version function doesn't panic
    #[test]
    fn test_idl_spec_version() {
        idl_spec_version();
    }

    fn params(source: &str) -> IdlType {
        IdlType {
            name: "Params".into(),
            source: source.into(),
            docs: vec![],
            type_def: IdlTypeDef::Struct(vec![IdlStructField {
                name: Some("step".into()),
                docs: vec![],
                type_def: IdlTypeDef::U64,
            }]),
        }
    }

    #[test]
    fn types_dedupe_by_name() -> Result<()> {
        let mut idl = IdlDefinition::default();
        let first = idl.add_type(params("counter::Params"))?;
        let second = idl.add_type(params("counter::Params"))?;
        assert_eq!(first, IdlTypeDef::Defined("Params".into()));
        assert_eq!(first, second);
        assert_eq!(idl.types.len(), 1);
        assert_eq!(
            idl.registered_type("Params", "counter::Params"),
            Some(IdlTypeDef::Defined("Params".into()))
        );
        assert_eq!(idl.registered_type("Params", "other::Params"), None);
        Ok(())
    }

    #[test]
    fn conflicting_type_names_error() -> Result<()> {
        let mut idl = IdlDefinition::default();
        idl.add_type(params("counter::Params"))?;
        let err = idl.add_type(params("other::Params")).unwrap_err();
        assert!(matches!(err, Error::DuplicateTypeName { .. }));
        Ok(())
    }

    #[test]
    fn discriminators_must_be_unique() -> Result<()> {
        let mut idl = IdlDefinition::default();
        let ix = |name: &str| IdlInstruction {
            name: name.into(),
            docs: vec![],
            discriminator: vec![1; 8],
            validated: true,
            accounts: vec![],
            args: IdlTypeDef::Struct(vec![]),
        };
        idl.add_instruction(ix("a"))?;
        idl.add_instruction(ix("a"))?;
        assert_eq!(idl.instructions.len(), 1);
        assert!(matches!(
            idl.add_instruction(ix("b")),
            Err(Error::DuplicateDiscriminator { .. })
        ));
        Ok(())
    }

    #[test]
    fn item_source_strips_generics() {
        struct Wrapper<T>(T);
        let source = item_source::<Wrapper<u8>>();
        assert!(source.ends_with("Wrapper"));
        assert_eq!(short_name(&source), "Wrapper");
        assert_eq!(short_name("Plain"), "Plain");
    }

    #[test]
    fn address_serializes_as_base58() -> Result<()> {
        let idl = IdlDefinition::default();
        let json = idl.to_json()?;
        assert!(json.contains("\"address\": \"11111111111111111111111111111111\""));
        let parsed: IdlDefinition = serde_json::from_str(&json)?;
        assert_eq!(parsed, idl);
        Ok(())
    }
}
