use crate::{ItemDescription, ItemSource};
use serde::{Deserialize, Serialize};

/// A registered composite type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlType {
    pub name: String,
    #[serde(skip)]
    pub source: ItemSource,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub docs: ItemDescription,
    pub type_def: IdlTypeDef,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct IdlEnumVariant {
    pub name: String,
    pub discriminant: u8,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub docs: ItemDescription,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub type_def: Option<IdlTypeDef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdlStructField {
    /// `None` for tuple fields
    pub name: Option<String>,
    #[serde(skip_serializing_if = "crate::is_default", default)]
    pub docs: ItemDescription,
    pub type_def: IdlTypeDef,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IdlTypeDef {
    /// A reference into [`IdlDefinition::types`](crate::IdlDefinition::types) by short name.
    Defined(String),
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
    U128,
    I128,
    String,
    Address,
    Option(Box<IdlTypeDef>),
    List {
        len_ty: Box<IdlTypeDef>,
        item_ty: Box<IdlTypeDef>,
    },
    Array(Box<IdlTypeDef>, usize),
    Struct(Vec<IdlStructField>),
    Enum {
        variants: Vec<IdlEnumVariant>,
    },
}

impl IdlTypeDef {
    /// The name of the referenced type, if this is a reference.
    #[must_use]
    pub fn defined_name(&self) -> Option<&str> {
        match self {
            IdlTypeDef::Defined(name) => Some(name),
            _ => None,
        }
    }
}

impl Default for IdlTypeDef {
    fn default() -> Self {
        Self::Struct(vec![])
    }
}
