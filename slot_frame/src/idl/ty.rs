use crate::{idl::TypeToIdl, IdlResult};
use slot_frame_idl::{
    ty::{IdlStructField, IdlTypeDef},
    IdlDefinition,
};
use solana_address::Address;

macro_rules! primitive_type_defs {
    ($($ty:ty => $def:ident),* $(,)?) => {$(
        impl TypeToIdl for $ty {
            fn type_def(_idl_definition: &mut IdlDefinition) -> IdlResult<IdlTypeDef> {
                Ok(IdlTypeDef::$def)
            }
        }
    )*};
}

primitive_type_defs! {
    bool => Bool,
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    u64 => U64,
    i64 => I64,
    f64 => F64,
    u128 => U128,
    i128 => I128,
    String => String,
    Address => Address,
}

impl<T: TypeToIdl> TypeToIdl for Option<T> {
    fn type_def(idl_definition: &mut IdlDefinition) -> IdlResult<IdlTypeDef> {
        let inner = T::type_to_idl(idl_definition)?;
        Ok(IdlTypeDef::Option(Box::new(inner)))
    }
}

impl<T: TypeToIdl> TypeToIdl for Vec<T> {
    fn type_def(idl_definition: &mut IdlDefinition) -> IdlResult<IdlTypeDef> {
        let item = T::type_to_idl(idl_definition)?;
        // borsh prefixes sequences with a u32 length
        Ok(IdlTypeDef::List {
            len_ty: Box::new(IdlTypeDef::U32),
            item_ty: Box::new(item),
        })
    }
}

impl<T: TypeToIdl, const N: usize> TypeToIdl for [T; N] {
    fn type_def(idl_definition: &mut IdlDefinition) -> IdlResult<IdlTypeDef> {
        let item = T::type_to_idl(idl_definition)?;
        Ok(IdlTypeDef::Array(Box::new(item), N))
    }
}

impl TypeToIdl for () {
    fn type_def(_idl_definition: &mut IdlDefinition) -> IdlResult<IdlTypeDef> {
        Ok(IdlTypeDef::Struct(vec![]))
    }
}

fn unnamed(type_def: IdlTypeDef) -> IdlStructField {
    IdlStructField {
        name: None,
        docs: vec![],
        type_def,
    }
}

/// Implements [`TypeToIdl`] for every non-empty prefix of the given type parameters.
macro_rules! tuple_type_defs {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first: TypeToIdl $(, $rest: TypeToIdl)*> TypeToIdl for ($first, $($rest,)*) {
            fn type_def(idl_definition: &mut IdlDefinition) -> IdlResult<IdlTypeDef> {
                Ok(IdlTypeDef::Struct(vec![
                    unnamed($first::type_to_idl(idl_definition)?),
                    $(unnamed($rest::type_to_idl(idl_definition)?),)*
                ]))
            }
        }
        tuple_type_defs!($($rest),*);
    };
    () => {};
}

tuple_type_defs!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn containers_wrap_their_items() -> IdlResult<()> {
        let mut idl = IdlDefinition::default();
        assert_eq!(
            <Vec<Option<u16>>>::type_to_idl(&mut idl)?,
            IdlTypeDef::List {
                len_ty: Box::new(IdlTypeDef::U32),
                item_ty: Box::new(IdlTypeDef::Option(Box::new(IdlTypeDef::U16))),
            }
        );
        assert_eq!(
            <[Address; 2]>::type_to_idl(&mut idl)?,
            IdlTypeDef::Array(Box::new(IdlTypeDef::Address), 2)
        );
        assert!(idl.types.is_empty());
        Ok(())
    }

    #[test]
    fn tuples_are_unnamed_structs() -> IdlResult<()> {
        let mut idl = IdlDefinition::default();
        let IdlTypeDef::Struct(fields) = <(u8, bool)>::type_to_idl(&mut idl)? else {
            panic!("expected a struct");
        };
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|field| field.name.is_none()));
        Ok(())
    }
}
