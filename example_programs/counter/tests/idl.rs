#![cfg(feature = "idl")]

use counter::*;
use pretty_assertions::assert_eq;
use slot_frame::{
    prelude::*,
    slot_frame_idl::{
        seeds::{IdlBump, IdlSeed},
        ty::{IdlStructField, IdlTypeDef},
    },
};

fn step_field() -> IdlStructField {
    IdlStructField {
        name: Some("step".to_string()),
        docs: vec![],
        type_def: IdlTypeDef::Defined("Step".to_string()),
    }
}

#[test]
fn shared_argument_type_is_listed_once() -> Result<()> {
    let idl = CounterProgram::program_to_idl()?;

    let names = idl
        .instructions
        .iter()
        .map(|ix| ix.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["initialize", "increment", "decrement", "fund", "close"]
    );
    assert_eq!(
        idl.types.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["CountChanged", "Counter", "Step"]
    );
    for name in ["increment", "decrement"] {
        let ix = idl.find_instruction(name).expect("instruction is listed");
        assert_eq!(ix.args, IdlTypeDef::Struct(vec![step_field()]));
    }
    Ok(())
}

#[test]
fn discriminators_match_runtime_tags() -> Result<()> {
    let idl = CounterProgram::program_to_idl()?;
    let increment = idl.find_instruction("increment").expect("instruction is listed");
    assert_eq!(increment.discriminator, Increment::TAG.to_bytes().to_vec());
    assert_eq!(
        idl.accounts["Counter"].discriminator,
        <Counter as Record>::TAG.to_bytes().to_vec()
    );
    assert_eq!(idl.accounts["Counter"].size, 8 + 48);
    assert_eq!(
        idl.events["CountChanged"].discriminator,
        CountChanged::TAG.to_bytes().to_vec()
    );
    Ok(())
}

#[test]
fn slot_constraints_are_described() -> Result<()> {
    let idl = CounterProgram::program_to_idl()?;
    let init = idl.find_instruction("initialize").expect("instruction is listed");
    let counter = &init.accounts[2];
    assert_eq!(counter.name, "counter");
    assert!(counter.writable);
    assert_eq!(counter.record.as_deref(), Some("Counter"));
    assert_eq!(counter.size, Some(0));
    let created = counter.init.as_ref().expect("counter is created");
    assert_eq!(created.payer, "payer");
    assert_eq!(created.space, 56);
    let seeds = counter.seeds.as_ref().expect("counter is derived");
    assert_eq!(
        seeds.seeds,
        vec![
            IdlSeed::Const(COUNTER_SEED.to_vec()),
            IdlSeed::Slot("authority".to_string())
        ]
    );
    assert_eq!(seeds.bump, IdlBump::Field("bump".to_string()));

    let system_program = &init.accounts[3];
    assert_eq!(system_program.address, Some(System::ID));
    assert_eq!(system_program.size, None);

    let close = idl.find_instruction("close").expect("instruction is listed");
    assert_eq!(close.accounts[1].close.as_deref(), Some("destination"));
    assert_eq!(close.accounts[1].has_one[0].slot, "authority");
    Ok(())
}

#[test]
fn errors_include_framework_and_program_codes() -> Result<()> {
    let idl = CounterProgram::program_to_idl()?;
    let overflow = idl
        .errors
        .iter()
        .find(|error| error.name == "Overflow")
        .expect("program error is listed");
    assert_eq!(overflow.code, CounterError::Overflow as u32);
    assert_eq!(overflow.message, "The counter would overflow");
    assert!(idl
        .errors
        .iter()
        .any(|error| error.code == ErrorCode::ExpectedSigner as u32));
    Ok(())
}

#[test]
fn document_serializes_to_json() -> Result<()> {
    let idl = CounterProgram::program_to_idl()?;
    let json: serde_json::Value = serde_json::from_str(&idl.to_json()?)?;
    assert_eq!(
        json["address"],
        "Coux9zxTFKZpRdFpE4F7Fs5RZ6FdaURdckwS61BUTMG"
    );
    assert_eq!(json["metadata"]["name"], "counter");
    Ok(())
}
