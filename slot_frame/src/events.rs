//! Structured events emitted through the host's data log.

use crate::tag::Tag;
use borsh::BorshSerialize;

pub use slot_frame_proc::Event;

/// A borsh-serializable payload logged with [`Context::emit`](crate::context::Context::emit).
///
/// Derivable with [`derive@Event`], which sets [`Self::TAG`] to `sighash!("event", <Name>)`.
pub trait Event: BorshSerialize {
    const NAME: &'static str;
    const TAG: Tag;
}

#[cfg(test)]
mod tests {
    use crate::{
        context::Context,
        prelude::*,
        tag::{Tag, EVENT_NAMESPACE},
        testing::MockRuntime,
    };

    #[derive(Event, BorshSerialize, Debug)]
    struct Incremented {
        count: u64,
    }

    #[test]
    fn emitted_event_is_tag_then_borsh() -> Result<()> {
        assert_eq!(Incremented::TAG, Tag::derive(EVENT_NAMESPACE, "Incremented"));
        let runtime = MockRuntime::new(Address::new_from_array([1; 32]));
        let program_id = Address::new_from_array([1; 32]);
        let ctx = Context::new(&program_id, &[], &[], &runtime);
        ctx.emit(&Incremented { count: 7 })?;

        let logs = runtime.logs();
        assert_eq!(logs.len(), 1);
        let mut expected = Incremented::TAG.to_bytes().to_vec();
        expected.extend_from_slice(&7u64.to_le_bytes());
        assert_eq!(logs[0], vec![expected]);
        Ok(())
    }
}
