//! Radio port trait

use crate::domain::{OperatingState, RigResult};

/// An open radio: a CAT dialect bound to a transport, or the emulated rig.
pub trait RadioIo: Send {
    /// Sample the radio's current operating state.
    fn read_operating_state(&mut self) -> RigResult<OperatingState>;

    /// Release the transport. Safe to call more than once.
    fn close(&mut self);
}
