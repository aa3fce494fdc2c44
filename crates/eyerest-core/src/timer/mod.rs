pub mod registry;
pub mod rest;

pub use registry::{Envelope, Ticket, TimerId, TimerRegistry};
pub use rest::{
    ExtendOutcome, RestDisplay, RestEnd, RestSession, TickOutcome, CUE_AT_SECS, EXTEND_STEP_SECS,
    UNLOCK_PHRASE,
};
