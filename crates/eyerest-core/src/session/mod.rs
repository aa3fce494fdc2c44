//! The session: mode, state machine and the worker that drives it.

pub mod machine;
mod mode;
pub mod worker;

pub use machine::{Session, SessionContext, SessionMachine, SessionSnapshot};
pub use mode::Mode;
pub use worker::{spawn, SessionHandle, SessionWorker};
