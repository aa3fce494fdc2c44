//! # Eyerest Core Library
//!
//! Core logic for Eyerest, a periodic work/rest reminder. A work period
//! counts down, then a rest break takes over the screen; presence detection,
//! manual overrides and short interruptions bend that schedule. The CLI and
//! any desktop shell are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Session**: a state machine driven by a single worker task. Callers
//!   only enqueue events through a [`SessionHandle`]; the worker applies
//!   them one at a time and publishes a [`SessionSnapshot`] after each.
//! - **Timers**: named one-shot timers that feed events back into the same
//!   queue. Cancelled or superseded timers never take effect.
//! - **Rest session**: the rest countdown with extension, unlock and cue.
//! - **Storage**: TOML configuration and a JSON statistics ledger under
//!   `~/.config/eyerest/`.
//!
//! ## Key Components
//!
//! - [`SessionMachine`]: mode transitions and timer bookkeeping
//! - [`TimerRegistry`]: cancellable timers keyed by [`TimerId`]
//! - [`RestSession`]: rest countdown
//! - [`StatisticsLedger`]: completed-rest statistics
//! - [`Config`]: application configuration
//! - [`IdleDetector`]: presence sensor contract

pub mod error;
pub mod events;
pub mod hotkey;
pub mod idle;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, HotkeyError, IdleError, LedgerError, RestError};
pub use events::{Event, Notification, WorkParams};
pub use hotkey::{hotkey_bindings, Hotkey, HotkeyAction, HotkeyBinding};
pub use idle::{ActivityClock, FixedIdle, IdleDetector};
pub use session::{
    spawn, Mode, Session, SessionContext, SessionHandle, SessionMachine, SessionSnapshot,
    SessionWorker,
};
pub use storage::{Config, ConfigKey, ConfigUpdate, StatisticsLedger};
pub use timer::{Envelope, RestDisplay, RestSession, TimerId, TimerRegistry};
