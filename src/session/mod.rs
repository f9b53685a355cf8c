//! Session lifecycle: state, timers and the controller that ties them together.
//!
//! # Module Structure
//!
//! - `state`: `SessionState` flags and the `LifecycleState` machine
//! - `idle`: idle sources and the polling `IdleMonitor`
//! - `deletion`: the idempotent delete primitive and `DeletionScheduler`
//! - `controller`: `SessionController`, which owns all of the above

pub mod controller;
pub mod deletion;
pub mod idle;
pub mod state;

pub use self::controller::{SessionController, SessionEvent, SessionSettings, SubmitResponse};
pub use self::deletion::{
    delete_if_present, force_deletion_with_deadline, force_immediate_deletion, DeletionOutcome,
    DeletionScheduler,
};
pub use self::idle::{ActivityClock, IdleMonitor, IdleProbe, SystemIdleProbe};
pub use self::state::{LifecycleState, SessionState};
