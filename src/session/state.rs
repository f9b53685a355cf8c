//! Session flags owned by the lifecycle controller.

use chrono::{DateTime, Local};
use uuid::Uuid;

/// Where the controller is in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Waiting for a credential. Initial state.
    #[default]
    Locked,
    /// A submitted credential is being checked.
    Authenticating,
    /// The viewing surface shows the artifact.
    Active,
    /// The viewing surface was closed for inactivity; deletion still pending.
    LockedByTimeout,
    /// The deletion job has fired or the process is exiting.
    Closed,
}

/// State of the current (or most recent) viewing episode.
///
/// Flags change only through the methods below, which keep two invariants:
/// `access_granted` is set only together with an opened viewer, and
/// `deletion_discharged` never goes back to `false`.
#[derive(Debug, Default)]
pub struct SessionState {
    lifecycle: LifecycleState,
    access_granted: bool,
    lock_armed: bool,
    deletion_armed: bool,
    deletion_discharged: bool,
    session_id: Option<Uuid>,
    granted_at: Option<DateTime<Local>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn access_granted(&self) -> bool {
        self.access_granted
    }

    pub fn lock_armed(&self) -> bool {
        self.lock_armed
    }

    pub fn deletion_armed(&self) -> bool {
        self.deletion_armed
    }

    pub fn deletion_discharged(&self) -> bool {
        self.deletion_discharged
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn granted_at(&self) -> Option<DateTime<Local>> {
        self.granted_at
    }

    /// Enters `Authenticating`, returning the state to restore on rejection.
    pub(crate) fn begin_authentication(&mut self) -> LifecycleState {
        let previous = self.lifecycle;
        self.lifecycle = LifecycleState::Authenticating;
        previous
    }

    /// Leaves `Authenticating` without granting access.
    pub(crate) fn reject(&mut self, previous: LifecycleState) {
        self.lifecycle = previous;
    }

    /// Records a successful grant after the viewer has opened.
    pub(crate) fn grant(&mut self, id: Uuid) {
        self.session_id = Some(id);
        self.granted_at = Some(Local::now());
        self.lock_armed = true;
        self.access_granted = true;
        self.lifecycle = LifecycleState::Active;
    }

    /// True when a deferred deletion is armed and has not yet discharged.
    pub fn deletion_pending(&self) -> bool {
        self.deletion_armed && !self.deletion_discharged
    }

    pub(crate) fn arm_deletion(&mut self) {
        self.deletion_armed = true;
    }

    /// Moves `Active` to `LockedByTimeout`. Other states are left alone.
    pub(crate) fn lock_for_inactivity(&mut self) -> bool {
        self.lock_armed = false;
        if self.lifecycle == LifecycleState::Active {
            self.lifecycle = LifecycleState::LockedByTimeout;
            true
        } else {
            false
        }
    }

    /// Records that the deferred job has run.
    pub(crate) fn finish_deletion(&mut self, artifact_gone: bool) {
        self.deletion_armed = false;
        self.lock_armed = false;
        if artifact_gone {
            self.deletion_discharged = true;
        }
        self.lifecycle = LifecycleState::Closed;
    }

    /// Marks the artifact as removed. Monotonic.
    pub(crate) fn mark_discharged(&mut self) {
        self.deletion_discharged = true;
    }

    /// Whether the exit-time fallback deletion must run.
    pub fn fallback_permitted(&self) -> bool {
        self.access_granted && !self.deletion_discharged
    }

    pub(crate) fn close(&mut self) {
        self.lock_armed = false;
        self.deletion_armed = false;
        self.lifecycle = LifecycleState::Closed;
    }
}
