//! The session lifecycle controller.
//!
//! `SessionController` validates credentials, opens the viewing session, arms
//! the idle lock and the deletion timer, and makes sure the artifact is removed
//! exactly once however the session ends. Timer callbacks do not touch the
//! controller directly: they post [`SessionEvent`]s to the host loop, which
//! hands them back through [`SessionController::handle_event`].

use crate::constants::{
    FALLBACK_DELETE_TIMEOUT, MSG_INVALID_PASSWORD, MSG_SESSION_CLOSED, MSG_VERIFICATION_FAULT,
};
use crate::crypto::CredentialVerifier;
use crate::session::deletion::{
    force_deletion_with_deadline, force_immediate_deletion, DeletionOutcome, DeletionScheduler,
};
use crate::session::idle::{IdleMonitor, IdleProbe};
use crate::session::state::{LifecycleState, SessionState};
use crate::surface::{DisplaySurfaces, FileOperationResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Timings and location of the protected artifact.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub artifact_path: PathBuf,
    pub lock_timeout: Duration,
    pub delete_delay: Duration,
}

impl SessionSettings {
    /// File name of the artifact, for user-facing messages.
    pub fn artifact_name(&self) -> String {
        self.artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.artifact_path.display().to_string())
    }
}

/// Reply to a credential submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
}

impl SubmitResponse {
    fn granted(message: String) -> Self {
        Self {
            success: true,
            message,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Timer events posted back to the host loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The idle monitor of session `session` reached its threshold.
    IdleTimeout { session: Uuid },
    /// The deferred deletion job ran.
    DeletionFinished(DeletionOutcome),
}

/// Orchestrates verifier, idle monitor, deletion scheduler and surfaces.
pub struct SessionController<S: DisplaySurfaces> {
    settings: SessionSettings,
    verifier: CredentialVerifier,
    surfaces: S,
    idle: IdleMonitor,
    deletion: DeletionScheduler,
    state: SessionState,
    events: UnboundedSender<SessionEvent>,
    shut_down: bool,
}

impl<S: DisplaySurfaces> SessionController<S> {
    pub fn new(
        settings: SessionSettings,
        verifier: CredentialVerifier,
        surfaces: S,
        probe: Arc<dyn IdleProbe>,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            settings,
            verifier,
            surfaces,
            idle: IdleMonitor::new(probe),
            deletion: DeletionScheduler::new(),
            state: SessionState::new(),
            events,
            shut_down: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn surfaces(&self) -> &S {
        &self.surfaces
    }

    pub fn surfaces_mut(&mut self) -> &mut S {
        &mut self.surfaces
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn idle_armed(&self) -> bool {
        self.idle.is_armed()
    }

    pub fn deletion_armed(&self) -> bool {
        self.deletion.is_armed()
    }

    /// Registers process-level hooks and shows the gate.
    pub fn start(&mut self) {
        if !self.surfaces.block_capture_hotkey() {
            warn!("Screenshot hotkey could not be blocked on this platform (best-effort only)");
        }
        self.surfaces.open_gate();
        info!(artifact = %self.settings.artifact_name(), "Gate ready");
    }

    /// Reopens the gate so a new credential can be submitted.
    pub fn reopen_gate(&mut self) {
        if self.state.lifecycle() == LifecycleState::Closed {
            self.surfaces.show_message(MSG_SESSION_CLOSED, false);
            return;
        }
        if !self.surfaces.gate_open() {
            self.surfaces.open_gate();
        }
    }

    /// Handles one password submission and shows the reply on the gate.
    pub fn submit_password(&mut self, secret: &str) -> SubmitResponse {
        let response = self.authenticate(secret);
        self.surfaces.show_message(&response.message, response.success);
        response
    }

    fn authenticate(&mut self, secret: &str) -> SubmitResponse {
        if self.state.lifecycle() == LifecycleState::Closed {
            return SubmitResponse::rejected(MSG_SESSION_CLOSED);
        }

        let previous = self.state.begin_authentication();

        match self.verifier.verify(secret) {
            Ok(true) => {}
            Ok(false) => {
                warn!("Rejected credential submission");
                self.state.reject(previous);
                return SubmitResponse::rejected(MSG_INVALID_PASSWORD);
            }
            Err(e) => {
                error!(error = %e, "Credential verification fault");
                self.state.reject(previous);
                return SubmitResponse::rejected(MSG_VERIFICATION_FAULT);
            }
        }

        match self.settings.artifact_path.try_exists() {
            Ok(true) => {}
            Ok(false) => {
                warn!(path = %self.settings.artifact_path.display(), "Artifact not found");
                self.state.reject(previous);
                return SubmitResponse::rejected(format!(
                    "Error: Target file ({}) not found in the working directory.",
                    self.settings.artifact_name()
                ));
            }
            Err(e) => {
                error!(error = %e, "Failed to check artifact");
                self.state.reject(previous);
                return SubmitResponse::rejected(format!("File processing failed: {}", e));
            }
        }

        self.grant(previous)
    }

    fn grant(&mut self, previous: LifecycleState) -> SubmitResponse {
        if self.surfaces.viewer_open() {
            info!("Closing previous viewer before opening a new session");
            self.surfaces.close_viewer();
        }

        if let Err(e) = self.surfaces.open_viewer(&self.settings.artifact_path) {
            error!(error = %e, "Failed to open viewing surface");
            self.state.reject(previous);
            // The earlier session's viewer is gone; leave it locked, not Active.
            if self.state.lock_for_inactivity() {
                self.idle.stop();
            }
            return SubmitResponse::rejected(format!("File processing failed: {}", e));
        }
        if !self.surfaces.request_content_protection() {
            warn!("Content protection is not available for this viewer (best-effort only)");
        }

        self.surfaces.close_gate();

        let session = Uuid::new_v4();
        let events = self.events.clone();
        self.idle.start(self.settings.lock_timeout, move || {
            let _ = events.send(SessionEvent::IdleTimeout { session });
        });

        if self.state.deletion_pending() {
            debug!("Carrying forward the deletion timer of an earlier session");
        } else {
            let events = self.events.clone();
            self.deletion.schedule_delayed_deletion(
                self.settings.artifact_path.clone(),
                self.settings.delete_delay,
                move |outcome| {
                    let _ = events.send(SessionEvent::DeletionFinished(outcome));
                },
            );
            self.state.arm_deletion();
        }

        self.state.grant(session);
        info!(session_id = %session, "Access granted");

        SubmitResponse::granted(format!(
            "Viewer opened. Deletion timer started ({}s).",
            self.settings.delete_delay.as_secs()
        ))
    }

    /// Applies a timer event posted by the idle monitor or deletion job.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::IdleTimeout { session } => self.on_idle_timeout(session),
            SessionEvent::DeletionFinished(outcome) => self.on_deletion_finished(outcome),
        }
    }

    fn on_idle_timeout(&mut self, session: Uuid) {
        if self.state.session_id() != Some(session) {
            debug!(%session, "Ignoring idle timeout from a superseded session");
            return;
        }
        if self.state.lock_for_inactivity() {
            self.idle.stop();
            self.surfaces.close_viewer();
            info!(%session, "Viewer closed for inactivity");
        }
    }

    fn on_deletion_finished(&mut self, outcome: DeletionOutcome) {
        self.idle.stop();
        self.surfaces.close_viewer();
        self.state.finish_deletion(outcome.artifact_gone());

        let result = FileOperationResult {
            message: outcome.message(&self.settings.artifact_name()),
            success: outcome.artifact_gone(),
        };
        info!(outcome = %outcome, "Deletion job completed");

        if !self.surfaces.notify_gate(&result) {
            debug!("No gate surface to notify");
        }
    }

    /// Runs the exit path. Safe to call more than once.
    ///
    /// Timers are cancelled and surfaces closed, then the fallback deletion
    /// runs if access was granted and the artifact has not been removed yet.
    /// Waits at most [`FALLBACK_DELETE_TIMEOUT`] and never fails.
    pub fn shutdown(&mut self) -> Option<DeletionOutcome> {
        if self.shut_down {
            return None;
        }
        self.shut_down = true;

        self.idle.stop();
        self.deletion.cancel();
        self.surfaces.close_viewer();
        self.surfaces.release_capture_hotkey();

        let outcome = if self.state.fallback_permitted() {
            info!("Running fallback deletion before exit");
            let outcome =
                force_deletion_with_deadline(&self.settings.artifact_path, FALLBACK_DELETE_TIMEOUT);
            if outcome.as_ref().is_some_and(DeletionOutcome::artifact_gone) {
                self.state.mark_discharged();
            }
            outcome
        } else {
            debug!("Fallback deletion not required");
            None
        };

        self.state.close();
        info!("Session controller shut down");
        outcome
    }

    fn artifact_path(&self) -> &Path {
        &self.settings.artifact_path
    }
}

impl<S: DisplaySurfaces> Drop for SessionController<S> {
    fn drop(&mut self) {
        if !self.shut_down && self.state.fallback_permitted() {
            warn!("Controller dropped without shutdown; deleting artifact");
            if force_immediate_deletion(self.artifact_path()) {
                self.state.mark_discharged();
            }
        }
    }
}
