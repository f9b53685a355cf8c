use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

use lockview::constants::{MSG_INVALID_PASSWORD, MSG_SESSION_CLOSED};
use lockview::crypto::{hash_password, CredentialVerifier};
use lockview::errors::SurfaceError;
use lockview::session::{
    DeletionOutcome, IdleProbe, LifecycleState, SessionController, SessionEvent, SessionSettings,
};
use lockview::surface::{DisplaySurfaces, FileOperationResult};

const PASSWORD: &str = "secure123";
const ARTIFACT: &str = "doc.pdf";
const LOCK_TIMEOUT: Duration = Duration::from_secs(20);
const DELETE_DELAY: Duration = Duration::from_secs(240);

/// Records every call the controller makes into the display layer.
#[derive(Default)]
struct RecordingSurfaces {
    calls: Vec<String>,
    viewer: Option<PathBuf>,
    gate: bool,
    viewer_opens: usize,
    messages: Vec<(String, bool)>,
    notifications: Vec<FileOperationResult>,
    fail_open: bool,
}

impl DisplaySurfaces for RecordingSurfaces {
    fn open_viewer(&mut self, artifact: &Path) -> Result<(), SurfaceError> {
        self.calls.push("open_viewer".to_string());
        if self.fail_open {
            return Err(SurfaceError::from_spawn(
                "missing-viewer",
                io::Error::new(io::ErrorKind::NotFound, "no such file"),
            ));
        }
        self.viewer = Some(artifact.to_path_buf());
        self.viewer_opens += 1;
        Ok(())
    }

    fn close_viewer(&mut self) {
        self.calls.push("close_viewer".to_string());
        self.viewer = None;
    }

    fn viewer_open(&self) -> bool {
        self.viewer.is_some()
    }

    fn open_gate(&mut self) {
        self.calls.push("open_gate".to_string());
        self.gate = true;
    }

    fn close_gate(&mut self) {
        self.calls.push("close_gate".to_string());
        self.gate = false;
    }

    fn gate_open(&self) -> bool {
        self.gate
    }

    fn show_message(&mut self, message: &str, success: bool) {
        self.messages.push((message.to_string(), success));
    }

    fn notify_gate(&mut self, result: &FileOperationResult) -> bool {
        if !self.gate {
            return false;
        }
        self.notifications.push(result.clone());
        true
    }

    fn request_content_protection(&mut self) -> bool {
        self.calls.push("request_content_protection".to_string());
        true
    }

    fn block_capture_hotkey(&mut self) -> bool {
        self.calls.push("block_capture_hotkey".to_string());
        true
    }

    fn release_capture_hotkey(&mut self) {
        self.calls.push("release_capture_hotkey".to_string());
    }
}

/// Idle source whose reading the test sets directly.
struct ManualProbe(AtomicU64);

impl ManualProbe {
    fn set(&self, secs: u64) {
        self.0.store(secs, Ordering::SeqCst);
    }
}

impl IdleProbe for ManualProbe {
    fn idle_duration(&self) -> Duration {
        Duration::from_secs(self.0.load(Ordering::SeqCst))
    }
}

struct Harness {
    _dir: TempDir,
    artifact: PathBuf,
    probe: Arc<ManualProbe>,
    events: UnboundedReceiver<SessionEvent>,
    controller: SessionController<RecordingSurfaces>,
}

fn harness_with(create_artifact: bool, surfaces: RecordingSurfaces) -> Harness {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join(ARTIFACT);
    if create_artifact {
        fs::write(&artifact, b"%PDF-1.4 test").unwrap();
    }

    let probe = Arc::new(ManualProbe(AtomicU64::new(0)));
    let (tx, rx) = mpsc::unbounded_channel();
    let settings = SessionSettings {
        artifact_path: artifact.clone(),
        lock_timeout: LOCK_TIMEOUT,
        delete_delay: DELETE_DELAY,
    };
    let verifier = CredentialVerifier::new(hash_password(PASSWORD).unwrap());
    let mut controller = SessionController::new(
        settings,
        verifier,
        surfaces,
        Arc::clone(&probe) as Arc<dyn IdleProbe>,
        tx,
    );
    controller.start();

    Harness {
        _dir: dir,
        artifact,
        probe,
        events: rx,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(true, RecordingSurfaces::default())
}

#[tokio::test(start_paused = true)]
async fn test_wrong_password_changes_nothing() {
    let mut h = harness();
    let calls_before = h.controller.surfaces().calls.clone();

    let response = h.controller.submit_password("wrongpassword");

    assert!(!response.success);
    assert_eq!(response.message, MSG_INVALID_PASSWORD);
    assert_eq!(h.controller.surfaces().calls, calls_before);
    assert!(h.controller.surfaces().gate_open());
    assert!(!h.controller.idle_armed());
    assert!(!h.controller.deletion_armed());
    assert_eq!(h.controller.state().lifecycle(), LifecycleState::Locked);
    assert!(!h.controller.state().access_granted());
    assert!(h.artifact.exists());
}

#[tokio::test(start_paused = true)]
async fn test_correct_password_opens_session() {
    let mut h = harness();

    let response = h.controller.submit_password(PASSWORD);

    assert!(response.success, "{}", response.message);
    assert!(response.message.contains("240s"));

    let surfaces = h.controller.surfaces();
    assert_eq!(surfaces.viewer.as_deref(), Some(h.artifact.as_path()));
    assert!(!surfaces.gate_open());

    let open = surfaces.calls.iter().position(|c| c == "open_viewer").unwrap();
    let close_gate = surfaces.calls.iter().position(|c| c == "close_gate").unwrap();
    assert!(open < close_gate, "viewer must open before the gate closes");

    assert!(h.controller.idle_armed());
    assert!(h.controller.deletion_armed());

    let state = h.controller.state();
    assert_eq!(state.lifecycle(), LifecycleState::Active);
    assert!(state.access_granted());
    assert!(state.lock_armed());
    assert!(state.deletion_armed());
    assert!(!state.deletion_discharged());
    assert!(state.session_id().is_some());
    assert!(state.granted_at().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_missing_artifact_is_reported_by_name() {
    let mut h = harness_with(false, RecordingSurfaces::default());

    let response = h.controller.submit_password(PASSWORD);

    assert!(!response.success);
    assert!(response.message.contains(ARTIFACT));
    assert!(response.message.contains("not found"));
    assert_eq!(h.controller.surfaces().viewer_opens, 0);
    assert!(!h.controller.state().access_granted());
    assert!(!h.controller.deletion_armed());
    assert_eq!(h.controller.state().lifecycle(), LifecycleState::Locked);

    assert_eq!(h.controller.shutdown(), None);
}

#[tokio::test(start_paused = true)]
async fn test_viewer_failure_does_not_grant_access() {
    let surfaces = RecordingSurfaces {
        fail_open: true,
        ..RecordingSurfaces::default()
    };
    let mut h = harness_with(true, surfaces);

    let response = h.controller.submit_password(PASSWORD);

    assert!(!response.success);
    assert!(response.message.starts_with("File processing failed"));
    assert!(!h.controller.state().access_granted());
    assert!(!h.controller.idle_armed());
    assert!(!h.controller.deletion_armed());
    assert!(h.controller.surfaces().gate_open());

    assert_eq!(h.controller.shutdown(), None);
    assert!(h.artifact.exists());
}

#[tokio::test(start_paused = true)]
async fn test_idle_lock_leaves_deletion_running() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);
    let start = tokio::time::Instant::now();

    h.probe.set(25);
    let event = h.events.recv().await.unwrap();
    assert!(matches!(event, SessionEvent::IdleTimeout { .. }));
    h.controller.handle_event(event);

    assert_eq!(h.controller.state().lifecycle(), LifecycleState::LockedByTimeout);
    assert!(!h.controller.surfaces().viewer_open());
    assert!(!h.controller.idle_armed());
    assert!(h.controller.deletion_armed());
    assert!(h.artifact.exists());

    let event = h.events.recv().await.unwrap();
    assert_eq!(event, SessionEvent::DeletionFinished(DeletionOutcome::Removed));
    assert!(start.elapsed() >= DELETE_DELAY);
    h.controller.handle_event(event);

    assert!(!h.artifact.exists());
    assert_eq!(h.controller.state().lifecycle(), LifecycleState::Closed);
    assert!(h.controller.state().deletion_discharged());
    assert!(!h.controller.state().fallback_permitted());
}

#[tokio::test(start_paused = true)]
async fn test_deletion_of_already_removed_artifact_is_not_an_error() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);

    fs::remove_file(&h.artifact).unwrap();
    h.controller.reopen_gate();

    let event = h.events.recv().await.unwrap();
    assert_eq!(event, SessionEvent::DeletionFinished(DeletionOutcome::AlreadyRemoved));
    h.controller.handle_event(event);

    let notifications = &h.controller.surfaces().notifications;
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].success);
    assert_eq!(notifications[0].message, "doc.pdf was already deleted.");
    assert!(h.controller.state().deletion_discharged());
    assert!(!h.controller.surfaces().viewer_open());
}

#[tokio::test(start_paused = true)]
async fn test_exit_runs_fallback_deletion() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);
    assert!(h.controller.state().fallback_permitted());

    let outcome = h.controller.shutdown();

    assert_eq!(outcome, Some(DeletionOutcome::Removed));
    assert!(!h.artifact.exists());
    assert!(h.controller.state().deletion_discharged());
    assert_eq!(h.controller.state().lifecycle(), LifecycleState::Closed);
    assert!(!h.controller.idle_armed());
    assert!(!h.controller.deletion_armed());
    assert!(!h.controller.surfaces().viewer_open());
    assert!(h
        .controller
        .surfaces()
        .calls
        .contains(&"release_capture_hotkey".to_string()));

    // Second call is a no-op
    assert_eq!(h.controller.shutdown(), None);
}

#[tokio::test(start_paused = true)]
async fn test_exit_without_grant_leaves_artifact() {
    let mut h = harness();
    h.controller.submit_password("wrongpassword");

    assert_eq!(h.controller.shutdown(), None);
    assert!(h.artifact.exists());
}

#[tokio::test(start_paused = true)]
async fn test_exit_after_deferred_deletion_skips_fallback() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);

    let event = h.events.recv().await.unwrap();
    h.controller.handle_event(event);
    assert!(h.controller.state().deletion_discharged());

    assert_eq!(h.controller.shutdown(), None);
}

#[tokio::test(start_paused = true)]
async fn test_second_session_carries_deletion_forward() {
    let mut h = harness();
    let start = tokio::time::Instant::now();
    assert!(h.controller.submit_password(PASSWORD).success);
    let first_session = h.controller.state().session_id().unwrap();

    tokio::time::advance(Duration::from_secs(100)).await;

    h.controller.reopen_gate();
    assert!(h.controller.surfaces().gate_open());
    assert!(h.controller.submit_password(PASSWORD).success);

    let surfaces = h.controller.surfaces();
    assert_eq!(surfaces.viewer_opens, 2);
    assert!(surfaces.calls.contains(&"close_viewer".to_string()));
    assert_ne!(h.controller.state().session_id(), Some(first_session));
    assert!(h.controller.deletion_armed());

    let event = h.events.recv().await.unwrap();
    assert_eq!(event, SessionEvent::DeletionFinished(DeletionOutcome::Removed));

    // Fired at the first grant's deadline, not 240s after the second grant
    let elapsed = start.elapsed();
    assert!(elapsed >= DELETE_DELAY);
    assert!(elapsed < DELETE_DELAY + Duration::from_secs(100));
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_from_superseded_session_is_ignored() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);

    h.controller.handle_event(SessionEvent::IdleTimeout {
        session: Uuid::new_v4(),
    });

    assert_eq!(h.controller.state().lifecycle(), LifecycleState::Active);
    assert!(h.controller.surfaces().viewer_open());
}

#[tokio::test(start_paused = true)]
async fn test_failed_attempt_during_session_keeps_it_active() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);

    h.controller.reopen_gate();
    let response = h.controller.submit_password("wrongpassword");

    assert!(!response.success);
    assert_eq!(h.controller.state().lifecycle(), LifecycleState::Active);
    assert!(h.controller.state().access_granted());
    assert!(h.controller.surfaces().viewer_open());
}

#[tokio::test(start_paused = true)]
async fn test_closed_session_rejects_further_attempts() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);

    let event = h.events.recv().await.unwrap();
    h.controller.handle_event(event);
    assert_eq!(h.controller.state().lifecycle(), LifecycleState::Closed);

    h.controller.reopen_gate();
    assert!(!h.controller.surfaces().gate_open());
    assert_eq!(
        h.controller.surfaces().messages.last(),
        Some(&(MSG_SESSION_CLOSED.to_string(), false))
    );

    let response = h.controller.submit_password(PASSWORD);
    assert!(!response.success);
    assert_eq!(response.message, MSG_SESSION_CLOSED);
    assert_eq!(h.controller.surfaces().viewer_opens, 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_hash_gives_generic_fault() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join(ARTIFACT);
    fs::write(&artifact, b"data").unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    let mut controller = SessionController::new(
        SessionSettings {
            artifact_path: artifact.clone(),
            lock_timeout: LOCK_TIMEOUT,
            delete_delay: DELETE_DELAY,
        },
        CredentialVerifier::new("not-a-phc-string"),
        RecordingSurfaces::default(),
        Arc::new(ManualProbe(AtomicU64::new(0))) as Arc<dyn IdleProbe>,
        tx,
    );

    let response = controller.submit_password(PASSWORD);

    assert!(!response.success);
    assert!(response.message.contains("internal error"));
    assert!(!controller.state().access_granted());
    assert!(artifact.exists());
}

#[tokio::test(start_paused = true)]
async fn test_drop_without_shutdown_deletes_artifact() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);

    drop(h.controller);

    assert!(!h.artifact.exists());
}

#[tokio::test(start_paused = true)]
async fn test_failed_reopen_of_viewer_leaves_session_locked() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);

    h.controller.surfaces_mut().fail_open = true;
    h.controller.reopen_gate();
    let response = h.controller.submit_password(PASSWORD);

    assert!(!response.success);
    assert!(!h.controller.surfaces().viewer_open());
    assert_eq!(h.controller.state().lifecycle(), LifecycleState::LockedByTimeout);
    assert!(!h.controller.idle_armed());
    assert!(h.controller.deletion_armed());
    assert!(h.controller.state().fallback_permitted());
}

#[tokio::test(start_paused = true)]
async fn test_failed_deferred_deletion_is_retried_on_exit() {
    let mut h = harness();
    assert!(h.controller.submit_password(PASSWORD).success);

    // A directory at the artifact path makes the deferred removal fail
    fs::remove_file(&h.artifact).unwrap();
    fs::create_dir(&h.artifact).unwrap();

    let event = h.events.recv().await.unwrap();
    assert!(matches!(event, SessionEvent::DeletionFinished(DeletionOutcome::Failed { .. })));
    h.controller.handle_event(event);

    assert_eq!(h.controller.state().lifecycle(), LifecycleState::Closed);
    assert!(!h.controller.state().deletion_discharged());
    assert!(h.controller.state().fallback_permitted());

    fs::remove_dir(&h.artifact).unwrap();
    fs::write(&h.artifact, b"%PDF-1.4 test").unwrap();

    assert_eq!(h.controller.shutdown(), Some(DeletionOutcome::Removed));
    assert!(!h.artifact.exists());
    assert!(h.controller.state().deletion_discharged());
}
