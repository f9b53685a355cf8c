//! Display surfaces driven by the session controller.
//!
//! The controller never renders anything itself. It talks to a
//! [`DisplaySurfaces`] implementation that owns the gate (credential entry)
//! and the viewing surface, and that exposes the best-effort capture
//! protection hooks of the host platform. [`TerminalSurfaces`] is the host
//! used by the binary: the gate is the terminal and the viewer is an external
//! command.

use crate::constants::VIEWER_DETACH_CHECK;
use crate::errors::SurfaceError;
use serde::Serialize;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome notification sent to the gate surface after the deletion job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOperationResult {
    pub message: String,
    pub success: bool,
}

/// Trait defining the surfaces the controller opens, closes and notifies.
///
/// Capture protection hooks return `false` when the platform cannot honour
/// them. They are not a security boundary.
pub trait DisplaySurfaces {
    /// Opens the viewing surface on `artifact`, replacing any open viewer.
    ///
    /// # Errors
    ///
    /// Returns a `SurfaceError` if the viewer cannot be launched.
    fn open_viewer(&mut self, artifact: &Path) -> Result<(), SurfaceError>;

    /// Closes the viewing surface. No-op if none is open.
    fn close_viewer(&mut self);

    fn viewer_open(&self) -> bool;

    /// Shows the credential-entry surface.
    fn open_gate(&mut self);

    /// Destroys the credential-entry surface so it cannot be resubmitted.
    fn close_gate(&mut self);

    fn gate_open(&self) -> bool;

    /// Shows the reply to a credential submission.
    fn show_message(&mut self, message: &str, success: bool);

    /// Delivers a deletion outcome to the gate. Returns `false` if no gate exists.
    fn notify_gate(&mut self, result: &FileOperationResult) -> bool;

    /// Asks the OS to black out the viewing surface during screen capture.
    fn request_content_protection(&mut self) -> bool;

    /// Suppresses the screenshot hotkey while the process runs.
    fn block_capture_hotkey(&mut self) -> bool;

    /// Undoes `block_capture_hotkey`.
    fn release_capture_hotkey(&mut self);
}

/// The external viewer as far as lockview can track it.
enum ViewerProcess {
    /// Still running as our child; closing kills it.
    Attached(Child),
    /// The command exited successfully right away, handing the file to a
    /// process lockview does not own.
    Detached,
}

/// Terminal gate plus an external viewer process.
///
/// The gate flag is shared with the input reader thread so it knows whether
/// the next line is a password or a command.
pub struct TerminalSurfaces {
    viewer_command: String,
    viewer: Option<ViewerProcess>,
    gate_open: Arc<AtomicBool>,
}

impl TerminalSurfaces {
    pub fn new(viewer_command: impl Into<String>, gate_open: Arc<AtomicBool>) -> Self {
        Self {
            viewer_command: viewer_command.into(),
            viewer: None,
            gate_open,
        }
    }

    /// True if the current viewer was handed off to a process lockview cannot close.
    pub fn viewer_detached(&self) -> bool {
        matches!(self.viewer, Some(ViewerProcess::Detached))
    }
}

/// Waits up to `limit` for `child` to exit.
fn early_exit(child: &mut Child, limit: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
            _ => return None,
        }
    }
}

impl DisplaySurfaces for TerminalSurfaces {
    fn open_viewer(&mut self, artifact: &Path) -> Result<(), SurfaceError> {
        self.close_viewer();

        let mut child = Command::new(&self.viewer_command)
            .arg(artifact)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SurfaceError::from_spawn(&self.viewer_command, e))?;

        match early_exit(&mut child, VIEWER_DETACH_CHECK) {
            Some(status) if status.success() => {
                warn!(
                    command = %self.viewer_command,
                    "Viewer detached from lockview; its window cannot be closed on idle or exit. \
                     Set LOCKVIEW_VIEWER to a viewer that stays in the foreground"
                );
                self.viewer = Some(ViewerProcess::Detached);
            }
            Some(status) => {
                return Err(SurfaceError::ViewerExited {
                    command: self.viewer_command.clone(),
                    status: status.to_string(),
                });
            }
            None => {
                info!(pid = child.id(), "Viewer opened");
                self.viewer = Some(ViewerProcess::Attached(child));
            }
        }
        Ok(())
    }

    fn close_viewer(&mut self) {
        match self.viewer.take() {
            None => {}
            Some(ViewerProcess::Detached) => {
                warn!("Viewer was detached; close its window by hand");
            }
            Some(ViewerProcess::Attached(mut child)) => match child.try_wait() {
                Ok(Some(status)) => debug!(%status, "Viewer already exited"),
                _ => {
                    if let Err(e) = child.kill() {
                        warn!(error = %e, "Failed to close viewer");
                    }
                    let _ = child.wait();
                    info!("Viewer closed");
                }
            },
        }
    }

    fn viewer_open(&self) -> bool {
        self.viewer.is_some()
    }

    fn open_gate(&mut self) {
        self.gate_open.store(true, Ordering::SeqCst);
        println!("Enter the password to view the document.");
    }

    fn close_gate(&mut self) {
        self.gate_open.store(false, Ordering::SeqCst);
        println!("Gate closed. Type 'unlock' to enter the password again or 'quit' to exit.");
    }

    fn gate_open(&self) -> bool {
        self.gate_open.load(Ordering::SeqCst)
    }

    fn show_message(&mut self, message: &str, success: bool) {
        if success {
            println!("{}", message);
        } else {
            println!("✗ {}", message);
        }
    }

    fn notify_gate(&mut self, result: &FileOperationResult) -> bool {
        if !self.gate_open() {
            return false;
        }
        self.show_message(&result.message, result.success);
        true
    }

    fn request_content_protection(&mut self) -> bool {
        // An external viewer process gives us no handle to flag its window.
        false
    }

    fn block_capture_hotkey(&mut self) -> bool {
        false
    }

    fn release_capture_hotkey(&mut self) {}
}

impl Drop for TerminalSurfaces {
    fn drop(&mut self) {
        self.close_viewer();
    }
}
