//! Deferred and immediate deletion of the protected artifact.
//!
//! Every deletion path funnels through [`delete_if_present`], so duplicate or
//! racing invocations never double-fault: a file that is already gone is
//! reported as [`DeletionOutcome::AlreadyRemoved`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Result of one attempt to remove the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The file existed and was removed.
    Removed,
    /// The file was not there; nothing was done.
    AlreadyRemoved,
    /// Removal failed; the file may still exist.
    Failed {
        /// Human-readable reason, e.g. the OS error.
        reason: String,
    },
}

impl DeletionOutcome {
    /// True when the artifact is known to be gone afterwards.
    pub fn artifact_gone(&self) -> bool {
        matches!(self, DeletionOutcome::Removed | DeletionOutcome::AlreadyRemoved)
    }

    /// User-facing message naming the artifact.
    pub fn message(&self, artifact_name: &str) -> String {
        match self {
            DeletionOutcome::Removed => format!("{} successfully deleted.", artifact_name),
            DeletionOutcome::AlreadyRemoved => format!("{} was already deleted.", artifact_name),
            DeletionOutcome::Failed { reason } => format!("Error deleting file: {}", reason),
        }
    }
}

impl fmt::Display for DeletionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionOutcome::Removed => write!(f, "removed"),
            DeletionOutcome::AlreadyRemoved => write!(f, "already removed"),
            DeletionOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Removes `path` if it exists.
///
/// Never returns an error: a missing file is `AlreadyRemoved` and any other
/// failure (permissions, a viewer holding a lock) becomes `Failed`.
///
/// # Example
///
/// ```
/// use lockview::session::{delete_if_present, DeletionOutcome};
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("doc.pdf");
/// std::fs::write(&path, b"%PDF")?;
///
/// assert_eq!(delete_if_present(&path), DeletionOutcome::Removed);
/// assert_eq!(delete_if_present(&path), DeletionOutcome::AlreadyRemoved);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn delete_if_present(path: &Path) -> DeletionOutcome {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "Artifact deleted");
            DeletionOutcome::Removed
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Artifact already absent");
            DeletionOutcome::AlreadyRemoved
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to delete artifact");
            DeletionOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Synchronous best-effort deletion.
///
/// Returns `true` only if the artifact existed and was removed by this call.
pub fn force_immediate_deletion(path: &Path) -> bool {
    delete_if_present(path) == DeletionOutcome::Removed
}

/// Runs [`delete_if_present`] on a helper thread and blocks for at most `limit`.
///
/// Returns `None` if the deadline passes first; the helper thread keeps going
/// but the caller is released so shutdown is never held hostage by a stuck
/// filesystem call.
pub fn force_deletion_with_deadline(path: &Path, limit: Duration) -> Option<DeletionOutcome> {
    let (tx, rx) = mpsc::channel();
    let path = path.to_path_buf();

    thread::spawn(move || {
        let _ = tx.send(delete_if_present(&path));
    });

    match rx.recv_timeout(limit) {
        Ok(outcome) => Some(outcome),
        Err(_) => {
            warn!(?limit, "Fallback deletion did not finish before the deadline");
            None
        }
    }
}

/// Owns the single deferred deletion job.
///
/// Re-arming cancels the previous job; at most one is live at a time.
#[derive(Debug, Default)]
pub struct DeletionScheduler {
    handle: Option<JoinHandle<()>>,
}

impl DeletionScheduler {
    /// Creates a scheduler with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a deletion of `path` after `delay`, reporting through `on_result`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule_delayed_deletion<F>(&mut self, path: PathBuf, delay: Duration, on_result: F)
    where
        F: FnOnce(DeletionOutcome) + Send + 'static,
    {
        self.cancel();

        info!(path = %path.display(), delay_secs = delay.as_secs(), "Deletion timer armed");
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(path = %path.display(), "Deletion timer finished");
            on_result(delete_if_present(&path));
        }));
    }

    /// Cancels the pending job, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Deletion timer cancelled");
        }
    }

    /// True while a job is armed and has not yet fired.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DeletionScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
