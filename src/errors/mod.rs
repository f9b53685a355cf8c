//! Error handling utilities for the lockview application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.
//!
//! A wrong password and a failed deletion are deliberately *not* errors here:
//! the first is a normal `false` from the verifier and the second is a
//! `DeletionOutcome` reported through the notification channel.

use std::io;
use thiserror::Error;

/// Internal faults raised while checking or producing a credential hash.
///
/// # Examples
///
/// ```
/// use lockview::errors::VerificationError;
///
/// let error = VerificationError::MalformedHash("invalid format".to_string());
/// assert!(format!("{}", error).contains("malformed"));
/// ```
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The stored hash could not be parsed as a PHC string.
    #[error("Stored credential hash is malformed: {0}. Regenerate it with `lockview --hash-password`.")]
    MalformedHash(String),

    /// Hashing a new credential failed.
    #[error("Failed to hash credential: {0}")]
    Hashing(String),

    /// The hasher failed while checking a candidate for a reason other than a mismatch.
    #[error("Credential check failed: {0}")]
    Internal(String),
}

/// Represents errors that can occur when driving a display surface.
///
/// The viewing surface is an external viewer process, so these mirror the
/// ways launching a command can fail.
///
/// # Examples
///
/// ```
/// use lockview::errors::SurfaceError;
/// use std::io::{self, ErrorKind};
///
/// let error = SurfaceError::ViewerNotFound {
///     command: "xdg-open".to_string(),
///     source: io::Error::new(ErrorKind::NotFound, "command not found"),
/// };
/// assert!(format!("{}", error).contains("xdg-open"));
/// ```
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The viewer command does not exist.
    #[error("Viewer command '{command}' not found: {source}. Please check that it is installed and available in your PATH.")]
    ViewerNotFound {
        /// The viewer command that was not found
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The viewer command could not be executed due to permissions.
    #[error("Permission denied when trying to launch viewer '{command}': {source}")]
    PermissionDenied {
        /// The viewer command
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Any other failure while spawning the viewer.
    #[error("Failed to launch viewer '{command}': {source}")]
    LaunchFailed {
        /// The viewer command
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The viewer exited with a failure status right after launch.
    #[error("Viewer '{command}' exited immediately with {status}")]
    ViewerExited {
        /// The viewer command
        command: String,
        /// Exit status as reported by the OS
        status: String,
    },
}

impl SurfaceError {
    /// Classifies a spawn failure by its I/O error kind.
    pub fn from_spawn(command: &str, source: io::Error) -> Self {
        let command = command.to_string();
        match source.kind() {
            io::ErrorKind::NotFound => SurfaceError::ViewerNotFound { command, source },
            io::ErrorKind::PermissionDenied => SurfaceError::PermissionDenied { command, source },
            _ => SurfaceError::LaunchFailed { command, source },
        }
    }
}

/// Represents all possible errors that can occur in the lockview application.
///
/// Note: This type does not implement `Clone` to avoid losing error context when
/// cloning `std::io::Error` values.
///
/// # Examples
///
/// ```
/// use lockview::errors::AppError;
///
/// let error = AppError::Config("No credential hash configured".to_string());
/// assert_eq!(format!("{}", error), "Configuration error: No credential hash configured");
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal faults of the credential verifier.
    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    /// Errors opening or closing a display surface.
    #[error("Display surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// Errors reading a secret from the terminal.
    #[error("Prompt error: {0}")]
    Prompt(String),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_app_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_error: AppError = io_error.into();

        match app_error {
            AppError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::NotFound),
            _ => panic!("Expected AppError::Io variant"),
        }
    }

    #[test]
    fn test_app_error_display() {
        let config_error = AppError::Config("Invalid lock timeout".to_string());
        assert_eq!(
            format!("{}", config_error),
            "Configuration error: Invalid lock timeout"
        );

        let verification = AppError::Verification(VerificationError::MalformedHash(
            "missing algorithm".to_string(),
        ));
        let message = format!("{}", verification);
        assert!(message.contains("Verification error"));
        assert!(message.contains("missing algorithm"));
        assert!(message.contains("--hash-password"));

        let prompt = AppError::Prompt("no tty".to_string());
        assert_eq!(format!("{}", prompt), "Prompt error: no tty");
    }

    #[test]
    fn test_surface_error_classification() {
        let not_found = SurfaceError::from_spawn(
            "xdg-open",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(not_found, SurfaceError::ViewerNotFound { .. }));
        assert!(format!("{}", not_found).contains("PATH"));

        let denied = SurfaceError::from_spawn(
            "xdg-open",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(denied, SurfaceError::PermissionDenied { .. }));

        let other = SurfaceError::from_spawn("xdg-open", io::Error::other("boom"));
        assert!(matches!(other, SurfaceError::LaunchFailed { .. }));
        assert!(format!("{}", other).contains("boom"));
    }

    #[test]
    fn test_surface_error_source_chaining() {
        let error = SurfaceError::from_spawn(
            "evince",
            io::Error::new(io::ErrorKind::NotFound, "command not found"),
        );
        let source = error
            .source()
            .expect("SurfaceError::ViewerNotFound should have a source");
        let io_error = source
            .downcast_ref::<io::Error>()
            .expect("Source should be an io::Error");
        assert_eq!(io_error.kind(), io::ErrorKind::NotFound);

        let app_error: AppError = error.into();
        assert!(app_error.source().is_some());
    }
}
