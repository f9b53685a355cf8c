//! Constants used throughout the application.
//!
//! This module contains all constants used in the lockview application, organized
//! into logical groups. Having constants centralized makes them easier to find,
//! modify, and reference consistently.

use std::time::Duration;

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "lockview";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str =
    "Password-gated, one-time viewer that deletes the document after use";

// CLI Arguments & Defaults
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Log level used when `--verbose` is passed.
pub const VERBOSE_LOG_LEVEL: &str = "debug";

// Configuration Keys & Environment Variables
/// Environment variable for the working directory holding the artifact.
pub const ENV_VAR_LOCKVIEW_DIR: &str = "LOCKVIEW_DIR";
/// Environment variable for the protected artifact's file name.
pub const ENV_VAR_LOCKVIEW_ARTIFACT: &str = "LOCKVIEW_ARTIFACT";
/// Environment variable for the idle lock threshold in seconds.
pub const ENV_VAR_LOCKVIEW_LOCK_TIMEOUT: &str = "LOCKVIEW_LOCK_TIMEOUT";
/// Environment variable for the deletion delay in seconds.
pub const ENV_VAR_LOCKVIEW_DELETE_TIME: &str = "LOCKVIEW_DELETE_TIME";
/// Environment variable for the salted credential hash (PHC string).
pub const ENV_VAR_LOCKVIEW_PASSWORD_HASH: &str = "LOCKVIEW_PASSWORD_HASH";
/// Environment variable for the viewer command.
pub const ENV_VAR_LOCKVIEW_VIEWER: &str = "LOCKVIEW_VIEWER";
/// Environment variable for the system idle query command.
pub const ENV_VAR_LOCKVIEW_IDLE_COMMAND: &str = "LOCKVIEW_IDLE_COMMAND";
/// Optional JSON configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "lockview.json";

/// Default file name of the protected artifact.
pub const DEFAULT_ARTIFACT_FILENAME: &str = "encrypted_doc.pdf";
/// Default idle seconds before the viewing surface is closed.
pub const DEFAULT_LOCK_TIMEOUT_SECONDS: u64 = 20;
/// Default seconds after a successful view before forced deletion.
pub const DEFAULT_DELETE_TIME_SECONDS: u64 = 240;
/// Default viewer command.
///
/// Both defaults hand the file to a desktop viewer and exit, so lockview
/// cannot close that window. Set `LOCKVIEW_VIEWER` to a viewer that stays in
/// the foreground (e.g. `evince`, `zathura`) for the idle lock to take effect.
#[cfg(target_os = "macos")]
pub const DEFAULT_VIEWER_COMMAND: &str = "open";
/// Default viewer command.
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_VIEWER_COMMAND: &str = "xdg-open";
/// Default command reporting system-wide idle time in milliseconds.
pub const DEFAULT_IDLE_COMMAND: &str = "xprintidle";

// Validation
/// Characters forbidden in viewer and idle commands for security reasons.
pub const COMMAND_FORBIDDEN_CHARS: &[char] =
    &['|', '&', ';', '$', '(', ')', '`', '\\', '<', '>', '\'', '"'];
/// Placeholder string for redacted information in debug output.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

// Session Timing
/// Interval between two idle-time samples.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Upper bound on one run of the system idle query command.
pub const IDLE_QUERY_TIMEOUT: Duration = Duration::from_secs(1);
/// How long a freshly launched viewer is watched for an immediate exit.
pub const VIEWER_DETACH_CHECK: Duration = Duration::from_millis(300);
/// Upper bound on how long shutdown waits for the fallback deletion.
pub const FALLBACK_DELETE_TIMEOUT: Duration = Duration::from_secs(3);

// Gate Messages
/// Prompt shown by the terminal gate surface.
pub const GATE_PROMPT: &str = "Password: ";
/// Rejection for a wrong credential.
pub const MSG_INVALID_PASSWORD: &str = "Invalid password. Access denied.";
/// Generic message for an internal fault during verification.
pub const MSG_VERIFICATION_FAULT: &str = "Security check failed due to internal error.";
/// Rejection once the session has been closed for good.
pub const MSG_SESSION_CLOSED: &str = "Session closed. The document is no longer available.";

// Logging Configuration
/// Service name used in tracing spans and structured logs.
pub const TRACING_SERVICE_NAME: &str = "lockview";
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";
