//! Configuration management for the lockview application.
//!
//! Configuration is loaded once at startup. Values come from built-in
//! defaults, then an optional `lockview.json` in the working directory, then
//! environment variables, each source overriding the previous one.
//!
//! # Environment Variables
//!
//! - `LOCKVIEW_DIR`: Working directory holding the artifact (defaults to the current directory)
//! - `LOCKVIEW_ARTIFACT`: File name of the protected artifact (defaults to `encrypted_doc.pdf`)
//! - `LOCKVIEW_LOCK_TIMEOUT`: Idle seconds before the viewer is closed (defaults to 20)
//! - `LOCKVIEW_DELETE_TIME`: Seconds after a successful view before deletion (defaults to 240)
//! - `LOCKVIEW_PASSWORD_HASH`: Argon2 PHC hash of the password (required)
//! - `LOCKVIEW_VIEWER`: Command used to display the artifact. It must stay in the
//!   foreground while the document is shown; launchers such as `xdg-open` or
//!   `open` exit at once and leave a window lockview cannot close
//! - `LOCKVIEW_IDLE_COMMAND`: Command printing system idle time in milliseconds

use crate::constants::{
    COMMAND_FORBIDDEN_CHARS, CONFIG_FILE_NAME, DEFAULT_ARTIFACT_FILENAME,
    DEFAULT_DELETE_TIME_SECONDS, DEFAULT_IDLE_COMMAND, DEFAULT_LOCK_TIMEOUT_SECONDS,
    DEFAULT_VIEWER_COMMAND, ENV_VAR_LOCKVIEW_ARTIFACT, ENV_VAR_LOCKVIEW_DELETE_TIME,
    ENV_VAR_LOCKVIEW_DIR, ENV_VAR_LOCKVIEW_IDLE_COMMAND, ENV_VAR_LOCKVIEW_LOCK_TIMEOUT,
    ENV_VAR_LOCKVIEW_PASSWORD_HASH, ENV_VAR_LOCKVIEW_VIEWER, REDACTED_PLACEHOLDER,
};
use crate::crypto::check_hash_format;
use crate::errors::{AppError, AppResult};
use crate::session::SessionSettings;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Configuration for the lockview application.
///
/// # Examples
///
/// ```
/// use lockview::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     working_dir: PathBuf::from("/srv/docs"),
///     credential_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
///     ..Config::default()
/// };
/// assert_eq!(config.artifact_path(), PathBuf::from("/srv/docs/encrypted_doc.pdf"));
/// ```
#[derive(Clone)]
pub struct Config {
    /// Directory holding the artifact.
    pub working_dir: PathBuf,

    /// Name of the file under `working_dir` to protect.
    pub artifact_filename: String,

    /// Idle seconds before the viewing surface is closed.
    pub lock_timeout_seconds: u64,

    /// Seconds after a successful view before forced deletion.
    pub delete_time_seconds: u64,

    /// Salted hash checked by the verifier. Never logged.
    pub credential_hash: String,

    /// Command that displays the artifact.
    pub viewer_command: String,

    /// Command printing system-wide idle time in milliseconds.
    pub idle_command: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("working_dir", &"[REDACTED_PATH]")
            .field("artifact_filename", &self.artifact_filename)
            .field("lock_timeout_seconds", &self.lock_timeout_seconds)
            .field("delete_time_seconds", &self.delete_time_seconds)
            .field("credential_hash", &REDACTED_PLACEHOLDER)
            .field("viewer_command", &self.viewer_command)
            .field("idle_command", &self.idle_command)
            .finish()
    }
}

impl Default for Config {
    /// Creates a new Config with default values and no credential hash.
    fn default() -> Self {
        Config {
            working_dir: PathBuf::from(""),
            artifact_filename: DEFAULT_ARTIFACT_FILENAME.to_string(),
            lock_timeout_seconds: DEFAULT_LOCK_TIMEOUT_SECONDS,
            delete_time_seconds: DEFAULT_DELETE_TIME_SECONDS,
            credential_hash: String::new(),
            viewer_command: DEFAULT_VIEWER_COMMAND.to_string(),
            idle_command: DEFAULT_IDLE_COMMAND.to_string(),
        }
    }
}

/// Optional overrides read from `lockview.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FileConfig {
    artifact_filename: Option<String>,
    lock_timeout_seconds: Option<u64>,
    delete_time_seconds: Option<u64>,
    credential_hash: Option<String>,
    viewer_command: Option<String>,
    idle_command: Option<String>,
}

impl FileConfig {
    fn read(path: &Path) -> AppResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let parsed = serde_json::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Invalid {}: {}", CONFIG_FILE_NAME, e))
        })?;
        Ok(Some(parsed))
    }
}

impl Config {
    /// Validates a viewer or idle command string for security.
    ///
    /// The command must be non-empty and contain no spaces or shell
    /// metacharacters; use a wrapper script for commands needing arguments.
    fn validate_command<'a>(label: &str, cmd: &'a str) -> AppResult<&'a str> {
        if cmd.is_empty() {
            return Err(AppError::Config(format!("{} command cannot be empty", label)));
        }

        if cmd.contains(' ') {
            return Err(AppError::Config(format!(
                "{} command cannot contain spaces. Use a wrapper script for commands requiring arguments",
                label
            )));
        }

        for &ch in COMMAND_FORBIDDEN_CHARS.iter() {
            if cmd.contains(ch) {
                return Err(AppError::Config(format!(
                    "{} command cannot contain shell metacharacters: '{}'. Use a wrapper script instead",
                    label, ch
                )));
            }
        }

        Ok(cmd)
    }

    fn parse_seconds(var: &str, raw: &str) -> AppResult<u64> {
        raw.trim().parse::<u64>().map_err(|_| {
            AppError::Config(format!(
                "{} must be a whole number of seconds, got '{}'",
                var, raw
            ))
        })
    }

    /// Loads configuration from defaults, `lockview.json` and environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if:
    /// - The working directory cannot be determined or expanded
    /// - `lockview.json` exists but is not valid
    /// - A numeric environment variable is not a whole number
    /// - No credential hash is configured
    pub fn load() -> AppResult<Self> {
        let working_dir = match env::var(ENV_VAR_LOCKVIEW_DIR) {
            Ok(raw) => {
                let expanded = shellexpand::full(&raw)
                    .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;
                PathBuf::from(expanded.into_owned())
            }
            Err(_) => env::current_dir().map_err(|e| {
                AppError::Config(format!("Failed to determine working directory: {}", e))
            })?,
        };

        if working_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Working directory path is empty".to_string()));
        }

        let mut config = Config {
            working_dir,
            ..Config::default()
        };

        let file_path = config.working_dir.join(CONFIG_FILE_NAME);
        if let Some(file) = FileConfig::read(&file_path)? {
            debug!("Applying {}", CONFIG_FILE_NAME);
            config.apply_file(file);
        }

        config.apply_env()?;

        if config.credential_hash.is_empty() {
            return Err(AppError::Config(format!(
                "No credential hash configured. Set {} or credentialHash in {} (generate one with `lockview --hash-password`)",
                ENV_VAR_LOCKVIEW_PASSWORD_HASH, CONFIG_FILE_NAME
            )));
        }

        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.artifact_filename {
            self.artifact_filename = v;
        }
        if let Some(v) = file.lock_timeout_seconds {
            self.lock_timeout_seconds = v;
        }
        if let Some(v) = file.delete_time_seconds {
            self.delete_time_seconds = v;
        }
        if let Some(v) = file.credential_hash {
            self.credential_hash = v;
        }
        if let Some(v) = file.viewer_command {
            self.viewer_command = v;
        }
        if let Some(v) = file.idle_command {
            self.idle_command = v;
        }
    }

    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(v) = env::var(ENV_VAR_LOCKVIEW_ARTIFACT) {
            self.artifact_filename = v;
        }
        if let Ok(v) = env::var(ENV_VAR_LOCKVIEW_LOCK_TIMEOUT) {
            self.lock_timeout_seconds = Self::parse_seconds(ENV_VAR_LOCKVIEW_LOCK_TIMEOUT, &v)?;
        }
        if let Ok(v) = env::var(ENV_VAR_LOCKVIEW_DELETE_TIME) {
            self.delete_time_seconds = Self::parse_seconds(ENV_VAR_LOCKVIEW_DELETE_TIME, &v)?;
        }
        if let Ok(v) = env::var(ENV_VAR_LOCKVIEW_PASSWORD_HASH) {
            self.credential_hash = v.trim().to_string();
        }
        if let Ok(v) = env::var(ENV_VAR_LOCKVIEW_VIEWER) {
            self.viewer_command = v;
        }
        if let Ok(v) = env::var(ENV_VAR_LOCKVIEW_IDLE_COMMAND) {
            self.idle_command = v;
        }
        Ok(())
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first problem found.
    ///
    /// # Examples
    ///
    /// ```
    /// use lockview::Config;
    /// use std::path::PathBuf;
    ///
    /// let config = Config {
    ///     working_dir: PathBuf::from("/srv/docs"),
    ///     ..Config::default()
    /// };
    /// // No credential hash
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> AppResult<()> {
        if self.working_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Working directory path is empty".to_string()));
        }

        if !self.working_dir.is_absolute() {
            return Err(AppError::Config(
                "Working directory must be an absolute path".to_string(),
            ));
        }

        if self.artifact_filename.is_empty() {
            return Err(AppError::Config("Artifact filename is empty".to_string()));
        }

        let plain_name = Path::new(&self.artifact_filename)
            .file_name()
            .is_some_and(|name| name == self.artifact_filename.as_str());
        if !plain_name || self.artifact_filename.contains('\\') {
            return Err(AppError::Config(format!(
                "Artifact filename must be a plain file name, got '{}'",
                self.artifact_filename
            )));
        }

        if self.lock_timeout_seconds == 0 {
            return Err(AppError::Config(
                "Lock timeout must be greater than zero".to_string(),
            ));
        }

        if self.delete_time_seconds == 0 {
            return Err(AppError::Config(
                "Delete time must be greater than zero".to_string(),
            ));
        }

        if self.credential_hash.is_empty() {
            return Err(AppError::Config("Credential hash is empty".to_string()));
        }

        check_hash_format(&self.credential_hash)
            .map_err(|e| AppError::Config(e.to_string()))?;

        Config::validate_command("Viewer", &self.viewer_command)?;
        Config::validate_command("Idle query", &self.idle_command)?;

        Ok(())
    }

    /// Full path of the protected artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.working_dir.join(&self.artifact_filename)
    }

    /// Timings and artifact location handed to the session controller.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            artifact_path: self.artifact_path(),
            lock_timeout: Duration::from_secs(self.lock_timeout_seconds),
            delete_delay: Duration::from_secs(self.delete_time_seconds),
        }
    }
}
