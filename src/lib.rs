/*!
# lockview

lockview guards a single local document behind a password and lets it be
viewed for one bounded session. After a configured delay the document is
deleted, and if the process exits first the deletion happens on the way out.

## Core Features

- Password gate checked against a salted Argon2id hash
- Viewer closes after a configurable period of user inactivity
- Deferred deletion of the document, armed once per grant and never reset
- Synchronous fallback deletion on quit, Ctrl-C, SIGTERM or SIGHUP

## Architecture

- `session`: lifecycle controller, session state, idle monitor, deletion scheduler
- `crypto`: credential verification
- `surface`: gate and viewer surfaces the controller drives
- `app`: the single-threaded host loop
- `config`: configuration loading and validation
- `errors`: error handling infrastructure
- `logging`: tracing subscriber setup

## Usage Example

```rust,no_run
use lockview::{app, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> lockview::AppResult<()> {
    let config = Config::load()?;
    config.validate()?;
    app::run(config).await
}
```
*/

/// Host event loop wiring input, timers and exit signals to the controller
pub mod app;
/// Command-line interface handling using clap
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Application-wide constants
pub mod constants;
/// Credential hashing and verification
pub mod crypto;
/// Error types and utilities for error handling
pub mod errors;
/// Tracing subscriber setup
pub mod logging;
/// Session lifecycle controller and its timers
pub mod session;
/// Display surfaces driven by the controller
pub mod surface;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use session::{SessionController, SubmitResponse};
