/*!
# lockview - One-time Password-Gated Viewer

lockview shows a single local document after the right password is entered,
closes the viewer when the user goes idle, and deletes the document after a
fixed delay or when the program exits, whichever comes first.

## Usage

```
lockview [OPTIONS]

Options:
  -v, --verbose                 Print verbose (debug) log output
      --log-format <FORMAT>     Log output format [default: text] [possible values: text, json]
      --hash-password           Prompt for a new password, print its hash and exit
  -h, --help                    Print help information
  -V, --version                 Print version information
```

## Configuration

See `lockview::config` for the environment variables and the optional
`lockview.json` file. `LOCKVIEW_PASSWORD_HASH` (or `credentialHash`) is required.
*/

use lockview::cli::CliArgs;
use lockview::config::Config;
use lockview::constants::{TRACING_ROOT_SPAN_NAME, TRACING_SERVICE_NAME};
use lockview::crypto::hash_password;
use lockview::errors::{AppError, AppResult};
use lockview::{app, logging};
use tracing::{debug, info, Instrument};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Prompts twice for a new password and prints its hash.
fn print_password_hash() -> AppResult<()> {
    let password = Zeroizing::new(
        rpassword::prompt_password("New password: ")
            .map_err(|e| AppError::Prompt(e.to_string()))?,
    );
    let confirmation = Zeroizing::new(
        rpassword::prompt_password("Confirm password: ")
            .map_err(|e| AppError::Prompt(e.to_string()))?,
    );

    if password.is_empty() {
        return Err(AppError::Prompt("Password cannot be empty".to_string()));
    }
    if *password != *confirmation {
        return Err(AppError::Prompt("Passwords do not match".to_string()));
    }

    println!("{}", hash_password(&password)?);
    Ok(())
}

/// The main entry point for the lockview application.
///
/// 1. Parses command-line arguments and initializes logging
/// 2. Loads and validates configuration (failure prevents startup)
/// 3. Runs the gate loop, which always ends with the fallback deletion
fn main() -> AppResult<()> {
    let args = CliArgs::parse();
    logging::init_tracing(&args.log_format, args.verbose)?;
    debug!("CLI arguments: {:?}", args);

    if args.hash_password {
        return print_password_hash();
    }

    let root_span = tracing::info_span!(
        TRACING_ROOT_SPAN_NAME,
        service = TRACING_SERVICE_NAME,
        invocation_id = %Uuid::new_v4()
    );

    info!(parent: &root_span, "Starting lockview");

    let config = Config::load()?;
    config.validate()?;
    debug!(parent: &root_span, ?config, "Configuration loaded");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(app::run(config).instrument(root_span.clone()))?;

    info!(parent: &root_span, "lockview exited cleanly");
    Ok(())
}
