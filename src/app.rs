//! The host event loop.
//!
//! Everything the controller reacts to arrives here: gate input from the
//! terminal reader thread, timer events from the idle monitor and deletion
//! job, and exit signals from the OS. The loop runs on a single-threaded
//! runtime, so the controller is only ever touched from one place.

use crate::config::Config;
use crate::constants::GATE_PROMPT;
use crate::crypto::CredentialVerifier;
use crate::errors::AppResult;
use crate::session::{ActivityClock, SessionController, SessionEvent, SystemIdleProbe};
use crate::surface::TerminalSurfaces;
use std::fmt;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// One unit of input from the terminal.
pub enum GateInput {
    /// A password typed at the open gate.
    Password(Zeroizing<String>),
    /// Reopen the gate for another attempt.
    Unlock,
    /// Leave the application.
    Quit,
    /// Anything else typed while the gate is closed.
    Unknown(String),
}

impl fmt::Debug for GateInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateInput::Password(_) => f.write_str("Password([REDACTED])"),
            GateInput::Unlock => f.write_str("Unlock"),
            GateInput::Quit => f.write_str("Quit"),
            GateInput::Unknown(cmd) => f.debug_tuple("Unknown").field(cmd).finish(),
        }
    }
}

/// Interprets a line typed while the gate is closed.
pub fn parse_command(line: &str) -> GateInput {
    match line.trim().to_lowercase().as_str() {
        "unlock" | "u" => GateInput::Unlock,
        "quit" | "exit" | "q" => GateInput::Quit,
        other => GateInput::Unknown(other.to_string()),
    }
}

/// Runs `f` with `flag` raised, so the exit path knows a hidden prompt is open.
fn while_prompting<T>(flag: &AtomicBool, f: impl FnOnce() -> T) -> T {
    flag.store(true, Ordering::SeqCst);
    let result = f();
    flag.store(false, Ordering::SeqCst);
    result
}

/// Turns terminal echo back on if the process is leaving during a hidden prompt.
///
/// The reader thread never unwinds on exit, so the prompt cannot restore echo
/// itself. Returns whether a restore was attempted.
fn restore_echo_if_prompting(prompting: &AtomicBool) -> bool {
    if !prompting.load(Ordering::SeqCst) {
        return false;
    }

    #[cfg(unix)]
    {
        let tty = match std::fs::File::open("/dev/tty") {
            Ok(tty) => tty,
            Err(e) => {
                warn!(error = %e, "Cannot open terminal to restore echo");
                return true;
            }
        };
        match std::process::Command::new("stty").arg("echo").stdin(tty).status() {
            Ok(status) if status.success() => debug!("Terminal echo restored"),
            Ok(status) => warn!(%status, "stty could not restore terminal echo"),
            Err(e) => warn!(error = %e, "Failed to run stty to restore terminal echo"),
        }
        println!();
    }

    true
}

/// Reads gate input on a dedicated thread.
///
/// Password entry blocks the terminal, so it cannot run on the event loop.
/// After each line the reader waits for `ready` before prompting again, so it
/// always sees the gate state the controller left behind.
fn spawn_gate_reader(
    tx: mpsc::UnboundedSender<GateInput>,
    ready: std_mpsc::Receiver<()>,
    gate_open: Arc<AtomicBool>,
    prompting: Arc<AtomicBool>,
    activity: Arc<ActivityClock>,
) {
    thread::spawn(move || loop {
        let input = if gate_open.load(Ordering::SeqCst) {
            match while_prompting(&prompting, || rpassword::prompt_password(GATE_PROMPT)) {
                Ok(secret) => GateInput::Password(Zeroizing::new(secret)),
                Err(e) => {
                    warn!(error = %e, "Failed to read password; exiting");
                    GateInput::Quit
                }
            }
        } else {
            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line) {
                Ok(0) => GateInput::Quit,
                Ok(_) => parse_command(&line),
                Err(e) => {
                    warn!(error = %e, "Failed to read input; exiting");
                    GateInput::Quit
                }
            }
        };

        activity.touch();
        let quit = matches!(input, GateInput::Quit);
        if tx.send(input).is_err() || quit {
            break;
        }
        if ready.recv().is_err() {
            break;
        }
    });
}

/// Resolves once the process is asked to terminate.
async fn exit_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGHUP");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
            _ = term.recv() => info!("SIGTERM received"),
            _ = hangup.recv() => info!("SIGHUP received"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Interrupt received");
    }
}

/// Runs the gate until the user quits or the process is signalled.
///
/// The fallback deletion always runs before this returns.
pub async fn run(config: Config) -> AppResult<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<GateInput>();
    let (ready_tx, ready_rx) = std_mpsc::channel::<()>();

    let activity = Arc::new(ActivityClock::new());
    let probe = Arc::new(SystemIdleProbe::new(
        config.idle_command.clone(),
        Arc::clone(&activity),
    ));
    let gate_open = Arc::new(AtomicBool::new(false));
    let surfaces = TerminalSurfaces::new(config.viewer_command.clone(), Arc::clone(&gate_open));

    let mut controller = SessionController::new(
        config.session_settings(),
        CredentialVerifier::new(config.credential_hash.clone()),
        surfaces,
        probe,
        events_tx,
    );
    controller.start();

    let prompting = Arc::new(AtomicBool::new(false));
    spawn_gate_reader(input_tx, ready_rx, gate_open, Arc::clone(&prompting), activity);

    let exit = exit_signal();
    tokio::pin!(exit);

    loop {
        tokio::select! {
            _ = &mut exit => break,

            Some(event) = events_rx.recv() => {
                debug!(?event, "Session event");
                controller.handle_event(event);
            }

            input = input_rx.recv() => {
                match input {
                    Some(GateInput::Password(secret)) => {
                        controller.submit_password(&secret);
                    }
                    Some(GateInput::Unlock) => controller.reopen_gate(),
                    Some(GateInput::Unknown(cmd)) => {
                        if !cmd.is_empty() {
                            println!("Unknown command '{}'. Type 'unlock' or 'quit'.", cmd);
                        }
                    }
                    Some(GateInput::Quit) | None => {
                        info!("Quit requested");
                        break;
                    }
                }
                let _ = ready_tx.send(());
            }
        }
    }

    controller.shutdown();
    restore_echo_if_prompting(&prompting);
    Ok(())
}
