//! Idle detection for the viewing session.
//!
//! The monitor samples an [`IdleProbe`] on a fixed poll interval and fires its
//! callback once the reported idle duration reaches the threshold. The poll
//! interval is independent of the threshold, so thresholds shorter than one
//! interval are effectively rounded up to the next sample.

use crate::constants::{IDLE_POLL_INTERVAL, IDLE_QUERY_TIMEOUT};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Host hook reporting how long the user has been idle.
pub trait IdleProbe: Send + Sync {
    /// Elapsed time since the last user input event.
    fn idle_duration(&self) -> Duration;
}

/// In-process idle tracking, touched whenever the host sees user input.
#[derive(Debug)]
pub struct ActivityClock {
    last_input: Mutex<Instant>,
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            last_input: Mutex::new(Instant::now()),
        }
    }

    /// Records user input now.
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_input.lock() {
            *last = Instant::now();
        }
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleProbe for ActivityClock {
    fn idle_duration(&self) -> Duration {
        self.last_input
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }
}

/// System-wide idle time from an external query command.
///
/// The command must print the idle time in milliseconds (`xprintidle` does).
/// If it cannot be run, does not finish within [`IDLE_QUERY_TIMEOUT`], or its
/// output is not a number, the query falls back to the in-process
/// [`ActivityClock`] and warns once.
pub struct SystemIdleProbe {
    command: String,
    fallback: Arc<ActivityClock>,
    warned: AtomicBool,
}

impl SystemIdleProbe {
    pub fn new(command: impl Into<String>, fallback: Arc<ActivityClock>) -> Self {
        Self {
            command: command.into(),
            fallback,
            warned: AtomicBool::new(false),
        }
    }

    fn query(&self) -> Option<Duration> {
        let mut child = Command::new(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;

        let deadline = Instant::now() + IDLE_QUERY_TIMEOUT;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                _ => {
                    debug!(command = %self.command, "Idle query timed out; killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
            }
        }

        let output = child.wait_with_output().ok()?;
        if !output.status.success() {
            return None;
        }
        parse_idle_millis(&String::from_utf8_lossy(&output.stdout))
    }
}

impl IdleProbe for SystemIdleProbe {
    fn idle_duration(&self) -> Duration {
        match self.query() {
            Some(idle) => idle,
            None => {
                if !self.warned.swap(true, Ordering::Relaxed) {
                    warn!(
                        command = %self.command,
                        "System idle query unavailable; falling back to terminal activity"
                    );
                }
                self.fallback.idle_duration()
            }
        }
    }
}

/// Parses a millisecond count as printed by idle query tools.
fn parse_idle_millis(output: &str) -> Option<Duration> {
    output.trim().parse::<u64>().ok().map(Duration::from_millis)
}

/// Polls idle time and fires a one-shot timeout callback.
pub struct IdleMonitor {
    probe: Arc<dyn IdleProbe>,
    poll_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl IdleMonitor {
    /// Creates a disarmed monitor polling every [`IDLE_POLL_INTERVAL`].
    pub fn new(probe: Arc<dyn IdleProbe>) -> Self {
        Self {
            probe,
            poll_interval: IDLE_POLL_INTERVAL,
            handle: None,
        }
    }

    /// Arms the monitor. Any previous poll loop is cancelled first.
    ///
    /// `on_timeout` runs at most once, after which the monitor disarms itself.
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(&mut self, threshold: Duration, on_timeout: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.stop();

        let probe = Arc::clone(&self.probe);
        let period = self.poll_interval;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                // Samples may run external commands; keep them off the event loop.
                let sample = Arc::clone(&probe);
                let idle = match tokio::task::spawn_blocking(move || sample.idle_duration()).await {
                    Ok(idle) => idle,
                    Err(e) => {
                        warn!(error = %e, "Idle probe failed");
                        continue;
                    }
                };
                if idle >= threshold {
                    info!(idle_secs = idle.as_secs(), "Idle timeout reached");
                    on_timeout();
                    break;
                }
            }
        }));
        info!(threshold_secs = threshold.as_secs(), "Idle monitor started");
    }

    /// Disarms the monitor. Calling it when not armed is a no-op.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Idle monitor stopped");
        }
    }

    /// True while the poll loop is running.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for IdleMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
