use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{IdleControl, IdleSignal, IdleTracker, POLL_INTERVAL_MS};
use crate::snapshot::LatestValue;
use crate::{lock_or_recover, log_debug};

/// Reports milliseconds since the last keyboard/mouse input.
pub trait IdleSource: Send {
    fn idle_ms(&mut self) -> Result<u64>;
}

/// Idle source driven by the host process (tests, demos, embedders with their own hooks).
#[derive(Debug, Clone)]
pub struct ManualIdleSource {
    last_input: Arc<Mutex<Instant>>,
}

impl Default for ManualIdleSource {
    fn default() -> Self {
        Self {
            last_input: Arc::new(Mutex::new(Instant::now())),
        }
    }
}

impl ManualIdleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record input right now.
    pub fn touch(&self) {
        *lock_or_recover(&self.last_input, "manual idle touch") = Instant::now();
    }

    /// Pretend the last input happened `idle_ms` ago.
    pub fn set_idle_ms(&self, idle_ms: u64) {
        let now = Instant::now();
        let last = now
            .checked_sub(Duration::from_millis(idle_ms))
            .unwrap_or(now);
        *lock_or_recover(&self.last_input, "manual idle set") = last;
    }
}

impl IdleSource for ManualIdleSource {
    fn idle_ms(&mut self) -> Result<u64> {
        let last = *lock_or_recover(&self.last_input, "manual idle read");
        let elapsed = Instant::now().saturating_duration_since(last).as_millis();
        Ok(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}

/// Shells out to an X11 idle helper such as `xprintidle`, which prints milliseconds.
#[derive(Debug, Clone)]
pub struct CommandIdleSource {
    program: String,
    args: Vec<String>,
}

impl CommandIdleSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn xprintidle() -> Self {
        Self::new("xprintidle", Vec::new())
    }
}

impl IdleSource for CommandIdleSource {
    fn idle_ms(&mut self) -> Result<u64> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("failed to run {}", self.program))?;
        if !output.status.success() {
            return Err(anyhow!("{} exited with {}", self.program, output.status));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<u64>()
            .with_context(|| format!("{} printed '{}'", self.program, text.trim()))
    }
}

/// Cloneable control handle onto a running poller's tracker.
#[derive(Debug, Clone)]
pub struct IdleHandle {
    tracker: Arc<Mutex<IdleTracker>>,
}

impl IdleHandle {
    pub fn state(&self) -> super::IdleState {
        lock_or_recover(&self.tracker, "idle handle state").state()
    }

    pub fn threshold_ms(&self) -> u64 {
        lock_or_recover(&self.tracker, "idle handle threshold").threshold_ms()
    }
}

impl IdleControl for IdleHandle {
    fn set_threshold_ms(&self, threshold_ms: u64) {
        lock_or_recover(&self.tracker, "idle set threshold").set_threshold_ms(threshold_ms);
    }

    fn reset_to_standby(&self) {
        lock_or_recover(&self.tracker, "idle reset").reset_to_standby();
    }
}

/// Background thread sampling an [`IdleSource`] every 100 ms.
///
/// The newest idle time is published to a last-value slot; idle/active edges go
/// out in order on a channel.
pub struct IdlePoller {
    handle: IdleHandle,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl IdlePoller {
    pub fn spawn(
        source: Box<dyn IdleSource>,
        threshold_ms: u64,
        latest_idle: LatestValue<u64>,
    ) -> (Self, Receiver<IdleSignal>) {
        Self::spawn_with_interval(
            source,
            threshold_ms,
            latest_idle,
            Duration::from_millis(POLL_INTERVAL_MS),
        )
    }

    pub fn spawn_with_interval(
        mut source: Box<dyn IdleSource>,
        threshold_ms: u64,
        latest_idle: LatestValue<u64>,
        interval: Duration,
    ) -> (Self, Receiver<IdleSignal>) {
        let tracker = Arc::new(Mutex::new(IdleTracker::new(threshold_ms)));
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded();

        let thread_tracker = Arc::clone(&tracker);
        let thread_stop = Arc::clone(&stop);
        let join = thread::spawn(move || {
            poll_loop(
                source.as_mut(),
                &thread_tracker,
                &thread_stop,
                &latest_idle,
                &tx,
                interval,
            )
        });

        (
            Self {
                handle: IdleHandle { tracker },
                stop,
                join: Some(join),
            },
            rx,
        )
    }

    pub fn handle(&self) -> IdleHandle {
        self.handle.clone()
    }

    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for IdlePoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop(
    source: &mut dyn IdleSource,
    tracker: &Mutex<IdleTracker>,
    stop: &AtomicBool,
    latest_idle: &LatestValue<u64>,
    tx: &Sender<IdleSignal>,
    interval: Duration,
) {
    let mut source_failed = false;
    while !stop.load(Ordering::SeqCst) {
        let idle_ms = match source.idle_ms() {
            Ok(ms) => {
                source_failed = false;
                ms
            }
            Err(err) => {
                if !source_failed {
                    log_debug(&format!("idle source unavailable: {err:#}"));
                    source_failed = true;
                }
                0
            }
        };
        latest_idle.publish(idle_ms);
        let signal = lock_or_recover(tracker, "idle poll").update(idle_ms);
        if let Some(signal) = signal {
            if tx.send(signal).is_err() {
                break;
            }
        }
        thread::sleep(interval);
    }
}
