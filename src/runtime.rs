//! The single event-loop thread that owns the director.
//!
//! Discrete inputs arrive in order over channels; idle time and gaze samples are
//! read from last-value slots before each dispatch. Timers are checked after every
//! wake-up, which happens at least every [`EVENT_LOOP_IDLE_MS`].

use std::time::{Duration, Instant};

use crossbeam_channel::{never, select, Receiver};

use crate::audio::{AudioEvent, PlaybackSignal};
use crate::director::{Director, DirectorEvent};
use crate::idle::IdleSignal;
use crate::log_debug;
use crate::presence::GazeSnapshot;
use crate::snapshot::LatestValue;

pub const EVENT_LOOP_IDLE_MS: u64 = 50;

/// Everything the loop listens to besides the director's own audio channels.
pub struct RuntimeInputs {
    pub events: Receiver<DirectorEvent>,
    pub idle_signals: Receiver<IdleSignal>,
    pub idle_ms: LatestValue<u64>,
    pub gaze: LatestValue<GazeSnapshot>,
}

impl RuntimeInputs {
    /// Inputs with no idle poller or gaze source attached.
    pub fn events_only(events: Receiver<DirectorEvent>) -> Self {
        Self {
            events,
            idle_signals: never(),
            idle_ms: LatestValue::new(),
            gaze: LatestValue::new(),
        }
    }
}

pub struct Runtime {
    director: Director,
    inputs: RuntimeInputs,
    audio_events: Receiver<AudioEvent>,
    playback_signals: Receiver<PlaybackSignal>,
    stop_at: Option<Instant>,
    running: bool,
}

impl Runtime {
    pub fn new(director: Director, inputs: RuntimeInputs) -> Self {
        let audio_events = director.audio().events();
        let playback_signals = director.audio().playback_signals();
        Self {
            director,
            inputs,
            audio_events,
            playback_signals,
            stop_at: None,
            running: true,
        }
    }

    /// Shut down on its own once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.stop_at = Some(deadline);
        self
    }

    pub fn director(&self) -> &Director {
        &self.director
    }

    pub fn director_mut(&mut self) -> &mut Director {
        &mut self.director
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run until a `Shutdown` event or the deadline.
    pub fn run(&mut self) {
        let tick = Duration::from_millis(EVENT_LOOP_IDLE_MS);
        while self.run_once(tick) {}
        log_debug("event loop stopped");
    }

    /// Wait up to `timeout` for one input, dispatch it, then fire due timers.
    /// Returns `false` once the loop has stopped.
    pub fn run_once(&mut self, timeout: Duration) -> bool {
        if !self.running {
            return false;
        }
        self.drain_snapshots();

        let events = self.inputs.events.clone();
        let audio_events = self.audio_events.clone();
        let playback_signals = self.playback_signals.clone();
        let idle_signals = self.inputs.idle_signals.clone();
        let mut idle_closed = false;

        select! {
            recv(events) -> event => match event {
                Ok(event) => {
                    if !self.director.handle_event(event) {
                        self.running = false;
                    }
                }
                Err(_) => {
                    log_debug("director event channel closed");
                    self.director.shutdown();
                    self.running = false;
                }
            },
            recv(audio_events) -> event => {
                if let Ok(event) = event {
                    // Resulting starts and stops arrive on `playback_signals`.
                    let _ = self.director.audio().handle_event(event);
                }
            },
            recv(playback_signals) -> signal => {
                if let Ok(signal) = signal {
                    self.director.on_playback_signal(&signal);
                }
            },
            recv(idle_signals) -> signal => match signal {
                Ok(IdleSignal::IdleConfirmed) => {
                    self.drain_snapshots();
                    self.director.on_user_idle();
                }
                Ok(IdleSignal::ActiveDetected) => self.director.on_user_active(),
                Err(_) => idle_closed = true,
            },
            default(timeout) => {}
        }

        if idle_closed {
            log_debug("idle poller stopped; continuing without idle detection");
            self.inputs.idle_signals = never();
        }

        if !self.running {
            return false;
        }
        let now = Instant::now();
        self.director.tick(now);
        if self.stop_at.is_some_and(|deadline| now >= deadline) {
            log_debug("run deadline reached");
            self.director.shutdown();
            self.running = false;
        }
        self.running
    }

    fn drain_snapshots(&mut self) {
        if let Some(idle_ms) = self.inputs.idle_ms.take() {
            self.director.on_idle_time(idle_ms);
        }
        if let Some(gaze) = self.inputs.gaze.take() {
            self.director.on_gaze(gaze, Instant::now());
        }
    }

    pub fn into_director(self) -> Director {
        self.director
    }
}
