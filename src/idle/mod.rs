//! Keyboard/mouse idle tracking.
//!
//! [`IdleTracker`] turns a stream of idle-time samples into edge-triggered
//! "idle confirmed" / "activity resumed" signals. After activity resumes the tracker
//! parks in `Active` until the owner explicitly resets it, so a single idle episode
//! produces at most one appearance.

mod poller;

pub use poller::{CommandIdleSource, IdleHandle, IdlePoller, IdleSource, ManualIdleSource};

pub const POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_THRESHOLD_MS: u64 = 180_000;
pub const PRE_IDLE_RATIO: f64 = 0.8;
/// Idle below this counts as fresh input.
pub const ACTIVE_RESET_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Standby,
    PreIdle,
    IdleTriggered,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleSignal {
    IdleConfirmed,
    ActiveDetected,
}

/// Control surface the director uses to re-arm idle detection.
pub trait IdleControl: Send {
    fn set_threshold_ms(&self, threshold_ms: u64);
    fn reset_to_standby(&self);
}

#[derive(Debug, Clone)]
pub struct IdleTracker {
    state: IdleState,
    threshold_ms: u64,
}

impl Default for IdleTracker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_MS)
    }
}

impl IdleTracker {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            state: IdleState::Standby,
            threshold_ms: threshold_ms.max(1),
        }
    }

    pub fn state(&self) -> IdleState {
        self.state
    }

    pub fn threshold_ms(&self) -> u64 {
        self.threshold_ms
    }

    pub fn set_threshold_ms(&mut self, threshold_ms: u64) {
        self.threshold_ms = threshold_ms.max(1);
    }

    pub fn reset_to_standby(&mut self) {
        self.state = IdleState::Standby;
    }

    fn pre_idle_ms(&self) -> u64 {
        (self.threshold_ms as f64 * PRE_IDLE_RATIO) as u64
    }

    pub fn update(&mut self, idle_ms: u64) -> Option<IdleSignal> {
        match self.state {
            IdleState::Standby | IdleState::PreIdle if idle_ms >= self.threshold_ms => {
                self.state = IdleState::IdleTriggered;
                Some(IdleSignal::IdleConfirmed)
            }
            IdleState::Standby => {
                if idle_ms >= self.pre_idle_ms() {
                    self.state = IdleState::PreIdle;
                }
                None
            }
            IdleState::PreIdle => {
                if idle_ms < ACTIVE_RESET_MS {
                    self.state = IdleState::Standby;
                }
                None
            }
            IdleState::IdleTriggered => {
                if idle_ms < ACTIVE_RESET_MS {
                    self.state = IdleState::Active;
                    Some(IdleSignal::ActiveDetected)
                } else {
                    None
                }
            }
            IdleState::Active => None,
        }
    }
}
