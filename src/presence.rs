//! Presence inference from idle time plus an optional camera signal.

pub const ACTIVE_IDLE_MS: u64 = 60_000;
pub const LONG_IDLE_MS: u64 = 300_000;
pub const FACE_ABSENT_FRAMES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// Recent keyboard/mouse input.
    PresentActive,
    /// At the desk but not touching anything (reading, watching).
    PresentPassive,
    Absent,
    /// Not enough signal; callers take no action.
    Unknown,
}

impl PresenceState {
    pub fn label(self) -> &'static str {
        match self {
            PresenceState::PresentActive => "present_active",
            PresenceState::PresentPassive => "present_passive",
            PresenceState::Absent => "absent",
            PresenceState::Unknown => "unknown",
        }
    }
}

/// Latest output of the gaze tracker.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GazeSnapshot {
    pub face_detected: bool,
    pub face_x: f32,
    pub face_y: f32,
    pub confidence: f32,
    pub emotion_label: Option<String>,
    pub emotion_score: f32,
}

impl GazeSnapshot {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn face(x: f32, y: f32, confidence: f32) -> Self {
        Self {
            face_detected: true,
            face_x: x,
            face_y: y,
            confidence,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct PresenceDetector {
    absent_streak: u32,
}

impl PresenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absent_streak(&self) -> u32 {
        self.absent_streak
    }

    pub fn reset(&mut self) {
        self.absent_streak = 0;
    }

    /// Classify presence. Every gaze observation past the active window feeds the
    /// consecutive face-absent counter, even while idle is still below the long threshold.
    pub fn determine_presence(&mut self, idle_ms: u64, gaze: Option<&GazeSnapshot>) -> PresenceState {
        if idle_ms < ACTIVE_IDLE_MS {
            return PresenceState::PresentActive;
        }
        let Some(gaze) = gaze else {
            return PresenceState::Unknown;
        };

        if gaze.face_detected {
            self.absent_streak = 0;
        } else {
            self.absent_streak = self.absent_streak.saturating_add(1);
        }

        if idle_ms >= LONG_IDLE_MS {
            if self.absent_streak >= FACE_ABSENT_FRAMES {
                return PresenceState::Absent;
            }
            if gaze.face_detected {
                return PresenceState::PresentPassive;
            }
        }
        PresenceState::Unknown
    }
}
