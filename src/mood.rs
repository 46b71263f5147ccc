//! A single bounded mood value nudged by interactions and relaxed over time.

use std::time::Duration;

pub const NEUTRAL_MOOD: f32 = 0.5;
pub const INTERACTION_BONUS: f32 = 0.10;
pub const ENGAGED_BONUS: f32 = 0.15;
pub const DISMISSAL_PENALTY: f32 = 0.05;
pub const DECAY_STEP: f32 = 0.02;
pub const DECAY_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodSystem {
    value: f32,
}

impl Default for MoodSystem {
    fn default() -> Self {
        Self {
            value: NEUTRAL_MOOD,
        }
    }
}

impl MoodSystem {
    pub fn new(initial: f32) -> Self {
        Self {
            value: clamp(initial),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn on_interacted(&mut self) {
        self.adjust(INTERACTION_BONUS);
    }

    /// Conversational exchange while engaged (commentary, chat).
    pub fn on_engaged(&mut self) {
        self.adjust(ENGAGED_BONUS);
    }

    pub fn on_dismissed(&mut self) {
        self.adjust(-DISMISSAL_PENALTY);
    }

    /// Pull one step toward neutral without overshooting.
    pub fn decay(&mut self) {
        if self.value > NEUTRAL_MOOD {
            self.value = (self.value - DECAY_STEP).max(NEUTRAL_MOOD);
        } else if self.value < NEUTRAL_MOOD {
            self.value = (self.value + DECAY_STEP).min(NEUTRAL_MOOD);
        }
    }

    pub fn label(&self) -> &'static str {
        match self.value {
            v if v < 0.2 => "angry",
            v if v < 0.4 => "annoyed",
            v if v < 0.6 => "calm",
            v if v < 0.8 => "happy",
            _ => "excited",
        }
    }

    fn adjust(&mut self, delta: f32) {
        self.value = clamp(self.value + delta);
    }
}

fn clamp(value: f32) -> f32 {
    if value.is_nan() {
        NEUTRAL_MOOD
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn starts_neutral_and_calm() {
        let mood = MoodSystem::default();
        assert!(close(mood.value(), 0.5));
        assert_eq!(mood.label(), "calm");
    }

    #[test]
    fn adjustments_are_bounded() {
        let mut mood = MoodSystem::new(0.95);
        mood.on_engaged();
        assert!(close(mood.value(), 1.0));
        assert_eq!(mood.label(), "excited");

        let mut mood = MoodSystem::new(0.02);
        mood.on_dismissed();
        assert!(close(mood.value(), 0.0));
        assert_eq!(mood.label(), "angry");
    }

    #[test]
    fn interaction_and_dismissal_deltas() {
        let mut mood = MoodSystem::default();
        mood.on_interacted();
        assert!(close(mood.value(), 0.6));
        mood.on_dismissed();
        assert!(close(mood.value(), 0.55));
    }

    #[test]
    fn decay_moves_toward_neutral_without_overshoot() {
        let mut mood = MoodSystem::new(0.51);
        mood.decay();
        assert!(close(mood.value(), 0.5));
        mood.decay();
        assert!(close(mood.value(), 0.5));

        let mut mood = MoodSystem::new(0.3);
        mood.decay();
        assert!(close(mood.value(), 0.32));
    }

    #[test]
    fn nan_initial_value_is_neutral() {
        assert!(close(MoodSystem::new(f32::NAN).value(), 0.5));
    }
}
