//! Bounded randomness so appearances never land on a predictable rhythm.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Jittered thresholds never drop below one minute.
pub const MIN_JITTERED_THRESHOLD_MS: u64 = 60_000;

const Y_BAND_LOW: f64 = 0.2;
const Y_BAND_HIGH: f64 = 0.8;

/// Screen edge the companion slides in from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
}

impl Edge {
    pub fn label(self) -> &'static str {
        match self {
            Edge::Left => "left",
            Edge::Right => "right",
        }
    }
}

/// Configured edge preference; `Auto` picks one at random per appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EdgePreference {
    Left,
    Right,
    Auto,
}

pub struct EntropyEngine {
    rng: StdRng,
}

impl Default for EntropyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyEngine {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic engine for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Offset `base_ms` by a uniform number of seconds from `range_secs`, floored at one minute.
    /// A reversed range is treated as if its bounds were swapped.
    pub fn jitter_threshold(&mut self, base_ms: u64, range_secs: (i64, i64)) -> u64 {
        let (mut lo, mut hi) = range_secs;
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        let offset_ms = self
            .rng
            .random_range(lo.saturating_mul(1000)..=hi.saturating_mul(1000));
        let base = i64::try_from(base_ms).unwrap_or(i64::MAX);
        let jittered = base.saturating_add(offset_ms);
        u64::try_from(jittered)
            .unwrap_or(0)
            .max(MIN_JITTERED_THRESHOLD_MS)
    }

    /// Uniform vertical position inside the middle 60% of the available band.
    pub fn random_y_position(&mut self, top: i32, height: i32) -> i32 {
        let height = f64::from(height.max(0));
        let lo = f64::from(top) + height * Y_BAND_LOW;
        let hi = f64::from(top) + height * Y_BAND_HIGH;
        if hi <= lo {
            return lo.round() as i32;
        }
        self.rng.random_range(lo..=hi).round() as i32
    }

    pub fn choose_edge(&mut self, preference: EdgePreference) -> Edge {
        match preference {
            EdgePreference::Left => Edge::Left,
            EdgePreference::Right => Edge::Right,
            EdgePreference::Auto => {
                if self.rng.random_bool(0.5) {
                    Edge::Left
                } else {
                    Edge::Right
                }
            }
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Seed a derived generator, e.g. for the script engine.
    pub fn fork(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.rng.random())
    }
}
