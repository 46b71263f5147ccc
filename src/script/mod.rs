//! Dialogue lines and the context-aware selector that picks among them.

mod time_range;

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{Duration, NaiveDateTime};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use time_range::{minute_of_day, TimeRange};

/// Weights below this are raised so every line keeps a non-zero chance.
pub const MIN_PROBABILITY: f64 = 0.01;
pub const DEFAULT_SCRIPT_PRIORITY: u8 = 2;
pub const DEFAULT_ANIM_SPEED: &str = "normal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventType {
    #[default]
    Idle,
    Panic,
}

impl EventType {
    pub fn label(self) -> &'static str {
        match self {
            EventType::Idle => "idle",
            EventType::Panic => "panic",
        }
    }
}

/// One line of character dialogue. Libraries replace these wholesale; they are never edited.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub id: String,
    pub text: String,
    pub audio_path: Option<PathBuf>,
    /// Animation tempo label understood by the presentation layer ("slow", "normal", "fast").
    pub anim_speed: String,
    /// Lower is more urgent.
    pub priority: u8,
    pub time_range: TimeRange,
    pub probability: f64,
    pub sprite_path: Option<PathBuf>,
    pub cooldown_minutes: u32,
    pub tags: Vec<String>,
    pub event_type: EventType,
}

impl Script {
    pub fn new(id: impl Into<String>, text: impl Into<String>, event_type: EventType) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            audio_path: None,
            anim_speed: DEFAULT_ANIM_SPEED.to_string(),
            priority: DEFAULT_SCRIPT_PRIORITY,
            time_range: TimeRange::Always,
            probability: 1.0,
            sprite_path: None,
            cooldown_minutes: 0,
            tags: Vec::new(),
            event_type,
        }
    }

    pub fn with_time_range(mut self, raw: &str) -> Self {
        self.time_range = TimeRange::parse(raw);
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability.max(MIN_PROBABILITY);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cooldown(mut self, minutes: u32) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    pub fn with_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio_path = Some(path.into());
        self
    }

    pub fn weight(&self) -> f64 {
        if self.probability.is_finite() {
            self.probability.max(MIN_PROBABILITY)
        } else {
            MIN_PROBABILITY
        }
    }
}

#[derive(Debug, Default)]
struct SelectionHistory {
    last_played: HashMap<String, NaiveDateTime>,
    last_id: Option<String>,
}

impl SelectionHistory {
    fn is_cooling_down(&self, script: &Script, now: NaiveDateTime) -> bool {
        if script.cooldown_minutes == 0 {
            return false;
        }
        match self.last_played.get(&script.id) {
            Some(last) => now < *last + Duration::minutes(i64::from(script.cooldown_minutes)),
            None => false,
        }
    }

    fn record(&mut self, script: &Script, now: NaiveDateTime) {
        self.last_played.insert(script.id.clone(), now);
        self.last_id = Some(script.id.clone());
    }
}

#[derive(Clone, Copy)]
struct Filter {
    avoid_repeat: bool,
    honor_cooldown: bool,
    source_len: usize,
}

/// Picks idle and panic lines honoring time windows, cooldowns, and repeat avoidance.
pub struct ScriptEngine {
    idle: Vec<Script>,
    panic: Vec<Script>,
    history: SelectionHistory,
    rng: StdRng,
}

impl ScriptEngine {
    pub fn new(idle: Vec<Script>, panic: Vec<Script>) -> Self {
        Self::with_rng(idle, panic, StdRng::from_os_rng())
    }

    pub fn with_rng(idle: Vec<Script>, panic: Vec<Script>, rng: StdRng) -> Self {
        Self {
            idle,
            panic,
            history: SelectionHistory::default(),
            rng,
        }
    }

    /// Swap in a new library; cooldown history survives so ids shared across packs stay throttled.
    pub fn refresh(&mut self, idle: Vec<Script>, panic: Vec<Script>) {
        self.idle = idle;
        self.panic = panic;
    }

    pub fn idle_scripts(&self) -> &[Script] {
        &self.idle
    }

    pub fn panic_scripts(&self) -> &[Script] {
        &self.panic
    }

    pub fn last_selected(&self) -> Option<&str> {
        self.history.last_id.as_deref()
    }

    pub fn select_idle(&mut self, now: NaiveDateTime) -> Option<Script> {
        let Self {
            idle, history, rng, ..
        } = self;
        select_from(history, rng, idle, now, true, true)
    }

    /// Panic lines ignore cooldown and repeats; an empty panic pool borrows from idle lines.
    pub fn select_panic(&mut self, now: NaiveDateTime) -> Option<Script> {
        let Self {
            idle,
            panic,
            history,
            rng,
        } = self;
        let pool = if panic.is_empty() { idle } else { panic };
        select_from(history, rng, pool, now, false, false)
    }

    /// Select from an arbitrary pool while sharing this engine's history.
    pub fn select(
        &mut self,
        pool: &[Script],
        now: NaiveDateTime,
        avoid_repeat: bool,
        honor_cooldown: bool,
    ) -> Option<Script> {
        select_from(
            &mut self.history,
            &mut self.rng,
            pool,
            now,
            avoid_repeat,
            honor_cooldown,
        )
    }
}

fn select_from(
    history: &mut SelectionHistory,
    rng: &mut StdRng,
    source: &[Script],
    now: NaiveDateTime,
    avoid_repeat: bool,
    honor_cooldown: bool,
) -> Option<Script> {
    if source.is_empty() {
        return None;
    }

    let exact: Vec<&Script> = source
        .iter()
        .filter(|s| !s.time_range.is_default() && s.time_range.matches(now))
        .collect();
    let defaults: Vec<&Script> = source
        .iter()
        .filter(|s| s.time_range.is_default())
        .collect();
    let both = !exact.is_empty() && !defaults.is_empty();
    let primary: Vec<&Script> = if !exact.is_empty() {
        exact.clone()
    } else if !defaults.is_empty() {
        defaults.clone()
    } else {
        source.iter().collect()
    };

    let filter = Filter {
        avoid_repeat,
        honor_cooldown,
        source_len: source.len(),
    };
    let mut candidates = filter_candidates(history, &primary, now, filter);

    if candidates.is_empty() && both {
        candidates = filter_candidates(history, &defaults, now, filter);
    }

    let narrowest = if both { &defaults } else { &primary };
    if candidates.is_empty() {
        // Cooldown gives way before repeat avoidance does.
        let relaxed = Filter {
            honor_cooldown: false,
            ..filter
        };
        candidates = filter_candidates(history, narrowest, now, relaxed);
    }
    if candidates.is_empty() {
        let relaxed = Filter {
            honor_cooldown: false,
            avoid_repeat: false,
            ..filter
        };
        candidates = filter_candidates(history, narrowest, now, relaxed);
    }

    let selected = weighted_pick(rng, &candidates)?.clone();
    history.record(&selected, now);
    Some(selected)
}

fn filter_candidates<'a>(
    history: &SelectionHistory,
    pool: &[&'a Script],
    now: NaiveDateTime,
    filter: Filter,
) -> Vec<&'a Script> {
    pool.iter()
        .copied()
        .filter(|script| script.time_range.matches(now))
        .filter(|script| !(filter.honor_cooldown && history.is_cooling_down(script, now)))
        .filter(|script| {
            !(filter.avoid_repeat
                && filter.source_len > 1
                && history.last_id.as_deref() == Some(script.id.as_str()))
        })
        .collect()
}

fn weighted_pick<'a>(rng: &mut StdRng, candidates: &[&'a Script]) -> Option<&'a Script> {
    match candidates {
        [] => None,
        [only] => Some(*only),
        _ => {
            let weights = candidates.iter().map(|script| script.weight());
            match WeightedIndex::new(weights) {
                Ok(dist) => candidates.get(dist.sample(rng)).copied(),
                Err(_) => candidates.first().copied(),
            }
        }
    }
}
