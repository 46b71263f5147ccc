//! Character content packs: idle and panic dialogue plus where they came from.

mod builtin;
mod pack;
#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::log_debug;
use crate::script::Script;

/// Dialogue for one character. Replaced wholesale on a character switch.
#[derive(Debug, Clone)]
pub struct ScriptLibrary {
    name: String,
    root: Option<PathBuf>,
    idle: Vec<Script>,
    panic: Vec<Script>,
}

impl Default for ScriptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ScriptLibrary {
    pub fn builtin() -> Self {
        Self {
            name: "builtin".to_string(),
            root: None,
            idle: builtin::builtin_idle(),
            panic: builtin::builtin_panic(),
        }
    }

    pub fn from_scripts(name: impl Into<String>, idle: Vec<Script>, panic: Vec<Script>) -> Self {
        Self {
            name: name.into(),
            root: None,
            idle,
            panic,
        }
    }

    /// Load a pack directory. Unreadable or empty sections fall back to the builtin lines.
    pub fn load(root: &Path) -> Self {
        let name = root
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("pack")
            .to_string();

        let dialogue = match pack::read_dialogue_file(root) {
            Ok(lines) => lines.unwrap_or_default(),
            Err(err) => {
                log_debug(&format!("content pack {name}: {err:#}"));
                Vec::new()
            }
        };
        let events = match pack::read_scripts_file(root) {
            Ok(events) => events.unwrap_or_default(),
            Err(err) => {
                log_debug(&format!("content pack {name}: {err:#}"));
                Default::default()
            }
        };

        let idle = if !dialogue.is_empty() {
            dialogue
        } else if !events.idle.is_empty() {
            events.idle
        } else {
            builtin::builtin_idle()
        };
        let panic = if events.panic.is_empty() {
            builtin::builtin_panic()
        } else {
            events.panic
        };
        log_debug(&format!(
            "content pack {name}: {} idle / {} panic lines",
            idle.len(),
            panic.len()
        ));

        Self {
            name,
            root: Some(root.to_path_buf()),
            idle,
            panic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn idle_scripts(&self) -> &[Script] {
        &self.idle
    }

    pub fn panic_scripts(&self) -> &[Script] {
        &self.panic
    }

    /// Highest-priority time-appropriate idle line, ignoring cooldowns.
    ///
    /// Used when the selector comes back empty (e.g. every windowed line is out of
    /// range). Only an empty library yields `None`.
    pub fn fallback_idle<R: Rng + ?Sized>(&self, now: NaiveDateTime, rng: &mut R) -> Option<Script> {
        let mut candidates: Vec<&Script> = self
            .idle
            .iter()
            .filter(|script| script.time_range.matches(now))
            .collect();
        if candidates.is_empty() {
            candidates = self
                .idle
                .iter()
                .filter(|script| script.time_range.is_default())
                .collect();
        }
        if candidates.is_empty() {
            candidates = self.idle.iter().collect();
        }
        let top = candidates.iter().map(|script| script.priority).min()?;
        let top_candidates: Vec<&Script> = candidates
            .into_iter()
            .filter(|script| script.priority == top)
            .collect();
        let index = match WeightedIndex::new(top_candidates.iter().map(|s| s.weight())) {
            Ok(dist) => dist.sample(rng),
            Err(_) => 0,
        };
        top_candidates.get(index).map(|script| (*script).clone())
    }
}
