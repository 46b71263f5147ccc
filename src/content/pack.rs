//! On-disk character pack formats.
//!
//! `scripts.json` / `scripts.yaml` hold `idle_events` + `panic_events` (or a bare
//! `scripts` list of idle lines); `scripts/dialogue.yaml` holds richer idle entries
//! with `conditions`, `tts` and `animation` blocks. When a file carries both
//! layouts, the event lists win.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::audio::AudioPriority;
use crate::log_debug;
use crate::script::{EventType, Script, TimeRange, DEFAULT_ANIM_SPEED, DEFAULT_SCRIPT_PRIORITY};

pub(super) const SCRIPTS_JSON: &str = "scripts.json";
pub(super) const SCRIPTS_YAML: &str = "scripts.yaml";
pub(super) const DIALOGUE_YAML: &str = "scripts/dialogue.yaml";
const PANIC_DEFAULT_PRIORITY: u8 = 1;

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawScript {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default, alias = "audio_cache")]
    audio_path: Option<String>,
    #[serde(default)]
    anim_speed: Option<String>,
    /// Lower is more urgent; out-of-range values are clamped onto the speech scale.
    #[serde(default)]
    priority: Option<i64>,
    #[serde(default)]
    time_range: Option<String>,
    /// Older packs tag lines with named day parts instead of a window.
    #[serde(default)]
    time_ranges: Vec<String>,
    #[serde(default)]
    probability: Option<f64>,
    #[serde(default)]
    sprite: Option<String>,
    #[serde(default)]
    cooldown_minutes: Option<i64>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ScriptsFile {
    Keyed(KeyedScripts),
    List(Vec<RawScript>),
}

/// Top-level mapping form. Both layouts are read so precedence does not depend on
/// which one happens to deserialize first.
#[derive(Debug, Default, Deserialize)]
pub(super) struct KeyedScripts {
    #[serde(default)]
    idle_events: Option<Vec<RawScript>>,
    #[serde(default)]
    panic_events: Option<Vec<RawScript>>,
    #[serde(default)]
    scripts: Option<Vec<RawScript>>,
}

impl KeyedScripts {
    fn has_event_lists(&self) -> bool {
        self.idle_events.is_some() || self.panic_events.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DialogueFile {
    #[serde(default)]
    scripts: Vec<DialogueEntry>,
}

#[derive(Debug, Deserialize)]
struct DialogueEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    conditions: Conditions,
    #[serde(default)]
    tts: TtsHints,
    #[serde(default)]
    animation: AnimationHints,
}

#[derive(Debug, Default, Deserialize)]
struct Conditions {
    time_start: Option<String>,
    time_end: Option<String>,
    probability: Option<f64>,
    cooldown_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct TtsHints {
    audio_cache: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AnimationHints {
    sprite: Option<String>,
    speed: Option<String>,
}

/// Idle and panic lines parsed from one pack file.
#[derive(Debug, Default)]
pub(super) struct ParsedEvents {
    pub(super) idle: Vec<Script>,
    pub(super) panic: Vec<Script>,
}

pub(super) fn read_scripts_file(root: &Path) -> Result<Option<ParsedEvents>> {
    let json_path = root.join(SCRIPTS_JSON);
    let yaml_path = root.join(SCRIPTS_YAML);
    let file: ScriptsFile = if json_path.is_file() {
        let raw = fs::read_to_string(&json_path)
            .with_context(|| format!("failed to read {}", json_path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid scripts file {}", json_path.display()))?
    } else if yaml_path.is_file() {
        let raw = fs::read_to_string(&yaml_path)
            .with_context(|| format!("failed to read {}", yaml_path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid scripts file {}", yaml_path.display()))?
    } else {
        return Ok(None);
    };

    let mut parsed = ParsedEvents::default();
    match file {
        ScriptsFile::List(scripts) => {
            parsed.idle = convert_all(root, scripts, EventType::Idle);
        }
        ScriptsFile::Keyed(keyed) if keyed.has_event_lists() => {
            if keyed.scripts.is_some() {
                log_debug(&format!(
                    "{}: ignoring `scripts` next to idle_events/panic_events",
                    root.display()
                ));
            }
            let idle = keyed.idle_events.unwrap_or_default();
            let panic = keyed.panic_events.unwrap_or_default();
            parsed.idle = convert_all(root, idle, EventType::Idle);
            parsed.panic = convert_all(root, panic, EventType::Panic);
        }
        ScriptsFile::Keyed(keyed) => {
            let scripts = keyed.scripts.unwrap_or_default();
            parsed.idle = convert_all(root, scripts, EventType::Idle);
        }
    }
    Ok(Some(parsed))
}

pub(super) fn read_dialogue_file(root: &Path) -> Result<Option<Vec<Script>>> {
    let path = root.join(DIALOGUE_YAML);
    if !path.is_file() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let file: DialogueFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid dialogue file {}", path.display()))?;
    Ok(Some(
        file.scripts
            .into_iter()
            .filter_map(|entry| convert_dialogue(root, entry))
            .collect(),
    ))
}

fn convert_all(root: &Path, raw: Vec<RawScript>, event_type: EventType) -> Vec<Script> {
    raw.into_iter()
        .filter_map(|item| convert(root, item, event_type))
        .collect()
}

fn convert(root: &Path, raw: RawScript, event_type: EventType) -> Option<Script> {
    let id = raw.id.trim().to_string();
    let text = raw.text.trim().to_string();
    if id.is_empty() || text.is_empty() {
        return None;
    }
    let default_priority = match event_type {
        EventType::Panic => PANIC_DEFAULT_PRIORITY,
        EventType::Idle => DEFAULT_SCRIPT_PRIORITY,
    };
    let time_range = match raw.time_range.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => TimeRange::parse(value),
        _ => legacy_time_range(&raw.time_ranges),
    };
    Some(
        Script {
            id,
            text,
            audio_path: resolve_path(root, raw.audio_path.as_deref()),
            anim_speed: speed_label(raw.anim_speed.as_deref()),
            priority: raw
                .priority
                .map_or(default_priority, |level| AudioPriority::from_level(level).level()),
            time_range,
            probability: 1.0,
            sprite_path: resolve_path(root, raw.sprite.as_deref()),
            cooldown_minutes: clamp_cooldown(raw.cooldown_minutes),
            tags: raw
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            event_type,
        }
        .with_probability(probability_or_default(raw.probability)),
    )
}

fn convert_dialogue(root: &Path, entry: DialogueEntry) -> Option<Script> {
    let id = entry.id.trim().to_string();
    let text = entry.text.trim().to_string();
    if id.is_empty() || text.is_empty() {
        return None;
    }
    let start = entry
        .conditions
        .time_start
        .as_deref()
        .unwrap_or("default")
        .trim()
        .to_ascii_lowercase();
    let end = entry
        .conditions
        .time_end
        .as_deref()
        .unwrap_or("default")
        .trim()
        .to_ascii_lowercase();
    let time_range = if start == "default" || end == "default" {
        TimeRange::Always
    } else {
        TimeRange::parse(&format!("{start}-{end}"))
    };
    let sprite_path = entry
        .animation
        .sprite
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| root.join("assets").join("sprites").join(name));

    Some(
        Script {
            id,
            text,
            audio_path: resolve_path(root, entry.tts.audio_cache.as_deref()),
            anim_speed: speed_label(entry.animation.speed.as_deref()),
            priority: DEFAULT_SCRIPT_PRIORITY,
            time_range,
            probability: 1.0,
            sprite_path,
            cooldown_minutes: clamp_cooldown(entry.conditions.cooldown_minutes),
            tags: Vec::new(),
            event_type: EventType::Idle,
        }
        .with_probability(probability_or_default(entry.conditions.probability)),
    )
}

fn legacy_time_range(tags: &[String]) -> TimeRange {
    let tags: Vec<String> = tags
        .iter()
        .map(|tag| tag.trim().to_ascii_lowercase())
        .collect();
    let has = |name: &str| tags.iter().any(|tag| tag == name);
    let window = if has("default") {
        "default"
    } else if has("morning") {
        "05:00-11:00"
    } else if has("afternoon") {
        "11:00-18:00"
    } else if has("evening") {
        "18:00-22:00"
    } else if has("night") {
        "22:00-06:00"
    } else {
        "default"
    };
    TimeRange::parse(window)
}

fn probability_or_default(value: Option<f64>) -> f64 {
    match value {
        Some(p) if p.is_finite() && p != 0.0 => p,
        _ => 1.0,
    }
}

fn clamp_cooldown(value: Option<i64>) -> u32 {
    value
        .unwrap_or(0)
        .clamp(0, i64::from(u32::MAX))
        .try_into()
        .unwrap_or(0)
}

fn speed_label(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(speed) if !speed.is_empty() => speed.to_string(),
        _ => DEFAULT_ANIM_SPEED.to_string(),
    }
}

/// Relative pack paths resolve against the pack root.
fn resolve_path(root: &Path, value: Option<&str>) -> Option<PathBuf> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }
    let path = PathBuf::from(text);
    Some(if path.is_absolute() { path } else { root.join(path) })
}
