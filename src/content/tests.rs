use super::*;
use crate::script::{EventType, TimeRange};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

#[test]
fn builtin_library_has_both_pools() {
    let library = ScriptLibrary::builtin();
    assert_eq!(library.idle_scripts().len(), 4);
    assert_eq!(library.panic_scripts().len(), 2);
    let night = library
        .idle_scripts()
        .iter()
        .find(|s| s.id == "night_default")
        .unwrap();
    assert_eq!(night.priority, 1);
    assert_eq!(night.cooldown_minutes, 20);
    assert!(library
        .panic_scripts()
        .iter()
        .all(|s| s.event_type == EventType::Panic));
}

#[test]
fn missing_pack_falls_back_to_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let library = ScriptLibrary::load(dir.path());
    assert_eq!(library.idle_scripts().len(), 4);
    assert_eq!(library.root(), Some(dir.path()));
}

#[test]
fn loads_json_events_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scripts.json"),
        r#"{
            "idle_events": [
                {"id": "tea", "text": "Tea time?", "time_range": "15:00-16:00",
                 "probability": 0, "cooldown_minutes": -3, "audio_path": "voice/tea.mp3",
                 "tags": ["drink", " "]},
                {"id": "", "text": "skipped"}
            ],
            "panic_events": [
                {"id": "oops", "text": "Oops!"}
            ]
        }"#,
    )
    .unwrap();
    let library = ScriptLibrary::load(dir.path());

    assert_eq!(library.idle_scripts().len(), 1);
    let tea = &library.idle_scripts()[0];
    assert_eq!(tea.time_range, TimeRange::Window { start: 900, end: 960 });
    assert!((tea.probability - 1.0).abs() < f64::EPSILON);
    assert_eq!(tea.cooldown_minutes, 0);
    assert_eq!(tea.audio_path, Some(dir.path().join("voice/tea.mp3")));
    assert_eq!(tea.tags, vec!["drink"]);
    assert_eq!(tea.priority, 2);

    let oops = &library.panic_scripts()[0];
    assert_eq!(oops.priority, 1);
    assert_eq!(oops.event_type, EventType::Panic);
}

#[test]
fn event_lists_win_over_plain_scripts_in_one_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scripts.yaml"),
        "scripts:\n  - id: plain\n    text: From the flat list\nidle_events:\n  - id: wave\n    text: Hello there\npanic_events:\n  - id: hide\n    text: Nothing to see\n",
    )
    .unwrap();
    let library = ScriptLibrary::load(dir.path());
    let idle: Vec<&str> = library.idle_scripts().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(idle, vec!["wave"]);
    let panic: Vec<&str> = library.panic_scripts().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(panic, vec!["hide"]);
}

#[test]
fn panic_only_file_keeps_builtin_idle_lines() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scripts.json"),
        r#"{"panic_events": [{"id": "hide", "text": "Nothing to see"}]}"#,
    )
    .unwrap();
    let library = ScriptLibrary::load(dir.path());
    assert_eq!(library.panic_scripts().len(), 1);
    assert_eq!(library.idle_scripts().len(), 4);
}

#[test]
fn out_of_range_priorities_are_clamped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scripts.json"),
        r#"{
            "idle_events": [
                {"id": "urgent", "text": "Look!", "priority": -5},
                {"id": "lazy", "text": "Whenever.", "priority": 1000}
            ]
        }"#,
    )
    .unwrap();
    let library = ScriptLibrary::load(dir.path());
    let urgent = library.idle_scripts().iter().find(|s| s.id == "urgent").unwrap();
    assert_eq!(urgent.priority, 0);
    let lazy = library.idle_scripts().iter().find(|s| s.id == "lazy").unwrap();
    assert_eq!(lazy.priority, 3);
}

#[test]
fn legacy_named_ranges_map_to_windows() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scripts.yaml"),
        "scripts:\n  - id: owl\n    text: Still up?\n    time_ranges: [night]\n  - id: any\n    text: Hi\n    time_ranges: [morning, default]\n",
    )
    .unwrap();
    let library = ScriptLibrary::load(dir.path());
    let owl = library.idle_scripts().iter().find(|s| s.id == "owl").unwrap();
    assert_eq!(owl.time_range.to_string(), "22:00-06:00");
    let any = library.idle_scripts().iter().find(|s| s.id == "any").unwrap();
    assert!(any.time_range.is_default());
    // No panic section: builtin panic lines fill in.
    assert_eq!(library.panic_scripts().len(), 2);
}

#[test]
fn dialogue_yaml_takes_priority_for_idle() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("scripts")).unwrap();
    fs::write(
        dir.path().join("scripts/dialogue.yaml"),
        "scripts:\n  - id: hello\n    text: Hello there\n    conditions:\n      time_start: \"09:00\"\n      time_end: \"10:00\"\n      cooldown_minutes: 15\n    animation:\n      sprite: wave.png\n      speed: fast\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("scripts.json"),
        r#"{"idle_events": [{"id": "json_idle", "text": "ignored"}], "panic_events": [{"id": "p", "text": "P!"}]}"#,
    )
    .unwrap();
    let library = ScriptLibrary::load(dir.path());
    assert_eq!(library.idle_scripts().len(), 1);
    let hello = &library.idle_scripts()[0];
    assert_eq!(hello.id, "hello");
    assert_eq!(hello.anim_speed, "fast");
    assert_eq!(hello.cooldown_minutes, 15);
    assert_eq!(
        hello.sprite_path,
        Some(dir.path().join("assets").join("sprites").join("wave.png"))
    );
    assert!(hello.time_range.matches(at(9, 30)));
    assert_eq!(library.panic_scripts()[0].id, "p");
}

#[test]
fn malformed_pack_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("scripts.json"), "{ not json").unwrap();
    let library = ScriptLibrary::load(dir.path());
    assert_eq!(library.idle_scripts().len(), 4);
    assert_eq!(library.panic_scripts().len(), 2);
}

#[test]
fn fallback_prefers_top_priority_time_match() {
    let library = ScriptLibrary::builtin();
    let mut rng = StdRng::seed_from_u64(9);
    let late = library.fallback_idle(at(23, 0), &mut rng).unwrap();
    assert_eq!(late.id, "night_default");
    let noon = library.fallback_idle(at(12, 0), &mut rng).unwrap();
    assert_eq!(noon.id, "afternoon_default");
}

#[test]
fn fallback_on_empty_library_is_none() {
    let library = ScriptLibrary::from_scripts("empty", Vec::new(), Vec::new());
    let mut rng = StdRng::seed_from_u64(9);
    assert!(library.fallback_idle(at(12, 0), &mut rng).is_none());
}
