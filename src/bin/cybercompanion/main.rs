//! CyberCompanion entrypoint: wires the idle poller, speech pipeline, and director
//! into one event loop.
//!
//! # Threads
//!
//! - Event loop: owns the director; every state change happens here
//! - Idle poller: samples system idle time, publishes edges
//! - Audio worker: synthesizes speech off the loop
//! - Command reader: turns stdin lines into director events

mod commands;
mod console;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::unbounded;
use cybercompanion::audio::{
    AudioManager, AudioSink, CommandSink, CommandSpeechBackend, NullSink, NullSpeechBackend,
    SpeechBackend,
};
use cybercompanion::backend::backend_for;
use cybercompanion::config::AppConfig;
use cybercompanion::content::ScriptLibrary;
use cybercompanion::director::{Collaborators, Director, DirectorEvent};
use cybercompanion::fsm::Transition;
use cybercompanion::idle::{CommandIdleSource, IdlePoller};
use cybercompanion::runtime::{Runtime, RuntimeInputs};
use cybercompanion::snapshot::LatestValue;
use cybercompanion::{init_logging, init_tracing, install_panic_hook, log_debug, log_file_path};

use crate::commands::{spawn_command_thread, HELP};
use crate::console::ConsolePresentation;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;

    let library = match config.content_dir.as_deref() {
        Some(root) => ScriptLibrary::load(root),
        None => ScriptLibrary::builtin(),
    };
    if config.list_scripts {
        print_library(&library);
        return Ok(());
    }

    init_logging(&config);
    init_tracing(&config);
    install_panic_hook();
    log_debug("=== CyberCompanion Started ===");
    let log_file = config.log_file.clone().unwrap_or_else(log_file_path);
    log_debug(&format!("Log file: {}", log_file.display()));

    let speech: Box<dyn SpeechBackend> = if config.tts_argv.is_empty() {
        Box::new(NullSpeechBackend)
    } else {
        Box::new(
            CommandSpeechBackend::new(config.tts_argv.clone())?
                .with_timeout(Duration::from_secs(config.tts_timeout_secs)),
        )
    };
    let sink: Box<dyn AudioSink> = if config.player_argv.is_empty() {
        Box::new(NullSink)
    } else {
        Box::new(CommandSink::new(config.player_argv.clone())?)
    };
    let audio = AudioManager::new(config.audio_settings(), speech, sink);
    log_debug(&format!("speech backend: {}", audio.backend_name()));

    let mut settings = config.director_settings();
    if settings.camera_enabled {
        eprintln!("camera tracking needs a gaze collaborator; continuing without it");
        settings.camera_enabled = false;
    }

    let idle_ms = LatestValue::new();
    let (mut poller, idle_signals) = IdlePoller::spawn(
        Box::new(CommandIdleSource::xprintidle()),
        settings.idle_threshold_ms,
        idle_ms.clone(),
    );

    let collaborators = Collaborators {
        presentation: Box::new(ConsolePresentation::default()),
        idle: Box::new(poller.handle()),
        text: Arc::new(Mutex::new(backend_for(config.llm_provider))),
        ..Collaborators::default()
    };

    let (event_tx, event_rx) = unbounded();
    let mut director = Director::new(
        settings,
        library,
        audio,
        collaborators,
        event_tx.clone(),
    );
    director.subscribe(Box::new(|transition: Transition| {
        println!("[state] {} -> {}", transition.from, transition.to);
    }));

    let inputs = RuntimeInputs {
        events: event_rx,
        idle_signals,
        idle_ms,
        gaze: LatestValue::new(),
    };
    let mut runtime = Runtime::new(director, inputs);
    if let Some(secs) = config.run_secs {
        runtime = runtime.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    println!(
        "CyberCompanion running with '{}' ({} idle / {} panic lines)",
        runtime.director().library().name(),
        runtime.director().library().idle_scripts().len(),
        runtime.director().library().panic_scripts().len()
    );
    println!("{HELP}");

    // Detached: a blocked stdin read must not hold up shutdown.
    let _commands = spawn_command_thread(event_tx.clone());
    if config.summon {
        let _ = event_tx.send(DirectorEvent::Summon);
    }

    runtime.run();
    println!("{}", runtime.director().status_summary());

    poller.shutdown();
    log_debug("=== CyberCompanion Exited ===");
    Ok(())
}

fn print_library(library: &ScriptLibrary) {
    println!("character: {}", library.name());
    for script in library.idle_scripts().iter().chain(library.panic_scripts()) {
        println!(
            "[{}] {} (priority {}, {}) {}",
            script.event_type.label(),
            script.id,
            script.priority,
            script.time_range,
            script.text
        );
    }
}
