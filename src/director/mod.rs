//! The director: turns idle, presence, media and user signals into lifecycle
//! transitions, and drives visuals and speech from the state machine's hooks.
//!
//! All of this runs on the event-loop thread. Hooks only see [`DirectorCore`];
//! when a hook needs another transition (e.g. a flee with no animation) it leaves
//! a follow-up request that [`Director`] applies once the current one completes.

mod collaborators;
mod events;
mod expression;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use crossbeam_channel::Sender;

pub use collaborators::{
    Collaborators, EntranceRun, FullscreenProbe, GazeControl, NeverFullscreen, NoEntrance,
    NullGaze, NullIdleControl, NullPresentation, Presentation, ScriptedEntrance,
    DEFAULT_SCREEN_BAND,
};
pub use events::{resolve_behavior_mode, BehaviorMode, DirectorEvent};
pub use expression::{Expression, ExpressionVoter};

use crate::audio::{AudioManager, AudioPriority, PlaybackSignal};
use crate::backend::{TextBackend, TextPrompt};
use crate::config::{
    DEFAULT_AUTO_DISMISS_SECS, DEFAULT_IDLE_THRESHOLD_SECS, DEFAULT_JITTER_MAX_SECS,
    DEFAULT_JITTER_MIN_SECS,
};
use crate::content::ScriptLibrary;
use crate::entropy::{Edge, EdgePreference, EntropyEngine};
use crate::fsm::{EntityState, Listener, StateMachine, Transition};
use crate::idle::IdleControl;
use crate::mood::{MoodSystem, DECAY_INTERVAL};
use crate::presence::{GazeSnapshot, PresenceDetector, PresenceState};
use crate::resources::ResourceScheduler;
use crate::script::{Script, ScriptEngine};
use crate::text_chunker::chunk_text;
use crate::{lock_or_recover, log_debug, log_debug_content};

const ENTRANCE_MIN_TIMEOUT: Duration = Duration::from_secs(3);
const ENTRANCE_GRACE: Duration = Duration::from_secs(2);
const RESTING_VISUAL: &str = "state1";
const FLEEING_VISUAL: &str = "state4";
const THINKING_VISUAL: &str = "state5";
const MAX_COMMENTARY_CHARS: usize = 90;
const COMMENTARY_PREAMBLE: &str = "正在看你的屏幕内容，让我看看你在做什么。";
const COMMENTARY_APOLOGY: &str = "我这次没看清你的屏幕，稍后再试一次。";
const POWER_SAVE_LINE: &str = "我现在在省电模式，稍后再看屏幕。";

#[derive(Debug, Clone, PartialEq)]
pub struct DirectorSettings {
    pub idle_threshold_ms: u64,
    pub jitter_range_secs: (i64, i64),
    pub auto_dismiss_ms: u64,
    pub fullscreen_pause: bool,
    pub audio_output_reactive: bool,
    pub edge: EdgePreference,
    pub camera_enabled: bool,
}

impl Default for DirectorSettings {
    fn default() -> Self {
        Self {
            idle_threshold_ms: DEFAULT_IDLE_THRESHOLD_SECS * 1000,
            jitter_range_secs: (DEFAULT_JITTER_MIN_SECS, DEFAULT_JITTER_MAX_SECS),
            auto_dismiss_ms: DEFAULT_AUTO_DISMISS_SECS * 1000,
            fullscreen_pause: true,
            audio_output_reactive: true,
            edge: EdgePreference::Right,
            camera_enabled: false,
        }
    }
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn fallback_ascii(text: &str) -> String {
    format!("   /\\_/\\\n  ( o.o )\n   > ^ <\n{text}")
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// State the hooks operate on. Owned by [`Director`] next to the state machine.
struct DirectorCore {
    settings: DirectorSettings,
    presentation: Box<dyn Presentation>,
    entrance_player: Box<dyn ScriptedEntrance>,
    fullscreen: Box<dyn FullscreenProbe>,
    gaze: Box<dyn GazeControl>,
    idle: Box<dyn IdleControl>,
    text: Arc<Mutex<Box<dyn TextBackend>>>,
    audio: AudioManager,
    library: ScriptLibrary,
    engine: ScriptEngine,
    entropy: EntropyEngine,
    presence: PresenceDetector,
    mood: MoodSystem,
    resources: ResourceScheduler,
    expression: ExpressionVoter,
    events: Sender<DirectorEvent>,

    behavior: BehaviorMode,
    camera_enabled: bool,
    latest_idle_ms: u64,
    latest_gaze: GazeSnapshot,
    silent_presence: bool,
    pending_script: Option<Script>,
    /// Deadline of the running scripted entrance.
    entrance_deadline: Option<Instant>,
    /// Set while ENGAGED is entered from a finished entrance, which already spoke.
    entrance_voiced: bool,
    audio_output_active: bool,
    audio_forced_visible: bool,
    /// Last external media report, including ones masked by our own playback.
    media_reported: bool,
    auto_dismiss_at: Option<Instant>,
    next_mood_decay: Instant,
    active_edge: Edge,
    active_y: i32,
    commentary_session: u64,
    follow_up: Option<EntityState>,
}

impl DirectorCore {
    fn entrance_playing(&self) -> bool {
        self.entrance_deadline.is_some()
    }

    fn effective_behavior(&self) -> BehaviorMode {
        resolve_behavior_mode(
            self.entrance_playing(),
            self.audio_output_active,
            self.behavior,
        )
    }

    fn set_behavior(&mut self, mode: BehaviorMode) {
        if self.behavior != mode {
            tracing::info!(mode = mode.label(), "behavior mode");
        }
        self.behavior = mode;
    }

    fn apply_behavior_visual(&mut self, state: EntityState) {
        if matches!(state, EntityState::Hidden | EntityState::Fleeing) {
            return;
        }
        let mode = self.effective_behavior();
        self.presentation
            .set_state_by_name(mode.visual(), mode == BehaviorMode::Idle);
    }

    fn rearm_idle(&mut self) {
        self.idle.reset_to_standby();
        let threshold = self
            .entropy
            .jitter_threshold(self.settings.idle_threshold_ms, self.settings.jitter_range_secs);
        self.idle.set_threshold_ms(threshold);
    }

    fn arm_auto_dismiss(&mut self, now: Instant) {
        self.auto_dismiss_at = Some(now + Duration::from_millis(self.settings.auto_dismiss_ms));
    }

    fn fullscreen_suppressed(&self) -> bool {
        self.settings.fullscreen_pause && self.fullscreen.is_fullscreen_app_running()
    }

    fn start_camera_if_allowed(&mut self, now: Instant) {
        if !self.camera_enabled {
            return;
        }
        let fullscreen = self.fullscreen_suppressed();
        if self.resources.resolve_plan(fullscreen, false, now).cv_running {
            self.gaze.start_tracking();
        }
    }

    fn select_idle_script(&mut self) -> Option<Script> {
        let now = local_now();
        self.engine
            .select_idle(now)
            .or_else(|| self.library.fallback_idle(now, self.entropy.rng()))
    }

    fn set_visual_from_script(&mut self, script: &Script) {
        self.presentation.set_state_by_name(RESTING_VISUAL, true);
        if let Some(sprite) = script.sprite_path.as_deref() {
            match self.presentation.set_sprite_content(sprite) {
                Ok(()) => return,
                Err(err) => log_debug(&format!(
                    "sprite {} unavailable, using text art: {err:#}",
                    sprite.display()
                )),
            }
        }
        self.presentation
            .set_ascii_content(&fallback_ascii(&script.text));
    }

    fn appear(&mut self, state: EntityState) {
        let now = Instant::now();
        self.start_camera_if_allowed(now);
        self.presentation.set_state_by_name(RESTING_VISUAL, true);

        let script = match self.pending_script.take() {
            Some(script) => Some(script),
            None => self.select_idle_script(),
        };

        if !self.presentation.is_visible() {
            let (top, height) = self.presentation.screen_band();
            self.active_edge = self.entropy.choose_edge(self.settings.edge);
            self.active_y = self.entropy.random_y_position(top, height);
            if let Some(script) = script.as_ref() {
                self.set_visual_from_script(script);
            }
            if state == EntityState::Peeking {
                self.presentation.peek(self.active_edge, self.active_y);
            } else {
                self.presentation
                    .summon(self.active_edge, self.active_y, script.as_ref());
            }
        } else {
            self.presentation.enter(script.as_ref());
        }

        match script.as_ref() {
            Some(script) if !self.silent_presence && !self.entrance_voiced => {
                self.mood.on_interacted();
                log_debug_content(&format!("speaking idle line {}: {}", script.id, script.text));
                let outcome = self
                    .audio
                    .play_script(script, Some(AudioPriority::High), false);
                if outcome.is_dropped() {
                    log_debug(&format!("idle line {} not spoken: {outcome:?}", script.id));
                }
            }
            Some(_) => {}
            None => log_debug("no idle line available; appearing silently"),
        }

        if self.behavior != BehaviorMode::Summoning {
            self.set_behavior(BehaviorMode::Idle);
        }
        self.apply_behavior_visual(state);
        self.presentation.set_autonomous_enabled(true);
        self.arm_auto_dismiss(now);
    }
}

fn enter_hidden(core: &mut DirectorCore, _transition: Transition) {
    core.auto_dismiss_at = None;
    core.gaze.stop_tracking();
    core.presentation.set_autonomous_enabled(false);
    core.presentation.hide();
    core.rearm_idle();
    core.silent_presence = false;
    core.audio_forced_visible = false;
    core.set_behavior(BehaviorMode::Busy);
}

fn enter_peeking(core: &mut DirectorCore, _transition: Transition) {
    core.appear(EntityState::Peeking);
}

fn enter_engaged(core: &mut DirectorCore, _transition: Transition) {
    core.appear(EntityState::Engaged);
}

fn enter_fleeing(core: &mut DirectorCore, _transition: Transition) {
    core.auto_dismiss_at = None;
    core.gaze.stop_tracking();
    core.presentation.set_autonomous_enabled(false);
    core.set_behavior(BehaviorMode::Busy);
    core.presentation.set_state_by_name(FLEEING_VISUAL, true);

    match core.engine.select_panic(local_now()) {
        Some(script) => {
            core.audio
                .play_script(&script, Some(AudioPriority::Critical), true);
        }
        None => {
            core.audio.interrupt(true, true);
        }
    }

    if !core.presentation.flee() {
        core.follow_up = Some(EntityState::Hidden);
    }
}

fn stop_auto_dismiss(core: &mut DirectorCore, _transition: Transition) {
    core.auto_dismiss_at = None;
}

pub struct Director {
    fsm: StateMachine<DirectorCore>,
    core: DirectorCore,
}

impl Director {
    pub fn new(
        settings: DirectorSettings,
        library: ScriptLibrary,
        audio: AudioManager,
        collaborators: Collaborators,
        events: Sender<DirectorEvent>,
    ) -> Self {
        let mut entropy = EntropyEngine::new();
        let engine = ScriptEngine::with_rng(
            library.idle_scripts().to_vec(),
            library.panic_scripts().to_vec(),
            entropy.fork(),
        );
        let Collaborators {
            presentation,
            entrance,
            fullscreen,
            gaze,
            idle,
            text,
        } = collaborators;

        let mut fsm = StateMachine::new(EntityState::Hidden);
        fsm.on_enter(EntityState::Hidden, enter_hidden);
        fsm.on_enter(EntityState::Peeking, enter_peeking);
        fsm.on_enter(EntityState::Engaged, enter_engaged);
        fsm.on_exit(EntityState::Engaged, stop_auto_dismiss);
        fsm.on_enter(EntityState::Fleeing, enter_fleeing);
        fsm.on_exit(EntityState::Fleeing, stop_auto_dismiss);

        let camera_enabled = settings.camera_enabled;
        let mut core = DirectorCore {
            settings,
            presentation,
            entrance_player: entrance,
            fullscreen,
            gaze,
            idle,
            text,
            audio,
            library,
            engine,
            entropy,
            presence: PresenceDetector::new(),
            mood: MoodSystem::default(),
            resources: ResourceScheduler::new(),
            expression: ExpressionVoter::default(),
            events,
            behavior: BehaviorMode::Busy,
            camera_enabled,
            latest_idle_ms: 0,
            latest_gaze: GazeSnapshot::absent(),
            silent_presence: false,
            pending_script: None,
            entrance_deadline: None,
            entrance_voiced: false,
            audio_output_active: false,
            audio_forced_visible: false,
            media_reported: false,
            auto_dismiss_at: None,
            next_mood_decay: Instant::now() + DECAY_INTERVAL,
            active_edge: Edge::Right,
            active_y: 0,
            commentary_session: 0,
            follow_up: None,
        };
        core.rearm_idle();

        Self { fsm, core }
    }

    pub fn state(&self) -> EntityState {
        self.fsm.state()
    }

    pub fn mood(&self) -> f32 {
        self.core.mood.value()
    }

    pub fn mood_label(&self) -> &'static str {
        self.core.mood.label()
    }

    /// Last explicitly set mode.
    pub fn behavior_mode(&self) -> BehaviorMode {
        self.core.behavior
    }

    /// Mode currently driving visuals.
    pub fn effective_behavior_mode(&self) -> BehaviorMode {
        self.core.effective_behavior()
    }

    pub fn audio(&self) -> &AudioManager {
        &self.core.audio
    }

    pub fn library(&self) -> &ScriptLibrary {
        &self.core.library
    }

    pub fn camera_enabled(&self) -> bool {
        self.core.camera_enabled
    }

    pub fn is_entrance_playing(&self) -> bool {
        self.core.entrance_playing()
    }

    pub fn auto_dismiss_deadline(&self) -> Option<Instant> {
        self.core.auto_dismiss_at
    }

    pub fn edge_and_y(&self) -> (Edge, i32) {
        (self.core.active_edge, self.core.active_y)
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.fsm.subscribe(listener);
    }

    /// Use this line on the next appearance instead of selecting one.
    pub fn queue_script(&mut self, script: Script) {
        self.core.pending_script = Some(script);
    }

    pub fn on_idle_time(&mut self, idle_ms: u64) {
        self.core.latest_idle_ms = idle_ms;
    }

    pub fn on_gaze(&mut self, gaze: GazeSnapshot, now: Instant) {
        let visible = matches!(self.state(), EntityState::Peeking | EntityState::Engaged);
        if visible && self.core.effective_behavior() == BehaviorMode::Idle {
            if let Some(expression) = self.core.expression.observe(&gaze, now) {
                self.core
                    .presentation
                    .set_state_by_name(expression.visual(), false);
            }
        }
        self.core.latest_gaze = gaze;
    }

    pub fn on_user_idle(&mut self) {
        if self.core.entrance_playing() || self.state() != EntityState::Hidden {
            return;
        }
        if self.core.fullscreen_suppressed() {
            log_debug("idle appearance skipped: fullscreen app in front");
            self.core.rearm_idle();
            return;
        }

        let core = &mut self.core;
        let gaze = core.camera_enabled.then_some(&core.latest_gaze);
        let presence = core.presence.determine_presence(core.latest_idle_ms, gaze);
        tracing::debug!(presence = presence.label(), idle_ms = core.latest_idle_ms, "idle confirmed");
        match presence {
            PresenceState::PresentActive | PresenceState::Absent => {
                core.set_behavior(BehaviorMode::Busy);
                core.rearm_idle();
            }
            PresenceState::PresentPassive | PresenceState::Unknown => {
                core.silent_presence = presence == PresenceState::PresentPassive;
                core.set_behavior(BehaviorMode::Idle);
                self.transition(EntityState::Engaged);
            }
        }
    }

    pub fn on_user_active(&mut self) {
        self.core.set_behavior(BehaviorMode::Busy);
        let state = self.state();
        self.core.apply_behavior_visual(state);
        match state {
            EntityState::Peeking | EntityState::Engaged => {
                self.core.mood.on_dismissed();
                self.transition(EntityState::Fleeing);
            }
            _ => self.core.idle.reset_to_standby(),
        }
    }

    /// Appear now regardless of idle time.
    pub fn summon_now(&mut self) -> bool {
        let state = self.state();
        if state == EntityState::Fleeing {
            return false;
        }
        self.core.set_behavior(BehaviorMode::Summoning);
        match state {
            EntityState::Hidden => {
                if self.try_start_entrance() {
                    return true;
                }
                self.core.silent_presence = false;
                self.transition(EntityState::Engaged)
            }
            EntityState::Peeking => self.transition(EntityState::Engaged),
            EntityState::Engaged => {
                self.core.arm_auto_dismiss(Instant::now());
                true
            }
            EntityState::Fleeing => false,
        }
    }

    pub fn toggle_visibility(&mut self) {
        match self.state() {
            EntityState::Hidden => {
                self.summon_now();
            }
            EntityState::Peeking | EntityState::Engaged => self.on_user_active(),
            EntityState::Fleeing => {}
        }
    }

    pub fn on_entrance_finished(&mut self) {
        if !self.core.entrance_playing() {
            return;
        }
        log_debug("scripted entrance finished");
        self.complete_entrance();
    }

    pub fn on_flee_completed(&mut self) {
        if self.state() == EntityState::Fleeing {
            self.transition(EntityState::Hidden);
        }
    }

    /// External audio started (music, video). Our own playback is filtered out.
    pub fn on_media_started(&mut self) {
        if !self.core.settings.audio_output_reactive {
            return;
        }
        self.core.media_reported = true;
        if self.core.audio.is_playing() {
            log_debug("ignoring audio output from our own playback");
            return;
        }
        if self.state() == EntityState::Hidden {
            self.core.audio_forced_visible = self.summon_now();
        }
        self.core.audio_output_active = true;
        self.core.set_behavior(BehaviorMode::MediaPlaying);
        let state = self.state();
        self.core.apply_behavior_visual(state);
    }

    pub fn on_media_stopped(&mut self) {
        if !self.core.settings.audio_output_reactive {
            return;
        }
        self.core.media_reported = false;
        if self.core.audio.is_playing() {
            return;
        }
        self.core.audio_output_active = false;
        let state = self.state();
        let forced = std::mem::take(&mut self.core.audio_forced_visible);
        if forced && matches!(state, EntityState::Peeking | EntityState::Engaged) {
            self.transition(EntityState::Hidden);
            return;
        }
        if self.core.behavior == BehaviorMode::Summoning {
            return;
        }
        let mode = if state == EntityState::Hidden {
            BehaviorMode::Busy
        } else {
            BehaviorMode::Idle
        };
        self.core.set_behavior(mode);
        self.core.apply_behavior_visual(state);
    }

    /// Our own playback started or stopped. Whether it is playing is read from the
    /// audio manager. A start masks external media; once we go quiet, the last media
    /// report that arrived meanwhile is applied.
    pub fn on_playback_signal(&mut self, signal: &PlaybackSignal) {
        match signal {
            PlaybackSignal::Started(_) => {
                if self.core.audio_output_active {
                    self.core.audio_output_active = false;
                    if self.core.behavior == BehaviorMode::MediaPlaying {
                        let state = self.state();
                        let mode = if state == EntityState::Hidden {
                            BehaviorMode::Busy
                        } else {
                            BehaviorMode::Idle
                        };
                        self.core.set_behavior(mode);
                        self.core.apply_behavior_visual(state);
                    }
                }
            }
            PlaybackSignal::Idle => {
                if self.core.audio.is_playing() {
                    return;
                }
                if self.core.media_reported && !self.core.audio_output_active {
                    self.on_media_started();
                } else if !self.core.media_reported && self.core.audio_forced_visible {
                    self.on_media_stopped();
                }
            }
        }
    }

    /// The camera failed; stay camera-less for the rest of the session.
    pub fn on_camera_error(&mut self, message: &str) {
        log_debug(&format!("camera disabled: {message}"));
        tracing::warn!(error = message, "camera error");
        self.core.camera_enabled = false;
        self.core.gaze.stop_tracking();
        self.core.latest_gaze = GazeSnapshot::absent();
        self.core.expression.reset();
    }

    /// Comment on what is on screen. The reply arrives later as `CommentaryReady`.
    pub fn request_commentary(&mut self, screen_text: String) -> u64 {
        let now = Instant::now();
        let core = &mut self.core;
        core.mood.on_engaged();
        core.presentation.set_state_by_name(THINKING_VISUAL, false);
        core.commentary_session += 1;
        let session = core.commentary_session;

        let fullscreen = core.fullscreen_suppressed();
        if !core.resources.resolve_plan(fullscreen, true, now).llm_running {
            log_debug("commentary skipped: text generation paused by resource plan");
            core.audio
                .speak(POWER_SAVE_LINE, AudioPriority::High, None, false);
            core.presentation.set_state_by_name(RESTING_VISUAL, false);
            return session;
        }

        core.audio.interrupt(true, true);
        core.audio
            .speak(COMMENTARY_PREAMBLE, AudioPriority::High, None, false);

        let backend = Arc::clone(&core.text);
        let events = core.events.clone();
        let mood = core.mood.value();
        thread::spawn(move || {
            let result = {
                let mut backend = lock_or_recover(&backend, "commentary backend");
                backend
                    .generate(&TextPrompt {
                        screen_text: &screen_text,
                        mood,
                    })
                    .map_err(|err| format!("{err:#}"))
            };
            let _ = events.send(DirectorEvent::CommentaryReady { session, result });
        });
        session
    }

    pub fn on_commentary_ready(&mut self, session: u64, result: Result<String, String>) {
        if session != self.core.commentary_session {
            log_debug(&format!("dropping commentary from superseded session {session}"));
            return;
        }
        let core = &mut self.core;
        core.presentation.set_state_by_name(RESTING_VISUAL, false);
        let reply = match result {
            Ok(text) => truncate_chars(text.trim(), MAX_COMMENTARY_CHARS).to_string(),
            Err(err) => {
                log_debug(&format!("commentary failed: {err}"));
                String::new()
            }
        };
        if reply.is_empty() {
            core.audio
                .speak(COMMENTARY_APOLOGY, AudioPriority::High, None, false);
            return;
        }
        log_debug_content(&format!("commentary: {reply}"));
        for chunk in chunk_text(&reply) {
            core.audio.speak(&chunk, AudioPriority::High, None, false);
        }
    }

    pub fn switch_character(&mut self, library: ScriptLibrary, voice: Option<&str>) {
        tracing::info!(character = library.name(), "switching character");
        self.core.engine.refresh(
            library.idle_scripts().to_vec(),
            library.panic_scripts().to_vec(),
        );
        self.core.library = library;
        if let Some(voice) = voice {
            self.core.audio.set_voice(voice);
        }
        self.core.pending_script = None;
        if self.state() == EntityState::Engaged {
            if let Some(script) = self.core.select_idle_script() {
                self.core.set_visual_from_script(&script);
            }
        }
    }

    pub fn status_summary(&self) -> String {
        let core = &self.core;
        format!(
            "mode: {} | visible: {} | media: {} | mood: {} ({:.2}) | camera: {} | character: {} | state: {}",
            core.effective_behavior().label(),
            if self.state().is_visible() { "yes" } else { "no" },
            if core.audio_output_active {
                "playing"
            } else {
                "quiet"
            },
            core.mood.label(),
            core.mood.value(),
            if core.camera_enabled { "on" } else { "off" },
            core.library.name(),
            self.state(),
        )
    }

    /// Fire due timers: entrance timeout, auto-dismiss, hourly mood decay.
    pub fn tick(&mut self, now: Instant) {
        if self.core.entrance_deadline.is_some_and(|deadline| now >= deadline) {
            log_debug("scripted entrance timed out; forcing completion");
            tracing::warn!("scripted entrance timed out");
            self.core.entrance_player.cancel();
            self.complete_entrance();
        }

        if self.core.auto_dismiss_at.is_some_and(|at| now >= at) {
            self.core.auto_dismiss_at = None;
            if self.state() == EntityState::Engaged {
                tracing::info!("auto-dismiss timer fired");
                self.core.mood.on_dismissed();
                self.core.audio.interrupt(true, true);
                self.transition(EntityState::Hidden);
            }
        }

        if now >= self.core.next_mood_decay {
            self.core.mood.decay();
            self.core.next_mood_decay = now + DECAY_INTERVAL;
        }
    }

    /// Earliest pending timer, for callers that want to sleep precisely.
    pub fn next_deadline(&self) -> Instant {
        [self.core.entrance_deadline, self.core.auto_dismiss_at]
            .into_iter()
            .flatten()
            .fold(self.core.next_mood_decay, Instant::min)
    }

    /// Dispatch one event. Returns `false` once the director has shut down.
    pub fn handle_event(&mut self, event: DirectorEvent) -> bool {
        match event {
            DirectorEvent::UserIdleConfirmed => self.on_user_idle(),
            DirectorEvent::UserActiveDetected => self.on_user_active(),
            DirectorEvent::Summon => {
                self.summon_now();
            }
            DirectorEvent::ToggleVisibility => self.toggle_visibility(),
            DirectorEvent::EntranceFinished => self.on_entrance_finished(),
            DirectorEvent::FleeCompleted => self.on_flee_completed(),
            DirectorEvent::MediaStarted => self.on_media_started(),
            DirectorEvent::MediaStopped => self.on_media_stopped(),
            DirectorEvent::CameraError(message) => self.on_camera_error(&message),
            DirectorEvent::RequestCommentary(text) => {
                self.request_commentary(text);
            }
            DirectorEvent::CommentaryReady { session, result } => {
                self.on_commentary_ready(session, result)
            }
            DirectorEvent::SwitchCharacter { root, voice } => {
                let library = ScriptLibrary::load(&root);
                self.switch_character(library, voice.as_deref());
            }
            DirectorEvent::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    pub fn shutdown(&mut self) {
        let core = &mut self.core;
        if core.entrance_deadline.take().is_some() {
            core.entrance_player.cancel();
        }
        core.auto_dismiss_at = None;
        core.commentary_session += 1;
        core.gaze.stop_tracking();
        core.presentation.set_autonomous_enabled(false);
        core.audio.shutdown();
        log_debug("director shut down");
    }

    fn transition(&mut self, next: EntityState) -> bool {
        let moved = self.fsm.transition_to(&mut self.core, next);
        while let Some(follow_up) = self.core.follow_up.take() {
            self.fsm.transition_to(&mut self.core, follow_up);
        }
        moved
    }

    fn try_start_entrance(&mut self) -> bool {
        if self.core.entrance_playing() {
            return true;
        }
        let run = match self.core.entrance_player.start() {
            Ok(Some(run)) => run,
            Ok(None) => {
                log_debug("no scripted entrance available; summoning directly");
                return false;
            }
            Err(err) => {
                log_debug(&format!("scripted entrance failed to start: {err:#}"));
                self.core.entrance_player.cancel();
                return false;
            }
        };

        let core = &mut self.core;
        core.presentation.hide();
        core.auto_dismiss_at = None;
        core.presentation.set_autonomous_enabled(false);
        core.silent_presence = false;
        core.set_behavior(BehaviorMode::Summoning);
        let timeout = ENTRANCE_MIN_TIMEOUT.max(run.duration + ENTRANCE_GRACE);
        core.entrance_deadline = Some(Instant::now() + timeout);
        tracing::info!(
            duration_ms = run.duration.as_millis() as u64,
            timeout_ms = timeout.as_millis() as u64,
            "scripted entrance started"
        );
        true
    }

    fn complete_entrance(&mut self) {
        self.core.entrance_deadline = None;
        self.core.set_behavior(BehaviorMode::Summoning);
        match self.state() {
            EntityState::Fleeing => {}
            EntityState::Hidden | EntityState::Peeking => {
                self.core.entrance_voiced = true;
                self.transition(EntityState::Engaged);
                self.core.entrance_voiced = false;
            }
            EntityState::Engaged => {
                self.core.apply_behavior_visual(EntityState::Engaged);
                self.core.presentation.set_autonomous_enabled(true);
                self.core.arm_auto_dismiss(Instant::now());
            }
        }
    }
}

impl Drop for Director {
    fn drop(&mut self) {
        self.core.audio.shutdown();
    }
}
