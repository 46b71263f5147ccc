//! Priority-scheduled speech: cache-first clip resolution, one synthesis worker,
//! and token-based cancellation.
//!
//! All scheduler state (live token, sequence counter, pending heap, current clip)
//! sits behind a single mutex that each public operation takes exactly once.
//! Results from the worker and the playback sink come back as [`AudioEvent`]s on a
//! channel; the owner's event loop feeds them to [`AudioManager::handle_event`].
//! Every start or stop of playback, whichever call caused it, is also published on
//! [`AudioManager::playback_signals`].

mod backend;
mod cache;
mod priority;
mod queue;
#[cfg(test)]
mod tests;
mod worker;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

pub use backend::{
    AudioSink, CommandSink, CommandSpeechBackend, NullSink, NullSpeechBackend, PlaybackDone,
    SpeechBackend, SynthesisRequest, DEFAULT_SYNTHESIS_TIMEOUT,
};
pub use cache::{cache_key, VoiceCache};
pub use priority::AudioPriority;
pub use queue::{PlaybackItem, PlaybackQueue};

use crate::error::CompanionError;
use crate::script::Script;
use crate::{lock_or_recover, log_debug, log_debug_content};
use worker::{spawn_worker, SpeechTask, WorkerMessage};

#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub voice: String,
    pub rate: String,
    pub cache_enabled: bool,
    pub cache_dir: PathBuf,
}

/// A clip ready to play, tagged with the token it was requested under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyClip {
    pub path: PathBuf,
    pub priority: AudioPriority,
    pub interrupt: bool,
    pub token: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    Ready(ReadyClip),
    PlaybackFinished { id: u64 },
}

/// What the owner should know after the scheduler reacted to something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    Started(PathBuf),
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    EmptyText,
    /// Low-priority speech while something is audible or queued.
    Busy,
    NoBackend,
    ShuttingDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Served from a pre-rendered or cached clip; already playing or queued.
    Resolved(PathBuf),
    /// Handed to the synthesis worker.
    Synthesizing { token: u64, seq: u64 },
    Dropped(DropReason),
}

impl SpeakOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, SpeakOutcome::Dropped(_))
    }
}

#[derive(Debug, Clone)]
struct CurrentClip {
    id: u64,
    path: PathBuf,
}

struct SchedulerState {
    token: u64,
    seq: u64,
    next_playback_id: u64,
    heap: PlaybackQueue,
    current: Option<CurrentClip>,
    sink: Box<dyn AudioSink>,
    voice: String,
    rate: String,
    cache: VoiceCache,
    running: bool,
}

pub struct AudioManager {
    state: Arc<Mutex<SchedulerState>>,
    worker_tx: Option<Sender<WorkerMessage>>,
    worker: Option<JoinHandle<()>>,
    events_tx: Sender<AudioEvent>,
    events_rx: Receiver<AudioEvent>,
    signals_tx: Sender<PlaybackSignal>,
    signals_rx: Receiver<PlaybackSignal>,
    backend_name: String,
}

impl AudioManager {
    pub fn new(
        settings: AudioSettings,
        backend: Box<dyn SpeechBackend>,
        sink: Box<dyn AudioSink>,
    ) -> Self {
        let cache = VoiceCache::new(settings.cache_dir, settings.cache_enabled);
        if let Err(err) = cache.ensure_dir() {
            log_debug(&format!(
                "voice cache dir {} unavailable: {err}",
                cache.dir().display()
            ));
        }
        let (events_tx, events_rx) = unbounded();
        let (signals_tx, signals_rx) = unbounded();
        let backend_name = backend.name().to_string();
        let (worker_tx, worker) = if backend.is_available() {
            let (tx, rx) = unbounded();
            match spawn_worker(backend, rx, events_tx.clone()) {
                Ok(handle) => (Some(tx), Some(handle)),
                Err(err) => {
                    log_debug(&format!("speech worker failed to start: {err}"));
                    (None, None)
                }
            }
        } else {
            log_debug("no speech backend; only pre-rendered and cached clips will play");
            (None, None)
        };

        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                token: 0,
                seq: 0,
                next_playback_id: 0,
                heap: PlaybackQueue::default(),
                current: None,
                sink,
                voice: settings.voice,
                rate: settings.rate,
                cache,
                running: true,
            })),
            worker_tx,
            worker,
            events_tx,
            events_rx,
            signals_tx,
            signals_rx,
            backend_name,
        }
    }

    /// Receiver for worker results and playback completions.
    pub fn events(&self) -> Receiver<AudioEvent> {
        self.events_rx.clone()
    }

    /// Ordered start/idle transitions of our own playback.
    pub fn playback_signals(&self) -> Receiver<PlaybackSignal> {
        self.signals_rx.clone()
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn can_synthesize(&self) -> bool {
        self.worker_tx.is_some()
    }

    /// Speak a line. Low-priority requests are dropped while anything is audible or queued;
    /// critical or interrupting requests cut off everything before them.
    pub fn speak(
        &self,
        text: &str,
        priority: AudioPriority,
        cached_path: Option<&Path>,
        interrupt: bool,
    ) -> SpeakOutcome {
        let mut state = lock_or_recover(&self.state, "audio speak");
        if priority == AudioPriority::Low && (state.current.is_some() || !state.heap.is_empty()) {
            log_debug(&format!("speech dropped: {}", CompanionError::ResourceContention));
            tracing::debug!(priority = %priority, "low-priority speech dropped");
            return SpeakOutcome::Dropped(DropReason::Busy);
        }
        self.enqueue_locked(&mut state, text, priority, cached_path, interrupt)
    }

    /// Queue a script's line at its own priority unless overridden. Not subject to the
    /// low-priority busy drop.
    pub fn play_script(
        &self,
        script: &Script,
        priority: Option<AudioPriority>,
        interrupt: bool,
    ) -> SpeakOutcome {
        let priority =
            priority.unwrap_or_else(|| AudioPriority::from_level(i64::from(script.priority)));
        let mut state = lock_or_recover(&self.state, "audio play script");
        self.enqueue_locked(
            &mut state,
            &script.text,
            priority,
            script.audio_path.as_deref(),
            interrupt,
        )
    }

    /// Stop what is playing; optionally drop queued clips and invalidate in-flight synthesis.
    pub fn interrupt(&self, clear_playback: bool, clear_tts: bool) -> PlaybackSignal {
        let mut state = lock_or_recover(&self.state, "audio interrupt");
        self.interrupt_locked(&mut state, clear_playback, clear_tts);
        PlaybackSignal::Idle
    }

    /// Feed back an event from [`AudioManager::events`].
    pub fn handle_event(&self, event: AudioEvent) -> Option<PlaybackSignal> {
        let mut state = lock_or_recover(&self.state, "audio event");
        match event {
            AudioEvent::Ready(clip) => self.deliver_locked(&mut state, clip),
            AudioEvent::PlaybackFinished { id } => {
                match &state.current {
                    Some(current) if current.id == id => {}
                    // A clip we already stopped or replaced.
                    _ => return None,
                }
                state.current = None;
                Some(self.play_next_locked(&mut state))
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        lock_or_recover(&self.state, "audio is playing")
            .current
            .is_some()
    }

    pub fn current_clip(&self) -> Option<PathBuf> {
        lock_or_recover(&self.state, "audio current clip")
            .current
            .as_ref()
            .map(|clip| clip.path.clone())
    }

    pub fn pending_len(&self) -> usize {
        lock_or_recover(&self.state, "audio pending").heap.len()
    }

    pub fn current_token(&self) -> u64 {
        lock_or_recover(&self.state, "audio token").token
    }

    pub fn voice(&self) -> String {
        lock_or_recover(&self.state, "audio voice").voice.clone()
    }

    pub fn set_voice(&self, voice: &str) {
        let voice = voice.trim();
        if !voice.is_empty() {
            lock_or_recover(&self.state, "audio set voice").voice = voice.to_string();
        }
    }

    pub fn set_rate(&self, rate: &str) {
        let rate = rate.trim();
        if !rate.is_empty() {
            lock_or_recover(&self.state, "audio set rate").rate = rate.to_string();
        }
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        lock_or_recover(&self.state, "audio set cache")
            .cache
            .set_enabled(enabled);
    }

    /// Path a line would be cached under with the current voice settings.
    pub fn cache_path_for(&self, text: &str) -> PathBuf {
        let state = lock_or_recover(&self.state, "audio cache path");
        state.cache.path_for(&state.voice, &state.rate, text.trim())
    }

    /// Stop playback, invalidate outstanding work and join the worker.
    pub fn shutdown(&mut self) {
        {
            let mut state = lock_or_recover(&self.state, "audio shutdown");
            if !state.running {
                return;
            }
            state.running = false;
            self.interrupt_locked(&mut state, true, true);
        }
        if let Some(tx) = self.worker_tx.take() {
            let _ = tx.send(WorkerMessage::Stop);
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    fn enqueue_locked(
        &self,
        state: &mut SchedulerState,
        text: &str,
        priority: AudioPriority,
        cached_path: Option<&Path>,
        interrupt: bool,
    ) -> SpeakOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SpeakOutcome::Dropped(DropReason::EmptyText);
        }
        if !state.running {
            return SpeakOutcome::Dropped(DropReason::ShuttingDown);
        }
        let interrupt = interrupt || priority == AudioPriority::Critical;
        if interrupt {
            self.interrupt_locked(state, true, true);
        }

        state.seq += 1;
        let seq = state.seq;
        let token = state.token;
        log_debug_content(&format!("speak [{priority}] seq {seq}: {text}"));
        tracing::debug!(priority = %priority, seq, token, interrupt, "speech queued");

        let resolved = cached_path
            .filter(|path| path.is_file())
            .map(Path::to_path_buf)
            .or_else(|| state.cache.lookup(&state.voice, &state.rate, text));
        if let Some(path) = resolved {
            self.deliver_locked(
                state,
                ReadyClip {
                    path: path.clone(),
                    priority,
                    interrupt,
                    token,
                    seq,
                },
            );
            return SpeakOutcome::Resolved(path);
        }

        let Some(tx) = self.worker_tx.as_ref() else {
            return SpeakOutcome::Dropped(DropReason::NoBackend);
        };
        let task = SpeechTask {
            text: text.to_string(),
            priority,
            interrupt,
            token,
            seq,
            target: state.cache.path_for(&state.voice, &state.rate, text),
            voice: state.voice.clone(),
            rate: state.rate.clone(),
            cache_enabled: state.cache.enabled(),
        };
        if tx.send(WorkerMessage::Task(task)).is_err() {
            return SpeakOutcome::Dropped(DropReason::ShuttingDown);
        }
        SpeakOutcome::Synthesizing { token, seq }
    }

    fn publish(&self, signal: &PlaybackSignal) {
        let _ = self.signals_tx.send(signal.clone());
    }

    fn interrupt_locked(&self, state: &mut SchedulerState, clear_playback: bool, clear_tts: bool) {
        state.sink.stop();
        if state.current.take().is_some() {
            self.publish(&PlaybackSignal::Idle);
        }
        if clear_playback {
            state.heap.clear();
        }
        if clear_tts {
            state.token += 1;
            if let Some(tx) = self.worker_tx.as_ref() {
                let _ = tx.send(WorkerMessage::Invalidate(state.token));
            }
        }
        tracing::debug!(token = state.token, clear_playback, clear_tts, "audio interrupted");
    }

    fn deliver_locked(&self, state: &mut SchedulerState, clip: ReadyClip) -> Option<PlaybackSignal> {
        if clip.token != state.token {
            log_debug(&format!(
                "discarding clip seq {}: {}",
                clip.seq,
                CompanionError::StaleResult {
                    token: clip.token,
                    live: state.token
                }
            ));
            return None;
        }
        if !clip.path.is_file() {
            return None;
        }
        if clip.interrupt || clip.priority == AudioPriority::Critical {
            state.sink.stop();
            state.current = None;
            state.heap.clear();
            return Some(self.start_locked(state, clip.path));
        }
        if state.current.is_some() {
            state.heap.push(PlaybackItem {
                priority: clip.priority,
                seq: clip.seq,
                token: clip.token,
                path: clip.path,
            });
            return None;
        }
        Some(self.start_locked(state, clip.path))
    }

    fn play_next_locked(&self, state: &mut SchedulerState) -> PlaybackSignal {
        let live = state.token;
        match state.heap.pop_live(live) {
            Some(item) => self.start_locked(state, item.path),
            None => {
                self.publish(&PlaybackSignal::Idle);
                PlaybackSignal::Idle
            }
        }
    }

    fn start_locked(&self, state: &mut SchedulerState, path: PathBuf) -> PlaybackSignal {
        let mut next = Some(path);
        while let Some(path) = next.take() {
            state.sink.stop();
            state.next_playback_id += 1;
            let id = state.next_playback_id;
            state.current = Some(CurrentClip {
                id,
                path: path.clone(),
            });
            let done = PlaybackDone::new(id, self.events_tx.clone());
            match state.sink.play(&path, done) {
                Ok(()) => {
                    tracing::debug!(id, path = %path.display(), "playback started");
                    let signal = PlaybackSignal::Started(path);
                    self.publish(&signal);
                    return signal;
                }
                Err(err) => {
                    log_debug(&format!("playback of {} failed: {err:#}", path.display()));
                    state.current = None;
                    let live = state.token;
                    next = state.heap.pop_live(live).map(|item| item.path);
                }
            }
        }
        self.publish(&PlaybackSignal::Idle);
        PlaybackSignal::Idle
    }
}

impl Drop for AudioManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
