use super::*;
use anyhow::Result;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

const EVENT_WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct SinkLog {
    played: Vec<PathBuf>,
    pending: Vec<PlaybackDone>,
    stops: usize,
}

#[derive(Clone, Default)]
struct RecordingSink {
    log: Arc<Mutex<SinkLog>>,
}

impl RecordingSink {
    fn played(&self) -> Vec<PathBuf> {
        self.log.lock().unwrap().played.clone()
    }

    fn stops(&self) -> usize {
        self.log.lock().unwrap().stops
    }

    /// Id of the most recent playback handle.
    fn last_id(&self) -> u64 {
        self.log.lock().unwrap().pending.last().unwrap().id()
    }
}

impl AudioSink for RecordingSink {
    fn play(&mut self, path: &Path, done: PlaybackDone) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.played.push(path.to_path_buf());
        log.pending.push(done);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().stops += 1;
    }
}

struct FileBackend {
    calls: Arc<AtomicUsize>,
    gate: Option<(Sender<()>, Receiver<()>)>,
}

impl SpeechBackend for FileBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<()> {
        if let Some((started, release)) = &self.gate {
            let _ = started.send(());
            let _ = release.recv_timeout(EVENT_WAIT);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        fs::write(request.target, request.text.as_bytes())?;
        Ok(())
    }
}

/// Records the order lines reach the backend; every call waits for a release.
struct OrderedBackend {
    texts: Arc<Mutex<Vec<String>>>,
    started: Sender<()>,
    release: Receiver<()>,
}

impl SpeechBackend for OrderedBackend {
    fn name(&self) -> &str {
        "ordered"
    }

    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<()> {
        let _ = self.started.send(());
        let _ = self.release.recv_timeout(EVENT_WAIT);
        self.texts.lock().unwrap().push(request.text.to_string());
        fs::write(request.target, request.text.as_bytes())?;
        Ok(())
    }
}

fn settings(dir: &TempDir) -> AudioSettings {
    AudioSettings {
        voice: "test-voice".to_string(),
        rate: "+0%".to_string(),
        cache_enabled: true,
        cache_dir: dir.path().join("cache"),
    }
}

fn clip(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, name.as_bytes()).unwrap();
    path
}

fn manager_without_backend(dir: &TempDir) -> (AudioManager, RecordingSink) {
    let sink = RecordingSink::default();
    let manager = AudioManager::new(
        settings(dir),
        Box::new(NullSpeechBackend),
        Box::new(sink.clone()),
    );
    (manager, sink)
}

fn finish_current(manager: &AudioManager, sink: &RecordingSink) -> Option<PlaybackSignal> {
    manager.handle_event(AudioEvent::PlaybackFinished { id: sink.last_id() })
}

#[test]
fn queued_clips_play_by_priority_then_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, sink) = manager_without_backend(&dir);
    let a = clip(&dir, "a.mp3");
    let b = clip(&dir, "b.mp3");
    let c = clip(&dir, "c.mp3");
    let d = clip(&dir, "d.mp3");

    assert_eq!(
        manager.speak("a", AudioPriority::Normal, Some(&a), false),
        SpeakOutcome::Resolved(a.clone())
    );
    manager.speak("b", AudioPriority::Normal, Some(&b), false);
    manager.speak("c", AudioPriority::High, Some(&c), false);
    manager.speak("d", AudioPriority::Normal, Some(&d), false);
    assert_eq!(manager.pending_len(), 3);

    assert_eq!(
        finish_current(&manager, &sink),
        Some(PlaybackSignal::Started(c.clone()))
    );
    assert_eq!(
        finish_current(&manager, &sink),
        Some(PlaybackSignal::Started(b.clone()))
    );
    assert_eq!(
        finish_current(&manager, &sink),
        Some(PlaybackSignal::Started(d.clone()))
    );
    assert_eq!(finish_current(&manager, &sink), Some(PlaybackSignal::Idle));
    assert_eq!(sink.played(), vec![a, c, b, d]);
    assert!(!manager.is_playing());
}

#[test]
fn low_priority_is_dropped_while_busy() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, sink) = manager_without_backend(&dir);
    let a = clip(&dir, "a.mp3");
    let b = clip(&dir, "b.mp3");

    manager.speak("a", AudioPriority::Normal, Some(&a), false);
    assert_eq!(
        manager.speak("b", AudioPriority::Low, Some(&b), false),
        SpeakOutcome::Dropped(DropReason::Busy)
    );
    assert_eq!(manager.pending_len(), 0);

    finish_current(&manager, &sink);
    assert_eq!(
        manager.speak("b", AudioPriority::Low, Some(&b), false),
        SpeakOutcome::Resolved(b)
    );
}

#[test]
fn script_playback_ignores_the_low_priority_drop() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _sink) = manager_without_backend(&dir);
    let a = clip(&dir, "a.mp3");
    let b = clip(&dir, "b.mp3");
    manager.speak("a", AudioPriority::Normal, Some(&a), false);

    let script = Script::new("quiet", "b", crate::script::EventType::Idle).with_audio(b.clone());
    assert_eq!(
        manager.play_script(&script, Some(AudioPriority::Low), false),
        SpeakOutcome::Resolved(b)
    );
    assert_eq!(manager.pending_len(), 1);
}

#[test]
fn critical_speech_cuts_off_current_and_queued() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, sink) = manager_without_backend(&dir);
    let a = clip(&dir, "a.mp3");
    let b = clip(&dir, "b.mp3");
    let urgent = clip(&dir, "urgent.mp3");

    manager.speak("a", AudioPriority::Normal, Some(&a), false);
    manager.speak("b", AudioPriority::Normal, Some(&b), false);
    let token_before = manager.current_token();

    manager.speak("urgent", AudioPriority::Critical, Some(&urgent), false);
    assert_eq!(manager.current_clip(), Some(urgent.clone()));
    assert_eq!(manager.pending_len(), 0);
    assert!(manager.current_token() > token_before);
    assert!(sink.stops() >= 1);
    assert_eq!(finish_current(&manager, &sink), Some(PlaybackSignal::Idle));
}

#[test]
fn repeated_interrupts_leave_the_same_idle_state() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _sink) = manager_without_backend(&dir);
    let a = clip(&dir, "a.mp3");
    let b = clip(&dir, "b.mp3");
    manager.speak("a", AudioPriority::Normal, Some(&a), false);
    manager.speak("b", AudioPriority::Normal, Some(&b), false);

    assert_eq!(manager.interrupt(true, true), PlaybackSignal::Idle);
    assert_eq!(manager.interrupt(true, true), PlaybackSignal::Idle);
    assert!(!manager.is_playing());
    assert_eq!(manager.pending_len(), 0);
}

#[test]
fn finish_for_a_replaced_clip_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, sink) = manager_without_backend(&dir);
    let a = clip(&dir, "a.mp3");
    let b = clip(&dir, "b.mp3");

    manager.speak("a", AudioPriority::Normal, Some(&a), false);
    let first_id = sink.last_id();
    manager.speak("b", AudioPriority::Normal, Some(&b), true);
    assert_eq!(
        manager.handle_event(AudioEvent::PlaybackFinished { id: first_id }),
        None
    );
    assert_eq!(manager.current_clip(), Some(b));
}

#[test]
fn ready_clip_with_old_token_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, sink) = manager_without_backend(&dir);
    let a = clip(&dir, "a.mp3");
    manager.interrupt(true, true);

    let stale = AudioEvent::Ready(ReadyClip {
        path: a,
        priority: AudioPriority::High,
        interrupt: false,
        token: 0,
        seq: 1,
    });
    assert_eq!(manager.handle_event(stale), None);
    assert!(sink.played().is_empty());
}

#[test]
fn uncached_text_without_backend_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _sink) = manager_without_backend(&dir);
    assert!(!manager.can_synthesize());
    assert_eq!(
        manager.speak("hello", AudioPriority::Normal, None, false),
        SpeakOutcome::Dropped(DropReason::NoBackend)
    );
    assert_eq!(
        manager.speak("   ", AudioPriority::Normal, None, false),
        SpeakOutcome::Dropped(DropReason::EmptyText)
    );
}

#[test]
fn synthesized_clip_plays_and_is_reused_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = RecordingSink::default();
    let manager = AudioManager::new(
        settings(&dir),
        Box::new(FileBackend {
            calls: Arc::clone(&calls),
            gate: None,
        }),
        Box::new(sink.clone()),
    );
    let events = manager.events();

    let outcome = manager.speak("hello there", AudioPriority::Normal, None, false);
    assert!(matches!(outcome, SpeakOutcome::Synthesizing { token: 0, .. }));
    let event = events.recv_timeout(EVENT_WAIT).unwrap();
    let expected = manager.cache_path_for("hello there");
    assert_eq!(
        manager.handle_event(event),
        Some(PlaybackSignal::Started(expected.clone()))
    );

    assert_eq!(
        manager.speak("hello there", AudioPriority::Normal, None, false),
        SpeakOutcome::Resolved(expected)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.pending_len(), 1);
}

#[test]
fn disabled_cache_synthesizes_every_time() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut config = settings(&dir);
    config.cache_enabled = false;
    let manager = AudioManager::new(
        config,
        Box::new(FileBackend {
            calls: Arc::clone(&calls),
            gate: None,
        }),
        Box::new(RecordingSink::default()),
    );
    let events = manager.events();

    for _ in 0..2 {
        let outcome = manager.speak("again", AudioPriority::High, None, true);
        assert!(matches!(outcome, SpeakOutcome::Synthesizing { .. }));
        let event = events.recv_timeout(EVENT_WAIT).unwrap();
        assert!(matches!(
            manager.handle_event(event),
            Some(PlaybackSignal::Started(_))
        ));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn interrupt_discards_synthesis_already_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let (started_tx, started_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let sink = RecordingSink::default();
    let manager = AudioManager::new(
        settings(&dir),
        Box::new(FileBackend {
            calls: Arc::new(AtomicUsize::new(0)),
            gate: Some((started_tx, release_rx)),
        }),
        Box::new(sink.clone()),
    );
    let events = manager.events();

    manager.speak("slow line", AudioPriority::Normal, None, false);
    started_rx.recv_timeout(EVENT_WAIT).unwrap();
    manager.interrupt(true, true);
    release_tx.send(()).unwrap();

    let event = events.recv_timeout(EVENT_WAIT).unwrap();
    assert!(matches!(&event, AudioEvent::Ready(clip) if clip.token == 0));
    assert_eq!(manager.handle_event(event), None);
    assert!(sink.played().is_empty());
    assert!(!manager.is_playing());
}

#[test]
fn voice_settings_ignore_blank_values() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _sink) = manager_without_backend(&dir);
    manager.set_voice("  ");
    assert_eq!(manager.voice(), "test-voice");
    let before = manager.cache_path_for("line");
    manager.set_voice("other-voice");
    assert_eq!(manager.voice(), "other-voice");
    assert_ne!(manager.cache_path_for("line"), before);
}

#[test]
fn speech_after_shutdown_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let (mut manager, _sink) = manager_without_backend(&dir);
    let a = clip(&dir, "a.mp3");
    manager.shutdown();
    manager.shutdown();
    assert_eq!(
        manager.speak("a", AudioPriority::Normal, Some(&a), false),
        SpeakOutcome::Dropped(DropReason::ShuttingDown)
    );
}

#[test]
fn cached_interrupt_wins_over_synthesis_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let (started_tx, started_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let sink = RecordingSink::default();
    let manager = AudioManager::new(
        settings(&dir),
        Box::new(FileBackend {
            calls: Arc::new(AtomicUsize::new(0)),
            gate: Some((started_tx, release_rx)),
        }),
        Box::new(sink.clone()),
    );
    let events = manager.events();
    let b = clip(&dir, "b.mp3");

    manager.speak("slow line", AudioPriority::Normal, None, false);
    started_rx.recv_timeout(EVENT_WAIT).unwrap();
    assert_eq!(
        manager.speak("b", AudioPriority::Normal, Some(&b), true),
        SpeakOutcome::Resolved(b.clone())
    );
    assert_eq!(manager.current_clip(), Some(b.clone()));
    release_tx.send(()).unwrap();

    let event = events.recv_timeout(EVENT_WAIT).unwrap();
    assert!(matches!(&event, AudioEvent::Ready(clip) if clip.token == 0));
    assert_eq!(manager.handle_event(event), None);
    assert_eq!(manager.current_clip(), Some(b.clone()));
    assert_eq!(manager.pending_len(), 0);
    assert_eq!(sink.played(), vec![b]);
}

#[test]
fn worker_synthesizes_higher_priority_first() {
    let dir = tempfile::tempdir().unwrap();
    let texts = Arc::new(Mutex::new(Vec::new()));
    let (started_tx, started_rx) = unbounded();
    let (release_tx, release_rx) = unbounded();
    let manager = AudioManager::new(
        settings(&dir),
        Box::new(OrderedBackend {
            texts: Arc::clone(&texts),
            started: started_tx,
            release: release_rx,
        }),
        Box::new(RecordingSink::default()),
    );
    let events = manager.events();

    manager.speak("first", AudioPriority::Normal, None, false);
    started_rx.recv_timeout(EVENT_WAIT).unwrap();
    manager.speak("normal", AudioPriority::Normal, None, false);
    manager.speak("high", AudioPriority::High, None, false);
    for _ in 0..3 {
        release_tx.send(()).unwrap();
    }
    for _ in 0..3 {
        events.recv_timeout(EVENT_WAIT).unwrap();
    }

    assert_eq!(*texts.lock().unwrap(), vec!["first", "high", "normal"]);
}

#[test]
fn playback_signals_cover_every_start_and_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, sink) = manager_without_backend(&dir);
    let signals = manager.playback_signals();
    let a = clip(&dir, "a.mp3");
    let b = clip(&dir, "b.mp3");

    manager.speak("a", AudioPriority::Normal, Some(&a), false);
    assert_eq!(signals.try_recv(), Ok(PlaybackSignal::Started(a.clone())));

    manager.interrupt(true, true);
    assert_eq!(signals.try_recv(), Ok(PlaybackSignal::Idle));
    manager.interrupt(true, true);
    assert!(signals.try_recv().is_err());

    manager.speak("b", AudioPriority::Normal, Some(&b), false);
    assert_eq!(signals.try_recv(), Ok(PlaybackSignal::Started(b.clone())));
    finish_current(&manager, &sink);
    assert_eq!(signals.try_recv(), Ok(PlaybackSignal::Idle));
    assert!(!manager.is_playing());
}

#[cfg(unix)]
#[test]
fn hung_synthesizer_is_killed_at_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("slow.mp3");
    let argv = ["sh", "-c", "printf partial > \"$0\"; sleep 5", "{out}"]
        .map(String::from)
        .to_vec();
    let mut backend = CommandSpeechBackend::new(argv)
        .unwrap()
        .with_timeout(Duration::from_millis(200));
    let started = std::time::Instant::now();
    let err = backend
        .synthesize(&SynthesisRequest {
            text: "hello",
            voice: "v",
            rate: "+0%",
            target: &target,
        })
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(err.to_string().contains("timed out"), "{err:#}");
    assert!(!target.exists());
}

#[cfg(unix)]
#[test]
fn synthesizer_output_lands_at_target() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("ok.mp3");
    let argv = ["sh", "-c", "printf \"$1\" > \"$0\"", "{out}", "{text}"]
        .map(String::from)
        .to_vec();
    let mut backend = CommandSpeechBackend::new(argv).unwrap();
    backend
        .synthesize(&SynthesisRequest {
            text: "hello",
            voice: "v",
            rate: "+0%",
            target: &target,
        })
        .unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
}

#[cfg(unix)]
#[test]
fn failed_synthesizer_leaves_no_clip() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("bad.mp3");
    let argv = ["sh", "-c", "printf junk > \"$0\"; echo boom >&2; exit 3", "{out}"]
        .map(String::from)
        .to_vec();
    let mut backend = CommandSpeechBackend::new(argv).unwrap();
    let err = backend
        .synthesize(&SynthesisRequest {
            text: "hello",
            voice: "v",
            rate: "+0%",
            target: &target,
        })
        .unwrap_err();
    assert!(err.to_string().contains("boom"), "{err:#}");
    assert!(!target.exists());
}
