//! Speech synthesizers and playback sinks the audio manager drives.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::Sender;

use super::AudioEvent;
use crate::error::CompanionError;
use crate::{lock_or_recover, log_debug};

const PLAYER_POLL_MS: u64 = 25;
const SYNTHESIS_POLL_MS: u64 = 25;
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// One utterance to render into `target`.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub voice: &'a str,
    pub rate: &'a str,
    pub target: &'a Path,
}

pub trait SpeechBackend: Send {
    fn name(&self) -> &str;

    /// A backend that reports `false` is never handed work.
    fn is_available(&self) -> bool {
        true
    }

    /// Render the request into `request.target`. Errors are logged and the task dropped.
    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<()>;
}

/// Stand-in when no synthesizer is configured; only pre-rendered and cached clips play.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSpeechBackend;

impl SpeechBackend for NullSpeechBackend {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn synthesize(&mut self, _request: &SynthesisRequest<'_>) -> Result<()> {
        Err(CompanionError::MissingCollaborator("speech backend").into())
    }
}

/// Runs an external synthesizer such as `edge-tts` or `espeak-ng`.
///
/// Arguments may contain `{text}`, `{voice}`, `{rate}` and `{out}` placeholders.
/// Without an `{out}` placeholder the edge-tts flag layout is appended. A run that
/// outlives the timeout is killed so one hung synthesizer cannot stall the queue.
#[derive(Debug, Clone)]
pub struct CommandSpeechBackend {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandSpeechBackend {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            bail!("speech command is empty");
        }
        Ok(Self {
            argv,
            timeout: DEFAULT_SYNTHESIS_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn command_line(&self, request: &SynthesisRequest<'_>) -> Vec<String> {
        let target = request.target.to_string_lossy();
        let mut has_output = false;
        let mut args: Vec<String> = self
            .argv
            .iter()
            .map(|arg| {
                if arg.contains("{out}") {
                    has_output = true;
                }
                arg.replace("{text}", request.text)
                    .replace("{voice}", request.voice)
                    .replace("{rate}", request.rate)
                    .replace("{out}", &target)
            })
            .collect();
        if !has_output {
            args.extend([
                "--voice".to_string(),
                request.voice.to_string(),
                format!("--rate={}", request.rate),
                "--text".to_string(),
                request.text.to_string(),
                "--write-media".to_string(),
                target.to_string(),
            ]);
        }
        args
    }
}

impl SpeechBackend for CommandSpeechBackend {
    fn name(&self) -> &str {
        &self.argv[0]
    }

    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<()> {
        let args = self.command_line(request);
        let mut child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to launch {}", args[0]))?;
        let mut stderr = child
            .stderr
            .take()
            .with_context(|| format!("failed to capture {} stderr", args[0]))?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    // A half-written clip must not be served from the cache later.
                    let _ = fs::remove_file(request.target);
                    return Err(CompanionError::SynthesisFailure(format!(
                        "{} timed out after {}ms",
                        args[0],
                        self.timeout.as_millis()
                    ))
                    .into());
                }
                Ok(None) => thread::sleep(Duration::from_millis(SYNTHESIS_POLL_MS)),
                Err(err) => {
                    let _ = child.kill();
                    return Err(anyhow!("{} wait failed: {err}", args[0]));
                }
            }
        };

        if !status.success() {
            let mut message = String::new();
            let _ = stderr.read_to_string(&mut message);
            let _ = fs::remove_file(request.target);
            return Err(anyhow!(
                "{} exited with {}: {}",
                args[0],
                status,
                message.trim()
            ));
        }
        if !request.target.is_file() {
            bail!("{} produced no audio at {}", args[0], request.target.display());
        }
        Ok(())
    }
}

/// Completion handle for one playback; the sink calls [`PlaybackDone::finish`] when the clip ends.
#[derive(Debug)]
pub struct PlaybackDone {
    id: u64,
    tx: Sender<AudioEvent>,
}

impl PlaybackDone {
    pub(crate) fn new(id: u64, tx: Sender<AudioEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn finish(self) {
        let _ = self.tx.send(AudioEvent::PlaybackFinished { id: self.id });
    }
}

pub trait AudioSink: Send {
    /// Start playing `path`. A stopped clip must not report completion.
    fn play(&mut self, path: &Path, done: PlaybackDone) -> Result<()>;
    fn stop(&mut self);
}

/// Sink for headless runs: every clip "finishes" immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&mut self, _path: &Path, done: PlaybackDone) -> Result<()> {
        done.finish();
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Plays clips through an external player process (ffplay, mpv, afplay, ...).
pub struct CommandSink {
    argv: Vec<String>,
    current: Option<Arc<Mutex<Option<Child>>>>,
}

impl CommandSink {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            bail!("player command is empty");
        }
        Ok(Self {
            argv,
            current: None,
        })
    }

    fn command_line(&self, path: &Path) -> Vec<String> {
        let path_text = path.to_string_lossy();
        let mut has_path = false;
        let mut args: Vec<String> = self
            .argv
            .iter()
            .map(|arg| {
                if arg.contains("{path}") {
                    has_path = true;
                }
                arg.replace("{path}", &path_text)
            })
            .collect();
        if !has_path {
            args.push(path_text.to_string());
        }
        args
    }
}

impl AudioSink for CommandSink {
    fn play(&mut self, path: &Path, done: PlaybackDone) -> Result<()> {
        self.stop();
        let args = self.command_line(path);
        let child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to launch player {}", args[0]))?;
        let slot = Arc::new(Mutex::new(Some(child)));
        self.current = Some(Arc::clone(&slot));
        thread::spawn(move || watch_player(&slot, done));
        Ok(())
    }

    fn stop(&mut self) {
        let Some(slot) = self.current.take() else {
            return;
        };
        let mut guard = lock_or_recover(&slot, "player stop");
        if let Some(mut child) = guard.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSink {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_player(slot: &Mutex<Option<Child>>, done: PlaybackDone) {
    loop {
        {
            let mut guard = lock_or_recover(slot, "player watch");
            let Some(child) = guard.as_mut() else {
                // Killed by stop(); no completion for a stopped clip.
                return;
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        log_debug(&format!("player exited with {status}"));
                    }
                    guard.take();
                    break;
                }
                Ok(None) => {}
                Err(err) => {
                    log_debug(&format!("player wait failed: {err}"));
                    guard.take();
                    break;
                }
            }
        }
        thread::sleep(Duration::from_millis(PLAYER_POLL_MS));
    }
    done.finish();
}
