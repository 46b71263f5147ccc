//! The single background thread that turns text into clips.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::backend::{SpeechBackend, SynthesisRequest};
use super::{AudioEvent, AudioPriority, ReadyClip};
use crate::{log_debug, log_debug_content};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpeechTask {
    pub(crate) text: String,
    pub(crate) priority: AudioPriority,
    pub(crate) interrupt: bool,
    pub(crate) token: u64,
    pub(crate) seq: u64,
    pub(crate) target: PathBuf,
    pub(crate) voice: String,
    pub(crate) rate: String,
    pub(crate) cache_enabled: bool,
}

impl Ord for SpeechTask {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, self.seq).cmp(&(other.priority, other.seq))
    }
}

impl PartialOrd for SpeechTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) enum WorkerMessage {
    Task(SpeechTask),
    /// Everything tagged below this token is dead.
    Invalidate(u64),
    Stop,
}

struct SynthesisWorker {
    backend: Box<dyn SpeechBackend>,
    queue: BinaryHeap<Reverse<SpeechTask>>,
    active_token: u64,
    events: Sender<AudioEvent>,
}

pub(crate) fn spawn_worker(
    backend: Box<dyn SpeechBackend>,
    rx: Receiver<WorkerMessage>,
    events: Sender<AudioEvent>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("speech-synth".to_string())
        .spawn(move || {
            let mut worker = SynthesisWorker {
                backend,
                queue: BinaryHeap::new(),
                active_token: 0,
                events,
            };
            worker.run(&rx);
        })
}

impl SynthesisWorker {
    fn run(&mut self, rx: &Receiver<WorkerMessage>) {
        loop {
            // Block only when there is nothing left to synthesize.
            if self.queue.is_empty() {
                match rx.recv() {
                    Ok(message) => {
                        if !self.apply(message) {
                            return;
                        }
                    }
                    Err(_) => return,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(message) => {
                        if !self.apply(message) {
                            return;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }
            if let Some(Reverse(task)) = self.queue.pop() {
                self.process(task);
            }
        }
    }

    /// Returns false once the worker should exit.
    fn apply(&mut self, message: WorkerMessage) -> bool {
        match message {
            WorkerMessage::Task(task) => {
                if task.token > self.active_token {
                    self.active_token = task.token;
                    self.queue.clear();
                }
                if task.token == self.active_token {
                    self.queue.push(Reverse(task));
                }
                true
            }
            WorkerMessage::Invalidate(token) => {
                if token > self.active_token {
                    self.active_token = token;
                }
                self.queue.clear();
                true
            }
            WorkerMessage::Stop => {
                self.queue.clear();
                false
            }
        }
    }

    fn process(&mut self, task: SpeechTask) {
        if task.token != self.active_token {
            return;
        }
        if task.cache_enabled && task.target.is_file() {
            self.deliver(&task);
            return;
        }
        if !task.cache_enabled && task.target.exists() {
            let _ = fs::remove_file(&task.target);
        }
        if let Some(parent) = task.target.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                log_debug(&format!("voice cache dir unavailable: {err}"));
                return;
            }
        }

        let request = SynthesisRequest {
            text: &task.text,
            voice: &task.voice,
            rate: &task.rate,
            target: &task.target,
        };
        let started = std::time::Instant::now();
        match self.backend.synthesize(&request) {
            Ok(()) => {
                tracing::debug!(
                    backend = self.backend.name(),
                    seq = task.seq,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "synthesis finished"
                );
                self.deliver(&task);
            }
            Err(err) => {
                log_debug(&format!(
                    "synthesis failed via {} (seq {}): {err:#}",
                    self.backend.name(),
                    task.seq
                ));
                log_debug_content(&format!("synthesis text: {}", task.text));
            }
        }
    }

    fn deliver(&self, task: &SpeechTask) {
        let _ = self.events.send(AudioEvent::Ready(ReadyClip {
            path: task.target.clone(),
            priority: task.priority,
            interrupt: task.interrupt,
            token: task.token,
            seq: task.seq,
        }));
    }
}
