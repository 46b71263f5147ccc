use std::env;
use std::path::PathBuf;

pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 180;
pub const DEFAULT_JITTER_MIN_SECS: i64 = -30;
pub const DEFAULT_JITTER_MAX_SECS: i64 = 60;
pub const DEFAULT_AUTO_DISMISS_SECS: u64 = 30;
pub const DEFAULT_TTS_VOICE: &str = "zh-CN-XiaoxiaoNeural";
pub const DEFAULT_TTS_RATE: &str = "+0%";
pub const DEFAULT_CAMERA_FPS: u32 = 15;
pub const DEFAULT_TTS_TIMEOUT_SECS: u64 = 30;

pub(super) const MIN_IDLE_THRESHOLD_SECS: u64 = 10;
pub(super) const MAX_IDLE_THRESHOLD_SECS: u64 = 4 * 60 * 60;
pub(super) const MAX_JITTER_SECS: i64 = 600;
pub(super) const MIN_AUTO_DISMISS_SECS: u64 = 5;
pub(super) const MAX_AUTO_DISMISS_SECS: u64 = 600;
pub(super) const MAX_RUN_SECS: u64 = 24 * 60 * 60;
pub(super) const MAX_TTS_TIMEOUT_SECS: u64 = 300;
pub(super) const MAX_VOICE_NAME_LEN: usize = 64;

pub(super) const TTS_BINARIES: &[&str] = &["edge-tts", "espeak-ng", "espeak", "say", "piper"];
pub(super) const PLAYER_BINARIES: &[&str] = &["ffplay", "mpv", "afplay", "aplay", "paplay"];

/// Synthesized clips land here unless `--voice-cache-dir` says otherwise.
pub fn default_voice_cache_dir() -> PathBuf {
    env::var("CYBERCOMPANION_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("cybercompanion").join("voice_cache"))
}
