//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

pub use defaults::{
    default_voice_cache_dir, DEFAULT_AUTO_DISMISS_SECS, DEFAULT_CAMERA_FPS,
    DEFAULT_IDLE_THRESHOLD_SECS, DEFAULT_JITTER_MAX_SECS, DEFAULT_JITTER_MIN_SECS,
    DEFAULT_TTS_RATE, DEFAULT_TTS_TIMEOUT_SECS, DEFAULT_TTS_VOICE,
};

use crate::audio::AudioSettings;
use crate::director::DirectorSettings;
use crate::entropy::EdgePreference;

/// CLI options for the desktop companion. Validated values keep spawned helpers safe.
#[derive(Debug, Parser, Clone)]
#[command(name = "cybercompanion", about = "CyberCompanion desktop companion", author, version)]
pub struct AppConfig {
    /// Seconds of keyboard/mouse inactivity before the companion considers appearing
    #[arg(
        long = "idle-threshold-secs",
        env = "CYBERCOMPANION_IDLE_SECS",
        default_value_t = DEFAULT_IDLE_THRESHOLD_SECS
    )]
    pub idle_threshold_secs: u64,

    /// Lower bound of the random offset applied to the idle threshold (seconds, may be negative)
    #[arg(
        long = "jitter-min-secs",
        allow_hyphen_values = true,
        default_value_t = DEFAULT_JITTER_MIN_SECS
    )]
    pub jitter_min_secs: i64,

    /// Upper bound of the random offset applied to the idle threshold (seconds)
    #[arg(
        long = "jitter-max-secs",
        allow_hyphen_values = true,
        default_value_t = DEFAULT_JITTER_MAX_SECS
    )]
    pub jitter_max_secs: i64,

    /// Seconds the companion stays engaged before leaving on its own
    #[arg(long = "auto-dismiss-secs", default_value_t = DEFAULT_AUTO_DISMISS_SECS)]
    pub auto_dismiss_secs: u64,

    /// Appear even while a fullscreen application is in front
    #[arg(long = "no-fullscreen-pause", default_value_t = false)]
    pub no_fullscreen_pause: bool,

    /// Ignore media playback from other applications
    #[arg(long = "no-audio-reactive", default_value_t = false)]
    pub no_audio_reactive: bool,

    /// Screen edge to appear from
    #[arg(long = "position", value_enum, default_value_t = EdgePreference::Right)]
    pub position: EdgePreference,

    /// Enable gaze/presence tracking through the camera collaborator
    #[arg(long = "camera", env = "CYBERCOMPANION_CAMERA", default_value_t = false)]
    pub camera: bool,

    /// Confirm consent for camera use (required together with --camera)
    #[arg(long = "camera-consent", default_value_t = false)]
    pub camera_consent: bool,

    /// Target frame rate requested from the camera collaborator
    #[arg(long = "camera-fps", default_value_t = DEFAULT_CAMERA_FPS)]
    pub camera_fps: u32,

    /// Voice name passed to the speech synthesizer
    #[arg(long = "tts-voice", env = "CYBERCOMPANION_TTS_VOICE", default_value = DEFAULT_TTS_VOICE)]
    pub tts_voice: String,

    /// Speaking-rate adjustment such as +0% or -10%
    #[arg(long = "tts-rate", allow_hyphen_values = true, default_value = DEFAULT_TTS_RATE)]
    pub tts_rate: String,

    /// Always synthesize fresh audio instead of reusing cached clips
    #[arg(long = "no-voice-cache", default_value_t = false)]
    pub no_voice_cache: bool,

    /// Directory holding synthesized clips
    #[arg(long = "voice-cache-dir")]
    pub voice_cache_dir: Option<PathBuf>,

    /// Speech synthesizer command; supports {text} {voice} {rate} {out} placeholders
    #[arg(long = "tts-cmd", env = "CYBERCOMPANION_TTS_CMD")]
    pub tts_cmd: Option<String>,

    /// Kill a synthesizer run that takes longer than this
    #[arg(long = "tts-timeout-secs", default_value_t = DEFAULT_TTS_TIMEOUT_SECS)]
    pub tts_timeout_secs: u64,

    /// Audio player command; supports a {path} placeholder
    #[arg(long = "player-cmd", env = "CYBERCOMPANION_PLAYER_CMD")]
    pub player_cmd: Option<String>,

    /// Character content pack directory (scripts.yaml, scripts.json or scripts/dialogue.yaml)
    #[arg(long = "content-dir")]
    pub content_dir: Option<PathBuf>,

    /// Text generator used for screen commentary
    #[arg(long = "llm-provider", value_enum, default_value_t = LlmProvider::Offline)]
    pub llm_provider: LlmProvider,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "CYBERCOMPANION_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "CYBERCOMPANION_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging spoken lines and screen text (debug log only)
    #[arg(
        long = "log-content",
        env = "CYBERCOMPANION_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,

    /// Debug log location (defaults to the temp dir)
    #[arg(long = "log-file", env = "CYBERCOMPANION_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Print the loaded idle/panic lines and exit
    #[arg(long = "list-scripts", default_value_t = false)]
    pub list_scripts: bool,

    /// Summon the companion right after start-up
    #[arg(long = "summon", default_value_t = false)]
    pub summon: bool,

    /// Stop the event loop after this many seconds
    #[arg(long = "run-secs")]
    pub run_secs: Option<u64>,

    #[arg(skip)]
    pub tts_argv: Vec<String>,

    #[arg(skip)]
    pub player_argv: Vec<String>,
}

/// Text generation backends selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    None,
    Offline,
}

impl LlmProvider {
    pub fn label(self) -> &'static str {
        match self {
            LlmProvider::None => "none",
            LlmProvider::Offline => "offline",
        }
    }
}

impl AppConfig {
    pub fn logging_enabled(&self) -> bool {
        (self.logs || self.log_timings) && !self.no_logs
    }

    /// Snapshot orchestration settings for the director.
    pub fn director_settings(&self) -> DirectorSettings {
        DirectorSettings {
            idle_threshold_ms: self.idle_threshold_secs.saturating_mul(1000),
            jitter_range_secs: (self.jitter_min_secs, self.jitter_max_secs),
            auto_dismiss_ms: self.auto_dismiss_secs.saturating_mul(1000),
            fullscreen_pause: !self.no_fullscreen_pause,
            audio_output_reactive: !self.no_audio_reactive,
            edge: self.position,
            camera_enabled: self.camera && self.camera_consent,
        }
    }

    /// Snapshot speech settings for the audio manager.
    pub fn audio_settings(&self) -> AudioSettings {
        AudioSettings {
            voice: self.tts_voice.clone(),
            rate: self.tts_rate.clone(),
            cache_enabled: !self.no_voice_cache,
            cache_dir: self
                .voice_cache_dir
                .clone()
                .unwrap_or_else(default_voice_cache_dir),
        }
    }
}
