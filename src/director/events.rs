use std::path::PathBuf;

/// Discrete inputs to the director, delivered in order over one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorEvent {
    UserIdleConfirmed,
    UserActiveDetected,
    Summon,
    ToggleVisibility,
    EntranceFinished,
    FleeCompleted,
    /// Something other than the companion started producing sound.
    MediaStarted,
    MediaStopped,
    CameraError(String),
    RequestCommentary(String),
    CommentaryReady {
        session: u64,
        result: Result<String, String>,
    },
    SwitchCharacter {
        root: PathBuf,
        voice: Option<String>,
    },
    Shutdown,
}

/// Orthogonal overlay on the lifecycle state that only selects visuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorMode {
    Idle,
    Busy,
    MediaPlaying,
    Summoning,
}

impl BehaviorMode {
    pub fn label(self) -> &'static str {
        match self {
            BehaviorMode::Idle => "IDLE",
            BehaviorMode::Busy => "BUSY",
            BehaviorMode::MediaPlaying => "MEDIA_PLAYING",
            BehaviorMode::Summoning => "SUMMONING",
        }
    }

    pub fn visual(self) -> &'static str {
        match self {
            BehaviorMode::Idle => "state1",
            BehaviorMode::Busy => "state4",
            BehaviorMode::MediaPlaying => "state3",
            BehaviorMode::Summoning => "state6",
        }
    }
}

/// Effective mode for visuals. Never consulted for transition legality.
pub fn resolve_behavior_mode(
    entrance_playing: bool,
    audio_output_active: bool,
    last: BehaviorMode,
) -> BehaviorMode {
    if entrance_playing {
        BehaviorMode::Summoning
    } else if audio_output_active {
        BehaviorMode::MediaPlaying
    } else {
        last
    }
}
