//! Seams between the director and the outside world.
//!
//! Each optional collaborator has a null implementation so a missing one only
//! disables its feature.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use crate::backend::{NullTextBackend, TextBackend};
use crate::entropy::Edge;
use crate::idle::IdleControl;
use crate::script::Script;

/// Default band used when a presentation cannot report its screen.
pub const DEFAULT_SCREEN_BAND: (i32, i32) = (0, 1080);

/// The on-screen body of the companion.
pub trait Presentation: Send {
    /// Switch the displayed animation. `as_base` marks it as the resting visual.
    fn set_state_by_name(&mut self, name: &str, as_base: bool) -> bool;
    fn set_ascii_content(&mut self, content: &str);
    fn set_sprite_content(&mut self, path: &Path) -> Result<()>;
    fn summon(&mut self, edge: Edge, y: i32, script: Option<&Script>);
    fn enter(&mut self, script: Option<&Script>);
    fn peek(&mut self, edge: Edge, y: i32);
    /// Start the exit animation. Returns `false` when no animation will report completion.
    fn flee(&mut self) -> bool;
    fn hide(&mut self);
    fn set_autonomous_enabled(&mut self, enabled: bool);
    fn is_visible(&self) -> bool;
    /// `(top, height)` of the usable screen area.
    fn screen_band(&self) -> (i32, i32) {
        DEFAULT_SCREEN_BAND
    }
}

/// Headless presentation that only remembers whether it is "shown".
#[derive(Debug, Default)]
pub struct NullPresentation {
    visible: bool,
}

impl Presentation for NullPresentation {
    fn set_state_by_name(&mut self, _name: &str, _as_base: bool) -> bool {
        false
    }

    fn set_ascii_content(&mut self, _content: &str) {}

    fn set_sprite_content(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn summon(&mut self, _edge: Edge, _y: i32, _script: Option<&Script>) {
        self.visible = true;
    }

    fn enter(&mut self, _script: Option<&Script>) {
        self.visible = true;
    }

    fn peek(&mut self, _edge: Edge, _y: i32) {
        self.visible = true;
    }

    fn flee(&mut self) -> bool {
        self.visible = false;
        false
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn set_autonomous_enabled(&mut self, _enabled: bool) {}

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// A running pre-scripted entrance; completion arrives as `EntranceFinished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntranceRun {
    pub duration: Duration,
}

pub trait ScriptedEntrance: Send {
    /// `Ok(None)` when no entrance asset is available.
    fn start(&mut self) -> Result<Option<EntranceRun>>;
    fn cancel(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoEntrance;

impl ScriptedEntrance for NoEntrance {
    fn start(&mut self) -> Result<Option<EntranceRun>> {
        Ok(None)
    }

    fn cancel(&mut self) {}
}

pub trait FullscreenProbe: Send {
    fn is_fullscreen_app_running(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NeverFullscreen;

impl FullscreenProbe for NeverFullscreen {
    fn is_fullscreen_app_running(&self) -> bool {
        false
    }
}

pub trait GazeControl: Send {
    fn start_tracking(&mut self);
    fn stop_tracking(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullGaze;

impl GazeControl for NullGaze {
    fn start_tracking(&mut self) {}
    fn stop_tracking(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullIdleControl;

impl IdleControl for NullIdleControl {
    fn set_threshold_ms(&self, _threshold_ms: u64) {}
    fn reset_to_standby(&self) {}
}

/// Everything the director talks to besides audio and content.
pub struct Collaborators {
    pub presentation: Box<dyn Presentation>,
    pub entrance: Box<dyn ScriptedEntrance>,
    pub fullscreen: Box<dyn FullscreenProbe>,
    pub gaze: Box<dyn GazeControl>,
    pub idle: Box<dyn IdleControl>,
    pub text: Arc<Mutex<Box<dyn TextBackend>>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            presentation: Box::new(NullPresentation::default()),
            entrance: Box::new(NoEntrance),
            fullscreen: Box::new(NeverFullscreen),
            gaze: Box::new(NullGaze),
            idle: Box::new(NullIdleControl),
            text: Arc::new(Mutex::new(Box::new(NullTextBackend))),
        }
    }
}
