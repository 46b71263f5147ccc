//! Decides which heavy subsystems (camera, text generation) are worth running.

use std::time::{Duration, Instant};

/// Text generation stays warm this long after the last dialog.
pub const LLM_WARM_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePlan {
    pub gui_running: bool,
    pub cv_running: bool,
    pub llm_running: bool,
}

impl ResourcePlan {
    pub const ALL_ON: ResourcePlan = ResourcePlan {
        gui_running: true,
        cv_running: true,
        llm_running: true,
    };
}

#[derive(Debug, Default)]
pub struct ResourceScheduler {
    last_dialog_at: Option<Instant>,
}

impl ResourceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dialog_activity(&mut self, now: Instant) {
        self.last_dialog_at = Some(now);
    }

    pub fn resolve_plan(&mut self, is_fullscreen: bool, dialog_active: bool, now: Instant) -> ResourcePlan {
        if is_fullscreen {
            return ResourcePlan {
                gui_running: true,
                cv_running: false,
                llm_running: false,
            };
        }
        if dialog_active {
            self.last_dialog_at = Some(now);
            return ResourcePlan::ALL_ON;
        }
        let warm = self
            .last_dialog_at
            .is_some_and(|last| now.saturating_duration_since(last) <= LLM_WARM_WINDOW);
        ResourcePlan {
            gui_running: true,
            cv_running: true,
            llm_running: warm,
        }
    }
}
