use std::fmt;

/// Four-level speech urgency; lower values win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AudioPriority {
    Critical = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
}

impl AudioPriority {
    /// Clamp an arbitrary numeric level onto the four-level scale.
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=0 => AudioPriority::Critical,
            1 => AudioPriority::High,
            2 => AudioPriority::Normal,
            _ => AudioPriority::Low,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            AudioPriority::Critical => "critical",
            AudioPriority::High => "high",
            AudioPriority::Normal => "normal",
            AudioPriority::Low => "low",
        }
    }
}

impl fmt::Display for AudioPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
