use std::fmt;

use chrono::{NaiveDateTime, Timelike};

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Time-of-day window attached to a line of dialogue.
///
/// Windows are end-exclusive and may wrap midnight (`22:00-06:00`). Strings that do
/// not parse are kept verbatim and never match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    Always,
    Window {
        start: u16,
        end: u16,
    },
    Invalid(String),
}

impl TimeRange {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_ascii_lowercase();
        if value.is_empty() || value == "default" {
            return TimeRange::Always;
        }
        let Some((start_text, end_text)) = value.split_once('-') else {
            return TimeRange::Invalid(raw.to_string());
        };
        match (parse_clock(start_text), parse_clock(end_text)) {
            (Some(start), Some(end)) => TimeRange::Window { start, end },
            _ => TimeRange::Invalid(raw.to_string()),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, TimeRange::Always)
    }

    pub fn matches_minute(&self, minute_of_day: u16) -> bool {
        match *self {
            TimeRange::Always => true,
            TimeRange::Invalid(_) => false,
            TimeRange::Window { start, end } => {
                if start <= end {
                    start <= minute_of_day && minute_of_day < end
                } else {
                    minute_of_day >= start || minute_of_day < end
                }
            }
        }
    }

    pub fn matches(&self, now: NaiveDateTime) -> bool {
        self.matches_minute(minute_of_day(now))
    }
}

impl From<String> for TimeRange {
    fn from(raw: String) -> Self {
        TimeRange::parse(&raw)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Always => f.write_str("default"),
            TimeRange::Window { start, end } => write!(
                f,
                "{:02}:{:02}-{:02}:{:02}",
                start / 60,
                start % 60,
                end / 60,
                end % 60
            ),
            TimeRange::Invalid(raw) => f.write_str(raw),
        }
    }
}

pub fn minute_of_day(now: NaiveDateTime) -> u16 {
    // hour < 24 and minute < 60, so this always fits.
    (now.hour() * 60 + now.minute()) as u16 % MINUTES_PER_DAY
}

fn parse_clock(text: &str) -> Option<u16> {
    let (hh, mm) = text.trim().split_once(':')?;
    let hh: u16 = hh.trim().parse().ok()?;
    let mm: u16 = mm.trim().parse().ok()?;
    if hh >= 24 || mm >= 60 {
        return None;
    }
    Some(hh * 60 + mm)
}
