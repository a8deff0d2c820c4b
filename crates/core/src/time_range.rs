//! Display-formatted time ranges
//!
//! Schedules store times as display strings such as `"9:00-10:00"` or
//! `"9:00 AM - 10:30 AM"`. Exact-match conflict detection compares those
//! strings directly; overlap detection parses them into [`TimeRange`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Half-open interval `[start, end)` in minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    start: u16,
    end: u16,
}

impl TimeRange {
    /// Build a range from minute offsets; `start` must precede `end`
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start >= end || end > MINUTES_PER_DAY {
            return Err(Error::validation(
                "time",
                format!("range {}..{} is empty or exceeds one day", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    /// Start minute (inclusive)
    pub fn start(&self) -> u16 {
        self.start
    }

    /// End minute (exclusive)
    pub fn end(&self) -> u16 {
        self.end
    }

    /// Whether the two ranges share at least one minute
    ///
    /// Back-to-back ranges (`9:00-10:00`, `10:00-11:00`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:02}-{}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace(['\u{2013}', '\u{2014}'], "-");
        let (start, end) = normalized
            .split_once('-')
            .ok_or_else(|| Error::validation("time", format!("'{}' is not a range", s)))?;
        let end_clock = parse_clock(end)?;
        let start_clock = parse_clock(start)?;
        let end_minutes = end_clock.minutes()?;
        // "9:00-10:30 AM" puts the meridiem on the end only. A start that
        // would land after a PM end ("11:00-12:00 PM") is read as AM.
        let start_minutes = match (start_clock.meridiem, end_clock.meridiem) {
            (None, Some(Meridiem::Pm)) => {
                let pm = start_clock.with_meridiem(Meridiem::Pm).minutes()?;
                if pm < end_minutes {
                    pm
                } else {
                    start_clock.with_meridiem(Meridiem::Am).minutes()?
                }
            }
            (None, Some(borrowed)) => start_clock.with_meridiem(borrowed).minutes()?,
            _ => start_clock.minutes()?,
        };
        TimeRange::new(start_minutes, end_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    hour: u16,
    minute: u16,
    meridiem: Option<Meridiem>,
}

impl Clock {
    fn with_meridiem(self, meridiem: Meridiem) -> Clock {
        Clock {
            meridiem: Some(meridiem),
            ..self
        }
    }

    fn minutes(&self) -> Result<u16> {
        let hour = match self.meridiem {
            None => self.hour,
            Some(_) if self.hour == 0 || self.hour > 12 => {
                return Err(Error::validation(
                    "time",
                    format!("hour {} is invalid on a 12-hour clock", self.hour),
                ))
            }
            Some(Meridiem::Am) => self.hour % 12,
            Some(Meridiem::Pm) => self.hour % 12 + 12,
        };
        if hour > 24 || self.minute > 59 || (hour == 24 && self.minute != 0) {
            return Err(Error::validation(
                "time",
                format!("{}:{:02} is not a clock time", self.hour, self.minute),
            ));
        }
        Ok(hour * 60 + self.minute)
    }
}

fn parse_clock(raw: &str) -> Result<Clock> {
    let text = raw.trim().to_ascii_uppercase();
    let (clock, meridiem) = if let Some(rest) = text.strip_suffix("AM") {
        (rest.trim(), Some(Meridiem::Am))
    } else if let Some(rest) = text.strip_suffix("PM") {
        (rest.trim(), Some(Meridiem::Pm))
    } else {
        (text.as_str(), None)
    };

    let invalid = || Error::validation("time", format!("'{}' is not a clock time", raw.trim()));
    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h, m),
        None => (clock, "0"),
    };
    let hour = hour.trim().parse::<u16>().map_err(|_| invalid())?;
    let minute = minute.trim().parse::<u16>().map_err(|_| invalid())?;
    Ok(Clock {
        hour,
        minute,
        meridiem,
    })
}
