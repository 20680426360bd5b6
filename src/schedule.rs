use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Short weekday labels indexed by day number (0 = Sunday)
pub const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Highest valid weekday index
pub const MAX_DAY: u8 = 6;

/// One recurring alarm: a display-formatted time of day and the weekdays it fires on.
/// Weekday indices are checked on construction and on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ScheduleFields")]
pub struct Schedule {
    /// Time of day as shown to the user, e.g. "08:00 AM"
    time: String,
    /// Weekday indices in 0..=6, Sunday first
    days: BTreeSet<u8>,
}

#[derive(Deserialize)]
struct ScheduleFields {
    time: String,
    days: BTreeSet<u8>,
}

impl TryFrom<ScheduleFields> for Schedule {
    type Error = String;

    fn try_from(fields: ScheduleFields) -> Result<Self, Self::Error> {
        Self::new(fields.time, fields.days)
    }
}

impl Schedule {
    /// Fails if any weekday index is outside 0..=6
    pub fn new(
        time: impl Into<String>,
        days: impl IntoIterator<Item = u8>,
    ) -> Result<Self, String> {
        let schedule = Self {
            time: time.into(),
            days: days.into_iter().collect(),
        };
        schedule.validate_days()?;
        Ok(schedule)
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn days(&self) -> &BTreeSet<u8> {
        &self.days
    }

    /// Build a schedule from a 24-hour clock reading, formatting it as "hh:mm AM"
    pub fn at(
        hour: u32,
        minute: u32,
        days: impl IntoIterator<Item = u8>,
    ) -> Result<Self, String> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| format!("Time {:02}:{:02} out of range", hour, minute))?;
        Self::new(time.format("%I:%M %p").to_string(), days)
    }

    /// Check every weekday index is in 0..=6
    fn validate_days(&self) -> Result<(), String> {
        match self.days.iter().find(|d| **d > MAX_DAY) {
            Some(day) => Err(format!("Invalid weekday index {} (expected 0-6)", day)),
            None => Ok(()),
        }
    }

    /// Parsed time of day, or None if the display string is not a recognised format
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        parse_display_time(&self.time).ok()
    }

    /// Minutes since midnight of the alarm time
    pub fn minutes_since_midnight(&self) -> Option<u32> {
        self.time_of_day()
            .map(|t| time_to_minutes(t.hour(), t.minute()))
    }

    /// Human readable form, e.g. "08:00 AM - Mon, Wed, Fri"
    pub fn describe(&self) -> String {
        let days = self
            .days
            .iter()
            .filter_map(|d| DAY_LABELS.get(*d as usize).copied())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} - {}", self.time, days)
    }

    /// Next moment strictly after `after` at which this alarm fires
    pub fn next_occurrence(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let time = self.time_of_day()?;
        // Eight days covers a same-weekday alarm whose time today has already passed
        (0..=7).find_map(|offset| {
            let date = after.date() + Duration::days(offset);
            let weekday = date.weekday().num_days_from_sunday() as u8;
            if !self.days.contains(&weekday) {
                return None;
            }
            let candidate = date.and_time(time);
            (candidate > after).then_some(candidate)
        })
    }
}

/// Parses "08:00 AM=1,3,5" (time, then comma separated weekday indices)
impl FromStr for Schedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (time_part, days_part) = s
            .split_once('=')
            .ok_or_else(|| format!("Invalid schedule '{}', expected TIME=DAYS", s))?;
        let time = parse_display_time(time_part.trim())?;
        let mut days = BTreeSet::new();
        for day in days_part.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let day: u8 = day
                .parse()
                .map_err(|_| format!("Invalid weekday '{}' in '{}'", day, s))?;
            days.insert(day);
        }
        Schedule::new(time.format("%I:%M %p").to_string(), days)
    }
}

/// Parse a display time: 12-hour "hh:mm AM" or 24-hour "HH:MM"
pub fn parse_display_time(time_str: &str) -> Result<NaiveTime, String> {
    let upper = time_str.trim().to_ascii_uppercase();
    if upper.ends_with("AM") || upper.ends_with("PM") {
        return NaiveTime::parse_from_str(&upper, "%I:%M %p")
            .map_err(|_| format!("Invalid time format '{}', expected hh:mm AM/PM", time_str));
    }
    let (hour, minute) = parse_time(&upper)?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| format!("Time '{}' out of range", time_str))
}

/// Parse a time string in "HH:MM" format and return (hour, minute)
pub fn parse_time(time_str: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid time format '{}', expected HH:MM", time_str));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| format!("Invalid hour in '{}'", time_str))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| format!("Invalid minute in '{}'", time_str))?;
    if hour >= 24 || minute >= 60 {
        return Err(format!("Time '{}' out of range", time_str));
    }
    Ok((hour, minute))
}

/// Convert time to minutes since midnight
pub fn time_to_minutes(hour: u32, minute: u32) -> u32 {
    hour * 60 + minute
}
