use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Метка слота в формате `HH:MM` (24 часа, с ведущими нулями).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).map(SlotTime)
    }

    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.0)
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl FromStr for SlotTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedTime(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(malformed());
        }
        let (hh, mm) = (&s[..2], &s[3..]);
        if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let hour: u32 = hh.parse().map_err(|_| malformed())?;
        let minute: u32 = mm.parse().map_err(|_| malformed())?;
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(SlotTime)
            .ok_or_else(malformed)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Разбор даты в формате `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    if s.len() != 10 {
        return Err(ValidationError::MalformedDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ValidationError::MalformedDate(s.to_string()))
}

/// Ежедневный шаблон расписания: одинаковые слоты каждый день,
/// кроме выходного дня недели.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTemplate {
    pub open_hour: u32,
    pub close_hour: u32,
    pub interval_minutes: u32,
    pub blackout: Weekday,
}

impl ScheduleTemplate {
    pub fn slots_for(&self, date: NaiveDate) -> Vec<SlotTime> {
        if self.is_blackout(date) || self.interval_minutes == 0 {
            return Vec::new();
        }

        let end = self.close_hour.saturating_mul(60);
        let mut current = self.open_hour.saturating_mul(60);
        let mut slots = Vec::new();

        while current < end {
            if let Some(slot) = SlotTime::from_minutes(current) {
                slots.push(slot);
            }
            match current.checked_add(self.interval_minutes) {
                Some(next) => current = next,
                None => break,
            }
        }

        slots
    }

    pub fn is_blackout(&self, date: NaiveDate) -> bool {
        date.weekday() == self.blackout
    }
}
