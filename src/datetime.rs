//! Instant parsing and display-timezone handling.
//!
//! Everything is persisted in UTC. Naive inputs (no offset) are read in the
//! configured display timezone, which is also used when rendering reminders.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Naive formats accepted after RFC 3339 fails, most specific first.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Timezone used to interpret naive input and to render times for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayTimezone {
    #[default]
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl DisplayTimezone {
    /// Resolve a wall-clock time in this zone to a UTC instant.
    ///
    /// Returns `None` for local times that fall into a DST gap. Ambiguous
    /// local times resolve to the earlier instant.
    pub fn to_utc(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            DisplayTimezone::Utc => Some(Utc.from_utc_datetime(&naive)),
            DisplayTimezone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            DisplayTimezone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Render an instant as `YYYY-MM-DD HH:MM` in this zone, with the offset
    /// appended unless the zone is UTC.
    pub fn format(&self, instant: &DateTime<Utc>) -> String {
        match self {
            DisplayTimezone::Utc => instant.format("%Y-%m-%d %H:%M UTC").to_string(),
            DisplayTimezone::Local => instant
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M %:z")
                .to_string(),
            DisplayTimezone::Fixed(offset) => instant
                .with_timezone(offset)
                .format("%Y-%m-%d %H:%M %:z")
                .to_string(),
        }
    }
}

impl FromStr for DisplayTimezone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "utc" | "z" | "gmt" => return Ok(DisplayTimezone::Utc),
            "local" => return Ok(DisplayTimezone::Local),
            _ => {}
        }
        parse_offset(trimmed)
            .map(|offset| {
                if offset.local_minus_utc() == 0 {
                    DisplayTimezone::Utc
                } else {
                    DisplayTimezone::Fixed(offset)
                }
            })
            .ok_or_else(|| {
                format!(
                    "invalid timezone '{}': expected UTC, local, or an offset like +08:00",
                    trimmed
                )
            })
    }
}

impl fmt::Display for DisplayTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayTimezone::Utc => f.write_str("UTC"),
            DisplayTimezone::Local => f.write_str("local"),
            DisplayTimezone::Fixed(offset) => write!(f, "{}", offset.fix()),
        }
    }
}

impl Serialize for DisplayTimezone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DisplayTimezone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH`.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse a user-supplied point in time.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS[.f]]`, `YYYY-MM-DD HH:MM[:SS]`
/// and a bare `YYYY-MM-DD` (midnight). Naive forms are read in `tz`.
pub fn parse_instant(input: &str, tz: DisplayTimezone) -> Result<DateTime<Utc>, String> {
    let value = input.trim();
    if value.is_empty() {
        return Err("time must not be empty".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| {
            format!(
                "'{}' is not a valid time (expected ISO-8601 such as 2026-02-14T09:00:00 or 2026-02-14 09:00)",
                value
            )
        })?;

    tz.to_utc(naive)
        .ok_or_else(|| format!("'{}' does not exist in timezone {}", value, tz))
}
