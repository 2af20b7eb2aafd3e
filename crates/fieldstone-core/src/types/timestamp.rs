use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Debug, Display},
    sync::OnceLock,
};
use time::{
    Date as TimeDate, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::{self, OwnedFormatItem},
};

static DISPLAY_FORMAT: OnceLock<OwnedFormatItem> = OnceLock::new();
static DEFAULT_FORMATS: OnceLock<DateFormats> = OnceLock::new();

/// Candidate input patterns tried by the default format set, in order.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "[year]-[month]-[day] [hour]:[minute]:[second]",
    "[year]-[month]-[day]T[hour]:[minute]:[second]",
    "[year]-[month]-[day]",
    "[month]/[day]/[year]",
];

const DISPLAY_PATTERN: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

///
/// Timestamp
///
/// Unix-seconds instant. Date-only inputs land on midnight UTC.
///

#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    #[must_use]
    pub const fn new(secs: i64) -> Self {
        Self(secs)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Current instant from the host clock.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Parse with the default candidate format set. First match wins.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        default_formats().parse(s)
    }

    /// Midnight UTC of this instant's calendar day.
    #[must_use]
    pub fn day_start(self) -> Self {
        let odt = self.to_offset();
        Self(odt.replace_time(Time::MIDNIGHT).unix_timestamp())
    }

    /// Last second (23:59:59 UTC) of this instant's calendar day.
    #[must_use]
    pub fn day_end(self) -> Self {
        const LAST_SECOND: u32 = 24 * 60 * 60 - 1;
        Self(self.day_start().0 + i64::from(LAST_SECOND))
    }

    /// Shift by whole minutes. Used only by the legacy UTC-offset shim.
    #[must_use]
    pub const fn offset_by_minutes(self, minutes: i64) -> Self {
        Self(self.0 + minutes * 60)
    }

    fn to_offset(self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.0).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Format with an explicit pattern (time's format-description syntax).
    /// Returns `None` when the pattern itself is invalid.
    #[must_use]
    pub fn format_with(self, pattern: &str) -> Option<String> {
        let item = format_description::parse_owned::<2>(pattern).ok()?;
        self.to_offset().format(&item).ok()
    }
}

impl Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = DISPLAY_FORMAT.get_or_init(|| {
            format_description::parse_owned::<2>(DISPLAY_PATTERN)
                .expect("display pattern is valid")
        });

        match self.to_offset().format(format) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "@{}", self.0),
        }
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}")))
    }
}

///
/// DateFormats
///
/// An ordered list of candidate input patterns. Parsing tries each in
/// declaration order and the first successful parse wins — not the most
/// specific match.
///

#[derive(Debug)]
pub struct DateFormats {
    items: Vec<OwnedFormatItem>,
}

impl DateFormats {
    /// Compile a candidate pattern list. Fails on the first invalid
    /// pattern, naming it.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, String> {
        let mut items = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let item = format_description::parse_owned::<2>(pattern)
                .map_err(|_| format!("invalid date format: {pattern}"))?;
            items.push(item);
        }

        Ok(Self { items })
    }

    /// First-match-wins parse. Each candidate is tried as a full
    /// datetime, then as a calendar date (midnight UTC).
    #[must_use]
    pub fn parse(&self, s: &str) -> Option<Timestamp> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        for item in &self.items {
            if let Ok(dt) = PrimitiveDateTime::parse(s, item) {
                return Some(Timestamp(dt.assume_utc().unix_timestamp()));
            }
            if let Ok(d) = TimeDate::parse(s, item) {
                return Some(Timestamp(d.midnight().assume_utc().unix_timestamp()));
            }
        }

        None
    }
}

fn default_formats() -> &'static DateFormats {
    DEFAULT_FORMATS
        .get_or_init(|| DateFormats::new(DEFAULT_PATTERNS).expect("default patterns are valid"))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_date_to_midnight() {
        let ts = Timestamp::parse("2024-03-01").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 00:00:00");
    }

    #[test]
    fn parses_iso_datetime() {
        let ts = Timestamp::parse("2024-03-01 12:30:05").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 12:30:05");
    }

    #[test]
    fn parses_us_slash_format() {
        let ts = Timestamp::parse("03/01/2024").unwrap();
        assert_eq!(ts, Timestamp::parse("2024-03-01").unwrap());
    }

    #[test]
    fn first_match_wins_over_later_candidates() {
        // both patterns accept "2020-01-02"; the first in order decides
        let formats =
            DateFormats::new(&["[year]-[month]-[day]", "[year]-[day]-[month]"]).unwrap();
        let ts = formats.parse("2020-01-02").unwrap();
        assert_eq!(ts, Timestamp::parse("2020-01-02").unwrap());
    }

    #[test]
    fn invalid_input_returns_none() {
        assert!(Timestamp::parse("not a date").is_none());
        assert!(Timestamp::parse("2024-13-40").is_none());
        assert!(Timestamp::parse("").is_none());
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        assert!(DateFormats::new(&["[yea"]).is_err());
    }

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let ts = Timestamp::parse("2024-03-01 12:30:05").unwrap();
        assert_eq!(ts.day_start().to_string(), "2024-03-01 00:00:00");
        assert_eq!(ts.day_end().to_string(), "2024-03-01 23:59:59");
    }

    #[test]
    fn ordering_follows_the_clock() {
        let a = Timestamp::parse("2020-01-01").unwrap();
        let b = Timestamp::parse("2021-01-01").unwrap();
        assert!(a < b);
    }
}
