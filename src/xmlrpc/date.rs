// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::convert::TryFrom;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use time::{Month, OffsetDateTime};

use crate::error::Result;

fn iso_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d\d\d\d)-?(\d\d)-?(\d\d)(?:[T ](\d\d):(\d\d)(?::(\d\d))?)?(Z|[+-]\d\d:?\d\d)?")
            .expect("static ISO-8601 pattern")
    })
}

/// An XML-RPC `dateTime.iso8601` value, kept as loose calendar fields.
///
/// Fields are never validated: `month = 13` survives a parse and a
/// serialization unchanged.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Date {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub timezone: String,
}

impl Date {
    /// Builds the UTC calendar fields of a Unix timestamp.
    pub fn from_timestamp(timestamp: i64) -> Result<Date> {
        let at = OffsetDateTime::from_unix_timestamp(timestamp)?;
        Ok(Date::from_offset_date_time(at))
    }

    pub fn now() -> Date {
        Date::from_offset_date_time(OffsetDateTime::now_utc())
    }

    fn from_offset_date_time(at: OffsetDateTime) -> Date {
        Date {
            year: at.year(),
            month: i32::from(u8::from(at.month())),
            day: i32::from(at.day()),
            hour: i32::from(at.hour()),
            minute: i32::from(at.minute()),
            second: i32::from(at.second()),
            timezone: String::new(),
        }
    }

    /// Parses `YYYY[-]MM[-]DD[[T ]HH:MM[:SS]]` with an optional zone suffix.
    /// Text that does not match leaves every field at zero.
    pub fn parse_iso(iso: &str) -> Date {
        let caps = match iso_pattern().captures(iso) {
            Some(caps) => caps,
            None => {
                trace!("dateTime.iso8601 {:?} does not match, using zero date", iso);
                return Date::default();
            }
        };

        let field = |idx: usize| {
            caps.get(idx)
                .and_then(|m| m.as_str().parse::<i32>().ok())
                .unwrap_or(0)
        };

        Date {
            year: field(1),
            month: field(2),
            day: field(3),
            hour: field(4),
            minute: field(5),
            second: field(6),
            timezone: caps.get(7).map_or(String::new(), |m| m.as_str().to_string()),
        }
    }

    /// Always `YYYYMMDDTHH:MM:SS`, every field zero-padded, followed by the
    /// timezone suffix if one was parsed.
    pub fn to_iso(&self) -> String {
        format!(
            "{:04}{:02}{:02}T{:02}:{:02}:{:02}{}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.timezone
        )
    }

    pub fn to_xml(&self) -> String {
        format!("<dateTime.iso8601>{}</dateTime.iso8601>", self.to_iso())
    }

    /// Seconds since the epoch, treating the fields as UTC. Out-of-range
    /// fields carry over into the next unit (month 13 is January next year).
    pub fn timestamp(&self) -> Option<i64> {
        let months = i64::from(self.year) * 12 + i64::from(self.month) - 1;
        let year = i32::try_from(months.div_euclid(12)).ok()?;
        let month = Month::try_from(months.rem_euclid(12) as u8 + 1).ok()?;
        let first = time::Date::from_calendar_date(year, month, 1).ok()?;
        let base = first.midnight().assume_utc().unix_timestamp();

        Some(base
            + (i64::from(self.day) - 1) * 86_400
            + i64::from(self.hour) * 3_600
            + i64::from(self.minute) * 60
            + i64::from(self.second))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}

#[cfg(test)]
mod tests {
    use super::Date;

    #[test]
    fn test_parse_compact_iso() {
        let date = Date::parse_iso("19980717T14:08:55");
        assert_eq!(1998, date.year);
        assert_eq!(7, date.month);
        assert_eq!(17, date.day);
        assert_eq!(14, date.hour);
        assert_eq!(8, date.minute);
        assert_eq!(55, date.second);
        assert_eq!("", date.timezone);
    }

    #[test]
    fn test_parse_dashed_without_seconds() {
        let date = Date::parse_iso("2024-03-09 07:45");
        assert_eq!((2024, 3, 9, 7, 45, 0), (date.year, date.month, date.day, date.hour, date.minute, date.second));
    }

    #[test]
    fn test_parse_keeps_zone() {
        let date = Date::parse_iso("2024-03-09T07:45:10Z");
        assert_eq!("Z", date.timezone);
        assert_eq!("20240309T07:45:10Z", date.to_iso());
    }

    #[test]
    fn test_output_is_always_padded() {
        let date = Date { year: 98, month: 7, day: 1, hour: 4, minute: 5, second: 6, ..Date::default() };
        assert_eq!("00980701T04:05:06", date.to_iso());
        assert_eq!(date, Date::parse_iso(&date.to_iso()));
    }

    #[test]
    fn test_parse_is_lenient() {
        let date = Date::parse_iso("20241340T99:99:99");
        assert_eq!(13, date.month);
        assert_eq!(40, date.day);
        assert_eq!(99, date.hour);

        assert_eq!(Date::default(), Date::parse_iso("yesterday"));
    }

    #[test]
    fn test_from_timestamp() {
        let date = Date::from_timestamp(1_000_000_000).unwrap();
        assert_eq!("20010909T01:46:40", date.to_iso());
        assert_eq!(Some(1_000_000_000), date.timestamp());
    }

    #[test]
    fn test_timestamp_carries_overflowing_month() {
        let overflow = Date { year: 2023, month: 13, day: 1, ..Date::default() };
        let january = Date { year: 2024, month: 1, day: 1, ..Date::default() };
        assert_eq!(january.timestamp(), overflow.timestamp());
    }

    #[test]
    fn test_to_xml() {
        let date = Date::parse_iso("19980717T14:08:55");
        assert_eq!("<dateTime.iso8601>19980717T14:08:55</dateTime.iso8601>", date.to_xml());
    }
}
