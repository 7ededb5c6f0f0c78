//! Serde helpers for calendar dates and clock times in API payloads.
//!
//! Meal dates travel as `YYYY-MM-DD` strings and meal times as `HH:MM`;
//! `time`'s default serde representations are not what the frontend sends.

use time::{format_description::FormatItem, macros::format_description, Date};

pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
pub const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

/// Format a date as `YYYY-MM-DD` for cache keys and payloads.
pub fn format_date(date: Date) -> String {
    // The format description above cannot fail for a valid Date.
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

pub mod iso_date {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let s = String::deserialize(d)?;
        Date::parse(&s, super::DATE_FORMAT).map_err(D::Error::custom)
    }
}

pub mod iso_date_option {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_some(&super::format_date(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
        let s: Option<String> = Option::deserialize(d)?;
        s.map(|s| Date::parse(&s, super::DATE_FORMAT).map_err(D::Error::custom))
            .transpose()
    }
}

pub mod clock_time_option {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::Time;

    pub fn serialize<S: Serializer>(time: &Option<Time>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => {
                let formatted = t
                    .format(super::TIME_FORMAT)
                    .map_err(serde::ser::Error::custom)?;
                s.serialize_some(&formatted)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Time>, D::Error> {
        let s: Option<String> = Option::deserialize(d)?;
        s.map(|s| Time::parse(&s, super::TIME_FORMAT).map_err(D::Error::custom))
            .transpose()
    }
}

/// Parse a `YYYY-MM-DD` query parameter.
pub fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn formats_and_parses_round_trip() {
        let d = date!(2024 - 01 - 10);
        assert_eq!(format_date(d), "2024-01-10");
        assert_eq!(parse_date("2024-01-10"), Some(d));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }
}
