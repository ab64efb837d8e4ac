use crate::utils::error::ParseError;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

/// Position of the connector word ("til") in the split token.
const CONNECTOR_SLOT: usize = 5;
const SLOT_COUNT: usize = 8;

fn span_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{1,2}/\d{1,2}-20\d{2}\s\d{2}:\d{2}\still\s\d{2}:\d{2})")
            .expect("span pattern is valid")
    })
}

/// Separator layout of a span token, independent of field contents.
fn shape_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^/\s]+/[^-\s]+-\S+\s+\S+:\S+\s+\S+\s+\S+:\S+$")
            .expect("shape pattern is valid")
    })
}

fn split_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/|-|:+|\s+").expect("split pattern is valid"))
}

/// Returns the `DD/MM-YYYY HH:MM til HH:MM` token contained in `line`, if any.
pub fn find_span(line: &str) -> Option<&str> {
    span_pattern().find(line).map(|m| m.as_str())
}

/// Parses `DD/MM-YYYY HH:MM til HH:MM` into start and end instants in `tz`.
pub fn parse_time_span(token: &str, tz: Tz) -> Result<(DateTime<Tz>, DateTime<Tz>), ParseError> {
    let format_error = |reason: String| ParseError::FormatError {
        token: token.to_string(),
        reason,
    };

    let token_body = token.trim();
    if !shape_pattern().is_match(token_body) {
        return Err(format_error(
            "expected DD/MM-YYYY HH:MM til HH:MM".to_string(),
        ));
    }

    let slots: Vec<&str> = split_pattern().split(token_body).collect();
    if slots.len() != SLOT_COUNT {
        return Err(format_error(format!(
            "expected {} fields, found {}",
            SLOT_COUNT,
            slots.len()
        )));
    }

    let mut fields = Vec::with_capacity(SLOT_COUNT - 1);
    for (i, slot) in slots.iter().enumerate() {
        if i == CONNECTOR_SLOT {
            continue;
        }
        let value = slot
            .parse::<u32>()
            .map_err(|_| format_error(format!("'{}' is not a number", slot)))?;
        fields.push(value);
    }

    // day, month, year, start hour, start minute, end hour, end minute
    let (day, month, year) = (fields[0], fields[1], fields[2]);
    let year = i32::try_from(year).map_err(|_| format_error(format!("year {} out of range", year)))?;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format_error(format!("{}/{}-{} is not a date", day, month, year)))?;

    let start_time = NaiveTime::from_hms_opt(fields[3], fields[4], 0)
        .ok_or_else(|| format_error(format!("{}:{} is not a time", fields[3], fields[4])))?;
    let end_time = NaiveTime::from_hms_opt(fields[5], fields[6], 0)
        .ok_or_else(|| format_error(format!("{}:{} is not a time", fields[5], fields[6])))?;

    let start = tz
        .from_local_datetime(&date.and_time(start_time))
        .earliest()
        .ok_or_else(|| format_error("start does not exist in the local time zone".to_string()))?;
    let end = tz
        .from_local_datetime(&date.and_time(end_time))
        .earliest()
        .ok_or_else(|| format_error("end does not exist in the local time zone".to_string()))?;

    if end <= start {
        return Err(format_error("end is not after start".to_string()));
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn copenhagen() -> Tz {
        "Europe/Copenhagen".parse().unwrap()
    }

    #[test]
    fn test_parse_valid_span() {
        let (start, end) = parse_time_span("8/1-2024 09:55 til 11:25", copenhagen()).unwrap();
        assert_eq!(start, copenhagen().with_ymd_and_hms(2024, 1, 8, 9, 55, 0).unwrap());
        assert_eq!(end, copenhagen().with_ymd_and_hms(2024, 1, 8, 11, 25, 0).unwrap());
        assert_eq!(start.date_naive(), end.date_naive());
        assert!(end > start);
    }

    #[test]
    fn test_connector_is_skipped_by_position() {
        // any word in the connector slot is accepted
        let (start, end) = parse_time_span("08/01-2024 08:15 to 09:45", copenhagen()).unwrap();
        assert_eq!((start.hour(), start.minute()), (8, 15));
        assert_eq!((end.hour(), end.minute()), (9, 45));
    }

    #[test]
    fn test_valid_spans_share_date_and_are_ordered() {
        for day in 1..=28 {
            for (sh, eh) in [(8, 9), (10, 12), (13, 15)] {
                let token = format!("{}/3-2024 {:02}:00 til {:02}:30", day, sh, eh);
                let (start, end) = parse_time_span(&token, copenhagen()).unwrap();
                assert!(end > start, "{}", token);
                assert_eq!(start.day(), day);
                assert_eq!(end.date_naive(), start.date_naive());
            }
        }
    }

    #[test]
    fn test_wrong_separator_count() {
        let err = parse_time_span("8/1/2024 09:55 til 11:25", copenhagen());
        assert!(matches!(err, Err(ParseError::FormatError { .. })));

        let err = parse_time_span("8/1-2024 09:55", copenhagen());
        assert!(matches!(err, Err(ParseError::FormatError { .. })));
    }

    #[test]
    fn test_non_numeric_field() {
        let err = parse_time_span("8/jan-2024 09:55 til 11:25", copenhagen()).unwrap_err();
        assert!(err.to_string().contains("jan"));
    }

    #[test]
    fn test_impossible_date_and_inverted_span() {
        assert!(parse_time_span("31/2-2024 09:55 til 11:25", copenhagen()).is_err());
        assert!(parse_time_span("8/1-2024 25:00 til 26:00", copenhagen()).is_err());
        assert!(parse_time_span("8/1-2024 11:25 til 09:55", copenhagen()).is_err());
    }

    #[test]
    fn test_find_span_in_line() {
        assert_eq!(
            find_span("8/1-2024 09:55 til 11:25"),
            Some("8/1-2024 09:55 til 11:25")
        );
        assert_eq!(find_span("Hold: 3a Da"), None);
    }
}
