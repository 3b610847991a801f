// Parsing and display helpers shared by the data sources and the view layer.
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::str::FromStr;

use crate::models::TimeFrame;

/// Epoch values above this magnitude are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: u64 = 100_000_000_000;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// Parses plain decimals like "63010.5". The backend serializes NUMERIC
// columns either as JSON numbers or as strings.
pub fn parse_decimal(s: &str) -> Result<f64> {
    let trimmed = s.trim();
    let value = f64::from_str(trimmed).map_err(|e| anyhow!("Failed to parse decimal '{}': {}", s, e))?;
    if !value.is_finite() {
        return Err(anyhow!("Failed to parse decimal '{}': not a finite number", s));
    }
    Ok(value)
}

pub fn from_epoch(value: i64) -> Result<DateTime<Utc>> {
    let parsed = if value.unsigned_abs() > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    };
    parsed.ok_or_else(|| anyhow!("Epoch timestamp out of range: {}", value))
}

// Accepts RFC 3339, naive ISO-8601 (read as UTC, which is what the backend's
// isoformat() produces for naive columns) and stringified epochs.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(epoch) = trimmed.parse::<i64>() {
        return from_epoch(epoch);
    }
    Err(anyhow!("Failed to parse timestamp '{}'", s))
}

/// Serde adapters for the loosely typed wire format.
pub mod wire {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Number(f64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Epoch(i64),
        EpochFloat(f64),
        Text(String),
    }

    pub fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Numeric::deserialize(deserializer)? {
            Numeric::Number(value) => Ok(value),
            Numeric::Text(text) => super::parse_decimal(&text).map_err(D::Error::custom),
        }
    }

    /// Absent, null and blank values all map to `None`, never to zero.
    pub fn optional_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Numeric>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Numeric::Number(value)) => Ok(Some(value)),
            Some(Numeric::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(Numeric::Text(text)) => super::parse_decimal(&text).map(Some).map_err(D::Error::custom),
        }
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Epoch(value) => super::from_epoch(value).map_err(D::Error::custom),
            RawTimestamp::EpochFloat(value) => super::from_epoch(value.trunc() as i64).map_err(D::Error::custom),
            RawTimestamp::Text(text) => super::parse_timestamp(&text).map_err(D::Error::custom),
        }
    }

    pub fn symbol<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.trim().to_lowercase())
    }
}

/// "63,010.50" for prices of 1 and above, four decimals below that.
pub fn format_price(value: f64) -> String {
    let decimals = if value.abs() < 1.0 { 4 } else { 2 };
    group_thousands(&format!("{:.*}", decimals, value))
}

/// Compact volume: 950, 12.35K, 1.50M, 2.00B.
pub fn format_volume(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

pub fn format_indicator(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Axis label for a chart point; intraday context only needs the clock time.
pub fn format_time_label(ts: DateTime<Utc>, granularity: TimeFrame) -> String {
    match granularity {
        TimeFrame::Minute5 => ts.format("%H:%M").to_string(),
        TimeFrame::Hour1 | TimeFrame::Hour4 => ts.format("%m-%d %H:%M").to_string(),
        _ => ts.format("%Y-%m-%d").to_string(),
    }
}

fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_decimal_accepts_plain_numbers() {
        assert_eq!(parse_decimal("123.45").unwrap(), 123.45);
        assert_eq!(parse_decimal(" 0.00012 ").unwrap(), 0.00012);
        assert!(parse_decimal("12,5").is_err());
        assert!(parse_decimal("NaN").is_err());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 12, 30, 18, 20, 0).unwrap();
        assert_eq!(parse_timestamp("2024-12-30T18:20:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-12-30T18:20:00+00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-12-30T20:20:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-12-30 18:20:00").unwrap(), expected);
        assert_eq!(parse_timestamp("1735582800").unwrap(), expected);
        assert_eq!(parse_timestamp("1735582800000").unwrap(), expected);
        assert!(parse_timestamp("30/12/2024").is_err());
    }

    #[test]
    fn test_extreme_epochs_are_errors() {
        assert!(parse_timestamp("-9223372036854775808").is_err());
        assert!(parse_timestamp("9223372036854775807").is_err());
        assert!(from_epoch(i64::MIN).is_err());
        assert_eq!(from_epoch(-86_400).unwrap(), Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_keeps_fractional_seconds() {
        let ts = parse_timestamp("2024-12-30T18:20:00.250").unwrap();
        assert_eq!(ts.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(63010.5), "63,010.50");
        assert_eq!(format_price(1234567.891), "1,234,567.89");
        assert_eq!(format_price(-1500.0), "-1,500.00");
        assert_eq!(format_price(999.0), "999.00");
        assert_eq!(format_price(0.12346), "0.1235");
    }

    #[test]
    fn test_format_volume_and_indicator() {
        assert_eq!(format_volume(950.0), "950");
        assert_eq!(format_volume(12_346.0), "12.35K");
        assert_eq!(format_volume(1_500_000.0), "1.50M");
        assert_eq!(format_volume(2_000_000_000.0), "2.00B");
        assert_eq!(format_indicator(Some(55.678)), "55.68");
        assert_eq!(format_indicator(None), "-");
    }

    #[test]
    fn test_time_labels_follow_granularity() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 10, 9, 5, 0).unwrap();
        assert_eq!(format_time_label(ts, TimeFrame::Minute5), "09:05");
        assert_eq!(format_time_label(ts, TimeFrame::Hour1), "03-10 09:05");
        assert_eq!(format_time_label(ts, TimeFrame::Day1), "2024-03-10");
        assert_eq!(format_timestamp(ts), "2024-03-10 09:05");
    }
}
