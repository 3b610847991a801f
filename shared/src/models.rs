use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::utils::wire;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Bucket size of a candle series. Wire names follow the backend tables
/// (`5m`, `1h`, `4h`, `1d`, `1w`, `1M`); note `1M` is a month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeFrame {
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
    #[serde(rename = "1M")]
    Month1,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 6] = [
        TimeFrame::Minute5,
        TimeFrame::Hour1,
        TimeFrame::Hour4,
        TimeFrame::Day1,
        TimeFrame::Week1,
        TimeFrame::Month1,
    ];

    /// Timeframes the backend runs fakeout detection on.
    pub const FAKEOUT: [TimeFrame; 3] = [TimeFrame::Hour1, TimeFrame::Hour4, TimeFrame::Day1];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Minute5 => "5m",
            TimeFrame::Hour1 => "1h",
            TimeFrame::Hour4 => "4h",
            TimeFrame::Day1 => "1d",
            TimeFrame::Week1 => "1w",
            TimeFrame::Month1 => "1M",
        }
    }

    /// Bucket length; a month is approximated as 30 days.
    pub fn duration(&self) -> Duration {
        match self {
            TimeFrame::Minute5 => Duration::minutes(5),
            TimeFrame::Hour1 => Duration::hours(1),
            TimeFrame::Hour4 => Duration::hours(4),
            TimeFrame::Day1 => Duration::days(1),
            TimeFrame::Week1 => Duration::weeks(1),
            TimeFrame::Month1 => Duration::days(30),
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrame {
    type Err = ParseEnumError;

    // Case matters: "1m" is not a valid alias for the monthly "1M".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeFrame::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s.trim())
            .ok_or_else(|| ParseEnumError { kind: "timeframe", value: s.to_string() })
    }
}

/// Which side of a level the price breached before closing back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FakeoutType {
    /// Wick above the level, close below it.
    High,
    /// Wick below the level, close above it.
    Low,
}

impl FakeoutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FakeoutType::High => "high",
            FakeoutType::Low => "low",
        }
    }
}

impl fmt::Display for FakeoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FakeoutType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(FakeoutType::High),
            "low" => Ok(FakeoutType::Low),
            _ => Err(ParseEnumError { kind: "fakeout type", value: s.to_string() }),
        }
    }
}

/// Common read access the view pipeline needs from any listed record.
pub trait MarketRecord {
    fn timestamp(&self) -> DateTime<Utc>;
    fn symbol(&self) -> &str;
    fn timeframe(&self) -> TimeFrame;

    fn fakeout_type(&self) -> Option<FakeoutType> {
        None
    }
}

/// A candle row as the backend sends it: the candles and context endpoints
/// leave `symbol`/`timeframe` to the response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandleRow {
    #[serde(deserialize_with = "wire::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "wire::decimal")]
    pub open: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub high: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub low: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub close: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub volume: f64,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub rsi_8: Option<f64>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub ema_20: Option<f64>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub ema_50: Option<f64>,
}

impl CandleRow {
    pub fn into_candle(self, symbol: &str, timeframe: TimeFrame) -> Candle {
        Candle {
            timestamp: self.timestamp,
            symbol: symbol.to_lowercase(),
            timeframe,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            rsi_8: self.rsi_8,
            ema_20: self.ema_20,
            ema_50: self.ema_50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    #[serde(deserialize_with = "wire::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "wire::symbol")]
    pub symbol: String,
    pub timeframe: TimeFrame,
    #[serde(deserialize_with = "wire::decimal")]
    pub open: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub high: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub low: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub close: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub volume: f64,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub rsi_8: Option<f64>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub ema_20: Option<f64>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub ema_50: Option<f64>,
}

impl MarketRecord for Candle {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }
}

/// A candle flagged by the detector as having faked out a key level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fakeout {
    pub id: i64,
    #[serde(deserialize_with = "wire::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "wire::symbol")]
    pub symbol: String,
    pub timeframe: TimeFrame,
    #[serde(deserialize_with = "wire::decimal")]
    pub open: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub high: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub low: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub close: f64,
    #[serde(deserialize_with = "wire::decimal")]
    pub volume: f64,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub rsi_8: Option<f64>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub ema_20: Option<f64>,
    #[serde(default, deserialize_with = "wire::optional_decimal")]
    pub ema_50: Option<f64>,
    pub fakeout_type: FakeoutType,
    #[serde(deserialize_with = "wire::decimal")]
    pub fakeout_level: f64,
}

impl Fakeout {
    /// Re-checks the detection rule against this row's own prices.
    pub fn is_confirmed(&self) -> bool {
        match self.fakeout_type {
            FakeoutType::High => self.high > self.fakeout_level && self.close < self.fakeout_level,
            FakeoutType::Low => self.low < self.fakeout_level && self.close > self.fakeout_level,
        }
    }

    pub fn describe_level(&self) -> &'static str {
        match self.fakeout_type {
            FakeoutType::High => "price spiked above this level then closed back below it",
            FakeoutType::Low => "price dipped below this level then closed back above it",
        }
    }
}

impl MarketRecord for Fakeout {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    fn fakeout_type(&self) -> Option<FakeoutType> {
        Some(self.fakeout_type)
    }
}

/// Fakeout counts for the stat cards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryCounts {
    pub today: u64,
    pub week: u64,
    pub month: u64,
    #[serde(default)]
    pub by_symbol: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_timeframe: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemStatus {
    pub status: String,
    pub database: String,
    #[serde(default)]
    pub latest_candles: BTreeMap<String, String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timeframe_round_trips_wire_names() {
        for tf in TimeFrame::ALL {
            assert_eq!(tf.as_str().parse::<TimeFrame>().unwrap(), tf);
        }
        assert!("1m".parse::<TimeFrame>().is_err());
        assert_eq!(serde_json::to_string(&TimeFrame::Month1).unwrap(), "\"1M\"");
    }

    #[test]
    fn test_fakeout_decodes_numeric_strings_and_missing_indicators() {
        let json = r#"{
            "id": 17,
            "timestamp": "2024-05-01T13:00:00",
            "symbol": "BTCUSDT",
            "timeframe": "1h",
            "open": "63010.5", "high": 63500, "low": "62900.25", "close": 63100,
            "volume": "1520.75",
            "rsi_8": null,
            "fakeout_type": "high",
            "fakeout_level": "63400"
        }"#;
        let fakeout: Fakeout = serde_json::from_str(json).unwrap();
        assert_eq!(fakeout.id, 17);
        assert_eq!(fakeout.symbol, "btcusdt");
        assert_eq!(fakeout.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap());
        assert_eq!(fakeout.open, 63010.5);
        assert_eq!(fakeout.rsi_8, None);
        assert_eq!(fakeout.ema_20, None);
        assert_eq!(fakeout.fakeout_level, 63400.0);
        assert!(fakeout.is_confirmed());
    }

    #[test]
    fn test_low_fakeout_confirmation_is_mirrored() {
        let json = r#"{"id": 1, "timestamp": 1714568400, "symbol": "ethusdt", "timeframe": "1d",
            "open": 3000, "high": 3050, "low": 2890, "close": 2990, "volume": 10,
            "fakeout_type": "low", "fakeout_level": 2900}"#;
        let mut fakeout: Fakeout = serde_json::from_str(json).unwrap();
        assert!(fakeout.is_confirmed());
        fakeout.close = 2895.0;
        assert!(!fakeout.is_confirmed());
    }

    #[test]
    fn test_huge_negative_epoch_is_a_decode_error() {
        let json = r#"{"id": 2, "timestamp": -1e30, "symbol": "ethusdt", "timeframe": "1h",
            "open": 1, "high": 2, "low": 0.5, "close": 1, "volume": 1,
            "fakeout_type": "high", "fakeout_level": 1.5}"#;
        let err = serde_json::from_str::<Fakeout>(json).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);
    }

    #[test]
    fn test_candle_row_takes_symbol_from_envelope() {
        let row: CandleRow = serde_json::from_str(
            r#"{"timestamp": "2024-05-01T00:00:00+00:00", "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 3, "rsi_8": 55.2}"#,
        )
        .unwrap();
        let candle = row.into_candle("XRPUSDT", TimeFrame::Hour4);
        assert_eq!(candle.symbol, "xrpusdt");
        assert_eq!(candle.timeframe, TimeFrame::Hour4);
        assert_eq!(candle.rsi_8, Some(55.2));
    }
}
