// Equality filters over the fetched record set.
use serde::{Deserialize, Serialize};
use shared::models::{MarketRecord, ParseEnumError};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKey {
    Symbol,
    Timeframe,
    /// Fakeout side; candles never match an active type filter.
    Type,
}

impl FilterKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Symbol => "symbol",
            FilterKey::Timeframe => "timeframe",
            FilterKey::Type => "type",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "symbol" => Ok(FilterKey::Symbol),
            "timeframe" => Ok(FilterKey::Timeframe),
            "type" | "fakeout_type" => Ok(FilterKey::Type),
            _ => Err(ParseEnumError { kind: "filter key", value: s.to_string() }),
        }
    }
}

/// Selected filter values. A key that is absent is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filters(BTreeMap<FilterKey, String>);

impl Filters {
    /// Stores `value` for `key`; `None` or a blank value clears it. Symbols are
    /// kept in their lowercase canonical form.
    pub fn set(&mut self, key: FilterKey, value: Option<&str>) {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => {
                let v = match key {
                    FilterKey::Symbol | FilterKey::Type => v.to_lowercase(),
                    FilterKey::Timeframe => v.to_string(),
                };
                self.0.insert(key, v);
            }
            None => {
                self.0.remove(&key);
            }
        }
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches<R: MarketRecord>(&self, record: &R) -> bool {
        self.0.iter().all(|(key, wanted)| match key {
            FilterKey::Symbol => record.symbol() == wanted,
            FilterKey::Timeframe => record.timeframe().as_str() == wanted,
            FilterKey::Type => record.fakeout_type().is_some_and(|t| t.as_str() == wanted),
        })
    }
}

/// Positions in `all` of the records satisfying every active filter, in
/// fetch order.
pub fn filter_indices<R: MarketRecord>(all: &[R], filters: &Filters) -> Vec<usize> {
    all.iter()
        .enumerate()
        .filter(|(_, record)| filters.matches(*record))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{candle_at, fakeout_at};
    use shared::models::{FakeoutType, TimeFrame};

    #[test]
    fn test_empty_filters_match_everything() {
        let all = vec![candle_at("btcusdt", 1), candle_at("ethusdt", 2)];
        assert_eq!(filter_indices(&all, &Filters::default()), vec![0, 1]);
    }

    #[test]
    fn test_filters_are_a_conjunction() {
        let all = vec![
            fakeout_at(1, "btcusdt", TimeFrame::Hour1, FakeoutType::High, 1),
            fakeout_at(2, "btcusdt", TimeFrame::Day1, FakeoutType::Low, 2),
            fakeout_at(3, "ethusdt", TimeFrame::Hour1, FakeoutType::High, 3),
            fakeout_at(4, "btcusdt", TimeFrame::Hour1, FakeoutType::Low, 4),
        ];
        let mut filters = Filters::default();
        filters.set(FilterKey::Symbol, Some("BTCUSDT"));
        filters.set(FilterKey::Timeframe, Some("1h"));
        assert_eq!(filter_indices(&all, &filters), vec![0, 3]);

        filters.set(FilterKey::Type, Some("low"));
        assert_eq!(filter_indices(&all, &filters), vec![3]);
    }

    #[test]
    fn test_relaxing_a_filter_only_adds_records() {
        let all = vec![
            fakeout_at(1, "btcusdt", TimeFrame::Hour1, FakeoutType::High, 1),
            fakeout_at(2, "ethusdt", TimeFrame::Hour1, FakeoutType::High, 2),
            fakeout_at(3, "ethusdt", TimeFrame::Hour4, FakeoutType::Low, 3),
        ];
        let mut filters = Filters::default();
        filters.set(FilterKey::Symbol, Some("ethusdt"));
        filters.set(FilterKey::Timeframe, Some("1h"));
        let strict = filter_indices(&all, &filters);

        filters.set(FilterKey::Timeframe, Some(""));
        let relaxed = filter_indices(&all, &filters);

        assert!(strict.iter().all(|i| relaxed.contains(i)));
        assert_eq!(relaxed, vec![1, 2]);
    }

    #[test]
    fn test_type_filter_never_matches_candles() {
        let all = vec![candle_at("btcusdt", 1)];
        let mut filters = Filters::default();
        filters.set(FilterKey::Type, Some("high"));
        assert!(filter_indices(&all, &filters).is_empty());
    }

    #[test]
    fn test_timeframe_filter_is_case_sensitive() {
        let mut monthly = candle_at("btcusdt", 1);
        monthly.timeframe = TimeFrame::Month1;
        let all = vec![monthly];
        let mut filters = Filters::default();
        filters.set(FilterKey::Timeframe, Some("1m"));
        assert!(filter_indices(&all, &filters).is_empty());
        filters.set(FilterKey::Timeframe, Some("1M"));
        assert_eq!(filter_indices(&all, &filters), vec![0]);
    }

    #[test]
    fn test_filter_key_parsing() {
        assert_eq!("type".parse::<FilterKey>().unwrap(), FilterKey::Type);
        assert_eq!("fakeout_type".parse::<FilterKey>().unwrap(), FilterKey::Type);
        assert!("volume".parse::<FilterKey>().is_err());
    }
}
