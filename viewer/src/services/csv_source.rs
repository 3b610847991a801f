// Offline data source backed by CSV dumps of the scanner tables.
//
// One file per table, named like the database tables: `{symbol}_{timeframe}.csv`
// (e.g. `btcusdt_1h.csv`). Header:
//   timestamp;open;high;low;close;volume;rsi_8;ema_20;ema_50[;id;fakeout_type;fakeout_level]
// Rows with a non-empty `fakeout_type` are fakeouts. Both `;` and `,` work as
// delimiters; the first header line decides.
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use shared::models::{Candle, Fakeout, FakeoutType, SummaryCounts, SystemStatus, TimeFrame};
use shared::utils::{parse_decimal, parse_timestamp};
use shared::ContextPolicy;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::data_source::{ContextKey, DataSource, FakeoutQuery};
use crate::error::ViewerError;

#[derive(Debug, Clone)]
struct TableRow {
    id: i64,
    candle: Candle,
    fakeout: Option<(FakeoutType, f64)>,
}

impl TableRow {
    fn to_fakeout(&self) -> Option<Fakeout> {
        let (fakeout_type, fakeout_level) = self.fakeout?;
        let c = &self.candle;
        Some(Fakeout {
            id: self.id,
            timestamp: c.timestamp,
            symbol: c.symbol.clone(),
            timeframe: c.timeframe,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            rsi_8: c.rsi_8,
            ema_20: c.ema_20,
            ema_50: c.ema_50,
            fakeout_type,
            fakeout_level,
        })
    }
}

pub struct CsvDataSource {
    dir: PathBuf,
    symbols: Vec<String>,
}

impl CsvDataSource {
    pub fn new(dir: impl Into<PathBuf>, symbols: Vec<String>) -> Self {
        Self { dir: dir.into(), symbols }
    }

    fn table_path(&self, symbol: &str, timeframe: TimeFrame) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", symbol.to_lowercase(), timeframe.as_str()))
    }

    /// Rows of one table in timestamp order; `None` if the file does not exist.
    fn read_table(&self, symbol: &str, timeframe: TimeFrame) -> Result<Option<Vec<TableRow>>, ViewerError> {
        let path = self.table_path(symbol, timeframe);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No CSV table");
            return Ok(None);
        }
        let mut rows = load_rows_from_csv(&path, symbol, timeframe)?;
        rows.sort_by_key(|r| r.candle.timestamp);
        Ok(Some(rows))
    }

    fn fakeouts_matching(&self, query: &FakeoutQuery) -> Result<Vec<Fakeout>, ViewerError> {
        let mut fakeouts = Vec::new();
        for symbol in self.symbols.iter().filter(|s| query.symbol.as_deref().map_or(true, |q| q.eq_ignore_ascii_case(s))) {
            for timeframe in TimeFrame::FAKEOUT.into_iter().filter(|tf| query.timeframe.map_or(true, |q| q == *tf)) {
                let Some(rows) = self.read_table(symbol, timeframe)? else {
                    continue;
                };
                fakeouts.extend(rows.iter().filter_map(TableRow::to_fakeout).filter(|f| query.matches(f)));
            }
        }
        fakeouts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(fakeouts)
    }

    fn find_fakeout(&self, key: &ContextKey) -> Result<Fakeout, ViewerError> {
        self.read_table(&key.symbol, key.timeframe)?
            .and_then(|rows| rows.iter().filter(|r| r.id == key.id).find_map(TableRow::to_fakeout))
            .ok_or_else(|| ViewerError::NotFound(format!("fakeout {} in {}_{}", key.id, key.symbol, key.timeframe)))
    }

    pub(crate) fn summary_counts_at(&self, now: DateTime<Utc>) -> Result<SummaryCounts, ViewerError> {
        let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let week_start = now - Duration::days(7);
        let month_start = now - Duration::days(30);

        let mut counts = SummaryCounts::default();
        for symbol in &self.symbols {
            counts.by_symbol.insert(symbol.to_uppercase(), 0);
        }
        for tf in TimeFrame::FAKEOUT {
            counts.by_timeframe.insert(tf.as_str().to_string(), 0);
        }

        for fakeout in self.fakeouts_matching(&FakeoutQuery::latest(usize::MAX))? {
            let ts = fakeout.timestamp;
            counts.today += u64::from(ts >= today_start);
            counts.week += u64::from(ts >= week_start);
            counts.month += u64::from(ts >= month_start);
            *counts.by_symbol.entry(fakeout.symbol.to_uppercase()).or_default() += 1;
            *counts.by_timeframe.entry(fakeout.timeframe.as_str().to_string()).or_default() += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl DataSource for CsvDataSource {
    async fn fetch_records(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Result<Vec<Candle>, ViewerError> {
        let rows = self
            .read_table(symbol, timeframe)?
            .ok_or_else(|| ViewerError::NotFound(format!("no data for {} {}", symbol, timeframe)))?;
        let skip = rows.len().saturating_sub(limit);
        let candles: Vec<Candle> = rows.into_iter().skip(skip).map(|r| r.candle).collect();
        tracing::info!(symbol, %timeframe, count = candles.len(), "Loaded candles from CSV");
        Ok(candles)
    }

    async fn fetch_fakeouts(&self, query: &FakeoutQuery) -> Result<Vec<Fakeout>, ViewerError> {
        let fakeouts: Vec<Fakeout> = self.fakeouts_matching(query)?.into_iter().skip(query.offset).take(query.limit).collect();
        tracing::info!(count = fakeouts.len(), "Loaded fakeouts from CSV");
        Ok(fakeouts)
    }

    async fn fetch_fakeout(&self, key: &ContextKey) -> Result<Fakeout, ViewerError> {
        self.find_fakeout(key)
    }

    async fn fetch_context(&self, key: &ContextKey) -> Result<Vec<Candle>, ViewerError> {
        let Some(policy) = ContextPolicy::for_timeframe(key.timeframe) else {
            return Ok(Vec::new());
        };
        let event = self.find_fakeout(key)?;

        let window = policy.window(event.timestamp);
        let context: Vec<Candle> = self
            .read_table(&key.symbol, policy.granularity)?
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.candle)
            .filter(|c| window.contains(c.timestamp))
            .collect();
        tracing::info!(id = key.id, symbol = %key.symbol, count = context.len(), "Loaded context from CSV");
        Ok(context)
    }

    async fn fetch_summary_counts(&self) -> Result<SummaryCounts, ViewerError> {
        self.summary_counts_at(Utc::now())
    }

    async fn fetch_status(&self) -> Result<SystemStatus, ViewerError> {
        let mut latest_candles = BTreeMap::new();
        for symbol in &self.symbols {
            if let Some(last) = self.read_table(symbol, TimeFrame::Minute5)?.and_then(|rows| rows.last().cloned()) {
                latest_candles.insert(symbol.clone(), last.candle.timestamp.to_rfc3339());
            }
        }
        Ok(SystemStatus {
            status: "healthy".to_string(),
            database: format!("csv:{}", self.dir.display()),
            latest_candles,
            timestamp: Some(Utc::now().to_rfc3339()),
        })
    }
}

fn sniff_delimiter(path: &Path) -> Result<u8, ViewerError> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    Ok(if header.contains(';') { b';' } else { b',' })
}

fn load_rows_from_csv(path: &Path, symbol: &str, timeframe: TimeFrame) -> Result<Vec<TableRow>, ViewerError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(sniff_delimiter(path)?)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        let line = idx + 2;

        let fields = Fields { record: &record, headers: &headers, line };

        let timestamp = parse_timestamp(fields.required("timestamp")?)
            .map_err(|e| ViewerError::CsvDataFormatError(format!("Error parsing 'timestamp' at line {}: {}", line, e)))?;

        let id = match fields.get("id") {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|e| ViewerError::CsvDataFormatError(format!("Error parsing 'id' at line {}: {}", line, e)))?,
            None => (idx + 1) as i64,
        };

        let fakeout = match fields.get("fakeout_type") {
            Some(raw) => {
                let fakeout_type = raw
                    .parse::<FakeoutType>()
                    .map_err(|e| ViewerError::CsvDataFormatError(format!("{} at line {}", e, line)))?;
                Some((fakeout_type, fields.decimal("fakeout_level")?))
            }
            None => None,
        };

        rows.push(TableRow {
            id,
            candle: Candle {
                timestamp,
                symbol: symbol.to_lowercase(),
                timeframe,
                open: fields.decimal("open")?,
                high: fields.decimal("high")?,
                low: fields.decimal("low")?,
                close: fields.decimal("close")?,
                volume: fields.decimal("volume")?,
                rsi_8: fields.optional("rsi_8")?,
                ema_20: fields.optional("ema_20")?,
                ema_50: fields.optional("ema_50")?,
            },
            fakeout,
        });
    }
    Ok(rows)
}

/// Header-keyed access to one data row; `line` is the 1-based file line.
struct Fields<'a> {
    record: &'a StringRecord,
    headers: &'a StringRecord,
    line: usize,
}

impl<'a> Fields<'a> {
    /// The trimmed value, `None` when the column is missing or blank.
    fn get(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .position(|header| header == name)
            .and_then(|pos| self.record.get(pos))
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<&'a str, ViewerError> {
        self.get(name)
            .ok_or_else(|| ViewerError::CsvDataFormatError(format!("Missing '{}' field at line {}", name, self.line)))
    }

    fn decimal(&self, name: &str) -> Result<f64, ViewerError> {
        parse_decimal(self.required(name)?)
            .map_err(|e| ViewerError::CsvDataFormatError(format!("Error parsing '{}' at line {}: {}", name, self.line, e)))
    }

    fn optional(&self, name: &str) -> Result<Option<f64>, ViewerError> {
        match self.get(name) {
            Some(_) => self.decimal(name).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const HEADER: &str = "timestamp;open;high;low;close;volume;rsi_8;ema_20;ema_50;id;fakeout_type;fakeout_level";

    fn write_table(dir: &TempDir, name: &str, lines: &[String]) {
        let mut content = String::from(HEADER);
        for line in lines {
            content.push('\n');
            content.push_str(line);
        }
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    fn row(ts: DateTime<Utc>, close: f64, id: i64, fakeout: &str) -> String {
        let (kind, level) = match fakeout {
            "high" => ("high", "101"),
            "low" => ("low", "99"),
            _ => ("", ""),
        };
        format!(
            "{};100;102;98;{};12.5;;;;{};{};{}",
            ts.format("%Y-%m-%dT%H:%M:%S"),
            close,
            id,
            kind,
            level
        )
    }

    fn event_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn fixture() -> (TempDir, CsvDataSource) {
        let dir = TempDir::new().unwrap();
        let t = event_time();
        write_table(
            &dir,
            "btcusdt_1h.csv",
            &[
                row(t - Duration::hours(1), 100.5, 1, ""),
                row(t, 100.0, 2, "high"),
                row(t + Duration::hours(1), 99.5, 3, "low"),
            ],
        );
        let five_minute: Vec<String> = (-20..=30)
            .map(|i| row(t + Duration::minutes(5 * i), 100.0, 100 + i, ""))
            .collect();
        write_table(&dir, "btcusdt_5m.csv", &five_minute);
        write_table(&dir, "btcusdt_4h.csv", &[row(t, 100.0, 7, "low")]);
        let source = CsvDataSource::new(dir.path(), vec!["btcusdt".to_string(), "ethusdt".to_string()]);
        (dir, source)
    }

    #[tokio::test]
    async fn test_fetch_records_keeps_most_recent_rows() {
        let (_dir, source) = fixture();
        let candles = source.fetch_records("BTCUSDT", TimeFrame::Hour1, 2).await.unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, event_time());
        assert!(candles.iter().all(|c| c.symbol == "btcusdt" && c.rsi_8.is_none()));
    }

    #[tokio::test]
    async fn test_missing_table_is_an_error() {
        let (_dir, source) = fixture();
        let err = source.fetch_records("ethusdt", TimeFrame::Hour1, 10).await.unwrap_err();
        assert!(matches!(err, ViewerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_fakeouts_newest_first_with_query() {
        let (_dir, source) = fixture();
        let all = source.fetch_fakeouts(&FakeoutQuery::latest(10)).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 2, 7]);

        let mut query = FakeoutQuery::latest(10);
        query.fakeout_type = Some(FakeoutType::Low);
        query.timeframe = Some(TimeFrame::Hour1);
        let lows = source.fetch_fakeouts(&query).await.unwrap();
        assert_eq!(lows.len(), 1);
        assert_eq!(lows[0].fakeout_level, 99.0);

        let paged = source.fetch_fakeouts(&FakeoutQuery { offset: 1, limit: 1, ..FakeoutQuery::latest(0) }).await.unwrap();
        assert_eq!(paged[0].id, 2);
    }

    #[tokio::test]
    async fn test_fetch_context_applies_hourly_window() {
        let (_dir, source) = fixture();
        let key = ContextKey { id: 2, symbol: "btcusdt".into(), timeframe: TimeFrame::Hour1 };
        let context = source.fetch_context(&key).await.unwrap();
        // 5m candles from -60 to +120 minutes inclusive.
        assert_eq!(context.len(), 37);
        assert!(context.iter().all(|c| c.timeframe == TimeFrame::Minute5));
        assert_eq!(context.first().unwrap().timestamp, event_time() - Duration::hours(1));
    }

    #[tokio::test]
    async fn test_fetch_fakeout_finds_rows_past_the_list_limit() {
        let (_dir, source) = fixture();
        let newest = source.fetch_fakeouts(&FakeoutQuery::latest(1)).await.unwrap();
        assert!(newest.iter().all(|f| f.id != 2));

        let key = ContextKey { id: 2, symbol: "btcusdt".into(), timeframe: TimeFrame::Hour1 };
        let fakeout = source.fetch_fakeout(&key).await.unwrap();
        assert_eq!(fakeout.id, 2);
        assert_eq!(fakeout.fakeout_type, FakeoutType::High);
        assert_eq!(fakeout.timestamp, event_time());

        let plain_candle = ContextKey { id: 1, ..key };
        assert!(matches!(source.fetch_fakeout(&plain_candle).await, Err(ViewerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_four_hour_context_is_empty_without_reading() {
        let (_dir, source) = fixture();
        let key = ContextKey { id: 999, symbol: "btcusdt".into(), timeframe: TimeFrame::Hour4 };
        assert!(source.fetch_context(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_fakeout_id_is_not_found() {
        let (_dir, source) = fixture();
        let key = ContextKey { id: 1, symbol: "btcusdt".into(), timeframe: TimeFrame::Hour1 };
        assert!(matches!(source.fetch_context(&key).await, Err(ViewerError::NotFound(_))));
    }

    #[test]
    fn test_summary_counts_by_period_symbol_and_timeframe() {
        let (_dir, source) = fixture();
        let now = event_time() + Duration::hours(2);
        let counts = source.summary_counts_at(now).unwrap();
        assert_eq!(counts.today, 3);
        assert_eq!(counts.week, 3);
        assert_eq!(counts.by_symbol["BTCUSDT"], 3);
        assert_eq!(counts.by_symbol["ETHUSDT"], 0);
        assert_eq!(counts.by_timeframe["1h"], 2);
        assert_eq!(counts.by_timeframe["1d"], 0);

        let later = source.summary_counts_at(now + Duration::days(10)).unwrap();
        assert_eq!(later.today, 0);
        assert_eq!(later.week, 0);
        assert_eq!(later.month, 3);
    }

    #[tokio::test]
    async fn test_bad_price_reports_column_and_line() {
        let dir = TempDir::new().unwrap();
        write_table(&dir, "btcusdt_1d.csv", &["2024-06-01T00:00:00;abc;1;1;1;1;;;;;;".to_string()]);
        let source = CsvDataSource::new(dir.path(), vec!["btcusdt".to_string()]);
        let err = source.fetch_records("btcusdt", TimeFrame::Day1, 5).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Error parsing 'open' at line 2"), "{}", message);
    }

    #[tokio::test]
    async fn test_status_reports_latest_five_minute_candle() {
        let (_dir, source) = fixture();
        let status = source.fetch_status().await.unwrap();
        assert_eq!(status.status, "healthy");
        assert_eq!(
            status.latest_candles["btcusdt"],
            (event_time() + Duration::minutes(150)).to_rfc3339()
        );
        assert!(!status.latest_candles.contains_key("ethusdt"));
    }
}
