// Builds the detail screen for one fakeout: its context window, the fetched
// candles mapped to chart series, or an explicit empty / error placeholder.
//
// Like list loads, context fetches are split into open / complete with a
// generation token, so a response for a fakeout the operator already left is
// dropped instead of replacing the current screen.
use serde::Serialize;
use shared::models::{Candle, Fakeout};
use shared::utils::{format_indicator, format_price, format_timestamp, format_volume};
use shared::{ContextPolicy, ContextWindow};
use tracing::{error, info, warn};

use super::chart::ChartSeries;
use crate::error::ViewerError;
use crate::services::{ContextKey, DataSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailTicket(u64);

/// A context fetch the caller must run and hand back to `complete`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRequest {
    pub ticket: DetailTicket,
    pub key: ContextKey,
    pub window: ContextWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// 4h fakeouts are shown without context.
    NoContextByDesign,
    /// The fetch succeeded but returned nothing.
    NoCandles,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DetailPayload {
    Loading { loading: bool },
    Series(ChartSeries),
    Empty { empty: bool, reason: EmptyReason },
    Error { error: String },
}

impl DetailPayload {
    fn empty(reason: EmptyReason) -> Self {
        DetailPayload::Empty { empty: true, reason }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DetailPayload::Loading { .. })
    }
}

/// Display strings for the detail header, above the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailHeader {
    pub time: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub rsi_8: String,
    pub ema_20: String,
    pub ema_50: String,
    pub level: String,
}

impl From<&Fakeout> for DetailHeader {
    fn from(f: &Fakeout) -> Self {
        Self {
            time: format_timestamp(f.timestamp),
            open: format_price(f.open),
            high: format_price(f.high),
            low: format_price(f.low),
            close: format_price(f.close),
            volume: format_volume(f.volume),
            rsi_8: format_indicator(f.rsi_8),
            ema_20: format_indicator(f.ema_20),
            ema_50: format_indicator(f.ema_50),
            level: format_price(f.fakeout_level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub fakeout: Fakeout,
    pub header: DetailHeader,
    /// Legend text for the level line; depends on the fakeout side.
    pub level_meaning: &'static str,
    /// False when the row's own OHLC does not satisfy the detection rule.
    pub confirmed: bool,
    pub window: Option<ContextWindow>,
    pub expected_points: usize,
    pub payload: DetailPayload,
}

#[derive(Debug, Default)]
pub struct DetailAssembler {
    latest: u64,
    view: Option<DetailView>,
}

impl DetailAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Option<&DetailView> {
        self.view.as_ref()
    }

    /// Shows `fakeout` and returns the context fetch to run, if any. Any
    /// request issued by an earlier `open` becomes stale.
    pub fn open(&mut self, fakeout: Fakeout) -> Option<ContextRequest> {
        self.latest += 1;
        let confirmed = fakeout.is_confirmed();
        if !confirmed {
            warn!(id = fakeout.id, symbol = %fakeout.symbol, "Fakeout prices do not match its level");
        }
        let header = DetailHeader::from(&fakeout);
        let level_meaning = fakeout.describe_level();

        let Some(policy) = ContextPolicy::for_timeframe(fakeout.timeframe) else {
            info!(id = fakeout.id, timeframe = %fakeout.timeframe, "No context for this timeframe");
            self.view = Some(DetailView {
                fakeout,
                header,
                level_meaning,
                confirmed,
                window: None,
                expected_points: 0,
                payload: DetailPayload::empty(EmptyReason::NoContextByDesign),
            });
            return None;
        };

        let window = policy.window(fakeout.timestamp);
        let request = ContextRequest { ticket: DetailTicket(self.latest), key: ContextKey::from(&fakeout), window };
        info!(
            token = self.latest,
            id = fakeout.id,
            symbol = %fakeout.symbol,
            granularity = %window.granularity,
            "Requesting fakeout context"
        );
        self.view = Some(DetailView {
            fakeout,
            header,
            level_meaning,
            confirmed,
            window: Some(window),
            expected_points: window.expected_points(),
            payload: DetailPayload::Loading { loading: true },
        });
        Some(request)
    }

    /// Applies a context response. Returns false when the response was stale
    /// and dropped.
    pub fn complete(&mut self, ticket: DetailTicket, result: Result<Vec<Candle>, ViewerError>) -> bool {
        if ticket.0 != self.latest {
            warn!(token = ticket.0, latest = self.latest, "Dropping stale context response");
            return false;
        }
        let Some(view) = self.view.as_mut() else {
            return false;
        };
        let Some(window) = view.window else {
            return false;
        };

        view.payload = match result {
            Ok(context) if context.is_empty() => {
                info!(id = view.fakeout.id, "Context window is empty");
                DetailPayload::empty(EmptyReason::NoCandles)
            }
            Ok(context) => {
                let outside = context.iter().filter(|c| !window.contains(c.timestamp)).count();
                if outside > 0 {
                    warn!(id = view.fakeout.id, outside, start = %window.start, end = %window.end, "Context candles outside the window");
                }
                let series = ChartSeries::from_context(&context, view.fakeout.fakeout_level, window.granularity);
                info!(id = view.fakeout.id, points = series.len(), expected = view.expected_points, "Assembled detail chart");
                DetailPayload::Series(series)
            }
            Err(e) => {
                error!(id = view.fakeout.id, error = %e, "Context fetch failed");
                DetailPayload::Error { error: e.to_string() }
            }
        };
        true
    }

    /// Leaves the detail screen; a pending context fetch becomes stale.
    pub fn close(&mut self) {
        self.latest += 1;
        self.view = None;
    }

    /// Opens `fakeout` and, if its timeframe has context, fetches and applies it.
    pub async fn assemble(&mut self, source: &dyn DataSource, fakeout: Fakeout) -> Option<&DetailView> {
        if let Some(request) = self.open(fakeout) {
            let result = source.fetch_context(&request.key).await;
            self.complete(request.ticket, result);
        }
        self.view()
    }
}
