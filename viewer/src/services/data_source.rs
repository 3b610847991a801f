// The seam between the view pipeline and wherever records come from.
use async_trait::async_trait;
use serde::Serialize;
use shared::models::{Candle, Fakeout, FakeoutType, MarketRecord, SummaryCounts, SystemStatus, TimeFrame};
use std::fmt;

use crate::error::ViewerError;

/// What a candle list load asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadCriteria {
    pub symbol: String,
    pub timeframe: TimeFrame,
    /// Row-count ceiling.
    pub limit: usize,
}

/// Server-side narrowing for a fakeout list load. Client-side filters still
/// apply on top of whatever comes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FakeoutQuery {
    pub symbol: Option<String>,
    pub timeframe: Option<TimeFrame>,
    pub fakeout_type: Option<FakeoutType>,
    pub limit: usize,
    pub offset: usize,
}

impl FakeoutQuery {
    pub fn latest(limit: usize) -> Self {
        Self { symbol: None, timeframe: None, fakeout_type: None, limit, offset: 0 }
    }

    pub fn matches(&self, fakeout: &Fakeout) -> bool {
        self.symbol.as_deref().map_or(true, |s| fakeout.symbol == s.to_lowercase())
            && self.timeframe.map_or(true, |tf| fakeout.timeframe == tf)
            && self.fakeout_type.map_or(true, |t| fakeout.fakeout_type == t)
    }
}

/// Identifies the fakeout whose context window is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextKey {
    pub id: i64,
    pub symbol: String,
    pub timeframe: TimeFrame,
}

impl From<&Fakeout> for ContextKey {
    fn from(fakeout: &Fakeout) -> Self {
        Self { id: fakeout.id, symbol: fakeout.symbol.clone(), timeframe: fakeout.timeframe }
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Up to `limit` most recent candles, oldest first.
    async fn fetch_records(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Result<Vec<Candle>, ViewerError>;

    /// Most recent fakeouts first.
    async fn fetch_fakeouts(&self, query: &FakeoutQuery) -> Result<Vec<Fakeout>, ViewerError>;

    /// A single fakeout by id, however old.
    async fn fetch_fakeout(&self, key: &ContextKey) -> Result<Fakeout, ViewerError>;

    /// Candles surrounding a fakeout, at the granularity its context policy
    /// prescribes.
    async fn fetch_context(&self, key: &ContextKey) -> Result<Vec<Candle>, ViewerError>;

    async fn fetch_summary_counts(&self) -> Result<SummaryCounts, ViewerError>;

    async fn fetch_status(&self) -> Result<SystemStatus, ViewerError>;
}

/// Record types a list view can load, with the criteria used to fetch them.
#[async_trait]
pub trait Loadable: MarketRecord + Sized + Send + Sync {
    type Criteria: fmt::Debug + Send + Sync;

    async fn fetch(source: &dyn DataSource, criteria: &Self::Criteria) -> Result<Vec<Self>, ViewerError>;
}

#[async_trait]
impl Loadable for Candle {
    type Criteria = LoadCriteria;

    async fn fetch(source: &dyn DataSource, criteria: &LoadCriteria) -> Result<Vec<Self>, ViewerError> {
        source.fetch_records(&criteria.symbol, criteria.timeframe, criteria.limit).await
    }
}

#[async_trait]
impl Loadable for Fakeout {
    type Criteria = FakeoutQuery;

    async fn fetch(source: &dyn DataSource, criteria: &FakeoutQuery) -> Result<Vec<Self>, ViewerError> {
        source.fetch_fakeouts(criteria).await
    }
}
