// HTTP client for the scanner backend's JSON API.
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::models::{Candle, CandleRow, Fakeout, SummaryCounts, SystemStatus, TimeFrame};
use shared::ContextPolicy;
use std::time::Duration;

use super::data_source::{ContextKey, DataSource, FakeoutQuery};
use crate::config::ApiSettings;
use crate::error::ViewerError;

#[derive(Debug, Deserialize)]
struct CandlesEnvelope {
    symbol: String,
    timeframe: TimeFrame,
    candles: Vec<CandleRow>,
}

#[derive(Debug, Deserialize)]
struct FakeoutsEnvelope {
    fakeouts: Vec<Fakeout>,
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    fakeout: Fakeout,
    #[serde(default)]
    context_candles: Vec<CandleRow>,
}

// FastAPI reports failures as {"detail": "..."}.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ViewerError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)
            .map_err(|e| ViewerError::ConfigError(format!("invalid api.base_url '{}': {}", base_url, e)))?;
        let http = reqwest::Client::builder()
            .user_agent("fakeout-viewer/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self { base_url, http })
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ViewerError> {
        Self::new(&settings.base_url, settings.timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ViewerError> {
        self.base_url
            .join(path)
            .map_err(|e| ViewerError::ConfigError(format!("cannot build url for '{}': {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ViewerError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, ?query, "GET");
        let resp = self.http.get(url).query(query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.detail)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
            tracing::error!(path, status = status.as_u16(), %message, "Backend request failed");
            return Err(ViewerError::StatusError { status: status.as_u16(), message });
        }

        Ok(serde_json::from_str(&body)?)
    }

    // One route serves both the fakeout row and its context candles.
    async fn fetch_detail(&self, key: &ContextKey) -> Result<DetailEnvelope, ViewerError> {
        let path = format!("api/fakeouts/{}", key.id);
        let params = [("symbol", key.symbol.to_lowercase()), ("timeframe", key.timeframe.as_str().to_string())];
        self.get_json(&path, &params).await
    }
}

#[async_trait]
impl DataSource for ApiClient {
    async fn fetch_records(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Result<Vec<Candle>, ViewerError> {
        let path = format!("api/candles/{}/{}", symbol.to_lowercase(), timeframe.as_str());
        let envelope: CandlesEnvelope = self.get_json(&path, &[("limit", limit.to_string())]).await?;
        tracing::info!(symbol = %envelope.symbol, timeframe = %envelope.timeframe, count = envelope.candles.len(), "Fetched candles");
        Ok(envelope
            .candles
            .into_iter()
            .map(|row| row.into_candle(&envelope.symbol, envelope.timeframe))
            .collect())
    }

    async fn fetch_fakeouts(&self, query: &FakeoutQuery) -> Result<Vec<Fakeout>, ViewerError> {
        let mut params = vec![("limit", query.limit.to_string()), ("offset", query.offset.to_string())];
        if let Some(symbol) = &query.symbol {
            params.push(("symbol", symbol.to_lowercase()));
        }
        if let Some(timeframe) = query.timeframe {
            params.push(("timeframe", timeframe.as_str().to_string()));
        }
        if let Some(fakeout_type) = query.fakeout_type {
            params.push(("fakeout_type", fakeout_type.as_str().to_string()));
        }
        let envelope: FakeoutsEnvelope = self.get_json("api/fakeouts", &params).await?;
        tracing::info!(count = envelope.fakeouts.len(), "Fetched fakeouts");
        Ok(envelope.fakeouts)
    }

    async fn fetch_fakeout(&self, key: &ContextKey) -> Result<Fakeout, ViewerError> {
        let envelope = self.fetch_detail(key).await?;
        tracing::info!(id = envelope.fakeout.id, symbol = %envelope.fakeout.symbol, "Fetched fakeout");
        Ok(envelope.fakeout)
    }

    async fn fetch_context(&self, key: &ContextKey) -> Result<Vec<Candle>, ViewerError> {
        let Some(policy) = ContextPolicy::for_timeframe(key.timeframe) else {
            return Ok(Vec::new());
        };
        let envelope = self.fetch_detail(key).await?;
        tracing::info!(
            id = envelope.fakeout.id,
            symbol = %envelope.fakeout.symbol,
            count = envelope.context_candles.len(),
            "Fetched fakeout context"
        );
        Ok(envelope
            .context_candles
            .into_iter()
            .map(|row| row.into_candle(&key.symbol, policy.granularity))
            .collect())
    }

    async fn fetch_summary_counts(&self) -> Result<SummaryCounts, ViewerError> {
        self.get_json("api/fakeouts/stats", &[]).await
    }

    async fn fetch_status(&self) -> Result<SystemStatus, ViewerError> {
        self.get_json("api/status", &[]).await
    }
}
