use serde::Serialize;
use shared::models::{Candle, TimeFrame};
use shared::utils::format_time_label;

/// Parallel series, one entry per context candle in ascending time order.
/// `level_series` repeats the fakeout level so it draws as a flat line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub close_series: Vec<f64>,
    pub high_series: Vec<f64>,
    pub low_series: Vec<f64>,
    pub level_series: Vec<f64>,
}

impl ChartSeries {
    pub fn from_context(context: &[Candle], level: f64, granularity: TimeFrame) -> Self {
        let mut ordered: Vec<&Candle> = context.iter().collect();
        ordered.sort_by_key(|c| c.timestamp);

        let mut series = Self {
            labels: Vec::with_capacity(ordered.len()),
            close_series: Vec::with_capacity(ordered.len()),
            high_series: Vec::with_capacity(ordered.len()),
            low_series: Vec::with_capacity(ordered.len()),
            level_series: vec![level; ordered.len()],
        };
        for candle in ordered {
            series.labels.push(format_time_label(candle.timestamp, granularity));
            series.close_series.push(candle.close);
            series.high_series.push(candle.high);
            series.low_series.push(candle.low);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
