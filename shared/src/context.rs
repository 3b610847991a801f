// Context windows drawn around a fakeout on its detail chart.
//
// The window is a fixed convention shared with the backend: hourly events are
// shown on 5m candles from one hour before to two hours after, 4h events have
// no context at all, and everything else is shown on 1h candles spanning a day
// either side.
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::TimeFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextPolicy {
    pub granularity: TimeFrame,
    #[serde(skip)]
    pub before: Duration,
    #[serde(skip)]
    pub after: Duration,
}

impl ContextPolicy {
    /// `None` means the timeframe has no context by design.
    pub fn for_timeframe(timeframe: TimeFrame) -> Option<Self> {
        match timeframe {
            TimeFrame::Hour1 => Some(Self {
                granularity: TimeFrame::Minute5,
                before: Duration::hours(1),
                after: Duration::hours(2),
            }),
            TimeFrame::Hour4 => None,
            _ => Some(Self {
                granularity: TimeFrame::Hour1,
                before: Duration::hours(24),
                after: Duration::hours(24),
            }),
        }
    }

    pub fn window(&self, event: DateTime<Utc>) -> ContextWindow {
        ContextWindow {
            start: event - self.before,
            end: event + self.after,
            granularity: self.granularity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub granularity: TimeFrame,
}

impl ContextWindow {
    /// Inclusive on both ends.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Number of granularity buckets the window can hold, endpoints included.
    pub fn expected_points(&self) -> usize {
        let step = self.granularity.duration().num_seconds();
        let span = (self.end - self.start).num_seconds();
        if step <= 0 || span < 0 {
            return 0;
        }
        (span / step) as usize + 1
    }
}
