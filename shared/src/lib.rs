pub mod context;
pub mod models;
pub mod utils;

// Models are shared between the API client, the offline CSV source and the
// view pipeline, so they live here rather than in the viewer crate.
pub use context::{ContextPolicy, ContextWindow};
pub use models::{Candle, CandleRow, Fakeout, FakeoutType, MarketRecord, SummaryCounts, SystemStatus, TimeFrame};
