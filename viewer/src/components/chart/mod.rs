// Chart-ready data for the fakeout detail screen.
pub mod series;

pub use series::ChartSeries;
