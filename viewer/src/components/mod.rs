// Screen-level building blocks behind the list and detail views.
pub mod chart;
pub mod detail;

pub use chart::ChartSeries;
pub use detail::{ContextRequest, DetailAssembler, DetailHeader, DetailPayload, DetailTicket, DetailView, EmptyReason};
