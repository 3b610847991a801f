pub mod api_client;
pub mod csv_source;
pub mod data_source;

pub use api_client::ApiClient;
pub use csv_source::CsvDataSource;
pub use data_source::{ContextKey, DataSource, FakeoutQuery, LoadCriteria, Loadable};
