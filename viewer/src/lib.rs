// Fakeout viewer library: data sources, the list view pipeline and the detail
// assembler. The `fakeout-viewer` binary is a thin driver over these.
pub mod components;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
