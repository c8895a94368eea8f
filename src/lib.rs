// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod history;
pub mod logging;
pub mod presenter;
pub mod runtime;
pub mod session;
pub mod time_series;
pub mod util;
pub mod words;
