pub mod app;
pub mod config;
pub mod console;
pub mod crawler;
pub mod error;
pub mod menu;
pub mod models;
pub mod seller_api;
pub mod unit_merge;
pub mod workbook;

// Re-export key functions for convenience
pub use app::{init_tracing, run_dimensions, run_pipeline, run_scraper, run_unit_update};
pub use error::{ToolkitError, ToolkitResult};
