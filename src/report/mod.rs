//! Report generation and chart-ready data.

pub mod chart;
pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report};
