//! MCP tool implementations
//!
//! All reporting operations live in one data-driven table; see `reports`.

pub mod reports;

pub use reports::report_tools;
