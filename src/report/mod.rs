//! Reporting utilities: currency/probability formatting and text summaries.
//!
//! Formatting lives in one place so the TUI and the CLI render identically.

pub mod format;

pub use format::*;
