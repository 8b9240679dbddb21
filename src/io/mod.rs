//! Input/output helpers.
//!
//! - spreadsheet → record mapping (`document`)
//! - assessment JSON export (`export`)

pub mod document;
pub mod export;

pub use document::*;
pub use export::*;
