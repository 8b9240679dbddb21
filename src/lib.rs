//! `mortgage-wizard` library crate.
//!
//! The binary (`mortgage`) is a thin wrapper around this library so that:
//!
//! - the wizard state machine, document mapping and submission logic are
//!   testable without a terminal
//! - the terminal UI and the one-shot CLI commands share the same code paths

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod session;
pub mod telemetry;
pub mod tui;
pub mod wizard;
