//! Domain types used throughout the wizard.
//!
//! This module defines:
//!
//! - the applicant field catalogue (`Field`, `FieldKind`, `Section`)
//! - the applicant record (`FormRecord`, `FieldValue`, `PartialRecord`)
//! - the prediction service response (`PredictionResult`)

pub mod types;

pub use types::*;
