//! Remote data: the prediction service and the sample spreadsheet.

pub mod predict;
pub mod sample;

pub use predict::{PredictionClient, PredictionRequest, PredictionService, normalize};
pub use sample::{SampleSource, download_sample_document, load_sample_document};
