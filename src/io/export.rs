//! Export a submitted application and its prediction to JSON.
//!
//! The file bundles the exact request body that was sent, the response, and
//! when it was generated, so a run can be inspected or replayed later.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::data::predict::{PredictionRequest, normalize};
use crate::domain::{FormRecord, PredictionResult};
use crate::error::AppError;

/// On-disk layout of an exported assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFile {
    pub tool: String,
    pub generated_at: DateTime<Local>,
    pub request: PredictionRequest,
    pub result: PredictionResult,
}

/// Write an assessment JSON file.
pub fn write_result_json(path: &Path, record: &FormRecord, result: &PredictionResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create result JSON '{}': {e}", path.display())))?;

    let assessment = AssessmentFile {
        tool: "mortgage".to_string(),
        generated_at: Local::now(),
        request: normalize(record),
        result: result.clone(),
    };

    serde_json::to_writer_pretty(file, &assessment)
        .map_err(|e| AppError::input(format!("Failed to write result JSON: {e}")))?;

    Ok(())
}

/// Read an assessment JSON file.
pub fn read_result_json(path: &Path) -> Result<AssessmentFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open result JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid result JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_keeps_request_and_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessment.json");

        let mut record = FormRecord::new();
        record.saving = Some(7_500.0);
        record.in_labor_force = true;
        let result = PredictionResult {
            prediction: Some(210_000.0),
            range_low: Some(190_000.0),
            range_high: Some(230_000.0),
            approved: true,
            approval_probability: Some(0.64),
            explanation: None,
        };

        write_result_json(&path, &record, &result).unwrap();
        let back = read_result_json(&path).unwrap();

        assert_eq!(back.tool, "mortgage");
        assert_eq!(back.result, result);
        assert_eq!(back.request["scf_SAVING"].as_f64(), Some(7_500.0));
        assert_eq!(back.request["scf_LF"].as_u64(), Some(1));
    }
}
