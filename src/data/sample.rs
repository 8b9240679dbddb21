//! The sample application spreadsheet.
//!
//! The sample ships inside the binary. A remote copy can be configured
//! instead (`MORTGAGE_SAMPLE_URL`); it is fetched once and cached in the
//! session directory for the rest of the process.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::info;

use crate::domain::PartialRecord;
use crate::error::AppError;
use crate::io::document::{DocumentFormat, parse_document_bytes};

/// Default file name used when saving the sample to disk.
pub const SAMPLE_DOWNLOAD_NAME: &str = "mortgage_application_sample.xlsx";

const SAMPLE_CACHE_NAME: &str = "docexample.xlsx";

static BUNDLED_SAMPLE: &[u8] = include_bytes!("../../assets/docexample.xlsx");

/// Where the sample spreadsheet comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSource {
    Bundled,
    Remote { url: String, cache_dir: Option<PathBuf> },
}

impl SampleSource {
    pub fn from_url(url: Option<&str>, cache_dir: Option<&Path>) -> Self {
        match url {
            Some(url) => SampleSource::Remote {
                url: url.to_string(),
                cache_dir: cache_dir.map(Path::to_path_buf),
            },
            None => SampleSource::Bundled,
        }
    }

    /// Spreadsheet format of the sample, judged from the remote URL.
    pub fn format(&self) -> DocumentFormat {
        match self {
            SampleSource::Bundled => DocumentFormat::Xlsx,
            SampleSource::Remote { url, .. } => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                DocumentFormat::from_path(Path::new(path)).unwrap_or(DocumentFormat::Xlsx)
            }
        }
    }

    /// Raw bytes of the sample spreadsheet.
    pub fn bytes(&self) -> Result<Vec<u8>, AppError> {
        match self {
            SampleSource::Bundled => Ok(BUNDLED_SAMPLE.to_vec()),
            SampleSource::Remote { url, cache_dir } => {
                let cached = cache_dir.as_ref().map(|dir| dir.join(SAMPLE_CACHE_NAME));
                if let Some(path) = &cached {
                    if let Ok(bytes) = fs::read(path) {
                        return Ok(bytes);
                    }
                }
                let bytes = fetch_remote(url)?;
                if let Some(path) = &cached {
                    // Caching is best effort; the fetched bytes are still usable.
                    let _ = fs::write(path, &bytes);
                }
                Ok(bytes)
            }
        }
    }
}

fn fetch_remote(url: &str) -> Result<Vec<u8>, AppError> {
    info!(%url, "fetching sample spreadsheet");
    let resp = Client::new()
        .get(url)
        .send()
        .map_err(|e| AppError::remote(format!("Sample download failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AppError::remote(format!(
            "Sample download failed with status {}.",
            resp.status()
        )));
    }

    resp.bytes()
        .map(|b| b.to_vec())
        .map_err(|e| AppError::remote(format!("Failed to read sample download: {e}")))
}

/// Map the sample spreadsheet exactly like an uploaded file.
pub fn load_sample_document(source: &SampleSource) -> Result<PartialRecord, AppError> {
    let bytes = source.bytes()?;
    parse_document_bytes(&bytes, source.format())
}

/// Write the sample spreadsheet to `dest`. A directory destination receives
/// the default file name.
pub fn download_sample_document(source: &SampleSource, dest: &Path) -> Result<PathBuf, AppError> {
    let path = if dest.is_dir() {
        dest.join(SAMPLE_DOWNLOAD_NAME)
    } else {
        dest.to_path_buf()
    };
    let bytes = source.bytes()?;
    fs::write(&path, bytes)
        .map_err(|e| AppError::input(format!("Failed to save sample '{}': {e}", path.display())))?;
    info!(path = %path.display(), "saved sample spreadsheet");
    Ok(path)
}
