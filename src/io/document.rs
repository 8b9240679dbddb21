//! Spreadsheet → applicant record mapping.
//!
//! The first worksheet's first row holds column headers; only the first
//! non-blank row below it is read. Each known header (exact match) is coerced
//! by its field kind:
//!
//! - boolean: numeric `1` is `true`, anything else `false`
//! - code: the cell as text (`31.0` → `"31"`)
//! - numeric: the number, or unset when blank/not a number
//!
//! There is no further validation of types or ranges. Unknown columns are
//! ignored and missing ones are simply absent from the result.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use tracing::{debug, info};

use crate::domain::{Field, FieldKind, FieldValue, PartialRecord};
use crate::error::AppError;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Supported spreadsheet formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Xlsx,
    Xls,
    Xlsb,
    Ods,
    Csv,
}

impl DocumentFormat {
    pub const EXTENSIONS: [&'static str; 6] = ["xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" | "xlsm" => Some(DocumentFormat::Xlsx),
            "xls" => Some(DocumentFormat::Xls),
            "xlsb" => Some(DocumentFormat::Xlsb),
            "ods" => Some(DocumentFormat::Ods),
            "csv" => Some(DocumentFormat::Csv),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// A spreadsheet cell, reduced to what the mapping needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl Cell {
    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Bool(_) => false,
        }
    }

    /// Numeric reading of the cell, if it has one.
    fn as_number(&self) -> Option<f64> {
        let v = match self {
            Cell::Empty => return None,
            Cell::Number(n) => *n,
            Cell::Bool(b) => f64::from(u8::from(*b)),
            Cell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.parse::<f64>().ok()?
            }
        };
        v.is_finite().then_some(v)
    }
}

/// Header row plus the first data row of a sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    pub headers: Vec<String>,
    pub values: Vec<Cell>,
}

/// Check an upload before reading it: it must exist, be a file no larger
/// than [`MAX_UPLOAD_BYTES`], and have a supported extension.
pub fn validate_upload(path: &Path) -> Result<DocumentFormat, AppError> {
    let meta = fs::metadata(path)
        .map_err(|_| AppError::input(format!("File not found: {}", path.display())))?;
    if meta.is_dir() {
        return Err(AppError::input(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    if meta.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::input(format!(
            "File is too large. Maximum size is {}MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    DocumentFormat::from_path(path).ok_or_else(|| {
        AppError::input(format!(
            "File type not supported. Please upload {}",
            DocumentFormat::EXTENSIONS
                .iter()
                .map(|e| format!(".{e}"))
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

/// Read and map a user-selected spreadsheet.
pub fn parse_document(path: &Path) -> Result<PartialRecord, AppError> {
    let format = validate_upload(path)?;
    let bytes = fs::read(path)
        .map_err(|e| AppError::input(format!("Failed to read '{}': {e}", path.display())))?;
    let partial = parse_document_bytes(&bytes, format)?;
    info!(path = %path.display(), fields = partial.len(), "mapped uploaded document");
    Ok(partial)
}

/// Map an in-memory spreadsheet.
pub fn parse_document_bytes(bytes: &[u8], format: DocumentFormat) -> Result<PartialRecord, AppError> {
    let row = match format {
        DocumentFormat::Csv => read_csv_row(bytes)?,
        _ => read_workbook_row(bytes)?,
    };
    Ok(map_row(&row))
}

fn read_workbook_row(bytes: &[u8]) -> Result<SheetRow, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::input(format!("Error parsing the document: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::input("Error parsing the document: the workbook has no worksheets."))?
        .map_err(|e| AppError::input(format!("Error parsing the document: {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(SheetRow::default());
    };
    let headers = header_row.iter().map(|c| c.to_string()).collect();

    let values = rows
        .map(|r| r.iter().map(Cell::from).collect::<Vec<_>>())
        .find(|cells| cells.iter().any(|c| !c.is_blank()))
        .unwrap_or_default();

    Ok(SheetRow { headers, values })
}

fn read_csv_row(bytes: &[u8]) -> Result<SheetRow, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Error parsing the document: {e}")))?
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            // Spreadsheet tools often prefix UTF-8 CSVs with a BOM.
            if idx == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut values = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AppError::input(format!("Error parsing the document: {e}")))?;
        let cells: Vec<Cell> = record
            .iter()
            .map(|s| if s.trim().is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) })
            .collect();
        if cells.iter().any(|c| !c.is_blank()) {
            values = cells;
            break;
        }
    }

    Ok(SheetRow { headers, values })
}

/// Map one header/value row onto the known fields.
pub fn map_row(row: &SheetRow) -> PartialRecord {
    let mut partial = PartialRecord::new();
    if row.values.is_empty() {
        return partial;
    }

    for (idx, header) in row.headers.iter().enumerate() {
        let Some(field) = Field::from_column(header) else {
            continue;
        };
        let cell = row.values.get(idx).unwrap_or(&Cell::Empty);
        partial.insert(field, coerce(field, cell));
    }

    debug!(mapped = partial.len(), columns = row.headers.len(), "mapped spreadsheet row");
    partial
}

/// Coerce one cell according to the field's kind.
pub fn coerce(field: Field, cell: &Cell) -> FieldValue {
    match field.kind() {
        FieldKind::Boolean => FieldValue::Flag(cell.as_number() == Some(1.0)),
        FieldKind::Code => FieldValue::Code(code_text(cell)),
        FieldKind::Numeric => FieldValue::Number(cell.as_number()),
    }
}

fn code_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.clone(),
        Cell::Bool(b) => b.to_string(),
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => format!("{}", *n as i64),
        Cell::Number(n) => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn csv_bytes(rows: &[Vec<String>]) -> Vec<u8> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.write_record(row).unwrap();
        }
        writer.into_inner().unwrap()
    }

    #[test]
    fn boolean_cells_only_accept_one() {
        let field = Field::Married;
        assert_eq!(coerce(field, &Cell::Number(1.0)), FieldValue::Flag(true));
        assert_eq!(coerce(field, &Cell::Text("1".into())), FieldValue::Flag(true));
        assert_eq!(coerce(field, &Cell::Bool(true)), FieldValue::Flag(true));
        assert_eq!(coerce(field, &Cell::Number(0.0)), FieldValue::Flag(false));
        assert_eq!(coerce(field, &Cell::Number(2.0)), FieldValue::Flag(false));
        assert_eq!(coerce(field, &Cell::Text("Yes".into())), FieldValue::Flag(false));
        assert_eq!(coerce(field, &Cell::Empty), FieldValue::Flag(false));
    }

    #[test]
    fn code_cells_are_stringified() {
        let field = Field::LoanPurpose;
        assert_eq!(coerce(field, &Cell::Number(31.0)), FieldValue::Code("31".into()));
        assert_eq!(coerce(field, &Cell::Text("32".into())), FieldValue::Code("32".into()));
        // No validation against the known code set.
        assert_eq!(coerce(field, &Cell::Text("99".into())), FieldValue::Code("99".into()));
        assert_eq!(coerce(field, &Cell::Empty), FieldValue::Code(String::new()));
    }

    #[test]
    fn numeric_cells_parse_or_stay_unset() {
        let field = Field::TotalDebt;
        assert_eq!(coerce(field, &Cell::Number(1500.5)), FieldValue::Number(Some(1500.5)));
        assert_eq!(coerce(field, &Cell::Text(" 2500 ".into())), FieldValue::Number(Some(2500.0)));
        assert_eq!(coerce(field, &Cell::Text("".into())), FieldValue::Number(None));
        assert_eq!(coerce(field, &Cell::Text("n/a".into())), FieldValue::Number(None));
        assert_eq!(coerce(field, &Cell::Empty), FieldValue::Number(None));
    }

    #[test]
    fn unknown_and_missing_columns_are_skipped() {
        let row = SheetRow {
            headers: vec!["Favourite Colour".into(), "Wages & Salary".into()],
            values: vec![Cell::Text("blue".into()), Cell::Number(61_000.0)],
        };
        let partial = map_row(&row);
        assert_eq!(partial.len(), 1);
        assert_eq!(partial.get(Field::Wages), Some(&FieldValue::Number(Some(61_000.0))));
        assert!(!partial.contains(Field::ApplicantIncome));
    }

    #[test]
    fn header_match_is_exact() {
        let row = SheetRow {
            headers: vec!["wages & salary".into(), "Wages & Salary ".into()],
            values: vec![Cell::Number(1.0), Cell::Number(2.0)],
        };
        assert!(map_row(&row).is_empty());
    }

    #[test]
    fn csv_reads_first_data_row_only() {
        let bytes = csv_bytes(&[
            vec!["\u{feff}Household Income (2019 USD)".into(), Field::Married.column().into()],
            vec!["".into(), "".into()],
            vec!["90000".into(), "1".into()],
            vec!["12".into(), "0".into()],
        ]);
        let partial = parse_document_bytes(&bytes, DocumentFormat::Csv).unwrap();
        assert_eq!(partial.get(Field::ApplicantIncome), Some(&FieldValue::Number(Some(90_000.0))));
        assert_eq!(partial.get(Field::Married), Some(&FieldValue::Flag(true)));
    }

    #[test]
    fn header_only_sheet_maps_nothing() {
        let bytes = csv_bytes(&[vec!["Wages & Salary".into()]]);
        assert!(parse_document_bytes(&bytes, DocumentFormat::Csv).unwrap().is_empty());
    }

    #[test]
    fn corrupt_workbook_is_an_input_error() {
        let err = parse_document_bytes(b"definitely not a zip", DocumentFormat::Xlsx).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().starts_with("Error parsing the document"));
    }

    #[test]
    fn upload_validation() {
        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("notes.txt");
        fs::write(&txt, "hello").unwrap();
        assert!(validate_upload(&txt).unwrap_err().message().contains("not supported"));

        let big = dir.path().join("big.csv");
        let mut file = fs::File::create(&big).unwrap();
        file.write_all(&vec![b'a'; (MAX_UPLOAD_BYTES + 1) as usize]).unwrap();
        assert_eq!(
            validate_upload(&big).unwrap_err().message(),
            "File is too large. Maximum size is 10MB"
        );

        assert!(validate_upload(&dir.path().join("missing.xlsx")).is_err());
        assert!(validate_upload(dir.path()).is_err());

        let ok = dir.path().join("app.XLSX");
        fs::write(&ok, "x").unwrap();
        assert_eq!(validate_upload(&ok).unwrap(), DocumentFormat::Xlsx);
    }
}
