//! Interactive spreadsheet picker.
//!
//! Kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the picker provides the "run `mortgage predict` and choose a file" UX
//!
//! Both the text prompt and the TUI upload screen use the same discovery.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::io::document::{DocumentFormat, validate_upload};

/// Default directory recursion depth for finding spreadsheets.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Prompt the user to select a spreadsheet from the current directory tree.
///
/// Accepts a number from the list or an explicit path; `q` cancels.
pub fn prompt_for_document_path() -> Result<PathBuf, AppError> {
    let files = discover_documents();
    if files.is_empty() {
        return Err(AppError::input(
            "No spreadsheets found. Provide one with `mortgage predict -f <file.xlsx>` or use --sample.",
        ));
    }

    println!("Found {} spreadsheet(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::input(format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::input(format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::input(
                "No input received. Provide a spreadsheet with `mortgage predict -f <file.xlsx>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::input("Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_document_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_document_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate the provided path points to a readable, supported spreadsheet.
pub fn validate_document_path(path: &Path) -> Result<PathBuf, AppError> {
    validate_upload(path)?;
    Ok(path.to_path_buf())
}

/// Discover spreadsheets under the current directory (deterministic order).
pub fn discover_documents() -> Vec<PathBuf> {
    find_documents(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

pub fn find_documents(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_documents_inner(root, 0, max_depth, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn find_documents_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            find_documents_inner(&path, depth + 1, max_depth, out);
            continue;
        }

        if file_type.is_file() && DocumentFormat::from_path(&path).is_some() && !is_lock_file(&path) {
            out.push(path);
        }
    }
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

// Office writes `~$name.xlsx` lock files next to open workbooks.
fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with("~$"))
}

pub fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_spreadsheets_and_skips_noise() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path();
        fs::create_dir_all(base.join("apps/2024")).unwrap();
        fs::create_dir_all(base.join("target")).unwrap();
        fs::write(base.join("b.csv"), "x").unwrap();
        fs::write(base.join("apps/a.xlsx"), "x").unwrap();
        fs::write(base.join("apps/2024/c.ods"), "x").unwrap();
        fs::write(base.join("apps/~$a.xlsx"), "x").unwrap();
        fs::write(base.join("target/d.xlsx"), "x").unwrap();
        fs::write(base.join("notes.txt"), "x").unwrap();

        let found: Vec<String> = find_documents(base, 4)
            .iter()
            .map(|p| p.strip_prefix(base).unwrap().display().to_string())
            .collect();
        assert_eq!(found, vec!["apps/2024/c.ods", "apps/a.xlsx", "b.csv"]);

        let shallow = find_documents(base, 0);
        assert_eq!(shallow.len(), 1);
    }
}
