// src/source/csv.rs
use csv::ReaderBuilder;
use futures::future::BoxFuture;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::task;
use tracing::info;

use super::{SheetData, SheetSource, SpreadsheetLocator};
use crate::error::SourceError;
use crate::process::Cell;

/// A local "workbook": each spreadsheet is a directory under `root`, each tab a `<tab>.csv`.
pub struct CsvSource {
    root: PathBuf,
}

impl CsvSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve_dir(&self, locator: &SpreadsheetLocator) -> Result<PathBuf, SourceError> {
        match locator {
            SpreadsheetLocator::Id(id) => {
                let dir = self.root.join(id);
                if dir.is_dir() {
                    Ok(dir)
                } else {
                    Err(SourceError::NotFound(format!("Spreadsheet not found: {}", id)))
                }
            }
            SpreadsheetLocator::Name(name) => {
                let mut entries: Vec<PathBuf> = fs::read_dir(&self.root)?
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect();
                // read_dir order is platform dependent; sort so "first match" is stable
                entries.sort();
                entries
                    .into_iter()
                    .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(name.as_str()))
                    .ok_or_else(|| {
                        SourceError::NotFound(format!("Spreadsheet not found: {}", name))
                    })
            }
        }
    }

    fn read_blocking(
        &self,
        locator: &SpreadsheetLocator,
        sheet: &str,
    ) -> Result<SheetData, SourceError> {
        let dir = self.resolve_dir(locator)?;
        let title = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let path = dir.join(format!("{}.csv", sheet));
        if !path.is_file() {
            return Err(SourceError::NotFound(format!(
                "Sheet not found: {} (in spreadsheet {})",
                sheet, title
            )));
        }

        let rows = read_rows(&path)?;
        info!(spreadsheet = %title, sheet, rows = rows.len(), "read csv sheet");
        Ok(SheetData {
            spreadsheet: title,
            sheet: sheet.to_string(),
            rows,
        })
    }
}

fn read_rows(path: &Path) -> Result<Vec<Vec<Cell>>, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(rows)
}

impl SheetSource for CsvSource {
    fn read_sheet<'a>(
        &'a self,
        spreadsheet: &'a SpreadsheetLocator,
        sheet: &'a str,
    ) -> BoxFuture<'a, Result<SheetData, SourceError>> {
        let root = self.root.clone();
        let locator = spreadsheet.clone();
        let sheet = sheet.to_string();
        Box::pin(async move {
            task::spawn_blocking(move || CsvSource::new(root).read_blocking(&locator, &sheet))
                .await
                .map_err(|e| SourceError::Malformed(format!("csv reader task failed: {}", e)))?
        })
    }
}
