// src/source/mod.rs
use futures::future::BoxFuture;
use std::fmt;

use crate::error::SourceError;
use crate::process::Cell;

pub mod csv;
pub mod sheets;

pub use self::csv::CsvSource;
pub use self::sheets::{SheetsAuth, SheetsSource};

/// How to find the spreadsheet: a direct identifier, or an exact name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetLocator {
    Id(String),
    Name(String),
}

impl fmt::Display for SpreadsheetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadsheetLocator::Id(id) => write!(f, "id {}", id),
            SpreadsheetLocator::Name(name) => write!(f, "name {}", name),
        }
    }
}

/// The used range of one tab: header row first, then data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    /// Resolved spreadsheet title.
    pub spreadsheet: String,
    pub sheet: String,
    pub rows: Vec<Vec<Cell>>,
}

/// A tabular backend exposing named tabs as 2-D cell arrays.
pub trait SheetSource: Send + Sync {
    /// Read the whole used range of `sheet`. A missing spreadsheet or tab is
    /// [`SourceError::NotFound`].
    fn read_sheet<'a>(
        &'a self,
        spreadsheet: &'a SpreadsheetLocator,
        sheet: &'a str,
    ) -> BoxFuture<'a, Result<SheetData, SourceError>>;
}
