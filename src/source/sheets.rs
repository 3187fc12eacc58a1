// src/source/sheets.rs
use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{SheetData, SheetSource, SpreadsheetLocator};
use crate::error::SourceError;
use crate::process::date_parser::from_serial;
use crate::process::Cell;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/";
const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3/";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials for the Google REST APIs.
#[derive(Debug, Clone)]
pub enum SheetsAuth {
    ApiKey(String),
    Bearer(String),
}

/// Reads a tab through the Google Sheets v4 values API, resolving names through Drive v3.
pub struct SheetsSource {
    client: Client,
    auth: SheetsAuth,
    sheets_base: Url,
    drive_base: Url,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    properties: TitleProps,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: TitleProps,
}

#[derive(Deserialize)]
struct TitleProps {
    title: String,
}

/// `spreadsheets.get` with grid data, trimmed by the field mask to typed cell values.
#[derive(Deserialize)]
struct GridSpreadsheet {
    #[serde(default)]
    sheets: Vec<GridSheet>,
}

#[derive(Deserialize)]
struct GridSheet {
    #[serde(default)]
    data: Vec<GridData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridData {
    #[serde(default)]
    row_data: Vec<RowData>,
}

#[derive(Deserialize)]
struct RowData {
    #[serde(default)]
    values: Vec<CellData>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CellData {
    effective_value: Option<ExtendedValue>,
    effective_format: Option<CellFormat>,
    formatted_value: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExtendedValue {
    number_value: Option<f64>,
    string_value: Option<String>,
    bool_value: Option<bool>,
    error_value: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellFormat {
    number_format: Option<NumberFormat>,
}

#[derive(Deserialize)]
struct NumberFormat {
    #[serde(rename = "type")]
    kind: Option<String>,
}

const GRID_FIELDS: &str = "sheets.data.rowData.values(effectiveValue,effectiveFormat.numberFormat.type,formattedValue)";

impl SheetsSource {
    pub fn new(auth: SheetsAuth) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).gzip(true).build()?;
        Ok(Self {
            client,
            auth,
            sheets_base: Url::parse(SHEETS_BASE).map_err(|e| SourceError::Malformed(e.to_string()))?,
            drive_base: Url::parse(DRIVE_BASE).map_err(|e| SourceError::Malformed(e.to_string()))?,
        })
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            SheetsAuth::ApiKey(key) => req.query(&[("key", key.as_str())]),
            SheetsAuth::Bearer(token) => req.bearer_auth(token),
        }
    }

    /// Resolve a locator to a spreadsheet id. Name lookups take the first match.
    async fn resolve_id(&self, locator: &SpreadsheetLocator) -> Result<String, SourceError> {
        let name = match locator {
            SpreadsheetLocator::Id(id) => return Ok(id.clone()),
            SpreadsheetLocator::Name(name) => name,
        };

        let url = join(&self.drive_base, &["files"])?;
        let resp = self
            .authorize(self.client.get(url))
            .query(&[
                ("q", drive_name_query(name).as_str()),
                ("fields", "files(id,name)"),
                ("pageSize", "10"),
            ])
            .send()
            .await?
            .error_for_status()?;
        let list: FileList = resp.json().await?;

        if list.files.len() > 1 {
            debug!(name = %name, matches = list.files.len(), "name lookup is ambiguous, taking first");
        }
        list.files
            .into_iter()
            .next()
            .map(|f| {
                debug!(name = %f.name, id = %f.id, "resolved spreadsheet by name");
                f.id
            })
            .ok_or_else(|| SourceError::NotFound(format!("Spreadsheet not found: {}", name)))
    }

    async fn metadata(&self, id: &str) -> Result<SpreadsheetMeta, SourceError> {
        let url = join(&self.sheets_base, &["spreadsheets", id])?;
        let resp = self
            .authorize(self.client.get(url))
            .query(&[("fields", "properties.title,sheets.properties.title")])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!("Spreadsheet not found: {}", id)));
        }
        Ok(resp.error_for_status()?.json().await?)
    }

    /// Typed cells of one tab. Date-formatted numbers come back as serials, so their
    /// meaning does not depend on the spreadsheet locale.
    async fn grid(&self, id: &str, sheet: &str) -> Result<Vec<Vec<Cell>>, SourceError> {
        let url = join(&self.sheets_base, &["spreadsheets", id])?;
        let grid: GridSpreadsheet = self
            .authorize(self.client.get(url))
            .query(&[
                ("ranges", a1_sheet_range(sheet).as_str()),
                ("includeGridData", "true"),
                ("fields", GRID_FIELDS),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(rows_from_grid(grid))
    }

    async fn read(
        &self,
        locator: &SpreadsheetLocator,
        sheet: &str,
    ) -> Result<SheetData, SourceError> {
        let id = self.resolve_id(locator).await?;
        let meta = self.metadata(&id).await?;
        if !meta.sheets.iter().any(|s| s.properties.title == sheet) {
            return Err(SourceError::NotFound(format!(
                "Sheet not found: {} (in spreadsheet {})",
                sheet, meta.properties.title
            )));
        }

        let rows = self.grid(&id, sheet).await?;
        info!(spreadsheet = %meta.properties.title, sheet, rows = rows.len(), "read sheet");

        Ok(SheetData {
            spreadsheet: meta.properties.title,
            sheet: sheet.to_string(),
            rows,
        })
    }
}

impl SheetSource for SheetsSource {
    fn read_sheet<'a>(
        &'a self,
        spreadsheet: &'a SpreadsheetLocator,
        sheet: &'a str,
    ) -> BoxFuture<'a, Result<SheetData, SourceError>> {
        Box::pin(self.read(spreadsheet, sheet))
    }
}

fn join(base: &Url, segments: &[&str]) -> Result<Url, SourceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SourceError::Malformed(format!("cannot-be-a-base URL: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// A1 range covering a whole tab: `'Tab Name'` with embedded quotes doubled.
fn a1_sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

fn drive_name_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME
    )
}

/// Flatten grid data into rows, dropping trailing blank cells and rows the way the
/// values API does.
fn rows_from_grid(grid: GridSpreadsheet) -> Vec<Vec<Cell>> {
    let mut rows: Vec<Vec<Cell>> = grid
        .sheets
        .into_iter()
        .flat_map(|s| s.data)
        .flat_map(|d| d.row_data)
        .map(|r| {
            let mut row: Vec<Cell> = r.values.into_iter().map(cell_from_grid).collect();
            while row.last().map_or(false, Cell::is_blank) {
                row.pop();
            }
            row
        })
        .collect();
    while rows.last().map_or(false, |r| r.is_empty()) {
        rows.pop();
    }
    rows
}

fn cell_from_grid(cell: CellData) -> Cell {
    let is_date = matches!(
        cell.effective_format
            .as_ref()
            .and_then(|f| f.number_format.as_ref())
            .and_then(|n| n.kind.as_deref()),
        Some("DATE") | Some("DATE_TIME")
    );
    let value = match cell.effective_value {
        Some(v) => v,
        None => return Cell::Blank,
    };

    if let Some(n) = value.number_value {
        if is_date {
            if let Some(d) = from_serial(n) {
                return Cell::LocalDate(d);
            }
        }
        return Cell::Number(n);
    }
    if let Some(s) = value.string_value {
        return Cell::from_text(&s);
    }
    if let Some(b) = value.bool_value {
        return Cell::Text(if b { "TRUE" } else { "FALSE" }.to_string());
    }
    if value.error_value.is_some() {
        // e.g. #N/A; the formatted text is what the sheet shows
        return cell.formatted_value.map_or(Cell::Blank, |s| Cell::from_text(&s));
    }
    Cell::Blank
}
