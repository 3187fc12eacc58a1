use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use super::date_parser;

/// A raw spreadsheet value as handed over by a data source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
    /// An instant; rendered as a calendar date after shifting into the output zone.
    Date(DateTime<Utc>),
    /// A calendar date already local to the sheet, e.g. a date-formatted serial.
    LocalDate(NaiveDate),
}

impl Cell {
    /// Build a cell from source text: empty text is blank, RFC 3339 timestamps are dates.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Blank;
        }
        match DateTime::parse_from_rfc3339(trimmed) {
            Ok(dt) => Cell::Date(dt.with_timezone(&Utc)),
            Err(_) => Cell::Text(raw.to_string()),
        }
    }

    /// Blank cells and whitespace-only text both count as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Date(_) | Cell::LocalDate(_) => false,
        }
    }
}

/// Never fails: blank → `""`, dates → `YYYY-MM-DD` in `tz`, everything else trimmed.
pub fn to_string_safe(cell: &Cell, tz: &FixedOffset) -> String {
    match cell {
        Cell::Blank => String::new(),
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => format_number(*n),
        Cell::Date(_) | Cell::LocalDate(_) => to_iso_date(cell, tz),
    }
}

/// Never fails and never yields NaN: anything unparseable is `0.0`.
pub fn to_number_safe(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            match cleaned.parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => 0.0,
            }
        }
        _ => 0.0,
    }
}

/// `YYYY-MM-DD` for anything that reads as a date, `""` otherwise.
pub fn to_iso_date(cell: &Cell, tz: &FixedOffset) -> String {
    let date = match cell {
        Cell::Blank => None,
        Cell::Date(dt) => Some(dt.with_timezone(tz).date_naive()),
        Cell::LocalDate(d) => Some(*d),
        Cell::Number(n) => date_parser::from_serial(*n),
        Cell::Text(s) => date_parser::parse_date(s, tz),
    };
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return String::new();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
