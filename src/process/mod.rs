// src/process/mod.rs
pub mod coerce;
pub mod date_parser;
pub mod record;

pub use coerce::{to_iso_date, to_number_safe, to_string_safe, Cell};
pub use record::{is_blank_row, map_row, CanonicalRecord, MapOptions};
