// src/fetch/payload.rs

use serde::{Deserialize, Serialize};

use crate::process::CanonicalRecord;
use crate::schema::ColumnRef;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub sheet: String,
    pub spreadsheet: String,
    pub row_count: usize,
    /// RFC 3339 with the configured offset.
    pub fetched_at: String,
}

/// Header-resolution diagnostics; for troubleshooting, not for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub installment_status_column: Option<String>,
    pub installment_status_index: Option<usize>,
    pub installment_candidates: Vec<ColumnRef>,
    pub chosen_column: Option<ColumnRef>,
    pub all_headers: Vec<String>,
    pub sample_data_keys: Vec<String>,
}

/// The full read response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub success: bool,
    pub meta: Meta,
    pub columns: Vec<String>,
    pub data: Vec<CanonicalRecord>,
    pub debug: DebugInfo,
}

impl Payload {
    /// What a tab without a header or without data rows produces.
    pub fn empty(meta: Meta) -> Self {
        Self {
            success: true,
            meta,
            columns: Vec::new(),
            data: Vec::new(),
            debug: DebugInfo::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub success: bool,
    pub error: String,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
