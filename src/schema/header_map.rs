use std::collections::HashMap;
use tracing::debug;

use super::normalize::{canonical_key, is_status_candidate, normalize_header};
use super::types::{CanonicalField, ColumnRef};

/// Header text that wins outright among status candidates.
pub const EXACT_STATUS_HEADER: &str = "Installment_status";

/// How the ambiguous installment status column was resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusResolution {
    pub chosen: Option<ColumnRef>,
    /// Every candidate seen, in column order, chosen or not.
    pub candidates: Vec<ColumnRef>,
}

/// Canonical key → source column, built once per fetch from the header row.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    columns: HashMap<String, ColumnRef>,
    status: StatusResolution,
}

impl HeaderMap {
    /// Build the map from the raw header row.
    ///
    /// Non-status headers are last-write-wins. Headers that normalise to the
    /// installment status key are held back as candidates: the first whose
    /// trimmed text is exactly [`EXACT_STATUS_HEADER`] is chosen, otherwise
    /// the rightmost one. This rule is tied to the layout of one specific sheet,
    /// so reordering its columns changes which one is picked.
    pub fn build(headers: &[String]) -> Self {
        let mut columns = HashMap::new();
        let mut candidates = Vec::new();

        for (index, raw) in headers.iter().enumerate() {
            let normalized = normalize_header(raw);
            if normalized.is_empty() {
                continue;
            }
            let column = ColumnRef {
                index,
                header: raw.clone(),
            };
            if is_status_candidate(&normalized) {
                candidates.push(column);
                continue;
            }
            columns.insert(canonical_key(&normalized), column);
        }

        let chosen = candidates
            .iter()
            .find(|c| c.header.trim() == EXACT_STATUS_HEADER)
            .or_else(|| candidates.last())
            .cloned();

        if let Some(c) = &chosen {
            columns.insert(CanonicalField::InstallmentStatus.key().to_string(), c.clone());
        }
        debug!(
            mapped = columns.len(),
            candidates = candidates.len(),
            chosen = ?chosen.as_ref().map(|c| c.index),
            "built header map"
        );

        Self {
            columns,
            status: StatusResolution { chosen, candidates },
        }
    }

    pub fn get(&self, key: &str) -> Option<&ColumnRef> {
        self.columns.get(key)
    }

    pub fn field(&self, field: CanonicalField) -> Option<&ColumnRef> {
        self.get(field.key())
    }

    pub fn status(&self) -> &StatusResolution {
        &self.status
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
