use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::coerce::{to_iso_date, to_number_safe, to_string_safe, Cell};
use crate::schema::{CanonicalField, FieldKind, HeaderMap};

/// One output row in the canonical schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "RegNo")]
    pub reg_no: String,
    #[serde(rename = "StudentName")]
    pub student_name: String,
    #[serde(rename = "Mobile")]
    pub mobile: String,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Batch")]
    pub batch: String,
    #[serde(rename = "Center")]
    pub center: String,
    #[serde(rename = "Scheme")]
    pub scheme: String,
    #[serde(rename = "Counselor")]
    pub counselor: String,
    #[serde(rename = "AdmissionDate")]
    pub admission_date: String,
    #[serde(rename = "DueDate")]
    pub due_date: String,
    #[serde(rename = "LastPaymentDate")]
    pub last_payment_date: String,
    #[serde(rename = "CourseFee")]
    pub course_fee: f64,
    #[serde(rename = "PaidAmount")]
    pub paid_amount: f64,
    #[serde(rename = "InstallmentAmount")]
    pub installment_amount: f64,
    #[serde(rename = "RemainingAmount")]
    pub remaining_amount: f64,
    #[serde(rename = "BadDebt")]
    pub bad_debt: f64,
    #[serde(rename = "Installment_status")]
    pub installment_status: String,
    #[serde(rename = "PaymentStatus")]
    pub payment_status: String,
    /// Raw header → cell text, only when original headers are requested.
    #[serde(rename = "_original", default, skip_serializing_if = "Option::is_none")]
    pub original: Option<BTreeMap<String, String>>,
}

/// Mutable access to the storage behind one canonical field.
enum Slot<'a> {
    Text(&'a mut String),
    Amount(&'a mut f64),
}

impl CanonicalRecord {
    fn slot(&mut self, field: CanonicalField) -> Slot<'_> {
        use CanonicalField as F;
        match field {
            F::RegNo => Slot::Text(&mut self.reg_no),
            F::StudentName => Slot::Text(&mut self.student_name),
            F::Mobile => Slot::Text(&mut self.mobile),
            F::Course => Slot::Text(&mut self.course),
            F::Batch => Slot::Text(&mut self.batch),
            F::Center => Slot::Text(&mut self.center),
            F::Scheme => Slot::Text(&mut self.scheme),
            F::Counselor => Slot::Text(&mut self.counselor),
            F::AdmissionDate => Slot::Text(&mut self.admission_date),
            F::DueDate => Slot::Text(&mut self.due_date),
            F::LastPaymentDate => Slot::Text(&mut self.last_payment_date),
            F::CourseFee => Slot::Amount(&mut self.course_fee),
            F::PaidAmount => Slot::Amount(&mut self.paid_amount),
            F::InstallmentAmount => Slot::Amount(&mut self.installment_amount),
            F::RemainingAmount => Slot::Amount(&mut self.remaining_amount),
            F::BadDebt => Slot::Amount(&mut self.bad_debt),
            F::InstallmentStatus => Slot::Text(&mut self.installment_status),
            F::PaymentStatus => Slot::Text(&mut self.payment_status),
        }
    }

    /// JSON keys this record serialises with, in schema order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = CanonicalField::ALL
            .iter()
            .map(|f| f.key().to_string())
            .collect();
        if self.original.is_some() {
            keys.push("_original".to_string());
        }
        keys
    }
}

/// Per-fetch options for [`map_row`].
#[derive(Debug, Clone, Copy)]
pub struct MapOptions {
    pub tz: FixedOffset,
    pub include_original_headers: bool,
}

/// True when every cell is blank; such rows are dropped before mapping.
pub fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

/// Map one raw row through `header_map`. Missing columns and short rows read as blank.
pub fn map_row(
    row: &[Cell],
    header_map: &HeaderMap,
    headers: &[String],
    opts: &MapOptions,
) -> CanonicalRecord {
    let mut record = CanonicalRecord::default();

    for field in CanonicalField::ALL {
        let cell = header_map
            .field(field)
            .and_then(|c| row.get(c.index))
            .unwrap_or(&Cell::Blank);
        match record.slot(field) {
            Slot::Amount(n) => *n = to_number_safe(cell),
            Slot::Text(s) if field.kind() == FieldKind::Date => *s = to_iso_date(cell, &opts.tz),
            Slot::Text(s) => *s = to_string_safe(cell, &opts.tz),
        }
    }

    if opts.include_original_headers {
        let original = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let cell = row.get(i).unwrap_or(&Cell::Blank);
                (h.clone(), to_string_safe(cell, &opts.tz))
            })
            .collect();
        record.original = Some(original);
    }

    record
}
