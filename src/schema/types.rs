// src/schema/types.rs

use serde::{Deserialize, Serialize};

/// How a canonical field's cell is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Amount,
    Status,
}

/// The fixed set of attributes every output record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    RegNo,
    StudentName,
    Mobile,
    Course,
    Batch,
    Center,
    Scheme,
    Counselor,
    AdmissionDate,
    DueDate,
    LastPaymentDate,
    CourseFee,
    PaidAmount,
    InstallmentAmount,
    RemainingAmount,
    BadDebt,
    InstallmentStatus,
    PaymentStatus,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 18] = [
        CanonicalField::RegNo,
        CanonicalField::StudentName,
        CanonicalField::Mobile,
        CanonicalField::Course,
        CanonicalField::Batch,
        CanonicalField::Center,
        CanonicalField::Scheme,
        CanonicalField::Counselor,
        CanonicalField::AdmissionDate,
        CanonicalField::DueDate,
        CanonicalField::LastPaymentDate,
        CanonicalField::CourseFee,
        CanonicalField::PaidAmount,
        CanonicalField::InstallmentAmount,
        CanonicalField::RemainingAmount,
        CanonicalField::BadDebt,
        CanonicalField::InstallmentStatus,
        CanonicalField::PaymentStatus,
    ];

    /// Key used both in the header map and in the JSON output.
    pub fn key(self) -> &'static str {
        match self {
            CanonicalField::RegNo => "RegNo",
            CanonicalField::StudentName => "StudentName",
            CanonicalField::Mobile => "Mobile",
            CanonicalField::Course => "Course",
            CanonicalField::Batch => "Batch",
            CanonicalField::Center => "Center",
            CanonicalField::Scheme => "Scheme",
            CanonicalField::Counselor => "Counselor",
            CanonicalField::AdmissionDate => "AdmissionDate",
            CanonicalField::DueDate => "DueDate",
            CanonicalField::LastPaymentDate => "LastPaymentDate",
            CanonicalField::CourseFee => "CourseFee",
            CanonicalField::PaidAmount => "PaidAmount",
            CanonicalField::InstallmentAmount => "InstallmentAmount",
            CanonicalField::RemainingAmount => "RemainingAmount",
            CanonicalField::BadDebt => "BadDebt",
            CanonicalField::InstallmentStatus => "Installment_status",
            CanonicalField::PaymentStatus => "PaymentStatus",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            CanonicalField::AdmissionDate
            | CanonicalField::DueDate
            | CanonicalField::LastPaymentDate => FieldKind::Date,
            CanonicalField::CourseFee
            | CanonicalField::PaidAmount
            | CanonicalField::InstallmentAmount
            | CanonicalField::RemainingAmount
            | CanonicalField::BadDebt => FieldKind::Amount,
            CanonicalField::InstallmentStatus | CanonicalField::PaymentStatus => FieldKind::Status,
            _ => FieldKind::Text,
        }
    }
}

/// A source column: its position in the header row and the header text as written.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct ColumnRef {
    pub index: usize,
    pub header: String,
}
