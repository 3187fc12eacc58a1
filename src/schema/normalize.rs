use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Normalised spellings that all mean the ambiguous installment status column.
pub const STATUS_CANDIDATE_KEYS: &[&str] = &["installment_status", "installmentstatus"];

/// Normalised header → canonical key. Keys not listed here pass through unchanged.
static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        (
            "RegNo",
            &[
                "regno",
                "reg_no",
                "registration_no",
                "registration_number",
                "registrationno",
            ],
        ),
        (
            "StudentName",
            &["studentname", "student_name", "name", "student"],
        ),
        (
            "Mobile",
            &["mobile", "mobile_no", "mobileno", "phone", "contact", "contact_no"],
        ),
        ("Course", &["course", "course_name", "coursename", "program"]),
        ("Batch", &["batch", "batch_name", "batchname", "batch_code"]),
        ("Center", &["center", "centre", "center_name", "centre_name", "branch"]),
        ("Scheme", &["scheme", "fee_scheme", "payment_scheme"]),
        ("Counselor", &["counselor", "counsellor", "counselor_name", "counsellor_name"]),
        (
            "AdmissionDate",
            &["admissiondate", "admission_date", "date_of_admission", "doa"],
        ),
        ("DueDate", &["duedate", "due_date", "next_due_date"]),
        (
            "LastPaymentDate",
            &["lastpaymentdate", "last_payment_date", "last_paid_date", "payment_date"],
        ),
        ("CourseFee", &["coursefee", "course_fee", "total_fee", "totalfee", "fee"]),
        (
            "PaidAmount",
            &["paidamount", "paid_amount", "amount_paid", "total_paid", "paid"],
        ),
        (
            "InstallmentAmount",
            &["installmentamount", "installment_amount", "emi", "emi_amount"],
        ),
        (
            "RemainingAmount",
            &["remainingamount", "remaining_amount", "balance", "balance_amount", "due_amount"],
        ),
        ("BadDebt", &["baddebt", "bad_debt", "bad_debt_amount"]),
        (
            "PaymentStatus",
            &["paymentstatus", "payment_status", "status", "fee_status"],
        ),
    ];

    table
        .iter()
        .flat_map(|(canonical, spellings)| spellings.iter().map(move |s| (*s, *canonical)))
        .collect()
});

/// Lowercase, trim, keep only letters, digits, spaces and `_`, and collapse whitespace runs into `_`.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped: String = lowered
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Map a normalised header onto its canonical key.
pub fn canonical_key(normalized: &str) -> String {
    ALIASES
        .get(normalized)
        .map(|s| s.to_string())
        .unwrap_or_else(|| normalized.to_string())
}

pub fn is_status_candidate(normalized: &str) -> bool {
    STATUS_CANDIDATE_KEYS.contains(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::CanonicalField;

    #[test]
    fn normalizes_case_punctuation_and_spaces() {
        assert_eq!(normalize_header("  Remaining Amount "), "remaining_amount");
        assert_eq!(normalize_header("Bad-Debt"), "baddebt");
        assert_eq!(normalize_header("Reg. No."), "reg_no");
        assert_eq!(normalize_header("Installment_status"), "installment_status");
        assert_eq!(normalize_header("Installment   Status"), "installment_status");
        assert_eq!(normalize_header("InstallmentStatus"), "installmentstatus");
        assert_eq!(normalize_header("Fee (₹)"), "fee");
        assert_eq!(normalize_header("***"), "");
    }

    #[test]
    fn non_ascii_letters_survive() {
        assert_eq!(normalize_header("Élève"), "élève");
        assert_eq!(normalize_header("Nom de l'Élève"), "nom_de_lélève");
        assert_eq!(canonical_key(&normalize_header("Élève")), "élève");
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(canonical_key("remainingamount"), "RemainingAmount");
        assert_eq!(canonical_key("baddebt"), "BadDebt");
        assert_eq!(canonical_key("bad_debt"), "BadDebt");
        assert_eq!(canonical_key("regno"), "RegNo");
        assert_eq!(canonical_key("centre"), "Center");
    }

    #[test]
    fn unknown_keys_pass_through() {
        assert_eq!(canonical_key("remarks"), "remarks");
        assert_eq!(canonical_key("installment_status"), "installment_status");
    }

    #[test]
    fn every_canonical_field_has_an_alias() {
        for field in CanonicalField::ALL {
            if field == CanonicalField::InstallmentStatus {
                continue;
            }
            assert!(
                ALIASES.values().any(|v| *v == field.key()),
                "no alias for {}",
                field.key()
            );
        }
    }

    #[test]
    fn status_candidates() {
        assert!(is_status_candidate("installment_status"));
        assert!(is_status_candidate("installmentstatus"));
        assert!(!is_status_candidate("payment_status"));
    }
}
