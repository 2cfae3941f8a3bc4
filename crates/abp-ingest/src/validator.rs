//! Row-level validation: required fields and batch-scoped duplicate detection.

use std::collections::HashSet;

use abp_core::models::RowSnapshot;

/// The nine sanitized field values of one parsed row, in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFields {
    pub beneficiary_number: String,
    pub beneficiary_name: String,
    pub user_reference: String,
    pub settlement_date: String,
    pub bank_account_number: String,
    pub destination_bank_iin: String,
    pub beneficiary_aadhaar_number: String,
    pub user_credit_reference: String,
    pub amount: String,
}

impl RowFields {
    /// Composite key used for duplicate detection within one batch.
    pub fn row_key(&self) -> String {
        format!("{}-{}", self.user_reference, self.user_credit_reference)
    }

    pub fn snapshot(&self) -> RowSnapshot {
        RowSnapshot {
            beneficiary_number: self.beneficiary_number.clone(),
            beneficiary_name: self.beneficiary_name.clone(),
            user_reference: self.user_reference.clone(),
            settlement_date: self.settlement_date.clone(),
            bank_account_number: self.bank_account_number.clone(),
            destination_bank_iin: self.destination_bank_iin.clone(),
            beneficiary_aadhaar_number: self.beneficiary_aadhaar_number.clone(),
            user_credit_reference: self.user_credit_reference.clone(),
            amount: self.amount.clone(),
        }
    }

    /// The nine values in the documented output column order.
    pub fn columns(&self) -> [&str; 9] {
        [
            &self.beneficiary_number,
            &self.beneficiary_name,
            &self.user_reference,
            &self.settlement_date,
            &self.bank_account_number,
            &self.destination_bank_iin,
            &self.beneficiary_aadhaar_number,
            &self.user_credit_reference,
            &self.amount,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingFields,
    DuplicateRow,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingFields => "Missing or invalid required fields",
            RejectReason::DuplicateRow => {
                "Duplicate row based on userReference and userCreditReference"
            }
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Row accepted; carries the parsed amount.
    Accepted { amount: f64 },
    Rejected(RejectReason),
}

/// Validate one row against the required-field rules and the batch-scoped
/// duplicate set.
///
/// The required-field check takes precedence when a row is both incomplete
/// and a duplicate. On acceptance the row key is registered in `seen_keys`
/// as a side effect. Duplicate detection is batch-scoped only: it never
/// consults persisted storage, so a row identical to one from a previous
/// upload is not flagged here.
pub fn validate(fields: &RowFields, seen_keys: &mut HashSet<String>) -> ValidationOutcome {
    let amount = fields
        .amount
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite());

    let complete = !fields.beneficiary_number.is_empty()
        && !fields.beneficiary_name.is_empty()
        && !fields.user_reference.is_empty()
        && !fields.settlement_date.is_empty()
        && !fields.beneficiary_aadhaar_number.is_empty()
        && !fields.user_credit_reference.is_empty();

    let amount = match (complete, amount) {
        (true, Some(amount)) => amount,
        _ => return ValidationOutcome::Rejected(RejectReason::MissingFields),
    };

    if !seen_keys.insert(fields.row_key()) {
        return ValidationOutcome::Rejected(RejectReason::DuplicateRow);
    }

    ValidationOutcome::Accepted { amount }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_fields() -> RowFields {
        RowFields {
            beneficiary_number: "BN-001".to_string(),
            beneficiary_name: "Asha Devi".to_string(),
            user_reference: "UR-100".to_string(),
            settlement_date: "15082026".to_string(),
            bank_account_number: "123456789012".to_string(),
            destination_bank_iin: "508534".to_string(),
            beneficiary_aadhaar_number: "234123412341".to_string(),
            user_credit_reference: "UCR-9".to_string(),
            amount: "2500.50".to_string(),
        }
    }

    #[test]
    fn complete_row_is_accepted_and_key_registered() {
        let mut seen = HashSet::new();
        let fields = valid_fields();
        match validate(&fields, &mut seen) {
            ValidationOutcome::Accepted { amount } => assert_eq!(amount, 2500.50),
            other => panic!("expected acceptance, got {:?}", other),
        }
        assert!(seen.contains("UR-100-UCR-9"));
    }

    #[test]
    fn missing_required_field_rejects() {
        let mut seen = HashSet::new();
        let mut fields = valid_fields();
        fields.beneficiary_name.clear();
        assert_eq!(
            validate(&fields, &mut seen),
            ValidationOutcome::Rejected(RejectReason::MissingFields)
        );
        // Rejected rows must not reserve their key.
        assert!(seen.is_empty());
    }

    #[test]
    fn bank_account_and_iin_are_optional() {
        let mut seen = HashSet::new();
        let mut fields = valid_fields();
        fields.bank_account_number.clear();
        fields.destination_bank_iin.clear();
        assert!(matches!(
            validate(&fields, &mut seen),
            ValidationOutcome::Accepted { .. }
        ));
    }

    #[test]
    fn non_numeric_amount_rejects() {
        let mut seen = HashSet::new();
        let mut fields = valid_fields();
        fields.amount = "12a4".to_string();
        assert_eq!(
            validate(&fields, &mut seen),
            ValidationOutcome::Rejected(RejectReason::MissingFields)
        );
    }

    #[test]
    fn empty_amount_rejects() {
        let mut seen = HashSet::new();
        let mut fields = valid_fields();
        fields.amount.clear();
        assert_eq!(
            validate(&fields, &mut seen),
            ValidationOutcome::Rejected(RejectReason::MissingFields)
        );
    }

    #[test]
    fn infinite_amount_rejects() {
        let mut seen = HashSet::new();
        let mut fields = valid_fields();
        fields.amount = "inf".to_string();
        assert_eq!(
            validate(&fields, &mut seen),
            ValidationOutcome::Rejected(RejectReason::MissingFields)
        );
    }

    #[test]
    fn second_row_with_same_key_is_duplicate() {
        let mut seen = HashSet::new();
        let fields = valid_fields();
        assert!(matches!(
            validate(&fields, &mut seen),
            ValidationOutcome::Accepted { .. }
        ));
        assert_eq!(
            validate(&fields, &mut seen),
            ValidationOutcome::Rejected(RejectReason::DuplicateRow)
        );
    }

    #[test]
    fn missing_fields_takes_precedence_over_duplicate() {
        let mut seen = HashSet::new();
        seen.insert("UR-100-UCR-9".to_string());
        let mut fields = valid_fields();
        fields.settlement_date.clear();
        assert_eq!(
            validate(&fields, &mut seen),
            ValidationOutcome::Rejected(RejectReason::MissingFields)
        );
    }

    #[test]
    fn same_reference_different_credit_reference_is_not_duplicate() {
        let mut seen = HashSet::new();
        let fields = valid_fields();
        assert!(matches!(
            validate(&fields, &mut seen),
            ValidationOutcome::Accepted { .. }
        ));
        let mut second = valid_fields();
        second.user_credit_reference = "UCR-10".to_string();
        assert!(matches!(
            validate(&second, &mut seen),
            ValidationOutcome::Accepted { .. }
        ));
    }
}
