use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::*;

/// A single expense attributed to one calendar day.
///
/// Transactions are never mutated field by field: an edit swaps in a new value
/// that keeps the original `id` and `recurring_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: EntryId,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    /// Rule that generated this instance. Provenance only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_id: Option<EntryId>,
}

impl Transaction {
    pub fn new(
        amount: f64,
        description: impl Into<String>,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            amount,
            description: description.into(),
            category: category.into(),
            date,
            bank_name: None,
            recurring_id: None,
        }
    }

    pub fn with_bank(mut self, bank_name: impl Into<String>) -> Self {
        self.bank_name = Some(bank_name.into());
        self
    }

    pub fn with_recurring_id(mut self, recurring_id: EntryId) -> Self {
        self.recurring_id = Some(recurring_id);
        self
    }

    /// Returns `true` when a recurring rule produced this transaction.
    pub fn is_generated(&self) -> bool {
        self.recurring_id.is_some()
    }

    /// Builds the replacement used by an edit: new contents, same identity.
    pub fn replaced_by(&self, mut replacement: Transaction) -> Transaction {
        replacement.id = self.id.clone();
        replacement.recurring_id = self.recurring_id.clone();
        replacement
    }
}

impl Identifiable for Transaction {
    fn entry_id(&self) -> &EntryId {
        &self.id
    }
}

impl Amounted for Transaction {
    fn amount(&self) -> f64 {
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_and_omits_empty_optionals() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let txn = Transaction::new(150.0, "Coffee", "Food", date);
        let json = serde_json::to_value(&txn).unwrap();

        assert_eq!(json["date"], "2024-05-01");
        assert!(json.get("bankName").is_none());
        assert!(json.get("recurringId").is_none());

        let loan = Transaction::new(5000.0, "Car", "Loan", date)
            .with_bank("SBI")
            .with_recurring_id(EntryId::from("rule-1"));
        let json = serde_json::to_value(&loan).unwrap();
        assert_eq!(json["bankName"], "SBI");
        assert_eq!(json["recurringId"], "rule-1");
    }

    #[test]
    fn replacement_keeps_identity_and_provenance() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let original =
            Transaction::new(10.0, "Rent", "Bills", date).with_recurring_id(EntryId::from("r"));
        let edited = original.replaced_by(Transaction::new(12.0, "Rent (new)", "Bills", date));

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.recurring_id, Some(EntryId::from("r")));
        assert_eq!(edited.amount, 12.0);
    }
}
