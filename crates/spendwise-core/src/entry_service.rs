//! Business logic helpers for manually entered transactions.

use chrono::NaiveDate;

use spendwise_domain::{is_credit_category, EntryId, Frequency, LedgerStore, Transaction};

use crate::{CoreError, RecurrenceService};

/// Raw fields of an entry form before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub bank_name: Option<String>,
}

/// A draft that passed validation; only these reach the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidEntry {
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub bank_name: Option<String>,
}

impl ValidEntry {
    pub fn into_transaction(self) -> Transaction {
        let mut txn = Transaction::new(self.amount, self.description, self.category, self.date);
        txn.bank_name = self.bank_name;
        txn
    }
}

impl EntryDraft {
    pub fn new(
        amount: f64,
        description: impl Into<String>,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            description: description.into(),
            category: category.into(),
            date,
            bank_name: None,
        }
    }

    pub fn with_bank(mut self, bank_name: impl Into<String>) -> Self {
        self.bank_name = Some(bank_name.into());
        self
    }

    /// Checks required fields and the credit-category bank rule.
    ///
    /// Bank names are kept only for credit categories; for every other
    /// category they are dropped rather than rejected.
    pub fn validate(self) -> Result<ValidEntry, CoreError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(CoreError::Validation(format!(
                "amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(CoreError::Validation("description is required".into()));
        }
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(CoreError::Validation("category is required".into()));
        }
        let bank_name = if is_credit_category(&category) {
            let bank = self
                .bank_name
                .map(|bank| bank.trim().to_string())
                .filter(|bank| !bank.is_empty())
                .ok_or_else(|| {
                    CoreError::Validation(format!("bank name is required for {category} entries"))
                })?;
            Some(bank)
        } else {
            None
        };
        Ok(ValidEntry {
            amount: self.amount,
            description,
            category,
            date: self.date,
            bank_name,
        })
    }
}

/// Parses an amount typed by the user, e.g. `"1250.50"`.
pub fn parse_amount(raw: &str) -> Result<f64, CoreError> {
    let trimmed = raw.trim();
    let amount: f64 = trimmed
        .parse()
        .map_err(|_| CoreError::Validation(format!("`{trimmed}` is not a valid amount")))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(CoreError::Validation(format!(
            "`{trimmed}` is not a valid amount"
        )));
    }
    Ok(amount)
}

/// Identifiers produced by a manual entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedEntry {
    pub transaction_id: EntryId,
    pub rule_id: Option<EntryId>,
}

/// Provides validated CRUD helpers for ledger transactions.
pub struct TransactionService;

impl TransactionService {
    /// Records a manual entry. With a `recurrence` the entry also becomes the
    /// first occurrence of a new rule whose cursor starts one period later.
    pub fn add(
        store: &mut LedgerStore,
        draft: EntryDraft,
        recurrence: Option<Frequency>,
    ) -> Result<AddedEntry, CoreError> {
        let transaction = draft.validate()?.into_transaction();
        let rule_id = recurrence
            .map(|frequency| RecurrenceService::create_from_entry(store, &transaction, frequency));
        let transaction_id = store.prepend_transaction(transaction);
        Ok(AddedEntry {
            transaction_id,
            rule_id,
        })
    }

    /// Inserts an already-built transaction, refusing duplicate ids.
    pub fn insert(store: &mut LedgerStore, transaction: Transaction) -> Result<EntryId, CoreError> {
        if store.transaction(&transaction.id).is_some() {
            return Err(CoreError::DuplicateId(transaction.id));
        }
        Ok(store.prepend_transaction(transaction))
    }

    /// Replaces the transaction wholesale, keeping its id and provenance.
    pub fn update(store: &mut LedgerStore, id: &EntryId, draft: EntryDraft) -> Result<(), CoreError> {
        let replacement = draft.validate()?.into_transaction();
        let txn = store
            .transaction_mut(id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.clone()))?;
        *txn = txn.replaced_by(replacement);
        Ok(())
    }

    /// Removes the transaction identified by `id`, returning the removed instance.
    pub fn remove(store: &mut LedgerStore, id: &EntryId) -> Result<Transaction, CoreError> {
        store
            .remove_transaction(id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.clone()))
    }

    /// Transactions newest date first; ties keep ledger order.
    pub fn list_by_date(store: &LedgerStore) -> Vec<&Transaction> {
        let mut transactions: Vec<&Transaction> = store.transactions.iter().collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        transactions
    }
}
