use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use spendwise_domain::{
    is_credit_category, CategoryItem, LedgerStore, RecurringRule, Transaction,
};

use crate::CoreError;

pub const EXPENSES_KEY: &str = "spendwise-expenses";
pub const RECURRING_KEY: &str = "spendwise-recurring";
pub const CUSTOM_CATEGORIES_KEY: &str = "spendwise-custom-categories";
pub const BUDGET_KEY: &str = "spendwise-budget";

/// Every key the ledger persists.
pub const LEDGER_KEYS: [&str; 4] = [EXPENSES_KEY, RECURRING_KEY, CUSTOM_CATEGORIES_KEY, BUDGET_KEY];

/// Abstraction over key/value backends that hold the persisted ledger blobs.
pub trait BlobStore: Send + Sync {
    /// Returns `None` when nothing was ever written under `key`.
    fn read_blob(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn write_blob(&self, key: &str, value: &str) -> Result<(), CoreError>;
    /// Removing an absent key is not an error.
    fn remove_blob(&self, key: &str) -> Result<(), CoreError>;
}

/// In-process blob store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .lock()
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl BlobStore for MemoryBlobStore {
    fn read_blob(&self, key: &str) -> Result<Option<String>, CoreError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| CoreError::Storage("memory blob store poisoned".into()))?;
        Ok(blobs.get(key).cloned())
    }

    fn write_blob(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| CoreError::Storage("memory blob store poisoned".into()))?;
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_blob(&self, key: &str) -> Result<(), CoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| CoreError::Storage("memory blob store poisoned".into()))?;
        blobs.remove(key);
        Ok(())
    }
}

/// Maps a [`LedgerStore`] onto its four blobs.
#[derive(Debug, Clone)]
pub struct LedgerRepository<S: BlobStore> {
    blobs: S,
    default_budget: f64,
}

impl<S: BlobStore> LedgerRepository<S> {
    pub fn new(blobs: S, default_budget: f64) -> Self {
        Self {
            blobs,
            default_budget,
        }
    }

    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    pub fn default_budget(&self) -> f64 {
        self.default_budget
    }

    /// Reads every blob; absent keys yield empty collections and the default
    /// budget. Malformed collections are an error.
    pub fn load(&self) -> Result<LedgerStore, CoreError> {
        Ok(LedgerStore {
            transactions: self.read_list::<Transaction>(EXPENSES_KEY)?,
            recurring_rules: self.read_list::<RecurringRule>(RECURRING_KEY)?,
            custom_categories: self.read_list::<CategoryItem>(CUSTOM_CATEGORIES_KEY)?,
            budget: self.read_budget()?,
        })
    }

    pub fn save(&self, store: &LedgerStore) -> Result<(), CoreError> {
        self.save_transactions(&store.transactions)?;
        self.save_rules(&store.recurring_rules)?;
        self.save_custom_categories(&store.custom_categories)?;
        self.save_budget(store.budget)
    }

    pub fn save_transactions(&self, transactions: &[Transaction]) -> Result<(), CoreError> {
        self.write_list(EXPENSES_KEY, transactions)
    }

    pub fn save_rules(&self, rules: &[RecurringRule]) -> Result<(), CoreError> {
        self.write_list(RECURRING_KEY, rules)
    }

    pub fn save_custom_categories(&self, categories: &[CategoryItem]) -> Result<(), CoreError> {
        self.write_list(CUSTOM_CATEGORIES_KEY, categories)
    }

    pub fn save_budget(&self, budget: f64) -> Result<(), CoreError> {
        self.blobs.write_blob(BUDGET_KEY, &budget.to_string())
    }

    /// Removes every ledger blob.
    pub fn clear(&self) -> Result<(), CoreError> {
        for key in LEDGER_KEYS {
            self.blobs.remove_blob(key)?;
        }
        Ok(())
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, CoreError> {
        match self.blobs.read_blob(key)? {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(&text)
                .map_err(|err| CoreError::Serde(format!("{key}: {err}"))),
            _ => Ok(Vec::new()),
        }
    }

    fn write_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), CoreError> {
        let text = serde_json::to_string(items)?;
        self.blobs.write_blob(key, &text)
    }

    fn read_budget(&self) -> Result<f64, CoreError> {
        let Some(text) = self.blobs.read_blob(BUDGET_KEY)? else {
            return Ok(self.default_budget);
        };
        match text.trim().parse::<f64>() {
            Ok(budget) if budget.is_finite() && budget >= 0.0 => Ok(budget),
            _ => {
                warn!(value = %text.trim(), "ignoring unreadable budget blob");
                Ok(self.default_budget)
            }
        }
    }
}

/// Detects soft-reference anomalies. None of these block loading.
pub fn store_warnings(store: &LedgerStore) -> Vec<String> {
    let mut warnings = Vec::new();

    for txn in &store.transactions {
        if store.category_named(&txn.category).is_none() {
            warnings.push(format!(
                "transaction {} references unknown category {}",
                txn.id, txn.category
            ));
        }
        if is_credit_category(&txn.category) && txn.bank_name.is_none() {
            warnings.push(format!(
                "transaction {} in {} has no bank name",
                txn.id, txn.category
            ));
        }
        if let Some(rule_id) = txn.recurring_id.as_ref() {
            if store.rule(rule_id).is_none() {
                warnings.push(format!(
                    "transaction {} was generated by removed rule {}",
                    txn.id, rule_id
                ));
            }
        }
    }
    for rule in &store.recurring_rules {
        if store.category_named(&rule.category).is_none() {
            warnings.push(format!(
                "recurring rule {} references unknown category {}",
                rule.id, rule.category
            ));
        }
    }
    warnings
}
