//! JSON backup export and the id-deduplicating import merge.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use spendwise_domain::{
    is_builtin_name, Amounted, CategoryItem, EntryId, Identifiable, LedgerStore, RecurringRule,
    Transaction,
};

use crate::CoreError;

/// Newest backup layout this build understands.
pub const BACKUP_VERSION: u32 = 1;

/// Full snapshot written by [`export_backup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub expenses: Vec<Transaction>,
    pub recurring_expenses: Vec<RecurringRule>,
    pub custom_categories: Vec<CategoryItem>,
    pub monthly_budget: f64,
}

/// A backup as read from outside; every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub expenses: Option<Vec<Transaction>>,
    #[serde(default)]
    pub recurring_expenses: Option<Vec<RecurringRule>>,
    #[serde(default)]
    pub custom_categories: Option<Vec<CategoryItem>>,
    #[serde(default)]
    pub monthly_budget: Option<f64>,
}

impl From<BackupDocument> for ImportBatch {
    fn from(doc: BackupDocument) -> Self {
        Self {
            version: Some(doc.version),
            timestamp: Some(doc.timestamp.to_rfc3339()),
            expenses: Some(doc.expenses),
            recurring_expenses: Some(doc.recurring_expenses),
            custom_categories: Some(doc.custom_categories),
            monthly_budget: Some(doc.monthly_budget),
        }
    }
}

impl ImportBatch {
    /// Rejects batches that would break store invariants if merged.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(version) = self.version {
            if version > BACKUP_VERSION {
                return Err(CoreError::Import(format!(
                    "backup version {version} is newer than supported version {BACKUP_VERSION}"
                )));
            }
        }
        if let Some(budget) = self.monthly_budget {
            if !is_valid_amount(budget) {
                return Err(CoreError::Import(format!("invalid monthly budget {budget}")));
            }
        }
        check_amounts(self.expenses.as_deref().unwrap_or_default(), "transaction")?;
        check_amounts(self.recurring_expenses.as_deref().unwrap_or_default(), "recurring rule")?;
        Ok(())
    }
}

fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

fn check_amounts<T: Identifiable + Amounted>(records: &[T], kind: &str) -> Result<(), CoreError> {
    match records.iter().find(|record| !is_valid_amount(record.amount())) {
        Some(record) => Err(CoreError::Import(format!(
            "{kind} {} has invalid amount {}",
            record.entry_id(),
            record.amount()
        ))),
        None => Ok(()),
    }
}

/// Parses and validates a backup document. Nothing is applied on error.
pub fn parse_backup(text: &str) -> Result<ImportBatch, CoreError> {
    let batch: ImportBatch = serde_json::from_str(text)
        .map_err(|err| CoreError::Import(format!("malformed backup: {err}")))?;
    batch.validate()?;
    Ok(batch)
}

/// What a merge added, per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub transactions_added: usize,
    pub rules_added: usize,
    pub categories_added: usize,
    /// Custom categories dropped because their name is already taken.
    pub categories_skipped: usize,
    pub budget_replaced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub store: LedgerStore,
    pub report: MergeReport,
}

/// Appends the records of `incoming` whose id is new to `existing`.
/// Duplicates inside the batch are dropped after their first occurrence.
fn append_unseen<T, F>(existing: &mut Vec<T>, incoming: &[T], mut accept: F) -> usize
where
    T: Identifiable + Clone,
    F: FnMut(&[T], &T) -> bool,
{
    let mut seen: HashSet<EntryId> = existing.iter().map(|item| item.entry_id().clone()).collect();
    let mut added = 0;
    for item in incoming {
        if seen.contains(item.entry_id()) || !accept(existing, item) {
            continue;
        }
        seen.insert(item.entry_id().clone());
        existing.push(item.clone());
        added += 1;
    }
    added
}

/// Merges a batch into a copy of `current`.
///
/// Records are accepted only when their id is unseen; existing records are
/// never overwritten. A declared budget replaces the current one.
pub fn merge_import(current: &LedgerStore, incoming: &ImportBatch) -> MergeOutcome {
    let mut store = current.clone();
    let mut report = MergeReport::default();

    if let Some(expenses) = &incoming.expenses {
        report.transactions_added = append_unseen(&mut store.transactions, expenses, |_, _| true);
    }

    if let Some(categories) = &incoming.custom_categories {
        let mut skipped = 0;
        let normalized: Vec<CategoryItem> = categories
            .iter()
            .cloned()
            .map(|mut category| {
                category.is_custom = true;
                category
            })
            .collect();
        report.categories_added =
            append_unseen(&mut store.custom_categories, &normalized, |existing, candidate| {
                let taken = is_builtin_name(&candidate.name)
                    || existing.iter().any(|category| category.matches_name(&candidate.name));
                if taken {
                    skipped += 1;
                }
                !taken
            });
        report.categories_skipped = skipped;
    }

    if let Some(rules) = &incoming.recurring_expenses {
        report.rules_added = append_unseen(&mut store.recurring_rules, rules, |_, _| true);
    }

    if let Some(budget) = incoming.monthly_budget {
        store.budget = budget;
        report.budget_replaced = true;
    }

    MergeOutcome { store, report }
}

/// Snapshot of the whole store in backup layout.
pub fn export_backup(store: &LedgerStore, timestamp: DateTime<Utc>) -> BackupDocument {
    BackupDocument {
        version: BACKUP_VERSION,
        timestamp,
        expenses: store.transactions.clone(),
        recurring_expenses: store.recurring_rules.clone(),
        custom_categories: store.custom_categories.clone(),
        monthly_budget: store.budget,
    }
}

pub fn backup_to_json(document: &BackupDocument) -> Result<String, CoreError> {
    Ok(serde_json::to_string_pretty(document)?)
}

pub struct MergeService;

impl MergeService {
    /// Parses `text` and merges it into `store`. On any error the store is
    /// left exactly as it was.
    pub fn import_json(store: &mut LedgerStore, text: &str) -> Result<MergeReport, CoreError> {
        let batch = parse_backup(text)?;
        Ok(Self::import_batch(store, &batch))
    }

    pub fn import_batch(store: &mut LedgerStore, batch: &ImportBatch) -> MergeReport {
        let MergeOutcome {
            store: merged,
            report,
        } = merge_import(store, batch);
        *store = merged;
        info!(
            transactions = report.transactions_added,
            rules = report.rules_added,
            categories = report.categories_added,
            categories_skipped = report.categories_skipped,
            budget_replaced = report.budget_replaced,
            "json backup merged"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use spendwise_domain::Frequency;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_store() -> LedgerStore {
        let mut store = LedgerStore::new(20_000.0);
        let rent = Transaction::new(15_000.0, "Rent", "Bills", date(2024, 1, 1));
        store
            .recurring_rules
            .push(RecurringRule::starting_after(&rent, Frequency::Monthly));
        store.transactions.push(rent);
        store.transactions.push(Transaction::new(40.0, "Tea", "Food", date(2024, 1, 2)));
        store.custom_categories.push(CategoryItem::custom("Pets", "#abcdef"));
        store
    }

    #[test]
    fn merging_own_backup_adds_nothing() {
        let store = sample_store();
        let backup = export_backup(&store, Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap());
        let outcome = merge_import(&store, &ImportBatch::from(backup));

        assert_eq!(outcome.report.transactions_added, 0);
        assert_eq!(outcome.report.rules_added, 0);
        assert_eq!(outcome.report.categories_added, 0);
        assert_eq!(outcome.store, store);
    }

    #[test]
    fn existing_records_are_never_overwritten() {
        let store = sample_store();
        let mut changed = store.transactions[0].clone();
        changed.amount = 1.0;
        let fresh = Transaction::new(99.0, "Book", "Education", date(2024, 1, 4));
        let batch = ImportBatch {
            expenses: Some(vec![changed, fresh.clone(), fresh.clone()]),
            ..ImportBatch::default()
        };

        let outcome = merge_import(&store, &batch);
        assert_eq!(outcome.report.transactions_added, 1);
        assert_eq!(outcome.store.transactions[0].amount, 15_000.0);
        assert_eq!(outcome.store.transactions.last(), Some(&fresh));
        assert_eq!(outcome.store.budget, store.budget);
        assert!(!outcome.report.budget_replaced);
    }

    #[test]
    fn category_name_collisions_are_skipped() {
        let store = sample_store();
        let mut pets = CategoryItem::custom("PETS", "#000000");
        pets.is_custom = false;
        let food = CategoryItem::custom("food", "#000000");
        let garden = CategoryItem {
            is_custom: false,
            ..CategoryItem::custom("Garden", "#00ff00")
        };
        let batch = ImportBatch {
            custom_categories: Some(vec![pets, food, garden]),
            ..ImportBatch::default()
        };

        let outcome = merge_import(&store, &batch);
        assert_eq!(outcome.report.categories_added, 1);
        assert_eq!(outcome.report.categories_skipped, 2);
        let added = outcome.store.custom_categories.last().unwrap();
        assert_eq!(added.name, "Garden");
        assert!(added.is_custom);
    }

    #[test]
    fn declared_budget_overwrites() {
        let store = sample_store();
        let batch = ImportBatch {
            monthly_budget: Some(0.0),
            ..ImportBatch::default()
        };
        let outcome = merge_import(&store, &batch);
        assert!(outcome.report.budget_replaced);
        assert_eq!(outcome.store.budget, 0.0);
    }

    #[test]
    fn malformed_or_invalid_json_leaves_store_untouched() {
        let mut store = sample_store();
        let before = store.clone();

        assert!(matches!(
            MergeService::import_json(&mut store, "{ not json"),
            Err(CoreError::Import(_))
        ));
        assert!(MergeService::import_json(&mut store, r#"{"version": 2}"#).is_err());
        assert!(MergeService::import_json(&mut store, r#"{"monthlyBudget": -1}"#).is_err());
        let negative = r#"{"expenses":[
            {"id":"a","amount":5,"description":"ok","category":"Food","date":"2024-01-01"},
            {"id":"b","amount":-5,"description":"bad","category":"Food","date":"2024-01-01"}
        ]}"#;
        assert!(MergeService::import_json(&mut store, negative).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn foreign_backup_with_short_ids_imports() {
        let mut store = LedgerStore::default();
        let text = r#"{
            "version": 1,
            "timestamp": "2024-05-01T10:00:00.000Z",
            "expenses": [
                {"id":"k3j9x2a1b","amount":150,"description":"Coffee","category":"Food","date":"2024-05-01"},
                {"id":"q8w7e6r5t","amount":4000,"description":"Car EMI","category":"EMI","date":"2024-05-02","bankName":"SBI"}
            ],
            "recurringExpenses": [
                {"id":"r1","amount":799,"description":"Spotify","category":"Entertainment","frequency":"MONTHLY","startDate":"2024-04-10","nextOccurrenceDate":"2024-05-10","isActive":true}
            ],
            "monthlyBudget": 30000
        }"#;

        let report = MergeService::import_json(&mut store, text).unwrap();
        assert_eq!(report.transactions_added, 2);
        assert_eq!(report.rules_added, 1);
        assert_eq!(store.budget, 30_000.0);
        assert_eq!(store.transactions[1].bank_name.as_deref(), Some("SBI"));

        let again = MergeService::import_json(&mut store, text).unwrap();
        assert_eq!(again.transactions_added, 0);
        assert_eq!(store.transactions.len(), 2);
    }

    #[test]
    fn backup_json_uses_camel_case_keys() {
        let store = sample_store();
        let json = backup_to_json(&export_backup(
            &store,
            Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap(),
        ))
        .unwrap();
        assert!(json.contains("\"recurringExpenses\""));
        assert!(json.contains("\"customCategories\""));
        assert!(json.contains("\"monthlyBudget\": 20000.0"));
        assert!(json.contains("\"version\": 1"));
    }
}
