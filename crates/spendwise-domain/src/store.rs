//! The in-memory ledger: transactions, rules, custom categories and budget.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    category::{builtin_categories, CategoryItem, FALLBACK_CATEGORY_COLOR},
    common::*,
    recurring::RecurringRule,
    transaction::Transaction,
};

/// Budget used when nothing has been persisted yet.
pub const DEFAULT_BUDGET: f64 = 50_000.0;

/// Authoritative collections owned by a single session.
///
/// Collections are plain vectors in display order: the newest manual and
/// generated transactions sit at the front, imports are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStore {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub recurring_rules: Vec<RecurringRule>,
    #[serde(default)]
    pub custom_categories: Vec<CategoryItem>,
    pub budget: f64,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

impl LedgerStore {
    pub fn new(budget: f64) -> Self {
        Self {
            transactions: Vec::new(),
            recurring_rules: Vec::new(),
            custom_categories: Vec::new(),
            budget,
        }
    }

    pub fn transaction(&self, id: &EntryId) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| &txn.id == id)
    }

    pub fn transaction_mut(&mut self, id: &EntryId) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|txn| &txn.id == id)
    }

    /// Inserts a transaction at the front, mirroring how new entries are listed.
    pub fn prepend_transaction(&mut self, transaction: Transaction) -> EntryId {
        let id = transaction.id.clone();
        self.transactions.insert(0, transaction);
        id
    }

    pub fn remove_transaction(&mut self, id: &EntryId) -> Option<Transaction> {
        let index = self.transactions.iter().position(|txn| &txn.id == id)?;
        Some(self.transactions.remove(index))
    }

    pub fn rule(&self, id: &EntryId) -> Option<&RecurringRule> {
        self.recurring_rules.iter().find(|rule| &rule.id == id)
    }

    pub fn rule_mut(&mut self, id: &EntryId) -> Option<&mut RecurringRule> {
        self.recurring_rules.iter_mut().find(|rule| &rule.id == id)
    }

    pub fn add_rule(&mut self, rule: RecurringRule) -> EntryId {
        let id = rule.id.clone();
        self.recurring_rules.push(rule);
        id
    }

    /// Removes a rule. Transactions it generated stay in the ledger.
    pub fn remove_rule(&mut self, id: &EntryId) -> Option<RecurringRule> {
        let index = self.recurring_rules.iter().position(|rule| &rule.id == id)?;
        Some(self.recurring_rules.remove(index))
    }

    /// Built-in categories followed by custom ones.
    pub fn all_categories(&self) -> Vec<CategoryItem> {
        let mut categories = builtin_categories();
        categories.extend(self.custom_categories.iter().cloned());
        categories
    }

    /// Resolves a soft category reference by name.
    pub fn category_named(&self, name: &str) -> Option<CategoryItem> {
        self.all_categories()
            .into_iter()
            .find(|category| category.matches_name(name))
    }

    pub fn category_color(&self, name: &str) -> String {
        self.category_named(name)
            .map(|category| category.color)
            .unwrap_or_else(|| FALLBACK_CATEGORY_COLOR.to_string())
    }

    /// Returns `true` when any transaction or rule still names `category`.
    pub fn is_category_referenced(&self, category: &str) -> bool {
        self.transactions.iter().any(|txn| txn.category == category)
            || self
                .recurring_rules
                .iter()
                .any(|rule| rule.category == category)
    }

    /// Transactions generated by `rule_id`, oldest first.
    pub fn instances_of(&self, rule_id: &EntryId) -> Vec<&Transaction> {
        let mut instances: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|txn| txn.recurring_id.as_ref() == Some(rule_id))
            .collect();
        instances.sort_by_key(|txn| txn.date);
        instances
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Inclusive calendar range used by the trailing-window projections.
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The `days` calendar days ending with (and including) `end`.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end - Duration::days(span),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take_while({
            let end = self.end;
            move |day| *day <= end
        })
    }
}
