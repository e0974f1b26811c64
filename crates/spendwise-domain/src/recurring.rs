//! Recurring payment rules and their schedule cursor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{common::*, transaction::Transaction};

/// Appended to the description of every generated instance.
pub const RECURRING_MARKER: &str = "(Recurring)";

/// A transaction template plus the cursor of the next date still to materialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRule {
    pub id: EntryId,
    pub amount: f64,
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub next_occurrence_date: NaiveDate,
    #[serde(default = "RecurringRule::default_active")]
    pub is_active: bool,
}

impl RecurringRule {
    /// Creates an active rule whose first instance is the entry dated `start_date`
    /// itself, so the cursor starts one period later.
    pub fn starting_after(template: &Transaction, frequency: Frequency) -> Self {
        Self {
            id: EntryId::generate(),
            amount: template.amount,
            description: template.description.clone(),
            category: template.category.clone(),
            bank_name: template.bank_name.clone(),
            frequency,
            start_date: template.date,
            next_occurrence_date: frequency.next_date(template.date),
            is_active: true,
        }
    }

    pub fn default_active() -> bool {
        true
    }

    /// Materializes the instance scheduled for `date`.
    pub fn instance_for(&self, date: NaiveDate) -> Transaction {
        Transaction {
            id: EntryId::generate(),
            amount: self.amount,
            description: format!("{} {}", self.description, RECURRING_MARKER),
            category: self.category.clone(),
            date,
            bank_name: self.bank_name.clone(),
            recurring_id: Some(self.id.clone()),
        }
    }

    /// Returns `true` when an active rule has an instance due on or before `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.is_active && self.next_occurrence_date <= today
    }

    pub fn status(&self, today: NaiveDate) -> RuleStatus {
        RuleStatus::classify(self, today)
    }
}

impl Identifiable for RecurringRule {
    fn entry_id(&self) -> &EntryId {
        &self.id
    }
}

impl Amounted for RecurringRule {
    fn amount(&self) -> f64 {
        self.amount
    }
}

/// Where a rule's cursor sits relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStatus {
    Paused,
    Overdue,
    DueToday,
    Upcoming,
}

impl RuleStatus {
    fn classify(rule: &RecurringRule, today: NaiveDate) -> RuleStatus {
        if !rule.is_active {
            return RuleStatus::Paused;
        }
        match rule.next_occurrence_date.cmp(&today) {
            std::cmp::Ordering::Less => RuleStatus::Overdue,
            std::cmp::Ordering::Equal => RuleStatus::DueToday,
            std::cmp::Ordering::Greater => RuleStatus::Upcoming,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuleStatus::Paused => "paused",
            RuleStatus::Overdue => "overdue",
            RuleStatus::DueToday => "due today",
            RuleStatus::Upcoming => "upcoming",
        }
    }
}
