//! Domain types representing spending categories.

use serde::{Deserialize, Serialize};

use crate::common::*;

/// Colour reported for names that match no known category.
pub const FALLBACK_CATEGORY_COLOR: &str = "#94a3b8";

/// Categories whose entries must name the lending bank.
pub const CREDIT_CATEGORIES: [&str; 2] = ["Loan", "EMI"];

const BUILT_IN: [(&str, &str, &str); 11] = [
    ("default_food", "Food", "#f97316"),
    ("default_transport", "Transport", "#3b82f6"),
    ("default_shopping", "Shopping", "#ec4899"),
    ("default_bills", "Bills", "#eab308"),
    ("default_entertainment", "Entertainment", "#8b5cf6"),
    ("default_health", "Health", "#10b981"),
    ("default_education", "Education", "#06b6d4"),
    ("default_travel", "Travel", "#14b8a6"),
    ("default_loan", "Loan", "#ef4444"),
    ("default_emi", "EMI", "#f43f5e"),
    ("default_other", "Other", "#64748b"),
];

/// Name every entry falls back to when no category is chosen.
pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryItem {
    pub id: EntryId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub is_custom: bool,
}

impl CategoryItem {
    /// Creates a user-defined category with a fresh `custom_` id.
    pub fn custom(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: EntryId::generate_prefixed("custom"),
            name: name.into(),
            color: color.into(),
            is_custom: true,
        }
    }

    /// Case-insensitive name comparison used for uniqueness checks and lookups.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

impl Identifiable for CategoryItem {
    fn entry_id(&self) -> &EntryId {
        &self.id
    }
}

/// Returns the immutable, always-present categories.
pub fn builtin_categories() -> Vec<CategoryItem> {
    BUILT_IN
        .iter()
        .map(|(id, name, color)| CategoryItem {
            id: EntryId::from(*id),
            name: (*name).to_string(),
            color: (*color).to_string(),
            is_custom: false,
        })
        .collect()
}

pub fn is_builtin_name(name: &str) -> bool {
    BUILT_IN
        .iter()
        .any(|(_, builtin, _)| builtin.eq_ignore_ascii_case(name.trim()))
}

pub fn is_builtin_id(id: &EntryId) -> bool {
    BUILT_IN.iter().any(|(builtin, _, _)| *builtin == id.as_str())
}

/// Returns `true` for the loan-like categories that require a bank name.
pub fn is_credit_category(name: &str) -> bool {
    CREDIT_CATEGORIES
        .iter()
        .any(|credit| credit.eq_ignore_ascii_case(name.trim()))
}
