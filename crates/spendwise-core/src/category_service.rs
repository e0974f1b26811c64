use spendwise_domain::{is_builtin_id, is_builtin_name, CategoryItem, EntryId, LedgerStore};
use tracing::debug;

use crate::CoreError;

/// Colours handed out to custom categories created without one.
const CUSTOM_PALETTE: [&str; 8] = [
    "#6366f1", "#f59e0b", "#84cc16", "#0ea5e9", "#d946ef", "#22c55e", "#e11d48", "#a855f7",
];

/// Result of deleting a custom category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRemoval {
    pub removed: CategoryItem,
    /// Transactions or rules still name the category; they keep the name and
    /// fall back to the neutral colour.
    pub still_referenced: bool,
}

pub struct CategoryService;

impl CategoryService {
    /// Adds a custom category. Names are unique case-insensitively across
    /// built-in and custom categories.
    pub fn add_custom(
        store: &mut LedgerStore,
        name: &str,
        color: Option<&str>,
    ) -> Result<EntryId, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("category name is required".into()));
        }
        if store.category_named(name).is_some() {
            return Err(CoreError::DuplicateCategory(name.to_string()));
        }
        let color = match color {
            Some(color) => normalize_color(color)?,
            None => CUSTOM_PALETTE[store.custom_categories.len() % CUSTOM_PALETTE.len()].to_string(),
        };
        let category = CategoryItem::custom(name, color);
        let id = category.id.clone();
        debug!(category = %id, name, "custom category added");
        store.custom_categories.push(category);
        Ok(id)
    }

    /// Removes a custom category by id or name. Built-in categories are
    /// rejected; referencing transactions and rules are left untouched.
    pub fn remove_custom(store: &mut LedgerStore, key: &str) -> Result<CategoryRemoval, CoreError> {
        let key = key.trim();
        if is_builtin_name(key) || is_builtin_id(&EntryId::from(key)) {
            return Err(CoreError::BuiltInCategory(key.to_string()));
        }
        let index = store
            .custom_categories
            .iter()
            .position(|category| category.id.as_str() == key || category.matches_name(key))
            .ok_or_else(|| CoreError::CategoryNotFound(key.to_string()))?;
        let removed = store.custom_categories.remove(index);
        let still_referenced = store.is_category_referenced(&removed.name);
        debug!(category = %removed.id, still_referenced, "custom category removed");
        Ok(CategoryRemoval {
            removed,
            still_referenced,
        })
    }

    /// Built-in categories followed by custom ones.
    pub fn list(store: &LedgerStore) -> Vec<CategoryItem> {
        store.all_categories()
    }
}

fn normalize_color(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(format!("#{}", hex.to_ascii_lowercase()))
    } else {
        Err(CoreError::Validation(format!(
            "`{trimmed}` is not a #rrggbb colour"
        )))
    }
}
