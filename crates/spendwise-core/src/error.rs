use std::io;

use spendwise_domain::EntryId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Transaction not found: {0}")]
    TransactionNotFound(EntryId),
    #[error("Recurring rule not found: {0}")]
    RuleNotFound(EntryId),
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("Category already exists: {0}")]
    DuplicateCategory(String),
    #[error("Built-in category cannot be changed: {0}")]
    BuiltInCategory(String),
    #[error("Identifier already in use: {0}")]
    DuplicateId(EntryId),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Import failed: {0}")]
    Import(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serde(err.to_string())
    }
}
