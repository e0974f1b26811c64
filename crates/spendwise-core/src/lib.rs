//! spendwise-core
//!
//! Business logic for the SpendWise ledger: the recurring obligation engine,
//! entry validation, import/export merging and the aggregation layer.
//! Depends on spendwise-domain. No CLI, no terminal I/O, no filesystem access;
//! persistence goes through the [`storage::BlobStore`] gateway.

pub mod category_service;
pub mod csv_codec;
pub mod entry_service;
pub mod error;
pub mod merge_service;
pub mod recurrence_service;
pub mod storage;
pub mod summary_service;
pub mod time;

pub use category_service::*;
pub use csv_codec::*;
pub use entry_service::*;
pub use error::CoreError;
pub use merge_service::*;
pub use recurrence_service::*;
pub use summary_service::*;

#[cfg(test)]
mod tests;
