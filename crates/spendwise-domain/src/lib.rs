//! spendwise-domain
//!
//! Pure domain models (Transaction, RecurringRule, CategoryItem, LedgerStore).
//! No I/O, no CLI, no storage. Only data types, invariant helpers and core enums.

pub mod category;
pub mod common;
pub mod recurring;
pub mod store;
pub mod transaction;

pub use category::*;
pub use common::*;
pub use recurring::*;
pub use store::*;
pub use transaction::*;
