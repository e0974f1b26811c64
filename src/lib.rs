#![doc(test(attr(deny(warnings))))]

//! SpendWise is a personal-finance ledger: expense entries, recurring
//! obligations that catch up on load, JSON/CSV interchange and dashboard
//! summaries, driven from the `spendwise_cli` binary.

pub mod cli;
pub mod errors;
pub mod session;
pub mod utils;

pub use errors::{AppError, AppResult};
pub use session::{LedgerSession, OpenReport};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter.
pub fn init() {
    init_with_filter(None);
}

/// Initializes global tracing, preferring `filter` over the default
/// directive when `RUST_LOG` is unset. Only the first call has an effect.
pub fn init_with_filter(filter: Option<&str>) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(filter);
        tracing::debug!("SpendWise tracing initialized.");
    });
}
