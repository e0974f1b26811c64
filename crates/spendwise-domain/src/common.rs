//! Shared traits, identifiers, and schedule arithmetic for ledger primitives.

use std::fmt;

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exposes a stable identifier for entities stored in the ledger.
pub trait Identifiable {
    fn entry_id(&self) -> &EntryId;
}

/// Supplies a common contract for retrieving numeric amounts.
pub trait Amounted {
    fn amount(&self) -> f64;
}

/// Opaque identifier shared by transactions, recurring rules and categories.
///
/// Identifiers are plain strings so records produced elsewhere (backups from
/// other devices, hand-edited files) keep their ids verbatim on import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Returns a fresh, never-before-seen identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns a fresh identifier carrying `prefix`, e.g. `custom_…`.
    pub fn generate_prefixed(prefix: &str) -> Self {
        Self(format!("{}_{}", prefix, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cadence at which a recurring rule produces instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    #[serde(alias = "Daily", alias = "daily")]
    Daily,
    #[serde(alias = "Weekly", alias = "weekly")]
    Weekly,
    #[serde(alias = "Monthly", alias = "monthly")]
    Monthly,
    #[serde(alias = "Yearly", alias = "yearly")]
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    /// Calculates the scheduled date one period after `from`.
    ///
    /// Calendar steps clamp to the last valid day of the target month, so
    /// Jan 31 advances to Feb 28/29 and Feb 29 advances a year to Feb 28.
    /// The clamped date is what later steps start from. Steps past the end of
    /// the supported calendar saturate at [`NaiveDate::MAX`].
    pub fn next_date(self, from: NaiveDate) -> NaiveDate {
        let next = match self {
            Frequency::Daily => from.checked_add_signed(Duration::days(1)),
            Frequency::Weekly => from.checked_add_signed(Duration::weeks(1)),
            Frequency::Monthly => from.checked_add_months(Months::new(1)),
            Frequency::Yearly => from.checked_add_months(Months::new(12)),
        };
        next.unwrap_or(NaiveDate::MAX)
    }

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
