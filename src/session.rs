//! One in-memory owner of the ledger plus the repository it persists to.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use spendwise_core::{
    export_backup, export_csv, import_csv,
    storage::{store_warnings, BlobStore, LedgerRepository},
    time::{Clock, SystemClock},
    AddedEntry, BackupDocument, CategoryRemoval, CategoryService, CoreError, CsvImportReport,
    DashboardSummary, EntryDraft, ImportBatch, MergeReport, MergeService, RecurrenceService,
    RuleSnapshot, SummaryService, TransactionService,
};
use spendwise_domain::{EntryId, Frequency, LedgerStore, RecurringRule, Transaction};

use crate::errors::{AppError, AppResult};

/// What happened while a session was opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenReport {
    /// Recurring instances materialized by the catch-up pass.
    pub generated: usize,
    pub warnings: Vec<String>,
}

/// Coordinates the store, the engine and persistence.
///
/// Every mutation applies in memory first, then writes the touched blobs.
/// Write failures are logged and never undo the in-memory change.
pub struct LedgerSession<S: BlobStore> {
    repo: LedgerRepository<S>,
    store: LedgerStore,
    clock: Arc<dyn Clock>,
}

impl<S: BlobStore> LedgerSession<S> {
    /// Loads the ledger and runs the recurring catch-up once for today.
    pub fn open(repo: LedgerRepository<S>) -> AppResult<(Self, OpenReport)> {
        Self::open_with_clock(repo, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        repo: LedgerRepository<S>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<(Self, OpenReport)> {
        let store = repo.load()?;
        let mut session = Self { repo, store, clock };
        let today = session.today();
        let generated = RecurrenceService::catch_up(&mut session.store, today);
        if generated > 0 {
            session.persist("transactions", |repo, store| {
                repo.save_transactions(&store.transactions)
            });
            session.persist("recurring rules", |repo, store| {
                repo.save_rules(&store.recurring_rules)
            });
        }
        let warnings = store_warnings(&session.store);
        for warning in &warnings {
            debug!(%warning, "ledger consistency");
        }
        info!(
            transactions = session.store.transactions.len(),
            rules = session.store.recurring_rules.len(),
            generated,
            "ledger session opened"
        );
        Ok((session, OpenReport { generated, warnings }))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn repository(&self) -> &LedgerRepository<S> {
        &self.repo
    }

    pub fn blobs(&self) -> &S {
        self.repo.blobs()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn persist<F>(&self, what: &str, write: F)
    where
        F: FnOnce(&LedgerRepository<S>, &LedgerStore) -> Result<(), CoreError>,
    {
        if let Err(err) = write(&self.repo, &self.store) {
            warn!(error = %err, "failed to persist {what}");
        }
    }

    fn persist_transactions(&self) {
        self.persist("transactions", |repo, store| {
            repo.save_transactions(&store.transactions)
        });
    }

    fn persist_rules(&self) {
        self.persist("recurring rules", |repo, store| {
            repo.save_rules(&store.recurring_rules)
        });
    }

    fn persist_categories(&self) {
        self.persist("custom categories", |repo, store| {
            repo.save_custom_categories(&store.custom_categories)
        });
    }

    fn persist_all(&self) {
        self.persist("ledger", |repo, store| repo.save(store));
    }

    pub fn add_entry(
        &mut self,
        draft: EntryDraft,
        recurrence: Option<Frequency>,
    ) -> AppResult<AddedEntry> {
        let added = TransactionService::add(&mut self.store, draft, recurrence)?;
        self.persist_transactions();
        if added.rule_id.is_some() {
            self.persist_rules();
        }
        Ok(added)
    }

    pub fn edit_entry(&mut self, id: &EntryId, draft: EntryDraft) -> AppResult<()> {
        TransactionService::update(&mut self.store, id, draft)?;
        self.persist_transactions();
        Ok(())
    }

    pub fn delete_entry(&mut self, id: &EntryId) -> AppResult<Transaction> {
        let removed = TransactionService::remove(&mut self.store, id)?;
        self.persist_transactions();
        Ok(removed)
    }

    pub fn update_rule(
        &mut self,
        id: &EntryId,
        draft: EntryDraft,
        frequency: Frequency,
    ) -> AppResult<()> {
        RecurrenceService::update_rule(&mut self.store, id, draft, frequency)?;
        self.persist_rules();
        Ok(())
    }

    /// Removes the rule and stores the draft as a plain transaction.
    pub fn convert_rule_to_one_off(&mut self, id: &EntryId, draft: EntryDraft) -> AppResult<EntryId> {
        let txn_id = RecurrenceService::convert_to_one_off(&mut self.store, id, draft)?;
        self.persist_rules();
        self.persist_transactions();
        Ok(txn_id)
    }

    pub fn toggle_rule(&mut self, id: &EntryId) -> AppResult<bool> {
        let active = RecurrenceService::toggle(&mut self.store, id)?;
        self.persist_rules();
        Ok(active)
    }

    pub fn delete_rule(&mut self, id: &EntryId) -> AppResult<RecurringRule> {
        let removed = RecurrenceService::remove(&mut self.store, id)?;
        self.persist_rules();
        Ok(removed)
    }

    pub fn rule_snapshots(&self) -> Vec<RuleSnapshot> {
        RecurrenceService::snapshots(&self.store, self.today())
    }

    pub fn add_category(&mut self, name: &str, color: Option<&str>) -> AppResult<EntryId> {
        let id = CategoryService::add_custom(&mut self.store, name, color)?;
        self.persist_categories();
        Ok(id)
    }

    pub fn delete_category(&mut self, key: &str) -> AppResult<CategoryRemoval> {
        let removal = CategoryService::remove_custom(&mut self.store, key)?;
        self.persist_categories();
        Ok(removal)
    }

    pub fn set_budget(&mut self, budget: f64) -> AppResult<()> {
        if !budget.is_finite() || budget < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "budget must be a non-negative number, got {budget}"
            )));
        }
        self.store.budget = budget;
        self.persist("budget", |repo, store| repo.save_budget(store.budget));
        Ok(())
    }

    /// Merges a JSON backup. Malformed input changes nothing.
    pub fn import_json(&mut self, text: &str) -> AppResult<MergeReport> {
        let report = MergeService::import_json(&mut self.store, text)?;
        self.persist_all();
        Ok(report)
    }

    pub fn import_batch(&mut self, batch: &ImportBatch) -> AppResult<MergeReport> {
        batch.validate()?;
        let report = MergeService::import_batch(&mut self.store, batch);
        self.persist_all();
        Ok(report)
    }

    pub fn import_csv(&mut self, text: &str) -> CsvImportReport {
        let report = import_csv(&mut self.store, text);
        if report.accepted > 0 {
            self.persist_transactions();
        }
        report
    }

    pub fn backup_document(&self) -> BackupDocument {
        export_backup(&self.store, self.clock.now())
    }

    pub fn export_json(&self) -> AppResult<String> {
        Ok(spendwise_core::backup_to_json(&self.backup_document())?)
    }

    pub fn export_csv(&self) -> String {
        export_csv(&self.store.transactions)
    }

    pub fn dashboard(&self) -> DashboardSummary {
        SummaryService::dashboard(&self.store, self.today())
    }

    /// Wipes every persisted blob and starts over with an empty ledger.
    pub fn reset(&mut self) -> AppResult<()> {
        self.repo.clear()?;
        self.store = LedgerStore::new(self.repo.default_budget());
        info!("ledger reset");
        Ok(())
    }
}
