use chrono::{NaiveDate, TimeZone, Utc};

use crate::{
    backup_to_json, export_backup, export_csv, import_csv, storage::LedgerRepository,
    storage::MemoryBlobStore, EntryDraft, MergeService, RecurrenceService, SummaryService,
    TransactionService,
};
use spendwise_domain::{Frequency, LedgerStore, RECURRING_MARKER};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ledger_with_history() -> LedgerStore {
    let mut store = LedgerStore::new(10_000.0);
    TransactionService::add(
        &mut store,
        EntryDraft::new(1_200.0, "Internet", "Bills", date(2024, 1, 15)),
        Some(Frequency::Monthly),
    )
    .expect("add recurring entry");
    TransactionService::add(
        &mut store,
        EntryDraft::new(4_000.0, "Car EMI", "EMI", date(2024, 3, 5)).with_bank("SBI"),
        None,
    )
    .expect("add credit entry");
    TransactionService::add(
        &mut store,
        EntryDraft::new(250.5, "Groceries", "Food", date(2024, 4, 1)),
        None,
    )
    .expect("add food entry");
    store
}

#[test]
fn manual_recurring_entry_catches_up_without_duplicating_the_first_date() {
    let mut store = ledger_with_history();
    let generated = RecurrenceService::catch_up(&mut store, date(2024, 4, 20));
    assert_eq!(generated, 3);

    let rule_id = store.recurring_rules[0].id.clone();
    let dates: Vec<NaiveDate> = store
        .instances_of(&rule_id)
        .iter()
        .map(|txn| txn.date)
        .collect();
    assert_eq!(dates, [date(2024, 2, 15), date(2024, 3, 15), date(2024, 4, 15)]);
    assert!(store
        .instances_of(&rule_id)
        .iter()
        .all(|txn| txn.description.ends_with(RECURRING_MARKER)));
    assert_eq!(
        store.recurring_rules[0].next_occurrence_date,
        date(2024, 5, 15)
    );
}

#[test]
fn json_import_of_own_backup_is_idempotent() {
    let mut store = ledger_with_history();
    RecurrenceService::catch_up(&mut store, date(2024, 4, 20));
    let backup = backup_to_json(&export_backup(
        &store,
        Utc.with_ymd_and_hms(2024, 4, 20, 8, 30, 0).unwrap(),
    ))
    .unwrap();

    let mut fresh = LedgerStore::default();
    let first = MergeService::import_json(&mut fresh, &backup).unwrap();
    assert_eq!(first.transactions_added, store.transactions.len());
    assert_eq!(fresh.budget, 10_000.0);

    let second = MergeService::import_json(&mut fresh, &backup).unwrap();
    assert_eq!(second.transactions_added, 0);
    assert_eq!(second.rules_added, 0);
    assert_eq!(fresh.transactions.len(), store.transactions.len());
    assert_eq!(fresh.recurring_rules, store.recurring_rules);
}

#[test]
fn csv_round_trip_doubles_on_reimport() {
    let store = ledger_with_history();
    let csv = export_csv(&store.transactions);

    let mut target = LedgerStore::default();
    let first = import_csv(&mut target, &csv);
    assert_eq!(first.accepted, 3);
    assert_eq!(first.skipped, 0);
    import_csv(&mut target, &csv);
    assert_eq!(target.transactions.len(), 6);
    assert_eq!(
        SummaryService::total_spend(&target),
        2.0 * SummaryService::total_spend(&store)
    );
}

#[test]
fn unterminated_quote_row_is_reported_among_good_rows() {
    let mut store = LedgerStore::default();
    let text = "Date,Description,Category,Amount,Bank\n\
                2024-05-01,\"Coffee, Large\",Food,150,\"\n\
                2024-05-02,\"Tea\",Food,20,\"\"\n";
    let report = import_csv(&mut store, text);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(store.transactions[0].description, "Tea");
}

#[test]
fn aggregates_are_consistent_with_total_spend() {
    let mut store = ledger_with_history();
    let today = date(2024, 4, 20);
    RecurrenceService::catch_up(&mut store, today);

    let total = SummaryService::total_spend(&store);
    let by_category: f64 = SummaryService::category_totals(&store)
        .iter()
        .map(|row| row.total)
        .sum();
    assert!((total - by_category).abs() < 1e-9);

    let window_start = today - chrono::Duration::days(29);
    let windowed: f64 = store
        .transactions
        .iter()
        .filter(|txn| txn.date >= window_start && txn.date <= today)
        .map(|txn| txn.amount)
        .sum();
    let daily: f64 = SummaryService::daily_series(&store, today)
        .iter()
        .map(|day| day.amount)
        .sum();
    assert!((windowed - daily).abs() < 1e-9);
    let averaged: f64 = SummaryService::category_averages(&store, today)
        .iter()
        .map(|row| row.total)
        .sum();
    assert!((windowed - averaged).abs() < 1e-9);
}

#[test]
fn repository_persists_a_caught_up_ledger() {
    let repo = LedgerRepository::new(MemoryBlobStore::new(), 50_000.0);
    let mut store = ledger_with_history();
    RecurrenceService::catch_up(&mut store, date(2024, 4, 20));
    repo.save(&store).unwrap();

    let mut reloaded = repo.load().unwrap();
    assert_eq!(reloaded, store);
    assert_eq!(RecurrenceService::catch_up(&mut reloaded, date(2024, 4, 20)), 0);
}
