//! The recurring obligation engine and rule maintenance helpers.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use spendwise_domain::{
    EntryId, Frequency, LedgerStore, RecurringRule, RuleStatus, Transaction,
};

use crate::{entry_service::EntryDraft, CoreError};

/// Result of one catch-up pass over a rule set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvanceOutcome {
    /// Rules whose cursor moved, in processing order.
    pub updated_rules: Vec<RecurringRule>,
    /// Generated instances: rule order, then chronological within a rule.
    pub new_transactions: Vec<Transaction>,
}

impl AdvanceOutcome {
    pub fn is_empty(&self) -> bool {
        self.updated_rules.is_empty() && self.new_transactions.is_empty()
    }
}

/// Materializes every instance due on or before `today` and moves each
/// affected rule's cursor to its first date after `today`.
///
/// Paused rules and rules whose cursor is still in the future produce nothing
/// and are left out of `updated_rules`. The input is never modified.
pub fn advance(rules: &[RecurringRule], today: NaiveDate) -> AdvanceOutcome {
    let mut outcome = AdvanceOutcome::default();
    for rule in rules {
        if let Some((updated, instances)) = advance_rule(rule, today) {
            debug!(
                rule = %rule.id,
                generated = instances.len(),
                next = %updated.next_occurrence_date,
                "recurring rule caught up"
            );
            outcome.new_transactions.extend(instances);
            outcome.updated_rules.push(updated);
        }
    }
    outcome
}

fn advance_rule(rule: &RecurringRule, today: NaiveDate) -> Option<(RecurringRule, Vec<Transaction>)> {
    if !rule.is_active {
        return None;
    }
    let mut cursor = rule.next_occurrence_date;
    let mut instances = Vec::new();
    let mut exhausted = false;
    while cursor <= today {
        instances.push(rule.instance_for(cursor));
        let next = rule.frequency.next_date(cursor);
        if next == cursor {
            // Stepping saturates at the last representable date.
            exhausted = true;
            break;
        }
        cursor = next;
    }
    if instances.is_empty() {
        return None;
    }
    let mut updated = rule.clone();
    updated.next_occurrence_date = cursor;
    if exhausted {
        warn!(rule = %rule.id, "schedule reached the end of the calendar; pausing rule");
        updated.is_active = false;
    }
    Some((updated, instances))
}

/// Folds an [`AdvanceOutcome`] into the store: instances go to the front in
/// engine order, changed rules replace their previous versions by id.
pub fn apply_advance(store: &mut LedgerStore, outcome: AdvanceOutcome) {
    let AdvanceOutcome {
        updated_rules,
        new_transactions,
    } = outcome;
    let mut transactions = new_transactions;
    transactions.append(&mut store.transactions);
    store.transactions = transactions;
    for updated in updated_rules {
        if let Some(existing) = store.rule_mut(&updated.id) {
            *existing = updated;
        }
    }
}

/// Per-rule view used by listings.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    pub rule_id: EntryId,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub frequency: Frequency,
    pub next_due: NaiveDate,
    pub status: RuleStatus,
    pub generated: usize,
}

/// Provides safe helpers for modifying recurring rules in a store.
pub struct RecurrenceService;

impl RecurrenceService {
    /// Runs the engine against the store's rules and applies the result.
    /// Returns the number of generated instances.
    pub fn catch_up(store: &mut LedgerStore, today: NaiveDate) -> usize {
        let outcome = advance(&store.recurring_rules, today);
        let generated = outcome.new_transactions.len();
        if generated > 0 {
            info!(
                generated,
                rules = outcome.updated_rules.len(),
                %today,
                "materialized recurring instances"
            );
        }
        apply_advance(store, outcome);
        generated
    }

    /// Adds a rule templated on a stored manual entry. The entry counts as
    /// the first occurrence, so the cursor starts one period after it.
    pub fn create_from_entry(
        store: &mut LedgerStore,
        entry: &Transaction,
        frequency: Frequency,
    ) -> EntryId {
        let rule_id = store.add_rule(RecurringRule::starting_after(entry, frequency));
        debug!(%rule_id, %frequency, "recurring rule created");
        rule_id
    }

    /// Replaces a rule's template and frequency. The draft's date becomes the
    /// next due date and must fall after every occurrence already recorded.
    pub fn update_rule(
        store: &mut LedgerStore,
        rule_id: &EntryId,
        draft: EntryDraft,
        frequency: Frequency,
    ) -> Result<(), CoreError> {
        let entry = draft.validate()?;
        let last = Self::last_occurrence(store, rule_id)?;
        if let Some(last) = last.filter(|last| entry.date <= *last) {
            return Err(CoreError::Validation(format!(
                "next due date must be after {last}, the last recorded occurrence"
            )));
        }
        let rule = store
            .rule_mut(rule_id)
            .ok_or_else(|| CoreError::RuleNotFound(rule_id.clone()))?;
        rule.amount = entry.amount;
        rule.description = entry.description;
        rule.category = entry.category;
        rule.bank_name = entry.bank_name;
        rule.frequency = frequency;
        rule.next_occurrence_date = entry.date;
        Ok(())
    }

    /// Drops the rule and records the draft as an ordinary one-off transaction.
    pub fn convert_to_one_off(
        store: &mut LedgerStore,
        rule_id: &EntryId,
        draft: EntryDraft,
    ) -> Result<EntryId, CoreError> {
        let entry = draft.validate()?;
        if store.rule(rule_id).is_none() {
            return Err(CoreError::RuleNotFound(rule_id.clone()));
        }
        store.remove_rule(rule_id);
        Ok(store.prepend_transaction(entry.into_transaction()))
    }

    /// Flips pause/resume and returns the new active flag.
    pub fn toggle(store: &mut LedgerStore, rule_id: &EntryId) -> Result<bool, CoreError> {
        let rule = store
            .rule_mut(rule_id)
            .ok_or_else(|| CoreError::RuleNotFound(rule_id.clone()))?;
        rule.is_active = !rule.is_active;
        Ok(rule.is_active)
    }

    /// Deletes a rule; its generated transactions remain.
    pub fn remove(store: &mut LedgerStore, rule_id: &EntryId) -> Result<RecurringRule, CoreError> {
        store
            .remove_rule(rule_id)
            .ok_or_else(|| CoreError::RuleNotFound(rule_id.clone()))
    }

    /// Latest date the rule has already produced: its newest generated
    /// instance, or the seed entry when nothing was generated yet.
    fn last_occurrence(
        store: &LedgerStore,
        rule_id: &EntryId,
    ) -> Result<Option<NaiveDate>, CoreError> {
        let rule = store
            .rule(rule_id)
            .ok_or_else(|| CoreError::RuleNotFound(rule_id.clone()))?;
        let generated = store.instances_of(rule_id).last().map(|txn| txn.date);
        let seed = (rule.start_date < rule.next_occurrence_date).then_some(rule.start_date);
        Ok(generated.max(seed))
    }

    pub fn snapshots(store: &LedgerStore, today: NaiveDate) -> Vec<RuleSnapshot> {
        store
            .recurring_rules
            .iter()
            .map(|rule| RuleSnapshot {
                rule_id: rule.id.clone(),
                description: rule.description.clone(),
                amount: rule.amount,
                category: rule.category.clone(),
                frequency: rule.frequency,
                next_due: rule.next_occurrence_date,
                status: rule.status(today),
                generated: store.instances_of(&rule.id).len(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(frequency: Frequency, next: NaiveDate) -> RecurringRule {
        RecurringRule {
            id: EntryId::generate(),
            amount: 100.0,
            description: "Rent".into(),
            category: "Bills".into(),
            bank_name: None,
            frequency,
            start_date: next,
            next_occurrence_date: next,
            is_active: true,
        }
    }

    fn dates(outcome: &AdvanceOutcome) -> Vec<NaiveDate> {
        outcome.new_transactions.iter().map(|txn| txn.date).collect()
    }

    #[test]
    fn monthly_rule_catches_up_every_missed_period() {
        let rules = vec![rule(Frequency::Monthly, date(2024, 1, 15))];
        let outcome = advance(&rules, date(2024, 4, 20));

        assert_eq!(
            dates(&outcome),
            vec![
                date(2024, 1, 15),
                date(2024, 2, 15),
                date(2024, 3, 15),
                date(2024, 4, 15)
            ]
        );
        assert_eq!(outcome.updated_rules.len(), 1);
        assert_eq!(outcome.updated_rules[0].next_occurrence_date, date(2024, 5, 15));
        assert_eq!(rules[0].next_occurrence_date, date(2024, 1, 15));
    }

    #[test]
    fn rule_due_today_generates_today() {
        let rules = vec![rule(Frequency::Daily, date(2024, 6, 1))];
        let outcome = advance(&rules, date(2024, 6, 1));

        assert_eq!(dates(&outcome), vec![date(2024, 6, 1)]);
        assert_eq!(outcome.updated_rules[0].next_occurrence_date, date(2024, 6, 2));
    }

    #[test]
    fn future_and_paused_rules_are_untouched() {
        let mut paused = rule(Frequency::Weekly, date(2024, 1, 1));
        paused.is_active = false;
        let future = rule(Frequency::Weekly, date(2024, 7, 1));
        let outcome = advance(&[paused, future], date(2024, 6, 1));

        assert!(outcome.is_empty());
    }

    #[test]
    fn month_end_rule_clamps_and_continues_from_clamped_day() {
        let rules = vec![rule(Frequency::Monthly, date(2024, 1, 31))];
        let outcome = advance(&rules, date(2024, 4, 1));

        assert_eq!(
            dates(&outcome),
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 29)]
        );
        assert_eq!(outcome.updated_rules[0].next_occurrence_date, date(2024, 4, 29));
    }

    #[test]
    fn output_follows_rule_order_then_chronology() {
        let weekly = rule(Frequency::Weekly, date(2024, 3, 1));
        let yearly = rule(Frequency::Yearly, date(2022, 2, 28));
        let outcome = advance(&[weekly.clone(), yearly.clone()], date(2024, 3, 10));

        let provenance: Vec<_> = outcome
            .new_transactions
            .iter()
            .map(|txn| txn.recurring_id.clone().unwrap())
            .collect();
        assert_eq!(
            provenance,
            vec![
                weekly.id.clone(),
                weekly.id.clone(),
                yearly.id.clone(),
                yearly.id.clone(),
                yearly.id.clone()
            ]
        );
        assert_eq!(
            dates(&outcome)[2..],
            [date(2022, 2, 28), date(2023, 2, 28), date(2024, 2, 28)]
        );
    }

    #[test]
    fn second_pass_with_same_day_is_a_no_op() {
        let mut store = LedgerStore::default();
        store.add_rule(rule(Frequency::Daily, date(2024, 5, 1)));

        assert_eq!(RecurrenceService::catch_up(&mut store, date(2024, 5, 10)), 10);
        let again = advance(&store.recurring_rules, date(2024, 5, 10));
        assert!(again.is_empty());
    }

    #[test]
    fn stepwise_passes_match_single_pass() {
        let base = rule(Frequency::Weekly, date(2024, 1, 3));

        let mut stepwise = LedgerStore::default();
        stepwise.add_rule(base.clone());
        RecurrenceService::catch_up(&mut stepwise, date(2024, 2, 1));
        RecurrenceService::catch_up(&mut stepwise, date(2024, 4, 1));

        let mut single = LedgerStore::default();
        single.add_rule(base);
        RecurrenceService::catch_up(&mut single, date(2024, 4, 1));

        let collect = |store: &LedgerStore| -> HashSet<NaiveDate> {
            store.transactions.iter().map(|txn| txn.date).collect()
        };
        assert_eq!(stepwise.transactions.len(), single.transactions.len());
        assert_eq!(collect(&stepwise), collect(&single));
        assert_eq!(
            stepwise.recurring_rules[0].next_occurrence_date,
            single.recurring_rules[0].next_occurrence_date
        );
    }

    #[test]
    fn apply_prepends_instances_and_replaces_rules() {
        let mut store = LedgerStore::default();
        let manual = Transaction::new(50.0, "Lunch", "Food", date(2024, 5, 20));
        store.prepend_transaction(manual.clone());
        let rule_id = store.add_rule(rule(Frequency::Monthly, date(2024, 5, 1)));

        RecurrenceService::catch_up(&mut store, date(2024, 6, 5));

        assert_eq!(store.transactions.len(), 3);
        assert_eq!(store.transactions[0].date, date(2024, 5, 1));
        assert_eq!(store.transactions[1].date, date(2024, 6, 1));
        assert_eq!(store.transactions[2], manual);
        assert_eq!(store.rule(&rule_id).unwrap().next_occurrence_date, date(2024, 7, 1));
    }

    #[test]
    fn toggle_and_missing_rules() {
        let mut store = LedgerStore::default();
        let rule_id = store.add_rule(rule(Frequency::Monthly, date(2024, 5, 1)));

        assert!(!RecurrenceService::toggle(&mut store, &rule_id).unwrap());
        assert_eq!(RecurrenceService::catch_up(&mut store, date(2024, 9, 1)), 0);
        assert!(RecurrenceService::toggle(&mut store, &rule_id).unwrap());

        let missing = EntryId::from("nope");
        assert!(matches!(
            RecurrenceService::toggle(&mut store, &missing),
            Err(CoreError::RuleNotFound(_))
        ));
        assert!(matches!(
            RecurrenceService::remove(&mut store, &missing),
            Err(CoreError::RuleNotFound(_))
        ));
    }

    #[test]
    fn edited_due_date_cannot_rewind_past_recorded_occurrences() {
        let mut store = LedgerStore::default();
        let seed = Transaction::new(1200.0, "Rent", "Bills", date(2024, 1, 15));
        store.prepend_transaction(seed.clone());
        let rule_id = RecurrenceService::create_from_entry(&mut store, &seed, Frequency::Monthly);

        let before_catch_up = EntryDraft::new(1200.0, "Rent", "Bills", date(2024, 1, 15));
        assert!(matches!(
            RecurrenceService::update_rule(&mut store, &rule_id, before_catch_up, Frequency::Monthly),
            Err(CoreError::Validation(_))
        ));

        assert_eq!(RecurrenceService::catch_up(&mut store, date(2024, 4, 20)), 3);
        let rewind = EntryDraft::new(1300.0, "Rent", "Bills", date(2024, 2, 15));
        assert!(matches!(
            RecurrenceService::update_rule(&mut store, &rule_id, rewind, Frequency::Monthly),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(store.rule(&rule_id).unwrap().next_occurrence_date, date(2024, 5, 15));
        assert_eq!(store.rule(&rule_id).unwrap().amount, 1200.0);

        assert_eq!(RecurrenceService::catch_up(&mut store, date(2024, 4, 20)), 0);
        let mut seen = HashSet::new();
        assert!(store.transactions.iter().all(|txn| seen.insert(txn.date)));
        assert_eq!(store.transactions.len(), 4);

        let forward = EntryDraft::new(1300.0, "Rent", "Bills", date(2024, 5, 1));
        RecurrenceService::update_rule(&mut store, &rule_id, forward, Frequency::Monthly).unwrap();
        assert_eq!(store.rule(&rule_id).unwrap().next_occurrence_date, date(2024, 5, 1));
        assert_eq!(RecurrenceService::catch_up(&mut store, date(2024, 5, 1)), 1);
        assert_eq!(store.transactions[0].amount, 1300.0);
    }

    #[test]
    fn schedule_ending_at_last_calendar_day_stops_and_pauses() {
        let rules = vec![rule(Frequency::Daily, NaiveDate::MAX)];
        let outcome = advance(&rules, NaiveDate::MAX);

        assert_eq!(dates(&outcome), vec![NaiveDate::MAX]);
        let updated = &outcome.updated_rules[0];
        assert_eq!(updated.next_occurrence_date, NaiveDate::MAX);
        assert!(!updated.is_active);
        assert!(advance(&outcome.updated_rules, NaiveDate::MAX).is_empty());
    }
}
