//! Aggregation helpers for dashboard summaries.
//!
//! Every projection is a pure read of the store; nothing here mutates state.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use spendwise_domain::{DateWindow, LedgerStore, Transaction};

/// Length of the trailing window used by the daily, average and bank views.
pub const TRAILING_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAverage {
    pub category: String,
    pub total: f64,
    /// `total / 30`, regardless of how many days had spending.
    pub average: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankTotal {
    pub bank: String,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetProgress {
    pub spent: f64,
    pub budget: f64,
    /// Share of the budget used, capped at 100.
    pub percent_used: f64,
    pub over_budget: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickStats {
    pub average_daily: f64,
    pub highest_transaction: Option<f64>,
    pub categories_in_use: usize,
    pub top_category: Option<String>,
}

/// Everything the summary screen renders, computed in one pass per view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub total_spend: f64,
    pub budget: BudgetProgress,
    pub categories: Vec<CategoryTotal>,
    pub daily: Vec<DailySpend>,
    pub category_averages: Vec<CategoryAverage>,
    pub banks: Vec<BankTotal>,
    pub stats: QuickStats,
}

/// Sums amounts per key, keeping keys in first-appearance order.
fn totals_by<'a, I, K>(transactions: I, key: K) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = &'a Transaction>,
    K: Fn(&'a Transaction) -> Option<&'a str>,
{
    let mut order: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for txn in transactions {
        let Some(name) = key(txn) else { continue };
        match index.get(name) {
            Some(&slot) => order[slot].1 += txn.amount,
            None => {
                index.insert(name, order.len());
                order.push((name.to_string(), txn.amount));
            }
        }
    }
    order
}

fn in_window(store: &LedgerStore, window: DateWindow) -> impl Iterator<Item = &Transaction> {
    store
        .transactions
        .iter()
        .filter(move |txn| window.contains(txn.date))
}

pub struct SummaryService;

impl SummaryService {
    pub fn total_spend(store: &LedgerStore) -> f64 {
        store.transactions.iter().map(|txn| txn.amount).sum()
    }

    /// Per-category totals over the whole ledger, in first-appearance order.
    pub fn category_totals(store: &LedgerStore) -> Vec<CategoryTotal> {
        totals_by(&store.transactions, |txn| Some(txn.category.as_str()))
            .into_iter()
            .map(|(category, total)| CategoryTotal {
                color: store.category_color(&category),
                category,
                total,
            })
            .collect()
    }

    /// Zero-filled daily totals for the 30 days ending with `today`.
    pub fn daily_series(store: &LedgerStore, today: NaiveDate) -> Vec<DailySpend> {
        let window = DateWindow::trailing(today, TRAILING_WINDOW_DAYS);
        let mut by_day: HashMap<NaiveDate, f64> = HashMap::new();
        for txn in in_window(store, window) {
            *by_day.entry(txn.date).or_default() += txn.amount;
        }
        window
            .days()
            .map(|date| DailySpend {
                date,
                amount: by_day.get(&date).copied().unwrap_or_default(),
            })
            .collect()
    }

    /// Trailing-window category totals with `total / 30` averages, highest first.
    pub fn category_averages(store: &LedgerStore, today: NaiveDate) -> Vec<CategoryAverage> {
        let window = DateWindow::trailing(today, TRAILING_WINDOW_DAYS);
        let mut averages: Vec<CategoryAverage> =
            totals_by(in_window(store, window), |txn| Some(txn.category.as_str()))
                .into_iter()
                .map(|(category, total)| CategoryAverage {
                    color: store.category_color(&category),
                    average: total / f64::from(TRAILING_WINDOW_DAYS),
                    category,
                    total,
                })
                .collect();
        averages.sort_by(|a, b| b.average.total_cmp(&a.average));
        averages
    }

    /// Trailing-window totals per bank, highest first. Entries without a bank
    /// are ignored.
    pub fn bank_totals(store: &LedgerStore, today: NaiveDate) -> Vec<BankTotal> {
        let window = DateWindow::trailing(today, TRAILING_WINDOW_DAYS);
        let mut banks: Vec<BankTotal> = totals_by(in_window(store, window), |txn| {
            txn.bank_name.as_deref()
        })
        .into_iter()
        .map(|(bank, total)| BankTotal { bank, total })
        .collect();
        banks.sort_by(|a, b| b.total.total_cmp(&a.total));
        banks
    }

    pub fn budget_progress(spent: f64, budget: f64) -> BudgetProgress {
        let percent_used = if budget > 0.0 {
            (spent / budget * 100.0).min(100.0)
        } else if spent > 0.0 {
            100.0
        } else {
            0.0
        };
        BudgetProgress {
            spent,
            budget,
            percent_used,
            over_budget: spent > budget,
        }
    }

    pub fn quick_stats(store: &LedgerStore) -> QuickStats {
        let totals = Self::category_totals(store);
        let average_daily = if store.transactions.is_empty() {
            0.0
        } else {
            Self::total_spend(store) / f64::from(TRAILING_WINDOW_DAYS)
        };
        let highest_transaction = store
            .transactions
            .iter()
            .map(|txn| txn.amount)
            .max_by(|a, b| a.total_cmp(b));
        // Ties resolve to the category seen first.
        let top_category = totals
            .iter()
            .fold(None::<&CategoryTotal>, |best, candidate| match best {
                Some(best) if best.total >= candidate.total => Some(best),
                _ => Some(candidate),
            })
            .map(|top| top.category.clone());
        QuickStats {
            average_daily,
            highest_transaction,
            categories_in_use: totals.len(),
            top_category,
        }
    }

    pub fn dashboard(store: &LedgerStore, today: NaiveDate) -> DashboardSummary {
        let total_spend = Self::total_spend(store);
        DashboardSummary {
            today,
            total_spend,
            budget: Self::budget_progress(total_spend, store.budget),
            categories: Self::category_totals(store),
            daily: Self::daily_series(store, today),
            category_averages: Self::category_averages(store, today),
            banks: Self::bank_totals(store, today),
            stats: Self::quick_stats(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> LedgerStore {
        let mut store = LedgerStore::new(1_000.0);
        let txns = [
            Transaction::new(100.0, "Groceries", "Food", date(2024, 3, 30)),
            Transaction::new(50.0, "Bus", "Transport", date(2024, 3, 1)),
            Transaction::new(30.0, "Snacks", "Food", date(2024, 2, 29)),
            Transaction::new(900.0, "Future", "Shopping", date(2024, 4, 2)),
            Transaction::new(600.0, "Car EMI", "EMI", date(2024, 3, 15)).with_bank("SBI"),
            Transaction::new(200.0, "Home loan", "Loan", date(2024, 3, 16)).with_bank("HDFC"),
            Transaction::new(300.0, "Top up", "Loan", date(2024, 1, 10)).with_bank("HDFC"),
        ];
        store.transactions.extend(txns);
        store
    }

    #[test]
    fn category_totals_keep_first_appearance_order() {
        let totals = SummaryService::category_totals(&store());
        let names: Vec<&str> = totals.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(names, ["Food", "Transport", "Shopping", "EMI", "Loan"]);
        assert_eq!(totals[0].total, 130.0);
        assert_eq!(totals[4].total, 500.0);
    }

    #[test]
    fn daily_series_is_zero_filled_and_inclusive() {
        let series = SummaryService::daily_series(&store(), date(2024, 3, 30));
        assert_eq!(series.len(), 30);
        assert_eq!(series[0].date, date(2024, 3, 1));
        assert_eq!(series[0].amount, 50.0);
        assert_eq!(series[29].date, date(2024, 3, 30));
        assert_eq!(series[29].amount, 100.0);
        assert_eq!(series.iter().filter(|day| day.amount == 0.0).count(), 26);
    }

    #[test]
    fn averages_sort_descending_and_ignore_future_entries() {
        let averages = SummaryService::category_averages(&store(), date(2024, 3, 30));
        let names: Vec<&str> = averages.iter().map(|a| a.category.as_str()).collect();
        assert_eq!(names, ["EMI", "Loan", "Food", "Transport"]);
        assert_eq!(averages[0].average, 20.0);
        assert_eq!(averages[2].total, 100.0);
    }

    #[test]
    fn bank_totals_only_count_windowed_credit_entries() {
        let banks = SummaryService::bank_totals(&store(), date(2024, 3, 30));
        assert_eq!(
            banks,
            vec![
                BankTotal { bank: "SBI".into(), total: 600.0 },
                BankTotal { bank: "HDFC".into(), total: 200.0 },
            ]
        );
    }

    #[test]
    fn budget_progress_caps_and_flags_overspend() {
        let under = SummaryService::budget_progress(250.0, 1_000.0);
        assert_eq!(under.percent_used, 25.0);
        assert!(!under.over_budget);

        let over = SummaryService::budget_progress(1_500.0, 1_000.0);
        assert_eq!(over.percent_used, 100.0);
        assert!(over.over_budget);

        assert_eq!(SummaryService::budget_progress(10.0, 0.0).percent_used, 100.0);
        assert_eq!(SummaryService::budget_progress(0.0, 0.0).percent_used, 0.0);
    }

    #[test]
    fn quick_stats_summarize_whole_ledger() {
        let stats = SummaryService::quick_stats(&store());
        assert_eq!(stats.average_daily, 2_180.0 / 30.0);
        assert_eq!(stats.highest_transaction, Some(900.0));
        assert_eq!(stats.categories_in_use, 5);
        assert_eq!(stats.top_category.as_deref(), Some("Shopping"));

        let empty = SummaryService::quick_stats(&LedgerStore::default());
        assert_eq!(empty.average_daily, 0.0);
        assert_eq!(empty.highest_transaction, None);
        assert_eq!(empty.top_category, None);
    }

    #[test]
    fn dashboard_measures_budget_against_total_spend() {
        let summary = SummaryService::dashboard(&store(), date(2024, 3, 30));
        assert_eq!(summary.total_spend, 2_180.0);
        assert!(summary.budget.over_budget);
        assert_eq!(summary.daily.len(), 30);
    }
}
