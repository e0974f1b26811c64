use colored::Colorize;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use spendwise_config::Config;
use spendwise_core::{BudgetProgress, DashboardSummary, RuleSnapshot};
use spendwise_domain::{CategoryItem, RuleStatus, Transaction};

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Section,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OutputPreferences {
    /// Drop colour codes, e.g. when stdout is piped into a file.
    pub plain: bool,
    /// Suppress informational lines; results and errors still print.
    pub quiet: bool,
}

static PREFERENCES: OnceLock<RwLock<OutputPreferences>> = OnceLock::new();

pub fn set_preferences(prefs: OutputPreferences) {
    let lock = PREFERENCES.get_or_init(|| RwLock::new(OutputPreferences::default()));
    if let Ok(mut guard) = lock.write() {
        *guard = prefs;
    }
}

fn preferences() -> OutputPreferences {
    PREFERENCES
        .get_or_init(|| RwLock::new(OutputPreferences::default()))
        .read()
        .map(|guard| *guard)
        .unwrap_or_default()
}

fn label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Info => "[i]",
        MessageKind::Success => "[ok]",
        MessageKind::Warning => "[!]",
        MessageKind::Error => "[x]",
        MessageKind::Section => "",
    }
}

fn apply_style(kind: MessageKind, message: impl fmt::Display, prefs: &OutputPreferences) -> String {
    let text = message.to_string();
    let formatted = match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        _ => format!("{} {text}", label(kind)),
    };

    if prefs.plain {
        return formatted;
    }

    match kind {
        MessageKind::Success => formatted.bright_green().to_string(),
        MessageKind::Warning => formatted.bright_yellow().to_string(),
        MessageKind::Error => formatted.bright_red().to_string(),
        MessageKind::Section => formatted.bold().to_string(),
        MessageKind::Info => formatted,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let prefs = preferences();
    if prefs.quiet && matches!(kind, MessageKind::Info | MessageKind::Section) {
        return;
    }
    let formatted = apply_style(kind, message, &prefs);
    match kind {
        MessageKind::Error | MessageKind::Warning => eprintln!("{formatted}"),
        MessageKind::Section => println!("\n{formatted}"),
        _ => println!("{formatted}"),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Renders `"#####....."` style meters for percentages.
fn meter(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

pub fn budget_line(progress: &BudgetProgress, config: &Config) -> String {
    let line = format!(
        "{} of {} [{}] {:.1}%",
        config.format_amount(progress.spent),
        config.format_amount(progress.budget),
        meter(progress.percent_used, 20),
        progress.percent_used
    );
    if preferences().plain {
        return line;
    }
    if progress.over_budget {
        line.bright_red().to_string()
    } else if progress.percent_used >= 80.0 {
        line.bright_yellow().to_string()
    } else {
        line.bright_green().to_string()
    }
}

pub fn transaction_row(txn: &Transaction, config: &Config) -> String {
    let mut row = format!(
        "{}  {:>12}  {:<14} {}",
        txn.date,
        config.format_amount(txn.amount),
        txn.category,
        txn.description
    );
    if let Some(bank) = txn.bank_name.as_deref() {
        row.push_str(&format!(" ({bank})"));
    }
    if txn.is_generated() {
        row.push_str(" [auto]");
    }
    format!("{row}  {}", txn.id)
}

pub fn rule_row(rule: &RuleSnapshot, config: &Config) -> String {
    let label = rule.status.label();
    let status = match rule.status {
        _ if preferences().plain => label.to_string(),
        RuleStatus::Paused => label.dimmed().to_string(),
        RuleStatus::DueToday | RuleStatus::Overdue => label.bright_yellow().to_string(),
        RuleStatus::Upcoming => label.to_string(),
    };
    format!(
        "{:<8} {:>12}  {:<14} {}  next {}  ({} generated) {}  {}",
        rule.frequency.label(),
        config.format_amount(rule.amount),
        rule.category,
        rule.description,
        rule.next_due,
        rule.generated,
        status,
        rule.rule_id
    )
}

pub fn category_row(category: &CategoryItem) -> String {
    let kind = if category.is_custom { "custom" } else { "built-in" };
    format!(
        "{:<16} {}  {:<8}  {}",
        category.name, category.color, kind, category.id
    )
}

pub fn dashboard(summary: &DashboardSummary, config: &Config) {
    section(format!("Dashboard for {}", summary.today));
    println!("Total spend: {}", config.format_amount(summary.total_spend));
    println!("Budget:      {}", budget_line(&summary.budget, config));

    if !summary.categories.is_empty() {
        section("By category");
        for total in &summary.categories {
            let share = if summary.total_spend > 0.0 {
                total.total / summary.total_spend * 100.0
            } else {
                0.0
            };
            println!(
                "{:<16} {:>12}  {:>5.1}%",
                total.category,
                config.format_amount(total.total),
                share
            );
        }
    }

    let window_total: f64 = summary.daily.iter().map(|day| day.amount).sum();
    if window_total > 0.0 {
        section("Last 30 days");
        for day in summary.daily.iter().filter(|day| day.amount > 0.0) {
            println!("{}  {:>12}", day.date, config.format_amount(day.amount));
        }
    }

    if !summary.category_averages.is_empty() {
        section("Daily average by category (30 days)");
        for avg in &summary.category_averages {
            println!(
                "{:<16} {:>12} per day  ({} total)",
                avg.category,
                config.format_amount(avg.average),
                config.format_amount(avg.total)
            );
        }
    }

    if !summary.banks.is_empty() {
        section("Credit by bank (30 days)");
        for bank in &summary.banks {
            println!("{:<16} {:>12}", bank.bank, config.format_amount(bank.total));
        }
    }

    section("Quick stats");
    let stats = &summary.stats;
    println!("Average per day:   {}", config.format_amount(stats.average_daily));
    if let Some(highest) = stats.highest_transaction {
        println!("Highest entry:     {}", config.format_amount(highest));
    }
    println!("Categories in use: {}", stats.categories_in_use);
    if let Some(top) = stats.top_category.as_deref() {
        println!("Top category:      {top}");
    }
}
