pub mod handlers;
pub mod output;

use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use spendwise_config::{Config, ConfigManager};
use spendwise_core::{
    storage::LedgerRepository,
    time::{Clock, FixedClock, SystemClock},
};
use spendwise_domain::Frequency;
use spendwise_storage_json::{JsonBlobStorage, StoragePaths};

use crate::{
    errors::AppResult,
    session::LedgerSession,
    utils::{app_base_dir, app_data_dir, long_version},
};

use output::OutputPreferences;

#[derive(Parser)]
#[command(
    name = "spendwise",
    about = "Personal expense ledger with recurring obligations.",
    version,
    long_version = long_version()
)]
pub struct Cli {
    /// Directory holding config, ledger data and backups
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,
    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,
    /// Disable colours
    #[arg(long, global = true)]
    pub plain: bool,
    /// Only print results and errors
    #[arg(long, short, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

/// Cadence accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatArg {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<RepeatArg> for Frequency {
    fn from(value: RepeatArg) -> Self {
        match value {
            RepeatArg::Daily => Frequency::Daily,
            RepeatArg::Weekly => Frequency::Weekly,
            RepeatArg::Monthly => Frequency::Monthly,
            RepeatArg::Yearly => Frequency::Yearly,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show totals, budget progress and the 30-day views.
    Summary {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List transactions, newest first.
    List {
        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Record an expense, optionally as the first of a recurring series.
    Add {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Lending bank, required for Loan and EMI
        #[arg(long)]
        bank: Option<String>,
        /// Repeat this entry on a schedule
        #[arg(long, value_enum)]
        repeat: Option<RepeatArg>,
    },
    /// Change fields of a transaction.
    Edit {
        id: String,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        bank: Option<String>,
    },
    /// Delete a transaction.
    Delete { id: String },
    /// List recurring rules with their next due date.
    Rules,
    /// Change a recurring rule, or turn it into a one-off entry.
    EditRule {
        id: String,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// New next due date
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        bank: Option<String>,
        #[arg(long, value_enum, conflicts_with = "one_off")]
        frequency: Option<RepeatArg>,
        /// Remove the rule and keep the entry as a single transaction
        #[arg(long = "one-off")]
        one_off: bool,
    },
    /// Pause or resume a recurring rule.
    ToggleRule { id: String },
    /// Delete a recurring rule. Generated transactions are kept.
    DeleteRule { id: String },
    /// List built-in and custom categories.
    Categories,
    /// Add a custom category.
    AddCategory {
        name: String,
        /// Hex colour, e.g. #22c55e
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a custom category by name or id.
    DeleteCategory { key: String },
    /// Show the monthly budget, or set it.
    Budget { amount: Option<f64> },
    /// Merge a JSON backup into the ledger. Known ids are skipped.
    ImportJson { file: PathBuf },
    /// Append transactions from a CSV file.
    ImportCsv { file: PathBuf },
    /// Write the whole ledger as a JSON backup document.
    ExportJson {
        /// Output path (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write all transactions as CSV.
    ExportCsv {
        /// Output path (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Manage backups in the data directory.
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Delete every transaction, rule, custom category and the budget.
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Write a backup of the current ledger.
    Create {
        /// Label appended to the file name
        #[arg(long)]
        note: Option<String>,
    },
    /// List backups, newest first.
    List,
    /// Merge a backup into the ledger.
    Restore { id: String },
    /// Delete a backup file.
    Delete { id: String },
}

/// Everything a command handler needs.
pub struct CliContext {
    pub config: Config,
    pub session: LedgerSession<JsonBlobStorage>,
}

/// Parses arguments, opens the ledger and runs one command.
pub fn run_cli() -> AppResult<()> {
    let cli = Cli::parse();

    let base_dir = app_base_dir(cli.data_dir.clone());
    let config = ConfigManager::with_base_dir(&base_dir)?.load()?;
    crate::init_with_filter(config.log_filter.as_deref());
    output::set_preferences(OutputPreferences {
        plain: cli.plain,
        quiet: cli.quiet,
    });

    let data_dir = app_data_dir(cli.data_dir.clone(), &config);
    let storage =
        JsonBlobStorage::with_retention(StoragePaths::under(&data_dir), config.backup_retention)?;
    let repo = LedgerRepository::new(storage, config.default_budget);
    let clock: Arc<dyn Clock> = match cli.today {
        Some(date) => Arc::new(FixedClock::on(date)),
        None => Arc::new(SystemClock),
    };
    let (session, report) = LedgerSession::open_with_clock(repo, clock)?;
    if report.generated > 0 {
        output::info(format!(
            "Added {} recurring entr{} that came due.",
            report.generated,
            if report.generated == 1 { "y" } else { "ies" }
        ));
    }

    let mut ctx = CliContext { config, session };
    handlers::dispatch(&mut ctx, cli.command)
}
