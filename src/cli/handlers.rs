//! One function per subcommand. Results go to stdout, diagnostics to stderr.

use std::{fs, path::Path};

use spendwise_core::{CategoryService, CoreError, EntryDraft, TransactionService};
use spendwise_domain::{EntryId, Frequency};
use spendwise_storage_json::replace_file;

use super::{output, BackupCommands, CliContext, Commands};
use crate::errors::{AppError, AppResult};

/// Field overrides shared by `edit` and `edit-rule`.
#[derive(Debug, Default)]
struct DraftOverrides {
    amount: Option<f64>,
    description: Option<String>,
    category: Option<String>,
    date: Option<chrono::NaiveDate>,
    bank: Option<String>,
}

impl DraftOverrides {
    fn apply(self, base: EntryDraft) -> EntryDraft {
        EntryDraft {
            amount: self.amount.unwrap_or(base.amount),
            description: self.description.unwrap_or(base.description),
            category: self.category.unwrap_or(base.category),
            date: self.date.unwrap_or(base.date),
            bank_name: self.bank.or(base.bank_name),
        }
    }
}

pub fn dispatch(ctx: &mut CliContext, command: Commands) -> AppResult<()> {
    match command {
        Commands::Summary { json } => summary(ctx, json),
        Commands::List { limit } => list(ctx, limit),
        Commands::Add {
            amount,
            description,
            category,
            date,
            bank,
            repeat,
        } => {
            let date = date.unwrap_or_else(|| ctx.session.today());
            let mut draft = EntryDraft::new(amount, description, category, date);
            draft.bank_name = bank;
            add(ctx, draft, repeat.map(Frequency::from))
        }
        Commands::Edit {
            id,
            amount,
            description,
            category,
            date,
            bank,
        } => edit(
            ctx,
            &EntryId::from(id),
            DraftOverrides {
                amount,
                description,
                category,
                date,
                bank,
            },
        ),
        Commands::Delete { id } => delete(ctx, &EntryId::from(id)),
        Commands::Rules => rules(ctx),
        Commands::EditRule {
            id,
            amount,
            description,
            category,
            date,
            bank,
            frequency,
            one_off,
        } => edit_rule(
            ctx,
            &EntryId::from(id),
            DraftOverrides {
                amount,
                description,
                category,
                date,
                bank,
            },
            frequency.map(Frequency::from),
            one_off,
        ),
        Commands::ToggleRule { id } => toggle_rule(ctx, &EntryId::from(id)),
        Commands::DeleteRule { id } => delete_rule(ctx, &EntryId::from(id)),
        Commands::Categories => categories(ctx),
        Commands::AddCategory { name, color } => add_category(ctx, &name, color.as_deref()),
        Commands::DeleteCategory { key } => delete_category(ctx, &key),
        Commands::Budget { amount } => budget(ctx, amount),
        Commands::ImportJson { file } => import_json(ctx, &file),
        Commands::ImportCsv { file } => import_csv(ctx, &file),
        Commands::ExportJson { output } => {
            let json = ctx.session.export_json()?;
            write_or_print(output.as_deref(), &json)
        }
        Commands::ExportCsv { output } => {
            let csv = ctx.session.export_csv();
            write_or_print(output.as_deref(), &csv)
        }
        Commands::Backup { command } => backup(ctx, command),
        Commands::Reset { yes } => reset(ctx, yes),
    }
}

fn summary(ctx: &CliContext, json: bool) -> AppResult<()> {
    let summary = ctx.session.dashboard();
    if json {
        let text = serde_json::to_string_pretty(&summary).map_err(CoreError::from)?;
        println!("{text}");
        return Ok(());
    }
    output::dashboard(&summary, &ctx.config);
    if summary.budget.over_budget {
        output::warning("Spending is over budget.");
    }
    Ok(())
}

fn list(ctx: &CliContext, limit: Option<usize>) -> AppResult<()> {
    let entries = TransactionService::list_by_date(ctx.session.store());
    if entries.is_empty() {
        output::info("No transactions yet.");
        return Ok(());
    }
    let limit = limit.unwrap_or(entries.len());
    for txn in entries.into_iter().take(limit) {
        println!("{}", output::transaction_row(txn, &ctx.config));
    }
    Ok(())
}

fn add(ctx: &mut CliContext, draft: EntryDraft, repeat: Option<Frequency>) -> AppResult<()> {
    let added = ctx.session.add_entry(draft, repeat)?;
    output::success(format!("Added transaction {}", added.transaction_id));
    if let (Some(rule_id), Some(frequency)) = (added.rule_id, repeat) {
        output::success(format!("Repeats {}: rule {rule_id}", frequency.label()));
    }
    Ok(())
}

fn edit(ctx: &mut CliContext, id: &EntryId, overrides: DraftOverrides) -> AppResult<()> {
    let current = ctx
        .session
        .store()
        .transaction(id)
        .ok_or_else(|| CoreError::TransactionNotFound(id.clone()))?;
    let mut base = EntryDraft::new(
        current.amount,
        current.description.clone(),
        current.category.clone(),
        current.date,
    );
    base.bank_name = current.bank_name.clone();
    ctx.session.edit_entry(id, overrides.apply(base))?;
    output::success(format!("Updated transaction {id}"));
    Ok(())
}

fn delete(ctx: &mut CliContext, id: &EntryId) -> AppResult<()> {
    let removed = ctx.session.delete_entry(id)?;
    output::success(format!(
        "Deleted {} ({})",
        removed.description,
        ctx.config.format_amount(removed.amount)
    ));
    Ok(())
}

fn rules(ctx: &CliContext) -> AppResult<()> {
    let snapshots = ctx.session.rule_snapshots();
    if snapshots.is_empty() {
        output::info("No recurring rules.");
        return Ok(());
    }
    for snapshot in &snapshots {
        println!("{}", output::rule_row(snapshot, &ctx.config));
    }
    Ok(())
}

fn edit_rule(
    ctx: &mut CliContext,
    id: &EntryId,
    overrides: DraftOverrides,
    frequency: Option<Frequency>,
    one_off: bool,
) -> AppResult<()> {
    let rule = ctx
        .session
        .store()
        .rule(id)
        .ok_or_else(|| CoreError::RuleNotFound(id.clone()))?;
    let mut base = EntryDraft::new(
        rule.amount,
        rule.description.clone(),
        rule.category.clone(),
        rule.next_occurrence_date,
    );
    base.bank_name = rule.bank_name.clone();
    let current_frequency = rule.frequency;
    let draft = overrides.apply(base);

    if one_off {
        let txn_id = ctx.session.convert_rule_to_one_off(id, draft)?;
        output::success(format!("Rule {id} removed; kept as transaction {txn_id}"));
    } else {
        ctx.session
            .update_rule(id, draft, frequency.unwrap_or(current_frequency))?;
        output::success(format!("Updated rule {id}"));
    }
    Ok(())
}

fn toggle_rule(ctx: &mut CliContext, id: &EntryId) -> AppResult<()> {
    let active = ctx.session.toggle_rule(id)?;
    let state = if active { "resumed" } else { "paused" };
    output::success(format!("Rule {id} {state}"));
    Ok(())
}

fn delete_rule(ctx: &mut CliContext, id: &EntryId) -> AppResult<()> {
    let removed = ctx.session.delete_rule(id)?;
    output::success(format!("Deleted rule for {}", removed.description));
    Ok(())
}

fn categories(ctx: &CliContext) -> AppResult<()> {
    for category in CategoryService::list(ctx.session.store()) {
        println!("{}", output::category_row(&category));
    }
    Ok(())
}

fn add_category(ctx: &mut CliContext, name: &str, color: Option<&str>) -> AppResult<()> {
    let id = ctx.session.add_category(name, color)?;
    output::success(format!("Added category {} ({id})", name.trim()));
    Ok(())
}

fn delete_category(ctx: &mut CliContext, key: &str) -> AppResult<()> {
    let removal = ctx.session.delete_category(key)?;
    output::success(format!("Deleted category {}", removal.removed.name));
    if removal.still_referenced {
        output::warning(format!(
            "Existing entries still use {}; they keep the name.",
            removal.removed.name
        ));
    }
    Ok(())
}

fn budget(ctx: &mut CliContext, amount: Option<f64>) -> AppResult<()> {
    match amount {
        Some(amount) => {
            ctx.session.set_budget(amount)?;
            output::success(format!("Budget set to {}", ctx.config.format_amount(amount)));
        }
        None => {
            let summary = ctx.session.dashboard();
            println!("{}", output::budget_line(&summary.budget, &ctx.config));
        }
    }
    Ok(())
}

fn import_json(ctx: &mut CliContext, file: &Path) -> AppResult<()> {
    let text = fs::read_to_string(file)?;
    let report = ctx.session.import_json(&text)?;
    output::success(format!(
        "Imported {} transactions, {} rules, {} categories",
        report.transactions_added, report.rules_added, report.categories_added
    ));
    if report.categories_skipped > 0 {
        output::info(format!(
            "Skipped {} categories whose names already exist",
            report.categories_skipped
        ));
    }
    if report.budget_replaced {
        output::info("Budget replaced from backup");
    }
    Ok(())
}

fn import_csv(ctx: &mut CliContext, file: &Path) -> AppResult<()> {
    let text = fs::read_to_string(file)?;
    let report = ctx.session.import_csv(&text);
    output::success(format!("Imported {} transactions", report.accepted));
    if report.skipped > 0 {
        output::warning(format!("Skipped {} malformed rows", report.skipped));
    }
    Ok(())
}

fn write_or_print(target: Option<&Path>, text: &str) -> AppResult<()> {
    match target {
        Some(path) => {
            replace_file(path, text)?;
            output::success(format!("Wrote {}", path.display()));
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn backup(ctx: &mut CliContext, command: BackupCommands) -> AppResult<()> {
    match command {
        BackupCommands::Create { note } => {
            let document = ctx.session.backup_document();
            let info = ctx.session.blobs().write_backup(&document, note.as_deref())?;
            output::success(format!("Backup written: {}", info.id));
        }
        BackupCommands::List => {
            let backups = ctx.session.blobs().list_backups()?;
            if backups.is_empty() {
                output::info("No backups yet.");
            }
            for info in backups {
                let created = info
                    .created_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{}  {}  {} bytes", info.id, created, info.size_bytes);
            }
        }
        BackupCommands::Restore { id } => {
            let batch = ctx.session.blobs().read_backup(&id)?;
            let report = ctx.session.import_batch(&batch)?;
            output::success(format!(
                "Restored {id}: {} transactions, {} rules, {} categories added",
                report.transactions_added, report.rules_added, report.categories_added
            ));
        }
        BackupCommands::Delete { id } => {
            ctx.session.blobs().delete_backup(&id)?;
            output::success(format!("Deleted backup {id}"));
        }
    }
    Ok(())
}

fn reset(ctx: &mut CliContext, yes: bool) -> AppResult<()> {
    if !yes {
        return Err(AppError::InvalidInput(
            "reset deletes the whole ledger; pass --yes to confirm".into(),
        ));
    }
    ctx.session.reset()?;
    output::success("Ledger cleared");
    Ok(())
}
