//! Spreadsheet interchange for transactions.
//!
//! The format is line oriented: one transaction per line, fields separated by
//! commas, description and bank double-quoted. Rows are validated one at a
//! time; a bad row is counted and skipped, never fatal.

use chrono::NaiveDate;
use tracing::{debug, info};

use spendwise_domain::{LedgerStore, Transaction, DEFAULT_CATEGORY};

pub const CSV_HEADER: &str = "Date,Description,Category,Amount,Bank";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Transactions recovered from a CSV document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvImport {
    pub transactions: Vec<Transaction>,
    pub skipped: usize,
}

/// Counts reported after a CSV import was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CsvImportReport {
    pub accepted: usize,
    pub skipped: usize,
}

/// Splits one line into fields.
///
/// A comma separates fields only when an even number of `"` characters
/// follows it up to the end of the line, so commas inside a balanced quoted
/// span stay in the field. Lines with unbalanced quotes split unevenly and are
/// rejected by the row checks.
pub fn split_fields(line: &str) -> Vec<&str> {
    let total_quotes = line.matches('"').count();
    let mut seen_quotes = 0;
    let mut fields = Vec::new();
    let mut start = 0;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => seen_quotes += 1,
            ',' if (total_quotes - seen_quotes) % 2 == 0 => {
                fields.push(&line[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    fields.push(&line[start..]);
    fields
}

/// Removes one surrounding quote on each side and collapses doubled quotes.
fn unquote(field: &str) -> String {
    let trimmed = field.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.replace("\"\"", "\"").trim().to_string()
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn parse_row(line: &str) -> Option<Transaction> {
    let fields = split_fields(line);
    if fields.len() < 4 {
        return None;
    }
    let date = NaiveDate::parse_from_str(fields[0].trim(), DATE_FORMAT).ok()?;
    let description = unquote(fields[1]);
    if description.is_empty() {
        return None;
    }
    let category = match unquote(fields[2]) {
        category if category.is_empty() => DEFAULT_CATEGORY.to_string(),
        category => category,
    };
    let amount: f64 = unquote(fields[3]).parse().ok()?;
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }
    let mut txn = Transaction::new(amount, description, category, date);
    txn.bank_name = fields
        .get(4)
        .map(|bank| unquote(bank))
        .filter(|bank| !bank.is_empty());
    Some(txn)
}

/// Parses a CSV document. The first line is a header and is always skipped;
/// blank lines are ignored without being counted. Every accepted row gets a
/// fresh id.
pub fn parse_csv(text: &str) -> CsvImport {
    let mut import = CsvImport::default();
    for (line_no, raw) in text.split('\n').enumerate().skip(1) {
        let line = raw.trim_end_matches('\r').trim();
        if line.is_empty() {
            continue;
        }
        match parse_row(line) {
            Some(txn) => import.transactions.push(txn),
            None => {
                debug!(line = line_no + 1, "skipping malformed csv row");
                import.skipped += 1;
            }
        }
    }
    import
}

/// Renders every transaction, in ledger order, below [`CSV_HEADER`].
pub fn export_csv(transactions: &[Transaction]) -> String {
    let mut out = String::from(CSV_HEADER);
    for txn in transactions {
        let category = if txn.category.contains(|c: char| c == ',' || c == '"') {
            quote(&txn.category)
        } else {
            txn.category.clone()
        };
        out.push('\n');
        out.push_str(&format!(
            "{},{},{},{},{}",
            txn.date.format(DATE_FORMAT),
            quote(&txn.description),
            category,
            txn.amount,
            quote(txn.bank_name.as_deref().unwrap_or_default()),
        ));
    }
    out
}

/// Appends every accepted row to the store. CSV rows carry no ids, so
/// importing the same file twice doubles its transactions.
pub fn import_csv(store: &mut LedgerStore, text: &str) -> CsvImportReport {
    let CsvImport {
        transactions,
        skipped,
    } = parse_csv(text);
    let report = CsvImportReport {
        accepted: transactions.len(),
        skipped,
    };
    store.transactions.extend(transactions);
    info!(accepted = report.accepted, skipped = report.skipped, "csv import applied");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quoted_commas_stay_in_their_field() {
        let fields = split_fields(r#"2024-05-01,"Coffee, Large",Food,150,"HDFC""#);
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[1], r#""Coffee, Large""#);
    }

    #[test]
    fn unterminated_quote_row_is_skipped_and_counted() {
        let text = "Date,Description,Category,Amount,Bank\n2024-05-01,\"Coffee, Large\",Food,150,\"\n";
        let import = parse_csv(text);
        assert!(import.transactions.is_empty());
        assert_eq!(import.skipped, 1);
    }

    #[test]
    fn parses_rows_and_normalizes_fields() {
        let text = concat!(
            "Date,Description,Category,Amount,Bank\r\n",
            "2024-05-01,\"Coffee, \"\"Large\"\"\",Food,150,\"\"\r\n",
            "\r\n",
            "2024-05-02,\"Car EMI\",EMI,4000.5,\"SBI\"\r\n",
            "2024-05-03,Bus,,20\n",
        );
        let import = parse_csv(text);
        assert_eq!(import.skipped, 0);
        assert_eq!(import.transactions.len(), 3);

        let coffee = &import.transactions[0];
        assert_eq!(coffee.description, "Coffee, \"Large\"");
        assert_eq!(coffee.date, date(2024, 5, 1));
        assert_eq!(coffee.bank_name, None);

        let emi = &import.transactions[1];
        assert_eq!(emi.amount, 4000.5);
        assert_eq!(emi.bank_name.as_deref(), Some("SBI"));

        assert_eq!(import.transactions[2].category, DEFAULT_CATEGORY);
        assert_ne!(import.transactions[0].id, import.transactions[1].id);
    }

    #[test]
    fn bad_rows_are_counted_individually() {
        let text = concat!(
            "Date,Description,Category,Amount,Bank\n",
            "2024-05-01,Tea,Food\n",
            "not-a-date,Tea,Food,10\n",
            "2024-05-01,,Food,10\n",
            "2024-05-01,Tea,Food,ten\n",
            "2024-05-01,Tea,Food,-5\n",
            "2024-05-01,Tea,Food,10\n",
        );
        let import = parse_csv(text);
        assert_eq!(import.transactions.len(), 1);
        assert_eq!(import.skipped, 5);
    }

    #[test]
    fn header_only_and_empty_documents_import_nothing() {
        assert_eq!(parse_csv(""), CsvImport::default());
        assert_eq!(parse_csv(CSV_HEADER), CsvImport::default());
    }

    #[test]
    fn export_quotes_text_columns() {
        let mut loan = Transaction::new(5000.0, "Home \"loan\"", "Loan", date(2024, 1, 5));
        loan.bank_name = Some("SBI".into());
        let tea = Transaction::new(12.5, "Tea", "Food", date(2024, 1, 6));
        let csv = export_csv(&[loan, tea]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], r#"2024-01-05,"Home ""loan""",Loan,5000,"SBI""#);
        assert_eq!(lines[2], r#"2024-01-06,"Tea",Food,12.5,"""#);
    }

    #[test]
    fn exported_rows_read_back() {
        let mut loan = Transaction::new(5000.0, "Home, loan", "Loan", date(2024, 1, 5));
        loan.bank_name = Some("SBI".into());
        let import = parse_csv(&export_csv(&[loan.clone()]));
        assert_eq!(import.skipped, 0);
        let back = &import.transactions[0];
        assert_eq!(back.description, loan.description);
        assert_eq!(back.bank_name, loan.bank_name);
        assert_eq!(back.amount, loan.amount);
    }

    #[test]
    fn importing_twice_doubles_the_ledger() {
        let mut store = LedgerStore::default();
        let text = "Date,Description,Category,Amount,Bank\n2024-05-01,Tea,Food,10,\n";
        assert_eq!(import_csv(&mut store, text).accepted, 1);
        import_csv(&mut store, text);
        assert_eq!(store.transactions.len(), 2);
    }
}
