//! CSV import for transaction exports
//!
//! Accepts a headered CSV with `date`, `description` and `amount` columns and
//! optional `category` and `merchant` columns, in any order. Amounts are
//! normalized so that positive means money leaving the account.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use std::io::Read;
use tracing::{debug, info};

use crate::db::{Database, TransactionInsertResult};
use crate::error::{Error, Result};
use crate::models::NewTransaction;

/// How to interpret an export
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// The file records expenses as negative numbers; flip every sign
    pub expenses_negative: bool,
}

/// Outcome of importing a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub parsed: usize,
    pub imported: usize,
    pub duplicates: usize,
}

/// Column positions resolved from the header row
#[derive(Debug)]
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    category: Option<usize>,
    merchant: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().to_ascii_lowercase();
                names.iter().any(|n| h == *n)
            })
        };
        let required = |names: &[&str]| {
            find(names).ok_or_else(|| Error::Import(format!("Missing column: {}", names[0])))
        };

        Ok(Self {
            date: required(&["date", "transaction date", "posted date"])?,
            description: required(&["description", "memo", "payee"])?,
            amount: required(&["amount"])?,
            category: find(&["category"]),
            merchant: find(&["merchant", "merchant_name", "merchant name"]),
        })
    }
}

/// Parse a CSV export into transactions ready for insertion
pub fn parse_csv<R: Read>(reader: R, options: ImportOptions) -> Result<Vec<NewTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut transactions = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = index + 2;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let field = |col: usize, name: &str| {
            record
                .get(col)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| Error::Import(format!("Line {}: missing {}", line, name)))
        };
        let optional = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let date = parse_date(field(columns.date, "date")?)
            .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?;
        let description = field(columns.description, "description")?.to_string();
        let mut amount = parse_amount(field(columns.amount, "amount")?)
            .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?;
        if options.expenses_negative {
            amount = -amount;
        }

        let import_hash = generate_hash(&date, &description, amount);

        transactions.push(NewTransaction {
            date,
            description,
            amount,
            category: optional(columns.category),
            merchant_name: optional(columns.merchant),
            import_hash,
        });
    }

    debug!("Parsed {} transactions", transactions.len());
    Ok(transactions)
}

/// Parse a CSV export and insert it for a user, skipping rows already imported
pub fn import_csv<R: Read>(
    db: &Database,
    user_id: i64,
    reader: R,
    options: ImportOptions,
) -> Result<ImportSummary> {
    if db.get_user(user_id)?.is_none() {
        return Err(Error::NotFound(format!("user {}", user_id)));
    }

    let transactions = parse_csv(reader, options)?;
    let mut summary = ImportSummary {
        parsed: transactions.len(),
        ..Default::default()
    };

    for tx in &transactions {
        match db.insert_transaction(user_id, tx)? {
            TransactionInsertResult::Inserted(_) => summary.imported += 1,
            TransactionInsertResult::Duplicate(_) => summary.duplicates += 1,
        }
    }

    info!(
        user_id,
        imported = summary.imported,
        duplicates = summary.duplicates,
        "Import complete"
    );
    Ok(summary)
}

/// Generate a unique hash for deduplication
fn generate_hash(date: &NaiveDate, description: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a date string in various common formats
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%m-%d-%Y", // 01-15-2024
        "%Y/%m/%d", // 2024/01/15
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, commas and parentheses
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    let amount = cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))?;

    if !amount.is_finite() {
        return Err(Error::Import(format!("Unable to parse amount: {}", s)));
    }
    Ok(amount)
}
