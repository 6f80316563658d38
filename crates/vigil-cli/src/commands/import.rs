//! Import command implementation

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use vigil_core::db::Database;
use vigil_core::import::{import_csv, ImportOptions, ImportSummary};

use super::find_user;

pub fn cmd_import(
    db: &Database,
    user: &str,
    file: &Path,
    expenses_negative: bool,
) -> Result<ImportSummary> {
    let user = find_user(db, user)?;

    println!("📥 Importing {} for {}...", file.display(), user.name);

    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let summary = import_csv(db, user.id, reader, ImportOptions { expenses_negative })
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!("   Parsed: {}", summary.parsed);
    println!("   Imported: {}", summary.imported);
    if summary.duplicates > 0 {
        println!("   Skipped duplicates: {}", summary.duplicates);
    }
    println!("✅ Import complete. Run 'vigil detect --user {}' next.", user.name);

    Ok(summary)
}
