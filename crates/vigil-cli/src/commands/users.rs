//! User command implementations

use anyhow::{Context, Result};
use vigil_core::db::Database;

pub fn cmd_users_add(db: &Database, name: &str) -> Result<()> {
    let id = db.upsert_user(name).context("Failed to add user")?;
    println!("✅ User '{}' (id {})", name.trim(), id);
    Ok(())
}

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users yet. Add one with: vigil users add <name>");
        return Ok(());
    }

    println!("{:<6} {:<24} {:>12}  CREATED", "ID", "NAME", "TRANSACTIONS");
    println!("{}", "-".repeat(60));
    for user in users {
        let count = db.count_transactions(user.id)?;
        println!(
            "{:<6} {:<24} {:>12}  {}",
            user.id,
            super::truncate(&user.name, 24),
            count,
            user.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}
