//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Detection configuration (override file or defaults)
//! - `find_user` - Resolve a user name given on the command line
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use vigil_core::config::{default_config_path, DetectionConfig};
use vigil_core::db::{Database, DB_KEY_ENV};
use vigil_core::models::User;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    debug!(path = %db_path.display(), no_encrypt, "Opening database");
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load detection thresholds from the override file or embedded defaults
pub fn load_config() -> Result<DetectionConfig> {
    DetectionConfig::load().context("Failed to load detection config")
}

/// Look up a user by name, with a hint when it does not exist
pub fn find_user(db: &Database, name: &str) -> Result<User> {
    db.get_user_by_name(name)?.with_context(|| {
        format!(
            "Unknown user '{}'. Add it first with: vigil users add {}",
            name, name
        )
    })
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED (key from {})", DB_KEY_ENV);
    }

    if let Some(path) = default_config_path() {
        println!("   Detection config override: {}", path.display());
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add a user: vigil users add alice");
    println!("  2. Import transactions: vigil import --user alice --file statement.csv");
    println!("  3. Scan for anomalies: vigil detect --user alice");

    Ok(())
}
