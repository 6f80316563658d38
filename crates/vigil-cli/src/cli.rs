//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Vigil - Spot unusual transactions in your spending history
#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Self-hosted transaction anomaly detector", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "vigil.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set VIGIL_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage users
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Import transactions from CSV (date,description,amount[,category][,merchant])
    Import {
        /// User the transactions belong to
        #[arg(short, long)]
        user: String,

        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// The file records expenses as negative numbers
        #[arg(long)]
        expenses_negative: bool,
    },

    /// Scan a user's recent transactions for anomalies
    Detect {
        /// User to scan
        #[arg(short, long)]
        user: String,

        /// Lookback window in days (defaults to the configured window)
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// List flagged transactions awaiting review
    Anomalies {
        /// User whose anomalies to list
        #[arg(short, long)]
        user: String,
    },

    /// Review a flagged transaction
    Review {
        /// Transaction ID
        id: i64,

        /// The transaction is legitimate
        #[arg(long, conflicts_with = "suspicious", required_unless_present = "suspicious")]
        legitimate: bool,

        /// The transaction is suspicious
        #[arg(long)]
        suspicious: bool,

        /// Optional note stored with the review
        #[arg(short, long)]
        feedback: Option<String>,
    },

    /// Manage AI prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// Add a user (no-op if the name exists)
    Add {
        /// User name
        name: String,
    },
    /// List users
    List,
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,
    /// Show the content of a prompt
    Show {
        /// Prompt ID (e.g., explain_anomaly)
        id: String,
    },
    /// Show the prompt override directory
    Path,
}
