//! Vigil CLI - Transaction anomaly detector
//!
//! Usage:
//!   vigil init                            Initialize database
//!   vigil users add alice                 Add a user
//!   vigil import --user alice --file CSV  Import transactions
//!   vigil detect --user alice             Scan for unusual transactions
//!   vigil review 42 --legitimate          Record a verdict

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vigil_core::AIClient;

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                Some(UsersAction::Add { name }) => commands::cmd_users_add(&db, &name),
                Some(UsersAction::List) | None => commands::cmd_users_list(&db),
            }
        }
        Commands::Import {
            user,
            file,
            expenses_negative,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &user, &file, expenses_negative).map(|_| ())
        }
        Commands::Detect { user, days } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config()?;
            commands::cmd_detect(&db, &user, days, AIClient::from_env(), &config).await.map(|_| ())
        }
        Commands::Anomalies { user } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_anomalies(&db, &user).map(|_| ())
        }
        Commands::Review {
            id,
            legitimate,
            suspicious: _,
            feedback,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_review(&db, id, legitimate, feedback.as_deref())
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
