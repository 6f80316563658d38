//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, load_config, find_user) and init
//! - `users` - User management commands
//! - `import` - CSV import command
//! - `detect` - Anomaly detection and listing
//! - `review` - Review verdicts for flagged transactions
//! - `prompts` - Prompt library management commands

pub mod core;
pub mod detect;
pub mod import;
pub mod prompts;
pub mod review;
pub mod users;

// Re-export command functions for main.rs
pub use core::*;
pub use detect::*;
pub use import::*;
pub use prompts::*;
pub use review::*;
pub use users::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
