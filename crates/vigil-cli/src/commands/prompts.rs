//! Prompts-related command implementations

use anyhow::{bail, Result};
use vigil_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

/// List all available prompts and their override status
pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();

    println!("{:<24} {:>7}  {:<12}  SOURCE", "ID", "VERSION", "TASK TYPE");
    println!("{}", "-".repeat(60));

    for info in library.list() {
        let source = if info.has_override {
            "✓ Custom"
        } else {
            "Default"
        };
        println!(
            "{:<24} {:>7}  {:<12}  {}",
            info.id, info.version, info.task_type, source
        );
    }

    println!();
    println!("To customize a prompt, copy it into the override directory:");
    println!("  vigil prompts path");

    Ok(())
}

/// Show the content of a specific prompt
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let Ok(id) = prompt_id.parse::<PromptId>() else {
        let known: Vec<_> = PromptId::all().iter().map(|id| id.as_str()).collect();
        bail!(
            "Unknown prompt ID: {} (available: {})",
            prompt_id,
            known.join(", ")
        );
    };

    let mut library = PromptLibrary::new();
    let prompt = library.get(id)?;

    println!("Prompt: {}", prompt.metadata.id);
    println!("Version: {}", prompt.metadata.version);
    println!("Task Type: {}", prompt.metadata.task_type);
    match &prompt.override_path {
        Some(path) if prompt.is_override => println!("Source: Override ({})", path.display()),
        _ => println!("Source: Default"),
    }

    println!();
    println!("--- Content ---");
    println!("{}", prompt.content);

    Ok(())
}

/// Show the path where prompt overrides should be placed
pub fn cmd_prompts_path() -> Result<()> {
    let Some(path) = default_prompts_dir() else {
        bail!("Could not determine prompts directory: no local data directory on this system");
    };

    println!("{}", path.display());
    if !path.exists() {
        eprintln!();
        eprintln!("Note: This directory does not exist yet.");
        eprintln!(
            "Create it and add e.g. {}.md to override a prompt.",
            PromptId::ExplainAnomaly.as_str()
        );
    }

    Ok(())
}
