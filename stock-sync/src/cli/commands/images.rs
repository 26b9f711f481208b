//! `images` command

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use super::Session;
use crate::stock::sync_images;

pub async fn handle_images_command(session: &mut Session, urls: &Path, dry_run: bool) -> Result<()> {
    let content = std::fs::read_to_string(urls)
        .with_context(|| format!("Failed to read URL list: {}", urls.display()))?;

    let outcome = sync_images(&mut session.doc, &session.config, &content, dry_run).await?;

    match &outcome.applied {
        Some(result) => println!(
            "{} {} image cells updated",
            "✓".bright_green(),
            result.total_updated_cells.to_string().bold()
        ),
        None => println!(
            "{} {} image updates planned (dry run)",
            "•".yellow(),
            outcome.plan.writes.len().to_string().bold()
        ),
    }
    if outcome.malformed > 0 {
        println!("{} malformed lines skipped", outcome.malformed.to_string().yellow());
    }
    if !outcome.plan.unknown.is_empty() {
        println!(
            "{} ({}): {}",
            "Unknown products".yellow().bold(),
            outcome.plan.unknown.len(),
            outcome.plan.unknown.join(", ")
        );
    }

    Ok(())
}
