//! `extras` command

use anyhow::Result;
use colored::*;
use std::path::Path;

use super::{Session, read_export};
use crate::stock::{find_extras, write_extras_excel};

pub async fn handle_extras_command(
    session: &mut Session,
    export: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let bytes = read_export(export)?;
    let extras = find_extras(&mut session.doc, &session.config, &bytes).await?;

    if extras.is_empty() {
        println!("{} Every sheet identifier is in the export", "✓".bright_green());
    } else {
        println!("{} ({}):", "Extra IDs".yellow().bold(), extras.len());
        for extra in &extras {
            println!(
                "  {} {} {}",
                extra.id.bright_white(),
                format!("row {}", extra.row).dimmed(),
                extra.name.as_deref().unwrap_or("")
            );
        }
    }

    if let Some(path) = output {
        write_extras_excel(&extras, path)?;
        println!("Saved to {}", path.display().to_string().cyan());
    }

    Ok(())
}
