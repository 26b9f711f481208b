//! `check-names` command

use anyhow::Result;
use colored::*;
use std::path::Path;

use super::{Session, read_export};
use crate::stock::check_names;

pub async fn handle_check_names_command(session: &mut Session, export: &Path) -> Result<()> {
    let bytes = read_export(export)?;
    let check = check_names(&mut session.doc, &session.config, &bytes).await?;

    println!(
        "{} OK, {} NOK",
        check.ok.to_string().bright_green(),
        check.nok().to_string().bright_red()
    );
    for mismatch in &check.mismatches {
        println!(
            "  {}: export {} / drive {}",
            mismatch.name.bold(),
            mismatch.export_id.cyan(),
            if mismatch.remote_id.is_empty() {
                "(vide)".dimmed()
            } else {
                mismatch.remote_id.yellow()
            }
        );
    }

    Ok(())
}
