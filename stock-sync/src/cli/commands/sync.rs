//! `sync` command

use anyhow::Result;
use colored::*;

use super::{Session, read_export};
use crate::cli::SyncArgs;
use crate::stock::{SyncOptions, reconcile, write_report_excel};

pub async fn handle_sync_command(session: &mut Session, args: SyncArgs) -> Result<()> {
    let bytes = read_export(&args.export)?;
    let options = SyncOptions {
        dry_run: args.dry_run,
        tax: !args.no_tax,
    };

    println!("Reconciling {}", args.export.display().to_string().cyan());
    let outcome = reconcile(&mut session.doc, &session.config, &bytes, options).await?;
    let report = &outcome.report;

    println!();
    match &outcome.applied {
        Some(result) => println!(
            "{} {} cells updated",
            "✓".bright_green(),
            result.total_updated_cells.to_string().bold()
        ),
        None => println!(
            "{} {} cell updates planned (dry run)",
            "•".yellow(),
            report.writes.len().to_string().bold()
        ),
    }
    println!("Dropped export rows: {}", report.dropped);

    if !report.missing_ids.is_empty() {
        println!();
        println!("{} ({}):", "Missing IDs".yellow().bold(), report.missing_ids.len());
        for missing in &report.missing_ids {
            println!(
                "  {} {}",
                missing.id.bright_white(),
                missing.name.as_deref().unwrap_or("").dimmed()
            );
        }
    }
    if !report.missing_conditioning.is_empty() {
        println!();
        println!(
            "{} ({}): {}",
            "Missing conditioning".yellow().bold(),
            report.missing_conditioning.len(),
            report.missing_conditioning.join(", ")
        );
    }
    if !report.invalid_conditioning.is_empty() {
        println!();
        println!(
            "{} ({}): {}",
            "Unusable conditioning".red().bold(),
            report.invalid_conditioning.len(),
            report.invalid_conditioning.join(", ")
        );
    }

    if let Some(path) = &args.output {
        write_report_excel(report, args.dry_run, path)?;
        println!();
        println!("Report saved to {}", path.display().to_string().cyan());
    }

    Ok(())
}
