//! Read-only comparisons between the export and the sheet
//!
//! Neither check queues writes; both reuse the column resolution and
//! identifier normalization of the reconciliation run.

use anyhow::{Context, Result};
use log::info;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::export::{ExportColumns, ExportRow, ExportTable, normalize_id};
use crate::config::{Config, require};
use crate::sheets::{FIRST_DATA_ROW, SheetDocument};

/// A product whose name matches but whose identifiers differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameMismatch {
    pub name: String,
    pub export_id: String,
    pub remote_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameCheck {
    pub ok: usize,
    /// Sorted by name
    pub mismatches: Vec<NameMismatch>,
}

impl NameCheck {
    pub fn nok(&self) -> usize {
        self.mismatches.len()
    }
}

/// Sheet identifier absent from the export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraId {
    pub id: String,
    /// One-based spreadsheet row
    pub row: usize,
    pub name: Option<String>,
}

/// Compare export identifiers with the sheet identifier of the first row
/// carrying the same product name
pub fn compare_names(
    export: &[(String, Option<String>)],
    remote_ids: &[Option<String>],
    remote_names: &[Option<String>],
) -> NameCheck {
    let mut first_row: HashMap<&str, usize> = HashMap::new();
    for (offset, name) in remote_names.iter().enumerate() {
        if let Some(name) = name.as_deref() {
            first_row.entry(name.trim()).or_insert(offset);
        }
    }

    let mut check = NameCheck::default();
    let mut seen: HashSet<&str> = HashSet::new();
    for (export_id, name) in export {
        let Some(name) = name.as_deref() else {
            continue;
        };
        // Each name counts once, with its first export row
        if !seen.insert(name.trim()) {
            continue;
        }
        let Some(&row) = first_row.get(name.trim()) else {
            continue;
        };

        let remote_id = remote_ids
            .get(row)
            .and_then(|id| id.as_deref())
            .map(normalize_id)
            .unwrap_or_default();
        if remote_id == export_id.as_str() {
            check.ok += 1;
        } else {
            check.mismatches.push(NameMismatch {
                name: name.trim().to_string(),
                export_id: export_id.clone(),
                remote_id: remote_id.to_string(),
            });
        }
    }

    check.mismatches.sort_by(|a, b| a.name.cmp(&b.name));
    check
}

/// Sheet identifiers not present in `export_ids`, in sheet order
pub fn extra_ids(
    export_ids: &HashSet<String>,
    remote_ids: &[Option<String>],
    remote_names: &[Option<String>],
) -> Vec<ExtraId> {
    remote_ids
        .iter()
        .enumerate()
        .filter_map(|(offset, id)| {
            let id = normalize_id(id.as_deref()?);
            if id.is_empty() || export_ids.contains(id) {
                return None;
            }
            Some(ExtraId {
                id: id.to_string(),
                row: offset + FIRST_DATA_ROW,
                name: remote_names.get(offset).cloned().flatten(),
            })
        })
        .collect()
}

fn export_identities(export_bytes: &[u8], config: &Config, need_name: bool) -> Result<Vec<(String, Option<String>)>> {
    let table = ExportTable::from_bytes(export_bytes)?;
    let columns = ExportColumns::for_ids(&table, &config.stock, need_name)?;
    Ok(table
        .records(&columns)
        .iter()
        .filter_map(ExportRow::parse_id)
        .collect())
}

/// Fetch the sheet's identifier and name columns
async fn remote_identities(
    doc: &mut SheetDocument,
    config: &Config,
    need_name: bool,
) -> Result<(Vec<Option<String>>, Vec<Option<String>>)> {
    let drive = &config.drive;
    let id_column = doc
        .resolve(&drive.id_title, false)
        .await?
        .with_context(|| format!("Cannot compare products without the '{}' column", drive.id_title))?;

    let name_column = if need_name {
        let title = require(&drive.name_title, "drive", "name_title")?;
        Some(doc.resolve(title, false).await?.with_context(|| {
            format!("Cannot compare names without the '{}' column", title)
        })?)
    } else {
        doc.resolve_optional(drive.name_title.as_deref()).await?
    };

    let ids = doc.fetch_column(&id_column.letters).await?;
    let names = match name_column {
        Some(column) => doc.fetch_column(&column.letters).await?,
        None => Vec::new(),
    };
    Ok((ids, names))
}

pub async fn check_names(doc: &mut SheetDocument, config: &Config, export_bytes: &[u8]) -> Result<NameCheck> {
    let export = export_identities(export_bytes, config, true)?;
    let (ids, names) = remote_identities(doc, config, true).await?;

    let check = compare_names(&export, &ids, &names);
    info!("Names checked: {} OK, {} NOK", check.ok, check.nok());
    Ok(check)
}

pub async fn find_extras(doc: &mut SheetDocument, config: &Config, export_bytes: &[u8]) -> Result<Vec<ExtraId>> {
    let export_ids: HashSet<String> = export_identities(export_bytes, config, false)?
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let (ids, names) = remote_identities(doc, config, false).await?;

    let extras = extra_ids(&export_ids, &ids, &names);
    info!("{} sheet identifiers absent from the export", extras.len());
    Ok(extras)
}

/// Save extra identifiers as an "IDs extra" sheet
pub fn write_extras_excel(extras: &[ExtraId], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("IDs extra")?;
    for (col, title) in ["ID", "Ligne drive", "Nom"].iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    for (i, extra) in extras.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &extra.id)?;
        sheet.write_number(row, 1, extra.row as f64)?;
        sheet.write_string(row, 2, extra.name.as_deref().unwrap_or(""))?;
    }
    sheet.set_column_width(2, 40)?;

    workbook
        .save(path)
        .with_context(|| format!("Failed to save extras: {}", path.display()))?;
    Ok(())
}
