//! Reconciliation report and its Excel rendering
//!
//! Generates a workbook containing:
//! - Summary sheet with run overview
//! - Identifiers present in the export but missing from the sheet
//! - Sheet rows without a conditioning value

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;

use crate::sheets::CellWrite;

/// Export identifier with positive stock that has no row in the sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingId {
    pub id: String,
    pub name: Option<String>,
}

/// Outcome of planning one reconciliation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    pub writes: Vec<CellWrite>,
    /// Sorted by numeric identifier
    pub missing_ids: Vec<MissingId>,
    /// Sorted lexically
    pub missing_conditioning: Vec<String>,
    /// Conditioned rows whose conditioning could not be turned into a mass
    pub invalid_conditioning: Vec<String>,
    /// Malformed export rows
    pub dropped: usize,
}

/// Numeric identifiers first in numeric order, then the rest lexically
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl ReconciliationReport {
    /// Put exception lists into their canonical order, removing repeats
    pub fn finalize(&mut self) {
        self.missing_ids.sort_by(|a, b| compare_ids(&a.id, &b.id));
        self.missing_ids.dedup_by(|a, b| a.id == b.id);
        self.missing_conditioning.sort();
        self.missing_conditioning.dedup();
        self.invalid_conditioning.sort();
        self.invalid_conditioning.dedup();
    }

    pub fn has_exceptions(&self) -> bool {
        !self.missing_ids.is_empty()
            || !self.missing_conditioning.is_empty()
            || !self.invalid_conditioning.is_empty()
            || self.dropped > 0
    }
}

/// Save `report` as an Excel workbook
pub fn write_report_excel(report: &ReconciliationReport, dry_run: bool, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let summary = workbook.add_worksheet();
    summary.set_name("Synthèse")?;
    let run_date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let rows: [(&str, String); 7] = [
        ("Date", run_date),
        ("Mode", if dry_run { "simulation" } else { "mise à jour" }.to_string()),
        ("Cellules", report.writes.len().to_string()),
        ("Lignes ignorées", report.dropped.to_string()),
        ("IDs manquants", report.missing_ids.len().to_string()),
        (
            "Conditionnement manquant",
            report.missing_conditioning.len().to_string(),
        ),
        (
            "Conditionnement invalide",
            report.invalid_conditioning.len().to_string(),
        ),
    ];
    for (row, (label, value)) in rows.iter().enumerate() {
        summary.write_string_with_format(row as u32, 0, *label, &bold)?;
        summary.write_string(row as u32, 1, value)?;
    }
    summary.set_column_width(0, 28)?;

    let missing = workbook.add_worksheet();
    missing.set_name("IDs manquants")?;
    missing.write_string_with_format(0, 0, "ID", &bold)?;
    missing.write_string_with_format(0, 1, "Nom", &bold)?;
    for (i, entry) in report.missing_ids.iter().enumerate() {
        let row = i as u32 + 1;
        missing.write_string(row, 0, &entry.id)?;
        missing.write_string(row, 1, entry.name.as_deref().unwrap_or(""))?;
    }
    missing.set_column_width(1, 40)?;

    let id_sheets = [
        ("Conditionnement manquant", &report.missing_conditioning),
        ("Conditionnement invalide", &report.invalid_conditioning),
    ];
    for (name, ids) in id_sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        sheet.write_string_with_format(0, 0, "ID", &bold)?;
        for (i, id) in ids.iter().enumerate() {
            sheet.write_string(i as u32 + 1, 0, id)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save report: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook};

    fn missing(id: &str) -> MissingId {
        MissingId {
            id: id.to_string(),
            name: None,
        }
    }

    #[test]
    fn test_missing_ids_sorted_numerically() {
        let mut report = ReconciliationReport {
            missing_ids: vec![missing("100"), missing("9"), missing("abc"), missing("20"), missing("9")],
            missing_conditioning: vec!["b".into(), "a".into(), "b".into()],
            ..Default::default()
        };
        report.finalize();

        let ids: Vec<&str> = report.missing_ids.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["9", "20", "100", "abc"]);
        assert_eq!(report.missing_conditioning, vec!["a", "b"]);
        assert!(report.has_exceptions());
    }

    #[test]
    fn test_empty_report_has_no_exceptions() {
        assert!(!ReconciliationReport::default().has_exceptions());
    }

    #[test]
    fn test_write_report_excel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let report = ReconciliationReport {
            missing_ids: vec![MissingId {
                id: "12".into(),
                name: Some("Farine".into()),
            }],
            missing_conditioning: vec!["7".into()],
            invalid_conditioning: vec!["31".into(), "44".into()],
            dropped: 2,
            ..Default::default()
        };

        write_report_excel(&report, true, &path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec![
                "Synthèse",
                "IDs manquants",
                "Conditionnement manquant",
                "Conditionnement invalide"
            ]
        );
        let summary = workbook.worksheet_range("Synthèse").unwrap();
        assert_eq!(
            summary.get_value((6, 0)),
            Some(&Data::String("Conditionnement invalide".into()))
        );
        assert_eq!(summary.get_value((6, 1)), Some(&Data::String("2".into())));
        let invalid = workbook.worksheet_range("Conditionnement invalide").unwrap();
        assert_eq!(invalid.get_value((2, 0)), Some(&Data::String("44".into())));
        let range = workbook.worksheet_range("IDs manquants").unwrap();
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("12".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("Farine".into())));
    }
}
