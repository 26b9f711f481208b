//! Stock reconciliation
//!
//! Joins export rows to sheet rows through the identifier index and plans the
//! cell writes for stock, price, per-kilo price and tax. Every row is handled
//! independently: a bad row is skipped and recorded, never fatal to the run.
//!
//! Pricing policy per matched row:
//! - sold by unit: stock and price are copied, the per-kilo price becomes a
//!   formula dividing by the packaging mass
//! - conditioned: stock is converted to whole packages, the package price
//!   becomes a formula multiplying the per-kilo price by the mass, and the
//!   export price goes to the per-kilo column

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use super::conditioning::{
    conditioned_price_formula, parse_mass, unit_quantity_price_formula, units_in_stock,
};
use super::export::{ExportColumns, ExportRow, ExportTable, MalformedRow, RawExportRow};
use super::index::IdentifierIndex;
use super::report::{MissingId, ReconciliationReport};
use crate::config::{Config, require};
use crate::sheets::{CellValue, CellWrite, ColumnRef, CommitResult, SheetDocument, cell_address};

/// Backend tax codes and the labels the sheet displays for them
pub const TAX_LABELS: [(&str, &str); 2] = [
    ("__export__.account_tax_4", "taux-reduit"),
    ("__export__.account_tax_2", "taux-normal"),
];

/// Conditioning value that means "sold by unit" when the export has no flag column
const LEGACY_UNIT_CONDITIONING: &str = "1";

pub fn tax_label(tax_class: &str) -> Option<&'static str> {
    TAX_LABELS
        .iter()
        .find(|(code, _)| *code == tax_class.trim())
        .map(|(_, label)| *label)
}

/// Sheet columns the planner may write to or read from; `None` disables it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetColumns {
    pub stock: Option<usize>,
    pub price: Option<usize>,
    pub quantity_price: Option<usize>,
    pub conditioning: Option<usize>,
    pub tax: Option<usize>,
}

/// How "sold by unit" is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPolicy {
    /// Export flag column present: a flag of exactly 0.0 means sold by unit
    ExportFlag,
    /// No flag column: conditioning `"1"` means sold by unit
    LegacyConditioning,
}

/// Everything a row needs from the sheet side
pub struct PlanContext<'a> {
    pub sheet_label: &'a str,
    pub index: &'a IdentifierIndex,
    /// Conditioning column snapshot, indexed by data row
    pub conditioning: &'a [Option<String>],
    pub columns: &'a SheetColumns,
    pub unit_policy: UnitPolicy,
}

/// Why a row produced no writes
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Wrong cell types in the export; counted as dropped
    Malformed(MalformedRow),
    /// Not in the sheet and nothing in stock
    Unmatched { id: String },
    /// Conditioned row whose conditioning is absent, unparsable or zero
    Conditioning { id: String, value: Option<String> },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Malformed(reason) => write!(f, "malformed row: {}", reason),
            SkipReason::Unmatched { id } => write!(f, "{} not in sheet and out of stock", id),
            SkipReason::Conditioning { id, value: None } => {
                write!(f, "{} has no conditioning to derive a mass from", id)
            }
            SkipReason::Conditioning {
                id,
                value: Some(value),
            } => write!(f, "{} has unusable conditioning '{}'", id, value),
        }
    }
}

impl std::error::Error for SkipReason {}

/// What a usable row contributes to the report
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Planned {
        id: String,
        writes: Vec<CellWrite>,
        missing_conditioning: bool,
    },
    MissingId(MissingId),
}

struct RowWriter<'a> {
    sheet_label: &'a str,
    row: usize,
    writes: Vec<CellWrite>,
}

impl RowWriter<'_> {
    fn push(&mut self, col: Option<usize>, value: CellValue) {
        if let Some(col) = col {
            self.writes.push(CellWrite::new(
                cell_address(self.row, col, Some(self.sheet_label)),
                value,
            ));
        }
    }
}

fn is_sold_by_unit(row: &ExportRow, conditioning: Option<&str>, policy: UnitPolicy) -> bool {
    match policy {
        UnitPolicy::ExportFlag => row.by_unit_flag == Some(0.0),
        UnitPolicy::LegacyConditioning => {
            conditioning.map(str::trim) == Some(LEGACY_UNIT_CONDITIONING)
        }
    }
}

/// Plan the writes for one export row
pub fn plan_row(raw: &RawExportRow, ctx: &PlanContext<'_>) -> Result<RowOutcome, SkipReason> {
    let row = ExportRow::parse(raw).map_err(SkipReason::Malformed)?;

    let Some(sheet_row) = ctx.index.get(&row.id) else {
        if row.quantity > 0.0 {
            return Ok(RowOutcome::MissingId(MissingId {
                id: row.id,
                name: row.name,
            }));
        }
        return Err(SkipReason::Unmatched { id: row.id });
    };

    let conditioning = ctx.conditioning.get(sheet_row).and_then(|c| c.as_deref());
    let columns = ctx.columns;
    let mut out = RowWriter {
        sheet_label: ctx.sheet_label,
        row: sheet_row,
        writes: Vec::with_capacity(4),
    };

    if is_sold_by_unit(&row, conditioning, ctx.unit_policy) {
        out.push(columns.stock, CellValue::Number(row.quantity));
        out.push(columns.price, CellValue::Number(row.price));
        if let (Some(price), Some(cond)) = (columns.price, columns.conditioning) {
            out.push(
                columns.quantity_price,
                CellValue::Formula(unit_quantity_price_formula(sheet_row, price, cond)),
            );
        }
    } else {
        let mass = conditioning.and_then(parse_mass).filter(|m| *m > 0);
        let Some(mass) = mass else {
            return Err(SkipReason::Conditioning {
                id: row.id,
                value: conditioning.map(str::to_string),
            });
        };

        out.push(
            columns.stock,
            CellValue::Integer(units_in_stock(row.quantity, mass)),
        );
        if let (Some(qp), Some(cond)) = (columns.quantity_price, columns.conditioning) {
            out.push(
                columns.price,
                CellValue::Formula(conditioned_price_formula(sheet_row, qp, cond)),
            );
        }
        out.push(columns.quantity_price, CellValue::Number(row.price));
    }

    if let Some(label) = row.tax_class.as_deref().and_then(tax_label) {
        out.push(columns.tax, CellValue::Text(label.to_string()));
    }

    Ok(RowOutcome::Planned {
        id: row.id,
        writes: out.writes,
        missing_conditioning: conditioning.is_none(),
    })
}

/// Plan every row, folding outcomes into one report
pub fn plan_writes(rows: &[RawExportRow], ctx: &PlanContext<'_>) -> ReconciliationReport {
    let mut report = ReconciliationReport::default();

    for raw in rows {
        match plan_row(raw, ctx) {
            Ok(RowOutcome::Planned {
                id,
                writes,
                missing_conditioning,
            }) => {
                if missing_conditioning {
                    warn!("No conditioning for {}", id);
                    report.missing_conditioning.push(id);
                }
                report.writes.extend(writes);
            }
            Ok(RowOutcome::MissingId(missing)) => {
                debug!("{} is not in the sheet", missing.id);
                report.missing_ids.push(missing);
            }
            Err(SkipReason::Malformed(reason)) => {
                debug!("Dropping export row: {}", reason);
                report.dropped += 1;
            }
            Err(skip @ SkipReason::Unmatched { .. }) => debug!("Skipping: {}", skip),
            Err(SkipReason::Conditioning { id, value }) => {
                match &value {
                    Some(value) => {
                        error!("Cannot derive a mass from conditioning '{}' of {}", value, id);
                        report.invalid_conditioning.push(id);
                    }
                    None => {
                        error!("No conditioning for conditioned product {}, skipping", id);
                        report.missing_conditioning.push(id);
                    }
                }
            }
        }
    }

    report.finalize();
    info!("Number of dropped elements: {}", report.dropped);
    report
}

/// Sheet columns as resolved from the header row
struct ResolvedColumns {
    stock: Option<ColumnRef>,
    price: Option<ColumnRef>,
    quantity_price: Option<ColumnRef>,
    conditioning: Option<ColumnRef>,
    tax: Option<ColumnRef>,
}

impl ResolvedColumns {
    fn indices(&self) -> SheetColumns {
        let index = |column: &Option<ColumnRef>| column.as_ref().map(|c| c.index);
        SheetColumns {
            stock: index(&self.stock),
            price: index(&self.price),
            quantity_price: index(&self.quantity_price),
            conditioning: index(&self.conditioning),
            tax: index(&self.tax),
        }
    }
}

/// Per-run switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    /// Write tax labels when the tax columns are configured
    pub tax: bool,
}

/// Result of [`reconcile`]: the commit outcome (None on a dry run) and the report
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub applied: Option<CommitResult>,
    pub report: ReconciliationReport,
}

/// Reconcile an export against the sheet and commit the planned writes
pub async fn reconcile(
    doc: &mut SheetDocument,
    config: &Config,
    export_bytes: &[u8],
    options: SyncOptions,
) -> Result<SyncOutcome> {
    let drive = &config.drive;

    info!("Reading export file");
    let table = ExportTable::from_bytes(export_bytes)?;
    let export_columns = ExportColumns::for_sync(&table, &config.stock, options.tax)?;
    let records = table.records(&export_columns);
    info!("{} export rows", records.len());

    let id_column = doc
        .resolve(&drive.id_title, false)
        .await?
        .with_context(|| format!("Cannot match products without the '{}' column", drive.id_title))?;

    let columns = ResolvedColumns {
        stock: doc
            .resolve_optional(Some(require(&drive.stock_title, "drive", "stock_title")?))
            .await?,
        price: doc
            .resolve_optional(Some(require(&drive.price_title, "drive", "price_title")?))
            .await?,
        quantity_price: doc
            .resolve_optional(Some(require(
                &drive.quantity_price_title,
                "drive",
                "quantity_price_title",
            )?))
            .await?,
        conditioning: doc
            .resolve_optional(Some(require(&drive.cond_title, "drive", "cond_title")?))
            .await?,
        tax: if options.tax && export_columns.tax.is_some() {
            doc.resolve_optional(drive.tax_title.as_deref()).await?
        } else {
            None
        },
    };

    info!("Retrieving product identifiers");
    let index = IdentifierIndex::build(&doc.fetch_column(&id_column.letters).await?);
    info!("{} identifiers indexed", index.len());
    let conditioning = match &columns.conditioning {
        Some(cond) => doc.fetch_column(&cond.letters).await?,
        None => Vec::new(),
    };

    let plan_columns = columns.indices();
    let ctx = PlanContext {
        sheet_label: doc.sheet_label(),
        index: &index,
        conditioning: &conditioning,
        columns: &plan_columns,
        unit_policy: if export_columns.by_unit.is_some() {
            UnitPolicy::ExportFlag
        } else {
            UnitPolicy::LegacyConditioning
        },
    };

    let report = plan_writes(&records, &ctx);
    let applied = doc.commit(&report.writes, options.dry_run).await?;

    Ok(SyncOutcome { applied, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriveConfig, ExportConfig, TransportConfig};
    use crate::sheets::testing::FakeTable;
    use calamine::Data;
    use rust_xlsxwriter::Workbook;
    use std::sync::Arc;

    const LABEL: &str = "Stock";

    fn columns() -> SheetColumns {
        SheetColumns {
            stock: Some(2),
            price: Some(3),
            quantity_price: Some(4),
            conditioning: Some(5),
            tax: Some(6),
        }
    }

    fn raw(id: &str, quantity: f64, price: f64, by_unit: f64) -> RawExportRow {
        RawExportRow {
            id: Data::String(format!("__export__.product_template_{}", id)),
            quantity: Data::Float(quantity),
            price: Data::Float(price),
            name: Some(Data::String(format!("Produit {}", id))),
            by_unit: Some(Data::Float(by_unit)),
            tax: None,
        }
    }

    fn plan(rows: &[RawExportRow], ids: &[Option<&str>], conds: &[Option<&str>]) -> ReconciliationReport {
        let ids: Vec<Option<String>> = ids.iter().map(|v| v.map(str::to_string)).collect();
        let conds: Vec<Option<String>> = conds.iter().map(|v| v.map(str::to_string)).collect();
        let index = IdentifierIndex::build(&ids);
        let columns = columns();
        let ctx = PlanContext {
            sheet_label: LABEL,
            index: &index,
            conditioning: &conds,
            columns: &columns,
            unit_policy: UnitPolicy::ExportFlag,
        };
        plan_writes(rows, &ctx)
    }

    #[test]
    fn test_unit_sold_row() {
        let report = plan(&[raw("10", 10.0, 5.0, 0.0)], &[Some("10")], &[Some("500g")]);

        assert_eq!(
            report.writes,
            vec![
                CellWrite::new("Stock!C2", CellValue::Number(10.0)),
                CellWrite::new("Stock!D2", CellValue::Number(5.0)),
                CellWrite::new(
                    "Stock!E2",
                    CellValue::Formula(
                        r#"=ROUND(D2 * 1000 / VALUE(REGEXEXTRACT(F2; "^\s*[0-9]+")); 2)"#.into()
                    )
                ),
            ]
        );
        assert!(!report.has_exceptions());
    }

    #[test]
    fn test_conditioned_row() {
        let report = plan(
            &[raw("7", 2.5, 12.0, 1.0)],
            &[Some("3"), Some("7")],
            &[Some("1kg"), Some("500g")],
        );

        assert_eq!(
            report.writes,
            vec![
                CellWrite::new("Stock!C3", CellValue::Integer(5)),
                CellWrite::new(
                    "Stock!D3",
                    CellValue::Formula(
                        r#"=E3 * VALUE(REGEXEXTRACT(F3; "^\s*[0-9]+")) / 1000"#.into()
                    )
                ),
                CellWrite::new("Stock!E3", CellValue::Number(12.0)),
            ]
        );
        assert!(!report.has_exceptions());
    }

    #[test]
    fn test_zero_mass_skips_row() {
        let report = plan(&[raw("7", 2.5, 12.0, 1.0)], &[Some("7")], &[Some("0g")]);
        assert!(report.writes.is_empty());
        assert_eq!(report.invalid_conditioning, vec!["7"]);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_unparsable_conditioning_skips_row() {
        let report = plan(&[raw("7", 2.5, 12.0, 1.0)], &[Some("7")], &[Some("1kg")]);
        assert!(report.writes.is_empty());
        assert_eq!(report.invalid_conditioning, vec!["7"]);
    }

    #[test]
    fn test_missing_conditioning_unit_row_still_written() {
        // Conditioning column shorter than the id column
        let report = plan(&[raw("8", 4.0, 2.0, 0.0)], &[Some("1"), Some("8")], &[Some("500g")]);
        assert_eq!(report.writes.len(), 3);
        assert_eq!(report.missing_conditioning, vec!["8"]);
    }

    #[test]
    fn test_missing_conditioning_conditioned_row_skipped() {
        let report = plan(&[raw("8", 4.0, 2.0, 1.0)], &[Some("8")], &[None]);
        assert!(report.writes.is_empty());
        assert_eq!(report.missing_conditioning, vec!["8"]);
        assert!(report.invalid_conditioning.is_empty());
    }

    #[test]
    fn test_non_string_identifier_dropped() {
        let mut row = raw("1", 1.0, 1.0, 0.0);
        row.id = Data::Float(1.0);
        let report = plan(&[row], &[Some("1")], &[Some("500g")]);
        assert_eq!(report.dropped, 1);
        assert!(report.writes.is_empty());
        assert!(report.missing_ids.is_empty());
        assert!(report.missing_conditioning.is_empty());
    }

    #[test]
    fn test_unmatched_rows() {
        let report = plan(
            &[
                raw("30", 1.0, 1.0, 0.0),
                raw("4", 0.0, 1.0, 0.0),
                raw("200", 2.0, 1.0, 0.0),
            ],
            &[Some("1")],
            &[Some("500g")],
        );
        let ids: Vec<&str> = report.missing_ids.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["30", "200"]);
        assert_eq!(report.missing_ids[0].name.as_deref(), Some("Produit 30"));
        assert!(report.writes.is_empty());
    }

    #[test]
    fn test_bad_rows_do_not_stop_the_run() {
        let mut broken = raw("1", 1.0, 1.0, 0.0);
        broken.quantity = Data::String("n/a".into());
        let report = plan(
            &[broken, raw("2", 3.0, 1.0, 0.0)],
            &[Some("1"), Some("2")],
            &[Some("500g"), Some("250g")],
        );
        assert_eq!(report.dropped, 1);
        assert_eq!(report.writes.len(), 3);
        assert_eq!(report.writes[0].target, "Stock!C3");
    }

    #[test]
    fn test_tax_label_written() {
        let mut row = raw("2", 3.0, 1.0, 0.0);
        row.tax = Some(Data::String("__export__.account_tax_2".into()));
        let mut unknown = raw("3", 3.0, 1.0, 0.0);
        unknown.tax = Some(Data::String("__export__.account_tax_9".into()));

        let report = plan(&[row, unknown], &[Some("2"), Some("3")], &[Some("500g"), Some("500g")]);
        assert_eq!(report.writes.len(), 7);
        assert_eq!(
            report.writes[3],
            CellWrite::new("Stock!G2", CellValue::Text("taux-normal".into()))
        );
    }

    #[test]
    fn test_missing_column_suppresses_writes() {
        let ids = vec![Some("5".to_string())];
        let conds = vec![Some("500g".to_string())];
        let index = IdentifierIndex::build(&ids);
        let columns = SheetColumns {
            quantity_price: None,
            ..columns()
        };
        let ctx = PlanContext {
            sheet_label: LABEL,
            index: &index,
            conditioning: &conds,
            columns: &columns,
            unit_policy: UnitPolicy::ExportFlag,
        };

        let report = plan_writes(&[raw("5", 1.0, 4.0, 1.0)], &ctx);
        assert_eq!(report.writes, vec![CellWrite::new("Stock!C2", CellValue::Integer(2))]);
    }

    #[test]
    fn test_legacy_unit_policy() {
        let ids = vec![Some("5".to_string()), Some("6".to_string())];
        let conds = vec![Some("1".to_string()), Some("250g".to_string())];
        let index = IdentifierIndex::build(&ids);
        let columns = columns();
        let ctx = PlanContext {
            sheet_label: LABEL,
            index: &index,
            conditioning: &conds,
            columns: &columns,
            unit_policy: UnitPolicy::LegacyConditioning,
        };
        let mut rows = vec![raw("5", 3.0, 2.0, 1.0), raw("6", 1.0, 8.0, 0.0)];
        for row in &mut rows {
            row.by_unit = None;
        }

        let report = plan_writes(&rows, &ctx);
        assert_eq!(report.writes[0], CellWrite::new("Stock!C2", CellValue::Number(3.0)));
        assert_eq!(report.writes[3], CellWrite::new("Stock!C3", CellValue::Integer(4)));
    }

    #[test]
    fn test_empty_or_text_flag_takes_conditioned_branch() {
        let mut empty = raw("5", 1.0, 8.0, 0.0);
        empty.by_unit = Some(Data::Empty);
        let mut text = raw("6", 1.0, 8.0, 0.0);
        text.by_unit = Some(Data::String("oui".into()));

        let report = plan(&[empty, text], &[Some("5"), Some("6")], &[Some("500g"), Some("250g")]);
        assert_eq!(report.writes[0], CellWrite::new("Stock!C2", CellValue::Integer(2)));
        assert_eq!(report.writes[2], CellWrite::new("Stock!E2", CellValue::Number(8.0)));
        assert_eq!(report.writes[3], CellWrite::new("Stock!C3", CellValue::Integer(4)));
        assert_eq!(report.writes.len(), 6);
    }

    #[test]
    fn test_tax_label_lookup() {
        assert_eq!(tax_label("__export__.account_tax_4"), Some("taux-reduit"));
        assert_eq!(tax_label("__export__.account_tax_2 "), Some("taux-normal"));
        assert_eq!(tax_label("TVA 20%"), None);
    }

    fn config() -> Config {
        Config {
            drive: DriveConfig {
                spreadsheet: "sheet".into(),
                sheet_label: LABEL.into(),
                id_title: "ID".into(),
                name_title: Some("Nom".into()),
                stock_title: Some("Stock".into()),
                price_title: Some("Prix".into()),
                quantity_price_title: Some("Prix kg".into()),
                cond_title: Some("Conditionnement".into()),
                tax_title: Some("TVA".into()),
                images_title: None,
            },
            stock: ExportConfig {
                id_title: Some("id".into()),
                name_title: Some("name".into()),
                stock_title: Some("qty".into()),
                price_title: Some("price".into()),
                by_unit_title: Some("by_unit".into()),
                tax_title: None,
            },
            transport: TransportConfig::default(),
        }
    }

    fn export_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        for (col, title) in ["id", "name", "qty", "price", "by_unit"].iter().enumerate() {
            ws.write_string(0, col as u16, *title).unwrap();
        }
        let rows: [(&str, &str, f64, f64, f64); 3] = [
            ("__export__.product_template_10", "Savon", 10.0, 5.0, 0.0),
            ("__export__.product_template_11", "Riz", 2.5, 4.0, 1.0),
            ("__export__.product_template_99", "Lentilles", 1.0, 3.0, 1.0),
        ];
        for (i, (id, name, qty, price, by_unit)) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            ws.write_string(row, 0, *id).unwrap();
            ws.write_string(row, 1, *name).unwrap();
            ws.write_number(row, 2, *qty).unwrap();
            ws.write_number(row, 3, *price).unwrap();
            ws.write_number(row, 4, *by_unit).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    fn remote() -> Arc<FakeTable> {
        Arc::new(FakeTable::new(
            LABEL,
            &[
                &["ID", "Nom", "Stock", "Prix", "Prix kg", "Conditionnement"],
                &["10", "Savon", "", "", "", "100g"],
                &["11", "Riz", "", "", "", "500g"],
            ],
        ))
    }

    #[tokio::test]
    async fn test_reconcile_commits_once() {
        let fake = remote();
        let mut doc = SheetDocument::new(fake.clone(), LABEL);
        let options = SyncOptions {
            dry_run: false,
            tax: true,
        };

        let outcome = reconcile(&mut doc, &config(), &export_bytes(), options).await.unwrap();

        assert_eq!(outcome.report.writes.len(), 6);
        assert_eq!(outcome.report.missing_ids.len(), 1);
        assert_eq!(outcome.report.missing_ids[0].id, "99");
        assert_eq!(outcome.applied.unwrap().total_updated_cells, 6);
        assert_eq!(fake.commits(), vec![outcome.report.writes.clone()]);
    }

    #[tokio::test]
    async fn test_reconcile_dry_run_same_writes_no_commit() {
        let fake = remote();
        let mut doc = SheetDocument::new(fake.clone(), LABEL);
        let dry = reconcile(
            &mut doc,
            &config(),
            &export_bytes(),
            SyncOptions {
                dry_run: true,
                tax: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(dry.applied, None);
        assert!(fake.commits().is_empty());

        let mut doc = SheetDocument::new(fake.clone(), LABEL);
        let wet = reconcile(
            &mut doc,
            &config(),
            &export_bytes(),
            SyncOptions {
                dry_run: false,
                tax: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(dry.report, wet.report);
    }

    #[tokio::test]
    async fn test_reconcile_without_id_column_fails() {
        let fake = Arc::new(FakeTable::new(LABEL, &[&["Nom", "Stock"], &["Savon", "1"]]));
        let mut doc = SheetDocument::new(fake, LABEL);
        let err = reconcile(&mut doc, &config(), &export_bytes(), SyncOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'ID'"));
    }

    #[tokio::test]
    async fn test_reconcile_commit_failure_is_fatal() {
        let fake = remote();
        fake.fail_commits();
        let mut doc = SheetDocument::new(fake.clone(), LABEL);
        let result = reconcile(&mut doc, &config(), &export_bytes(), SyncOptions::default()).await;
        assert!(result.is_err());
    }

    fn taxed_export_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        for (col, title) in ["id", "name", "qty", "price", "by_unit", "taxes"].iter().enumerate() {
            ws.write_string(0, col as u16, *title).unwrap();
        }
        ws.write_string(1, 0, "__export__.product_template_10").unwrap();
        ws.write_string(1, 1, "Savon").unwrap();
        ws.write_number(1, 2, 4.0).unwrap();
        ws.write_number(1, 3, 2.0).unwrap();
        ws.write_number(1, 4, 0.0).unwrap();
        ws.write_string(1, 5, "__export__.account_tax_2").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    fn taxed_remote() -> Arc<FakeTable> {
        Arc::new(FakeTable::new(
            LABEL,
            &[
                &["ID", "Nom", "Stock", "Prix", "Prix kg", "Conditionnement", "TVA"],
                &["10", "Savon", "", "", "", "100g", ""],
            ],
        ))
    }

    async fn taxed_run(tax: bool) -> ReconciliationReport {
        let mut config = config();
        config.stock.tax_title = Some("taxes".into());
        let mut doc = SheetDocument::new(taxed_remote(), LABEL);
        let options = SyncOptions { dry_run: true, tax };
        reconcile(&mut doc, &config, &taxed_export_bytes(), options)
            .await
            .unwrap()
            .report
    }

    #[tokio::test]
    async fn test_reconcile_writes_tax_labels() {
        let report = taxed_run(true).await;
        assert!(
            report
                .writes
                .contains(&CellWrite::new("Stock!G2", CellValue::Text("taux-normal".into())))
        );
    }

    #[tokio::test]
    async fn test_reconcile_without_tax_skips_labels() {
        let report = taxed_run(false).await;
        assert_eq!(report.writes.len(), 3);
        assert!(report.writes.iter().all(|w| !w.target.starts_with("Stock!G")));
    }
}
