//! Uploaded stock export
//!
//! The commerce backend exports a legacy `.xls` workbook; `.xlsx` and `.ods`
//! are accepted too. The first sheet's first row names the columns.

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;

use crate::config::{ExportConfig, require};

/// Prefix the backend puts in front of every product identifier
pub const EXPORT_ID_PREFIX: &str = "__export__.product_template_";

/// Strip the backend prefix (and surrounding whitespace) from an identifier
pub fn normalize_id(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix(EXPORT_ID_PREFIX).unwrap_or(trimmed)
}

/// First sheet of an export, as header plus raw rows
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

impl ExportTable {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .context("Failed to open export file (expected .xls, .xlsx or .ods)")?;

        let range = workbook
            .worksheet_range_at(0)
            .context("Export file has no sheets")?
            .context("Failed to read first sheet of export file")?;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header) => header.iter().map(header_text).collect(),
            None => return Ok(Self::default()),
        };

        Ok(Self {
            headers,
            rows: rows.map(|r| r.to_vec()).collect(),
        })
    }

    /// Index of the column titled `title`
    pub fn column(&self, title: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == title)
    }

    fn required_column(&self, title: &str) -> Result<usize> {
        self.column(title)
            .with_context(|| format!("Export file has no '{}' column", title))
    }

    fn optional_column(&self, title: Option<&str>) -> Option<usize> {
        let title = title?;
        let found = self.column(title);
        if found.is_none() {
            log::warn!("Export column '{}' not found, ignoring it", title);
        }
        found
    }

    fn cell(row: &[Data], col: Option<usize>) -> Option<Data> {
        col.map(|c| row.get(c).cloned().unwrap_or(Data::Empty))
    }

    /// Pull the recognized fields out of every row, without validating them
    pub fn records(&self, columns: &ExportColumns) -> Vec<RawExportRow> {
        self.rows
            .iter()
            .map(|row| RawExportRow {
                id: Self::cell(row, Some(columns.id)).unwrap_or(Data::Empty),
                quantity: Self::cell(row, columns.quantity).unwrap_or(Data::Empty),
                price: Self::cell(row, columns.price).unwrap_or(Data::Empty),
                name: Self::cell(row, columns.name),
                by_unit: Self::cell(row, columns.by_unit),
                tax: Self::cell(row, columns.tax),
            })
            .collect()
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Column positions of the recognized export fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportColumns {
    pub id: usize,
    pub quantity: Option<usize>,
    pub price: Option<usize>,
    pub name: Option<usize>,
    pub by_unit: Option<usize>,
    pub tax: Option<usize>,
}

impl ExportColumns {
    /// Columns for stock reconciliation: id, quantity and price are required
    pub fn for_sync(table: &ExportTable, config: &ExportConfig, with_tax: bool) -> Result<Self> {
        Ok(Self {
            id: table.required_column(require(&config.id_title, "stock", "ID_title")?)?,
            quantity: Some(
                table.required_column(require(&config.stock_title, "stock", "stock_title")?)?,
            ),
            price: Some(
                table.required_column(require(&config.price_title, "stock", "price_title")?)?,
            ),
            name: table.optional_column(config.name_title.as_deref()),
            by_unit: table.optional_column(config.by_unit_title.as_deref()),
            tax: if with_tax {
                table.optional_column(config.tax_title.as_deref())
            } else {
                None
            },
        })
    }

    /// Columns for read-only identifier checks
    pub fn for_ids(table: &ExportTable, config: &ExportConfig, need_name: bool) -> Result<Self> {
        let name = if need_name {
            Some(table.required_column(require(&config.name_title, "stock", "name_title")?)?)
        } else {
            table.optional_column(config.name_title.as_deref())
        };

        Ok(Self {
            id: table.required_column(require(&config.id_title, "stock", "ID_title")?)?,
            name,
            ..Self::default()
        })
    }
}

/// One export row as read, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct RawExportRow {
    pub id: Data,
    pub quantity: Data,
    pub price: Data,
    pub name: Option<Data>,
    pub by_unit: Option<Data>,
    pub tax: Option<Data>,
}

/// Why a row could not be used at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedRow {
    IdentifierNotText,
    EmptyIdentifier,
    QuantityNotNumeric,
    PriceNotNumeric,
}

impl std::fmt::Display for MalformedRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedRow::IdentifierNotText => write!(f, "identifier is not text"),
            MalformedRow::EmptyIdentifier => write!(f, "identifier is empty"),
            MalformedRow::QuantityNotNumeric => write!(f, "quantity is not a number"),
            MalformedRow::PriceNotNumeric => write!(f, "price is not a number"),
        }
    }
}

impl std::error::Error for MalformedRow {}

/// A validated export row
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    /// Identifier with the backend prefix removed
    pub id: String,
    pub quantity: f64,
    pub price: f64,
    pub name: Option<String>,
    /// Raw "sold by unit" flag; `0.0` means the product is sold by unit
    pub by_unit_flag: Option<f64>,
    pub tax_class: Option<String>,
}

/// Finite numeric value of a cell
pub fn cell_number(cell: &Data) -> Option<f64> {
    let value = match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Non-empty text of a cell; numbers are rendered, errors and blanks are `None`
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Empty | Data::Error(_) => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

impl ExportRow {
    pub fn parse(raw: &RawExportRow) -> Result<Self, MalformedRow> {
        let id = match &raw.id {
            Data::String(s) => normalize_id(s),
            _ => return Err(MalformedRow::IdentifierNotText),
        };
        if id.is_empty() {
            return Err(MalformedRow::EmptyIdentifier);
        }

        let quantity = cell_number(&raw.quantity).ok_or(MalformedRow::QuantityNotNumeric)?;
        let price = cell_number(&raw.price).ok_or(MalformedRow::PriceNotNumeric)?;

        Ok(Self {
            id: id.to_string(),
            quantity,
            price,
            name: raw.name.as_ref().and_then(cell_text),
            by_unit_flag: raw.by_unit.as_ref().and_then(cell_number),
            tax_class: raw.tax.as_ref().and_then(cell_text),
        })
    }

    /// Identifier and name only, for the read-only checks
    pub fn parse_id(raw: &RawExportRow) -> Option<(String, Option<String>)> {
        match &raw.id {
            Data::String(s) if !normalize_id(s).is_empty() => Some((
                normalize_id(s).to_string(),
                raw.name.as_ref().and_then(cell_text),
            )),
            _ => None,
        }
    }
}
