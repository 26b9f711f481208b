//! One tab of the remote spreadsheet
//!
//! Wraps a [`RemoteTable`] with the header-row cache used for column
//! resolution, whole-column snapshots, and the single bulk commit at the end
//! of a run.

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;

use super::addressing::{cell_address, column_index_to_letters, column_range, header_range};
use super::client::RemoteTable;
use super::models::{CellValue, CellWrite, CommitResult};

/// A resolved column: letter label plus zero-based index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub letters: String,
    pub index: usize,
}

/// Requested title is absent from the header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNotFound {
    pub title: String,
}

impl std::fmt::Display for ColumnNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "column '{}' not found in header row", self.title)
    }
}

impl std::error::Error for ColumnNotFound {}

pub struct SheetDocument {
    table: Arc<dyn RemoteTable>,
    sheet_label: String,
    column_titles: Option<Vec<String>>,
}

impl SheetDocument {
    pub fn new(table: Arc<dyn RemoteTable>, sheet_label: impl Into<String>) -> Self {
        Self {
            table,
            sheet_label: sheet_label.into(),
            column_titles: None,
        }
    }

    pub fn sheet_label(&self) -> &str {
        &self.sheet_label
    }

    /// Title row, fetched once and cached until `refresh` is requested
    pub async fn fetch_header_row(&mut self, refresh: bool) -> Result<&[String]> {
        if refresh || self.column_titles.is_none() {
            let rows = self.table.get_range(&header_range(&self.sheet_label)).await?;
            let titles = rows.into_iter().next().unwrap_or_default();
            debug!("Header row of '{}': {} columns", self.sheet_label, titles.len());
            self.column_titles = Some(titles);
        }

        Ok(self.column_titles.as_deref().unwrap_or_default())
    }

    /// Locate `title` in the header row
    ///
    /// The outer error is a transport failure; the inner one means the title
    /// simply isn't there, which callers treat as a warning.
    pub async fn resolve(
        &mut self,
        title: &str,
        refresh: bool,
    ) -> Result<Result<ColumnRef, ColumnNotFound>> {
        let titles = self.fetch_header_row(refresh).await?;

        Ok(match titles.iter().position(|t| t == title) {
            Some(index) => Ok(ColumnRef {
                letters: column_index_to_letters(index),
                index,
            }),
            None => Err(ColumnNotFound {
                title: title.to_string(),
            }),
        })
    }

    /// Resolve an optional title, logging a warning when it is configured but absent
    pub async fn resolve_optional(&mut self, title: Option<&str>) -> Result<Option<ColumnRef>> {
        let Some(title) = title else {
            return Ok(None);
        };

        match self.resolve(title, false).await? {
            Ok(column) => {
                debug!("Column '{}' -> {} ({})", title, column.letters, column.index);
                Ok(Some(column))
            }
            Err(not_found) => {
                warn!("{}", not_found);
                Ok(None)
            }
        }
    }

    /// Every value of a column below the title, `None` for empty cells
    pub async fn fetch_column(&self, letters: &str) -> Result<Vec<Option<String>>> {
        let rows = self
            .table
            .get_range(&column_range(&self.sheet_label, letters))
            .await?;

        Ok(rows
            .into_iter()
            .skip(1)
            .map(|row| row.into_iter().next().filter(|value| !value.is_empty()))
            .collect())
    }

    /// Queue a value for data row `row` of column `col`
    pub fn batch_element(&self, row: usize, col: usize, value: CellValue) -> CellWrite {
        CellWrite::new(cell_address(row, col, Some(&self.sheet_label)), value)
    }

    /// Submit `writes` as one bulk update, or skip the remote call on a dry run
    ///
    /// A failing commit loses the whole batch; nothing is retried at this level.
    pub async fn commit(&self, writes: &[CellWrite], dry_run: bool) -> Result<Option<CommitResult>> {
        if dry_run {
            for write in writes {
                debug!("{} <- {}", write.target, write.value);
            }
            info!("Dry run: {} cell updates not submitted", writes.len());
            return Ok(None);
        }

        if writes.is_empty() {
            info!("No cell updates to submit");
            return Ok(Some(CommitResult::default()));
        }

        info!("Submitting {} cell updates", writes.len());
        let result = self.table.batch_update(writes).await?;
        info!("{} cells updated", result.total_updated_cells);
        Ok(Some(result))
    }
}
