//! In-memory remote table for tests

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use super::addressing::letters_to_index;
use super::client::RemoteTable;
use super::models::{CellWrite, CommitResult};

/// Grid-backed [`RemoteTable`] that records every request
pub struct FakeTable {
    sheet_label: String,
    grid: Mutex<Vec<Vec<String>>>,
    requests: Mutex<Vec<String>>,
    commits: Mutex<Vec<Vec<CellWrite>>>,
    fail_commits: Mutex<bool>,
}

impl FakeTable {
    /// First row of `grid` is the header
    pub fn new(sheet_label: &str, grid: &[&[&str]]) -> Self {
        Self {
            sheet_label: sheet_label.to_string(),
            grid: Mutex::new(
                grid.iter()
                    .map(|row| row.iter().map(|c| c.to_string()).collect())
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            fail_commits: Mutex::new(false),
        }
    }

    pub fn set_header(&self, header: &[&str]) {
        let mut grid = self.grid.lock().unwrap();
        grid[0] = header.iter().map(|c| c.to_string()).collect();
    }

    pub fn fail_commits(&self) {
        *self.fail_commits.lock().unwrap() = true;
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<Vec<CellWrite>> {
        self.commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteTable for FakeTable {
    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        self.requests.lock().unwrap().push(range.to_string());

        let (label, cells) = range
            .split_once('!')
            .ok_or_else(|| anyhow::anyhow!("bad range {}", range))?;
        anyhow::ensure!(label == self.sheet_label, "unknown sheet {}", label);

        let grid = self.grid.lock().unwrap();
        if cells == "1:1" {
            return Ok(grid.first().cloned().into_iter().collect());
        }

        let (start, _) = cells
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("bad range {}", range))?;
        let col = letters_to_index(start).ok_or_else(|| anyhow::anyhow!("bad column {}", start))?;

        // The API omits empty cells and trailing empty rows
        let mut rows: Vec<Vec<String>> = grid
            .iter()
            .map(|row| match row.get(col) {
                Some(cell) if !cell.is_empty() => vec![cell.clone()],
                _ => Vec::new(),
            })
            .collect();
        while rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn batch_update(&self, writes: &[CellWrite]) -> Result<CommitResult> {
        if *self.fail_commits.lock().unwrap() {
            anyhow::bail!("HTTP 503 from fake table");
        }
        self.commits.lock().unwrap().push(writes.to_vec());
        Ok(CommitResult {
            spreadsheet_id: "fake".to_string(),
            total_updated_cells: writes.len() as u64,
            total_updated_rows: writes.len() as u64,
            total_updated_columns: 1,
            total_updated_sheets: 1,
        })
    }
}
