//! Remote spreadsheet access
//!
//! Addressing helpers, credentials, the HTTP transport and the per-tab
//! document wrapper used by the stock reconciliation commands.

pub mod addressing;
pub mod auth;
pub mod client;
pub mod document;
pub mod models;
pub mod retry;

#[cfg(test)]
pub mod testing;

pub use addressing::{FIRST_DATA_ROW, cell_address};
pub use auth::OAuthToken;
pub use client::{SHEETS_API_BASE, SheetsClient};
pub use document::{ColumnRef, SheetDocument};
pub use models::{CellValue, CellWrite, CommitResult};
pub use retry::RetryConfig;
