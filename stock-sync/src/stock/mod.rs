//! Stock reconciliation between the backend export and the sheet

pub mod check;
pub mod conditioning;
pub mod export;
pub mod images;
pub mod index;
pub mod reconcile;
pub mod report;

pub use check::{check_names, find_extras, write_extras_excel};
pub use images::sync_images;
pub use reconcile::{SyncOptions, reconcile};
pub use report::write_report_excel;
