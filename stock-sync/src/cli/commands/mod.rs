//! Subcommand handlers
//!
//! Each handler runs one core operation against an open [`Session`] and
//! prints a colored summary.

pub mod check_names;
pub mod extras;
pub mod images;
pub mod sync;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::sheets::SheetDocument;

/// Loaded configuration plus the remote tab it points at
pub struct Session {
    pub config: Config,
    pub doc: SheetDocument,
}

pub(crate) fn read_export(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        anyhow::bail!("Export file does not exist: {}", path.display());
    }
    std::fs::read(path).with_context(|| format!("Failed to read export file: {}", path.display()))
}
