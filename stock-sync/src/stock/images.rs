//! Product image URLs
//!
//! Input is a text file of `name|url` lines where `name` starts with the
//! product identifier followed by `-` (e.g. `1234-front.jpg|https://...`).

use anyhow::{Context, Result};
use log::{debug, info, warn};

use super::index::IdentifierIndex;
use crate::config::{Config, require};
use crate::sheets::{CellValue, CellWrite, CommitResult, SheetDocument};

/// Identifier -> url, in file order; a repeated identifier keeps its last url
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMapping {
    pub entries: Vec<(String, String)>,
    /// Non-blank lines that are not `name|url`
    pub malformed: usize,
}

pub fn parse_image_list(content: &str) -> ImageMapping {
    let mut mapping = ImageMapping::default();

    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let mut parts = line.split('|');
        let (Some(name), Some(url), None) = (parts.next(), parts.next(), parts.next()) else {
            warn!("Ignoring malformed image line {}: '{}'", number + 1, line);
            mapping.malformed += 1;
            continue;
        };

        let key = name.split('-').next().unwrap_or_default().trim();
        let url = url.trim();
        if key.is_empty() || url.is_empty() {
            warn!("Ignoring malformed image line {}: '{}'", number + 1, line);
            mapping.malformed += 1;
            continue;
        }

        match mapping.entries.iter().position(|(id, _)| id == key) {
            Some(pos) => mapping.entries[pos].1 = url.to_string(),
            None => mapping.entries.push((key.to_string(), url.to_string())),
        }
    }

    debug!("{} image entries, {} malformed lines", mapping.entries.len(), mapping.malformed);
    mapping
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePlan {
    pub writes: Vec<CellWrite>,
    /// Identifiers of the file that are not in the sheet
    pub unknown: Vec<String>,
}

pub fn plan_image_writes(
    mapping: &ImageMapping,
    index: &IdentifierIndex,
    doc: &SheetDocument,
    images_col: usize,
) -> ImagePlan {
    let mut plan = ImagePlan::default();

    for (id, url) in &mapping.entries {
        match index.get(id) {
            Some(row) => {
                plan.writes
                    .push(doc.batch_element(row, images_col, CellValue::Text(url.clone())))
            }
            None => plan.unknown.push(id.clone()),
        }
    }

    plan
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageOutcome {
    pub applied: Option<CommitResult>,
    pub plan: ImagePlan,
    pub malformed: usize,
}

/// Write image urls from `content` into the images column
pub async fn sync_images(
    doc: &mut SheetDocument,
    config: &Config,
    content: &str,
    dry_run: bool,
) -> Result<ImageOutcome> {
    let drive = &config.drive;
    let images_title = require(&drive.images_title, "drive", "images_title")?;

    let mapping = parse_image_list(content);
    info!("Number of images: {}", mapping.entries.len());

    let id_column = doc
        .resolve(&drive.id_title, false)
        .await?
        .with_context(|| format!("Cannot match products without the '{}' column", drive.id_title))?;
    let images_column = doc
        .resolve(images_title, false)
        .await?
        .with_context(|| format!("Cannot write images without the '{}' column", images_title))?;

    let index = IdentifierIndex::build(&doc.fetch_column(&id_column.letters).await?);
    let plan = plan_image_writes(&mapping, &index, doc, images_column.index);
    for id in &plan.unknown {
        warn!("Image for unknown product {}", id);
    }

    let applied = doc.commit(&plan.writes, dry_run).await?;
    Ok(ImageOutcome {
        applied,
        plan,
        malformed: mapping.malformed,
    })
}
