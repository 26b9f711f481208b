//! Value types exchanged with the remote sheet

use serde::{Deserialize, Serialize};
use std::fmt;

/// Content of a single queued cell write
///
/// Formulas are sent verbatim and evaluated by the spreadsheet, never locally.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Formula(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) | CellValue::Formula(s) => write!(f, "{}", s),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A queued intent to set one cell; nothing is applied until commit
#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    /// Sheet-qualified A1 address, e.g. `Stock!C12`
    pub target: String,
    pub value: CellValue,
}

impl CellWrite {
    pub fn new(target: impl Into<String>, value: CellValue) -> Self {
        Self {
            target: target.into(),
            value,
        }
    }
}

/// Summary returned by a bulk write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub total_updated_rows: u64,
    #[serde(default)]
    pub total_updated_columns: u64,
    #[serde(default)]
    pub total_updated_cells: u64,
    #[serde(default)]
    pub total_updated_sheets: u64,
}

/// `ValueRange` as returned by `values.get`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValueRangeResponse {
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// One entry of a `values.batchUpdate` body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ValueRangeUpdate<'a> {
    pub range: &'a str,
    pub values: [[&'a CellValue; 1]; 1],
}

/// Body of `values.batchUpdate`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchUpdateRequest<'a> {
    pub value_input_option: &'static str,
    pub data: Vec<ValueRangeUpdate<'a>>,
}

impl<'a> BatchUpdateRequest<'a> {
    /// Values are parsed as if typed by a user, so formulas are evaluated
    pub fn user_entered(writes: &'a [CellWrite]) -> Self {
        Self {
            value_input_option: "USER_ENTERED",
            data: writes
                .iter()
                .map(|w| ValueRangeUpdate {
                    range: &w.target,
                    values: [[&w.value]],
                })
                .collect(),
        }
    }
}
