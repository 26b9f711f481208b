//! Packaging units ("500g", "250ml") and the sheet formulas built on them
//!
//! The formula text is consumed verbatim by other sheet formulas, so both
//! templates must stay byte-for-byte stable.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::sheets::cell_address;

static MASS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)(g|ml)").expect("mass pattern is a valid regex"));

/// Sheet-side extraction of the leading number of a conditioning cell
const EXTRACT_MASS: &str = r#""^\s*[0-9]+""#;

/// Mass (or volume) in grams/millilitres encoded at the start of a conditioning value
///
/// `"500g"` -> 500, `" 250ml bottle"` -> 250, `"1kg"` -> None
pub fn parse_mass(conditioning: &str) -> Option<u64> {
    let caps = MASS_PATTERN.captures(conditioning)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Whole packages available for `quantity` (in kg or l) of a `mass` package
pub fn units_in_stock(quantity: f64, mass: u64) -> i64 {
    let units = (quantity * 1000.0 / mass as f64).floor();
    if units.is_finite() && units > 0.0 {
        units as i64
    } else {
        0
    }
}

/// Package price from the per-kilo price: `qp * mass / 1000`
pub fn conditioned_price_formula(row: usize, quantity_price_col: usize, cond_col: usize) -> String {
    format!(
        "={} * VALUE(REGEXEXTRACT({}; {})) / 1000",
        cell_address(row, quantity_price_col, None),
        cell_address(row, cond_col, None),
        EXTRACT_MASS
    )
}

/// Per-kilo price from the package price: `round(price * 1000 / mass, 2)`
pub fn unit_quantity_price_formula(row: usize, price_col: usize, cond_col: usize) -> String {
    format!(
        "=ROUND({} * 1000 / VALUE(REGEXEXTRACT({}; {})); 2)",
        cell_address(row, price_col, None),
        cell_address(row, cond_col, None),
        EXTRACT_MASS
    )
}
