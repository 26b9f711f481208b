//! A1-style cell addressing for the remote sheet
//!
//! Columns are zero-based and rendered in bijective base-26 (A=0, Z=25, AA=26).
//! Rows are zero-based *data* rows: row 0 is spreadsheet row 2, since row 1
//! holds the column titles.

/// Offset between a data row index and its one-based spreadsheet row.
pub const FIRST_DATA_ROW: usize = 2;

/// ASCII code just before 'A', so digits 1..=26 land on 'A'..='Z'
const LETTER_BASE: u8 = 64;

/// Convert a zero-based column index to its letter label
///
/// Works on the zero-based index throughout, so every `usize` has a label.
pub fn column_index_to_letters(col: usize) -> String {
    let mut rest = col;
    let mut label = Vec::new();

    loop {
        label.push(LETTER_BASE + 1 + (rest % 26) as u8);
        if rest < 26 {
            break;
        }
        rest = rest / 26 - 1;
    }

    label.reverse();
    label.into_iter().map(char::from).collect()
}

/// Convert a letter label back to its zero-based column index
///
/// Returns `None` for an empty label or anything outside `A-Z` (case-insensitive).
pub fn letters_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    let mut acc: usize = 0;
    for c in letters.chars() {
        let upper = c.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        let digit = (upper as u8 - LETTER_BASE) as usize;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }

    Some(acc - 1)
}

/// Address of a data cell, optionally qualified with a sheet label
///
/// ```text
/// cell_address(0, 0, None)           -> "A2"
/// cell_address(0, 0, Some("Sheet1")) -> "Sheet1!A2"
/// ```
pub fn cell_address(row: usize, col: usize, sheet_label: Option<&str>) -> String {
    let label = format!("{}{}", column_index_to_letters(col), row + FIRST_DATA_ROW);
    match sheet_label {
        Some(sheet) => format!("{}!{}", sheet, label),
        None => label,
    }
}

/// Range covering a whole column, e.g. `Stock!C:C`
pub fn column_range(sheet_label: &str, letters: &str) -> String {
    format!("{}!{}:{}", sheet_label, letters, letters)
}

/// Range covering the title row, e.g. `Stock!1:1`
pub fn header_range(sheet_label: &str) -> String {
    format!("{}!1:1", sheet_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letters() {
        assert_eq!(column_index_to_letters(0), "A");
        assert_eq!(column_index_to_letters(1), "B");
        assert_eq!(column_index_to_letters(25), "Z");
    }

    #[test]
    fn test_multi_letters() {
        assert_eq!(column_index_to_letters(26), "AA");
        assert_eq!(column_index_to_letters(27), "AB");
        assert_eq!(column_index_to_letters(51), "AZ");
        assert_eq!(column_index_to_letters(52), "BA");
        assert_eq!(column_index_to_letters(701), "ZZ");
        assert_eq!(column_index_to_letters(702), "AAA");
    }

    #[test]
    fn test_letters_round_trip() {
        for n in 0..20_000 {
            assert_eq!(letters_to_index(&column_index_to_letters(n)), Some(n), "column {}", n);
        }
    }

    #[test]
    fn test_largest_columns() {
        let near_max = usize::MAX - 1;
        assert_eq!(letters_to_index(&column_index_to_letters(near_max)), Some(near_max));

        let max = column_index_to_letters(usize::MAX);
        assert!(max.chars().all(|c| c.is_ascii_uppercase()));
        assert_ne!(max, column_index_to_letters(near_max));
        // one past usize::MAX once decoded
        assert_eq!(letters_to_index(&max), None);
    }

    #[test]
    fn test_letters_to_index_rejects_garbage() {
        assert_eq!(letters_to_index(""), None);
        assert_eq!(letters_to_index("A1"), None);
        assert_eq!(letters_to_index("É"), None);
        assert_eq!(letters_to_index("ab"), Some(27));
    }

    #[test]
    fn test_cell_address() {
        assert_eq!(cell_address(0, 0, None), "A2");
        assert_eq!(cell_address(25, 1, None), "B27");
        assert_eq!(cell_address(0, 0, Some("Sheet1")), "Sheet1!A2");
        assert_eq!(cell_address(3, 30, Some("Stock")), "Stock!AE5");
    }

    #[test]
    fn test_ranges() {
        assert_eq!(column_range("Stock", "AG"), "Stock!AG:AG");
        assert_eq!(header_range("Stock"), "Stock!1:1");
    }
}
