//! Spreadsheet-style cell reference arithmetic (`A1`, `AB12`, `$C$3`).
use regex::Regex;
use std::sync::LazyLock;

static CELL_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]*)$").expect("Hardcode regex pattern")
});

/// Converts column letters to a 1-based column index.
///
/// Letters are read as base-26 digits where `A = 1`:
/// `A → 1`, `Z → 26`, `AA → 27`, `AZ → 52`, `BA → 53`.
pub fn column_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |index, letter| {
        let letter = letter.to_ascii_uppercase();
        letter
            .is_ascii_uppercase()
            .then(|| index * 26 + (letter as usize - 'A' as usize + 1))
    })
}

/// Converts a 1-based column index back to its letters (`1 → A`, `27 → AA`).
pub fn index_to_column(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remainder = index;
    while remainder > 0 {
        let digit = (remainder - 1) % 26;
        letters.push((b'A' + digit as u8) as char);
        remainder = (remainder - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Splits a cell reference into its 1-based column index and optional 1-based row number.
pub fn split_reference(reference: &str) -> Option<(usize, Option<usize>)> {
    let captures = CELL_REFERENCE.captures(reference.trim())?;
    let column = captures.get(1).and_then(|matcher| column_to_index(matcher.as_str()))?;
    let row = captures
        .get(2)
        .map(|matcher| matcher.as_str())
        .filter(|digits| !digits.is_empty())
        .map(|digits| digits.parse::<usize>())
        .transpose()
        .ok()?;
    Some((column, row))
}

/// Formats a 1-based (column, row) pair as a reference like `C7`.
pub fn index_to_reference(column: usize, row: usize) -> String {
    format!("{}{}", index_to_column(column), row)
}
