use crate::addr;
use crate::model::{Cell, Sheet};

/// Display format attached to cells rewritten by the normalizer.
pub const GROUPED_INTEGER_FORMAT: &str = "#,##0";

/// Rewrites numeric-looking text cells inside the given rectangle into
/// formatted numeric cells.
///
/// The rectangle spans from `start_address` down to the sheet's *current*
/// last row, so this must run after any structural edits. Cells that are
/// numeric already, blank, absent, or non-numeric text are left untouched.
pub fn normalize_range(sheet: &mut Sheet, start_address: &str, end_column_letter: &str) {
    let (start_row, start_col) = addr::parse(start_address);
    let start_row = u32::try_from(start_row).unwrap_or(0);
    let start_col = u16::try_from(start_col).unwrap_or(0);
    let end_col = u16::try_from(addr::column_index(end_column_letter)).unwrap_or(0);

    let end_row = match sheet.last_row_index() {
        Some(index) => index,
        None => return,
    };

    for index in start_row..=end_row {
        let row = match sheet.row_mut(index) {
            Some(row) => row,
            None => continue,
        };
        for column in start_col..=end_col {
            let parsed = match row.get(column) {
                Some(Cell::Text(text)) => {
                    text.parse::<f64>().ok().filter(|value| value.is_finite())
                }
                _ => None,
            };
            if let Some(value) = parsed {
                row.set(
                    column,
                    Cell::NumberWithFormat(value, GROUPED_INTEGER_FORMAT.to_string()),
                );
            }
        }
    }
}
