use crate::model::{Cell, Row, Sheet};

/// Copies the header row plus every key-matching data row of `source` into
/// `target`.
///
/// Matching compares the *string representation* of the cell at
/// `compare_column` against `key`, exactly: case-sensitive and untrimmed.
/// Matched rows land densely numbered from 1 regardless of gaps in the
/// source; their relative order is preserved. Absent source cells are
/// skipped, never materialised as blanks.
pub fn filter_into(source: &Sheet, target: &mut Sheet, key: &str, compare_column: u16) {
    if let Some(header) = source.row(0) {
        target.insert_row(0, copy_row_as_text(header));
    }

    let last = source.last_row_index().unwrap_or(0);
    let mut next_target_row: u32 = 1;
    for index in 1..=last {
        let row = match source.row(index) {
            Some(row) => row,
            None => continue,
        };
        let matches = row
            .get(compare_column)
            .is_some_and(|cell| cell.display_string() == key);
        if matches {
            target.insert_row(next_target_row, copy_row_as_text(row));
            next_target_row += 1;
        }
    }
}

fn copy_row_as_text(row: &Row) -> Row {
    let mut copy = Row::new();
    for (column, cell) in row.cells() {
        copy.set(column, Cell::Text(cell.display_string()));
    }
    copy
}
