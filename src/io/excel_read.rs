use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::error::{Result, SplitError};
use crate::model::{Cell, Row, SHEET_COUNT, Sheet};

/// Opens the source workbook read-only, validates the fixed sheet count, and
/// loads the first six sheets into the sparse in-memory model. The workbook
/// handle is released when this returns; all row iteration happens against
/// the loaded sheets.
pub fn read_source(path: &Path) -> Result<Vec<Sheet>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let found = workbook.sheet_names().len();
    if found < SHEET_COUNT {
        return Err(SplitError::Schema {
            found,
            required: SHEET_COUNT,
        });
    }

    let mut sheets = Vec::with_capacity(SHEET_COUNT);
    for index in 0..SHEET_COUNT {
        let range = workbook
            .worksheet_range_at(index)
            .ok_or_else(|| SplitError::InvalidWorkbook(format!("missing sheet at index {index}")))?
            .map_err(SplitError::from)?;
        sheets.push(convert_range(&range));
    }

    Ok(sheets)
}

/// Converts a dense calamine range into the sparse sheet model. Empty cells
/// become absent entries; rows whose cells are all empty stay absent.
fn convert_range(range: &calamine::Range<DataType>) -> Sheet {
    let mut sheet = Sheet::new();
    let (start_row, start_col) = match range.start() {
        Some(start) => start,
        None => return sheet,
    };

    for (row_offset, cells) in range.rows().enumerate() {
        let mut row = Row::new();
        for (col_offset, value) in cells.iter().enumerate() {
            if let Some(cell) = convert_cell(value) {
                row.set(start_col as u16 + col_offset as u16, cell);
            }
        }
        if !row.is_empty() {
            sheet.insert_row(start_row + row_offset as u32, row);
        }
    }

    sheet
}

fn convert_cell(value: &DataType) -> Option<Cell> {
    match value {
        DataType::Empty => None,
        DataType::String(text) => Some(Cell::Text(text.clone())),
        DataType::Float(number) => Some(Cell::Number(*number)),
        DataType::Int(number) => Some(Cell::Number(*number as f64)),
        DataType::Bool(flag) => Some(Cell::Text(flag.to_string())),
        other => Some(Cell::Text(other.to_string())),
    }
}
