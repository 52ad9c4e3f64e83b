use std::path::Path;

use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use crate::error::Result;
use crate::model::{Cell, Workbook};

/// Persists the assembled workbook to the given path. The file is fully
/// written and released before this returns.
pub fn write_workbook(path: &Path, workbook: &Workbook) -> Result<()> {
    let mut writer = XlsxWorkbook::new();

    for (name, sheet) in workbook.sheets() {
        let worksheet = writer.add_worksheet();
        worksheet.set_name(name)?;

        for (row_index, row) in sheet.rows() {
            for (column, cell) in row.cells() {
                match cell {
                    Cell::Blank => {}
                    Cell::Text(text) => {
                        worksheet.write_string(row_index, column, text)?;
                    }
                    Cell::Number(value) => {
                        worksheet.write_number(row_index, column, *value)?;
                    }
                    Cell::NumberWithFormat(value, pattern) => {
                        let format = Format::new().set_num_format(pattern);
                        worksheet.write_number_with_format(row_index, column, *value, &format)?;
                    }
                }
            }
        }
    }

    writer.save(path)?;
    Ok(())
}
