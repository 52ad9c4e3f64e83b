use crate::config::SplitConfig;
use crate::model::{Cell, RecordRow, Row, SHEET_COUNT, Sheet, Workbook};
use crate::transform::{filter, normalize, prune};

/// Builds the output workbook for a single primary-sheet record.
///
/// Sheet1 receives the cached header and the record itself; the remaining
/// sheets are filled by the configured extraction rules, all keyed on
/// `record[2]`. The optional column removal, numeric normalization, and
/// empty-row pruning then run in that order. Table entries addressing a
/// sheet outside the schema are ignored; [`SplitConfig::validate`] rejects
/// them before a run starts.
pub fn assemble(
    record: &RecordRow,
    header: &RecordRow,
    source_sheets: &[Sheet],
    config: &SplitConfig,
) -> Workbook {
    let mut workbook = Workbook::new();
    for index in 0..SHEET_COUNT {
        workbook.add_sheet(format!("Sheet{}", index + 1));
    }

    if let Some(primary) = workbook.sheet_at_mut(0) {
        primary.insert_row(0, field_row(header));
        primary.insert_row(1, field_row(record));
    }

    for spec in &config.filters {
        let source = match source_sheets.get(spec.source_sheet) {
            Some(sheet) => sheet,
            None => continue,
        };
        let target = match workbook.sheet_at_mut(spec.target_sheet) {
            Some(sheet) => sheet,
            None => continue,
        };
        filter::filter_into(source, target, record.key(), spec.compare_column);
    }

    if config.remove_columns {
        for removal in &config.column_removals {
            if let Some(sheet) = workbook.sheet_at_mut(removal.sheet) {
                remove_columns(sheet, &removal.columns);
            }
        }
    }

    for range in &config.ranges {
        if let Some(sheet) = workbook.sheet_at_mut(range.sheet) {
            normalize::normalize_range(sheet, &range.start, &range.end_column);
        }
    }

    for (_, sheet) in workbook.sheets_mut() {
        prune::prune_empty_rows(sheet);
    }

    workbook
}

fn field_row(fields: &RecordRow) -> Row {
    let mut row = Row::new();
    for (column, field) in fields.fields().enumerate() {
        row.set(column as u16, Cell::Text(field.to_string()));
    }
    row
}

fn remove_columns(sheet: &mut Sheet, columns: &[u16]) {
    for (_, row) in sheet.rows_mut() {
        for column in columns {
            row.remove(*column);
        }
    }
}
