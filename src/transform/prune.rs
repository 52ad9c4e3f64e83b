use crate::model::Sheet;

/// Deletes every empty row in place, scanning from the highest index down.
///
/// A row is empty when every present cell is explicitly blank; a row with no
/// cells at all counts as empty too. Surviving rows keep their indices, so
/// the sheet may retain gaps; nothing downstream depends on contiguous
/// numbering.
pub fn prune_empty_rows(sheet: &mut Sheet) {
    let empty: Vec<u32> = sheet
        .rows()
        .filter(|(_, row)| row.all_blank())
        .map(|(index, _)| index)
        .collect();
    for index in empty.into_iter().rev() {
        sheet.remove_row(index);
    }
}
