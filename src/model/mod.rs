use std::collections::BTreeMap;

/// Width of a primary-sheet record in columns.
pub const COLUMN_COUNT: usize = 34;

/// Number of sheets the fixed schema expects in the source workbook and
/// produces in every output workbook.
pub const SHEET_COUNT: usize = 6;

/// Field indices that must be non-empty for a primary row to produce output.
pub const REQUIRED_FIELDS: [usize; 5] = [0, 1, 2, 3, 5];

/// A single cell value. Absence is modelled by the containing [`Row`] having
/// no entry at a column index, which is distinct from an explicit
/// [`Cell::Blank`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A cell that exists but carries no value.
    Blank,
    /// Plain text content.
    Text(String),
    /// Numeric content with the default display format.
    Number(f64),
    /// Numeric content carrying an explicit display format string.
    NumberWithFormat(f64, String),
}

impl Cell {
    /// String form of the cell, used for filter comparisons and text copies.
    pub fn display_string(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Text(value) => value.clone(),
            Cell::Number(value) | Cell::NumberWithFormat(value, _) => value.to_string(),
        }
    }

    /// True for the explicit blank marker.
    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Blank)
    }
}

/// Sparse mapping from column index to cell. A column without an entry is
/// absent, not blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<u16, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: u16, cell: Cell) {
        self.cells.insert(column, cell);
    }

    /// Drops the cell at the given column, leaving the index absent.
    pub fn remove(&mut self, column: u16) {
        self.cells.remove(&column);
    }

    pub fn get(&self, column: u16) -> Option<&Cell> {
        self.cells.get(&column)
    }

    /// Highest populated column index, if any cell exists.
    pub fn last_column(&self) -> Option<u16> {
        self.cells.keys().next_back().copied()
    }

    /// Iterates present cells in ascending column order.
    pub fn cells(&self) -> impl Iterator<Item = (u16, &Cell)> {
        self.cells.iter().map(|(column, cell)| (*column, cell))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every present cell is explicitly blank. A row with no cells
    /// at all also reports true.
    pub fn all_blank(&self) -> bool {
        self.cells.values().all(Cell::is_blank)
    }
}

/// Sparse ordered sequence of rows. A row index without an entry is absent,
/// which is distinct from a present row whose cells are all blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: BTreeMap<u32, Row>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, index: u32) -> Option<&Row> {
        self.rows.get(&index)
    }

    pub fn row_mut(&mut self, index: u32) -> Option<&mut Row> {
        self.rows.get_mut(&index)
    }

    pub fn insert_row(&mut self, index: u32, row: Row) {
        self.rows.insert(index, row);
    }

    pub fn remove_row(&mut self, index: u32) -> Option<Row> {
        self.rows.remove(&index)
    }

    /// Writes one cell, creating the row if it does not exist yet.
    pub fn set_cell(&mut self, row: u32, column: u16, cell: Cell) {
        self.rows.entry(row).or_default().set(column, cell);
    }

    pub fn cell(&self, row: u32, column: u16) -> Option<&Cell> {
        self.rows.get(&row).and_then(|row| row.get(column))
    }

    /// Highest populated row index, if any row exists.
    pub fn last_row_index(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    /// Number of rows physically present, ignoring gaps.
    pub fn physical_row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterates present rows in ascending index order.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &Row)> {
        self.rows.iter().map(|(index, row)| (*index, row))
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = (u32, &mut Row)> {
        self.rows.iter_mut().map(|(index, row)| (*index, row))
    }
}

/// Ordered sequence of named sheets. Creation order is significant: the
/// fixed schema addresses sheets by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<(String, Sheet)>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an empty sheet and returns a mutable handle to it.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut Sheet {
        self.sheets.push((name.into(), Sheet::new()));
        let last = self.sheets.len() - 1;
        &mut self.sheets[last].1
    }

    pub fn sheet_at(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index).map(|(_, sheet)| sheet)
    }

    pub fn sheet_at_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index).map(|(_, sheet)| sheet)
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Iterates sheets in creation order.
    pub fn sheets(&self) -> impl Iterator<Item = (&str, &Sheet)> {
        self.sheets.iter().map(|(name, sheet)| (name.as_str(), sheet))
    }

    pub fn sheets_mut(&mut self) -> impl Iterator<Item = (&str, &mut Sheet)> {
        self.sheets.iter_mut().map(|(name, sheet)| (name.as_str(), sheet))
    }
}

/// One primary-sheet row flattened into its 34 textual fields. The cached
/// header row shares the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    fields: [String; COLUMN_COUNT],
}

impl RecordRow {
    /// Extracts the 34 fields from a primary-sheet row. An absent row and an
    /// absent cell both yield empty field strings, never an error.
    pub fn extract(row: Option<&Row>) -> Self {
        let fields = std::array::from_fn(|column| {
            row.and_then(|row| row.get(column as u16))
                .map(Cell::display_string)
                .unwrap_or_default()
        });
        Self { fields }
    }

    /// Field at the given index; out-of-range indices read as empty.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// The correlation key auxiliary sheets are filtered against.
    pub fn key(&self) -> &str {
        self.field(2)
    }

    /// True when every required field holds a non-whitespace value.
    pub fn has_required_fields(&self) -> bool {
        REQUIRED_FIELDS
            .iter()
            .all(|&index| !self.field(index).trim().is_empty())
    }

    /// Iterates all 34 fields in column order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}
