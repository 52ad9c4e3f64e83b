use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SplitError};
use crate::model::SHEET_COUNT;

/// One auxiliary-sheet extraction rule: copy rows of `source_sheet` whose
/// cell at `compare_column` matches the record key into `target_sheet`.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSpec {
    pub source_sheet: usize,
    pub target_sheet: usize,
    pub compare_column: u16,
}

/// Rectangular normalization region: from `start` down to the sheet's
/// current last row, spanning columns up to `end_column`.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeSpec {
    pub sheet: usize,
    pub start: String,
    pub end_column: String,
}

impl RangeSpec {
    fn new(sheet: usize, start: &str, end_column: &str) -> Self {
        Self {
            sheet,
            start: start.to_string(),
            end_column: end_column.to_string(),
        }
    }
}

/// Column indices to drop from one output sheet. Removal clears the cells in
/// place; remaining columns are not shifted.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnRemoval {
    pub sheet: usize,
    pub columns: Vec<u16>,
}

/// What to do when an output file name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append `_2`, `_3`, … before the extension until the name is free.
    Suffix,
    /// Record a row failure and leave the existing file untouched.
    Fail,
}

/// The behaviour tables that have drifted across tool revisions, gathered in
/// one place so a revision change is a configuration swap rather than a code
/// edit. `Default` is the current revision; a JSON file passed via
/// `--config` may override any subset of fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Auxiliary-sheet extraction rules, applied in order.
    pub filters: Vec<FilterSpec>,
    /// Numeric normalization regions; a sheet may appear more than once.
    pub ranges: Vec<RangeSpec>,
    /// Whether the column-removal step runs at all. Earlier revisions
    /// enabled it; the current revision does not.
    pub remove_columns: bool,
    /// Per-sheet column indices dropped when `remove_columns` is on.
    pub column_removals: Vec<ColumnRemoval>,
    /// Output name collision handling; never silent overwrite.
    pub on_collision: CollisionPolicy,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            filters: vec![
                FilterSpec { source_sheet: 1, target_sheet: 1, compare_column: 2 },
                FilterSpec { source_sheet: 2, target_sheet: 2, compare_column: 3 },
                FilterSpec { source_sheet: 3, target_sheet: 3, compare_column: 3 },
                FilterSpec { source_sheet: 4, target_sheet: 4, compare_column: 3 },
                FilterSpec { source_sheet: 4, target_sheet: 5, compare_column: 0 },
            ],
            ranges: vec![
                RangeSpec::new(0, "G2", "AH"),
                RangeSpec::new(1, "I2", "AD"),
                RangeSpec::new(2, "E2", "O"),
                RangeSpec::new(3, "G2", "G"),
                RangeSpec::new(4, "G2", "G"),
                RangeSpec::new(5, "G2", "O"),
                RangeSpec::new(5, "T2", "Z"),
            ],
            remove_columns: false,
            column_removals: vec![
                ColumnRemoval { sheet: 0, columns: vec![6, 7, 8, 10, 11] },
                ColumnRemoval { sheet: 1, columns: vec![9, 10, 12, 13] },
            ],
            on_collision: CollisionPolicy::Suffix,
        }
    }
}

impl SplitConfig {
    /// Loads a configuration override from a JSON file. Fields missing from
    /// the file keep their current-revision defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|error| SplitError::Config(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every table entry addresses a sheet inside the fixed
    /// six-sheet schema.
    pub fn validate(&self) -> Result<()> {
        for spec in &self.filters {
            if spec.source_sheet >= SHEET_COUNT || spec.target_sheet >= SHEET_COUNT {
                return Err(SplitError::Config(format!(
                    "filter {} -> {} addresses a sheet outside the {SHEET_COUNT}-sheet schema",
                    spec.source_sheet, spec.target_sheet
                )));
            }
        }
        for range in &self.ranges {
            if range.sheet >= SHEET_COUNT {
                return Err(SplitError::Config(format!(
                    "normalization range on sheet {} outside the {SHEET_COUNT}-sheet schema",
                    range.sheet
                )));
            }
        }
        for removal in &self.column_removals {
            if removal.sheet >= SHEET_COUNT {
                return Err(SplitError::Config(format!(
                    "column removal on sheet {} outside the {SHEET_COUNT}-sheet schema",
                    removal.sheet
                )));
            }
        }
        Ok(())
    }
}
