//! Per-sheet transforms applied while assembling an output workbook:
//! key-based row extraction, numeric-text normalization, and empty-row
//! pruning.

pub mod filter;
pub mod normalize;
pub mod prune;
