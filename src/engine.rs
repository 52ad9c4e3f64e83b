use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::assemble;
use crate::config::{CollisionPolicy, SplitConfig};
use crate::error::{Result, SplitError};
use crate::io::{excel_read, excel_write};
use crate::model::{RecordRow, Sheet};
use crate::ports::ProgressSink;

/// Characters stripped from generated output file names.
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Outcome of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Every data row examined, whether it produced output or not.
    pub rows_processed: usize,
    /// Rows dropped because a required field was empty.
    pub rows_skipped: usize,
    /// Rows whose assembly or persistence failed, with the reason.
    pub rows_failed: Vec<RowFailure>,
    /// Directory the output workbooks were written to.
    pub output_dir: PathBuf,
}

impl Summary {
    fn new(output_dir: &Path) -> Self {
        Self {
            rows_processed: 0,
            rows_skipped: 0,
            rows_failed: Vec::new(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Number of output workbooks actually written.
    pub fn rows_written(&self) -> usize {
        self.rows_processed - self.rows_skipped - self.rows_failed.len()
    }
}

/// One row-scoped failure captured into the [`Summary`]. Row failures never
/// cross the row boundary; the run continues.
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub row: u32,
    pub reason: String,
}

/// Mutable per-run state threaded through the engine instead of living in
/// process-wide storage: the progress consumer and an optional cancellation
/// flag checked at row boundaries only.
pub struct RunContext<'a> {
    progress: &'a mut dyn ProgressSink,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> RunContext<'a> {
    pub fn new(progress: &'a mut dyn ProgressSink) -> Self {
        Self {
            progress,
            cancel: None,
        }
    }

    /// Attaches a caller-owned flag; setting it stops the run at the next
    /// row boundary, never mid-row.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

enum RowAction {
    Written(PathBuf),
    Skipped,
}

/// Top-level driver: validates the source shape, iterates records strictly
/// in ascending row order, and isolates each row's failures.
#[derive(Debug, Clone, Default)]
pub struct SplitEngine {
    config: SplitConfig,
}

impl SplitEngine {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Runs one split. Fatal conditions (unreadable source, missing sheets,
    /// inconsistent configuration) surface as an error before any row work;
    /// everything after that is captured per row into the returned summary.
    #[instrument(
        level = "info",
        skip_all,
        fields(source = %source_path.display(), output = %output_dir.display())
    )]
    pub fn run(
        &self,
        source_path: &Path,
        output_dir: &Path,
        ctx: &mut RunContext<'_>,
    ) -> Result<Summary> {
        self.config.validate()?;

        let source_sheets = excel_read::read_source(source_path)?;
        let primary = &source_sheets[0];
        let header = RecordRow::extract(primary.row(0));

        let row_count = primary.physical_row_count();
        let total_data_rows = row_count.saturating_sub(1);
        info!(rows = total_data_rows, "source workbook loaded");

        let mut summary = Summary::new(output_dir);

        for index in 1..row_count {
            if ctx.is_cancelled() {
                info!(row = index, "run cancelled at row boundary");
                break;
            }

            let row_index = index as u32;
            summary.rows_processed += 1;

            match self.process_row(row_index, &source_sheets, &header, output_dir) {
                Ok(RowAction::Written(path)) => {
                    debug!(row = row_index, path = %path.display(), "row written");
                }
                Ok(RowAction::Skipped) => {
                    summary.rows_skipped += 1;
                    debug!(row = row_index, "required field empty, row skipped");
                }
                Err(error) => {
                    warn!(row = row_index, %error, "row failed");
                    summary.rows_failed.push(RowFailure {
                        row: row_index,
                        reason: error.to_string(),
                    });
                }
            }

            ctx.progress
                .report(progress_percent(index, total_data_rows));
        }

        Ok(summary)
    }

    fn process_row(
        &self,
        row_index: u32,
        source_sheets: &[Sheet],
        header: &RecordRow,
        output_dir: &Path,
    ) -> Result<RowAction> {
        let record = RecordRow::extract(source_sheets[0].row(row_index));
        if !record.has_required_fields() {
            return Ok(RowAction::Skipped);
        }

        let file_name = output_file_name(&record);
        let workbook = assemble::assemble(&record, header, source_sheets, &self.config);
        let path = resolve_output_path(output_dir, &file_name, self.config.on_collision)?;

        excel_write::write_workbook(&path, &workbook).map_err(|source| SplitError::Persist {
            path: path.clone(),
            source: Box::new(source),
        })?;

        Ok(RowAction::Written(path))
    }
}

/// Output name rule: `{f0}~{f1}_{f5}_{f3}_{f2}.xlsx`, with every character
/// Windows rejects in file names stripped.
pub fn output_file_name(record: &RecordRow) -> String {
    let raw = format!(
        "{}~{}_{}_{}_{}.xlsx",
        record.field(0),
        record.field(1),
        record.field(5),
        record.field(3),
        record.field(2)
    );
    raw.chars()
        .filter(|ch| !ILLEGAL_FILENAME_CHARS.contains(ch))
        .collect()
}

fn resolve_output_path(dir: &Path, file_name: &str, policy: CollisionPolicy) -> Result<PathBuf> {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    match policy {
        CollisionPolicy::Fail => Err(SplitError::OutputExists(candidate)),
        CollisionPolicy::Suffix => {
            let stem = file_name.strip_suffix(".xlsx").unwrap_or(file_name);
            let mut counter = 2;
            loop {
                let candidate = dir.join(format!("{stem}_{counter}.xlsx"));
                if !candidate.exists() {
                    return Ok(candidate);
                }
                counter += 1;
            }
        }
    }
}

/// Percentage of rows seen so far, rounded to the nearest integer.
pub fn progress_percent(rows_seen: usize, total_data_rows: usize) -> u8 {
    if total_data_rows == 0 {
        return 100;
    }
    ((rows_seen * 100 + total_data_rows / 2) / total_data_rows) as u8
}

/// Runs the engine on a worker thread so an interactive caller stays
/// responsive, returning the join handle for the final summary together
/// with the ordered progress stream.
pub fn run_in_background(
    engine: SplitEngine,
    source_path: PathBuf,
    output_dir: PathBuf,
    cancel: Option<Arc<AtomicBool>>,
) -> (thread::JoinHandle<Result<Summary>>, mpsc::Receiver<u8>) {
    let (sender, receiver) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut progress = sender;
        let mut ctx = RunContext::new(&mut progress);
        if let Some(flag) = cancel.as_deref() {
            ctx = ctx.with_cancel(flag);
        }
        engine.run(&source_path, &output_dir, &mut ctx)
    });
    (handle, receiver)
}
