//! Capabilities the engine's collaborators present, kept behind traits so
//! front-ends (CLI, tests, a future GUI shell) can supply their own
//! implementations.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crate::engine::{RunContext, SplitEngine, Summary};
use crate::error::Result;

/// Receives progress updates as integers 0–100, monotonically non-decreasing
/// within a run. Delivery is at-least-once per row; consumers must tolerate
/// repeated values.
pub trait ProgressSink {
    fn report(&mut self, percent: u8);
}

/// Fire-and-forget delivery into an ordered channel. A disconnected receiver
/// is ignored; progress is a side channel and must never fail the run.
impl ProgressSink for Sender<u8> {
    fn report(&mut self, percent: u8) {
        let _ = self.send(percent);
    }
}

/// Sink for callers that do not track progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Terminal signal delivered exactly once per run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Summary),
    Failed(String),
}

/// Receives the single terminal success/failure signal of a run.
pub trait Notifier {
    fn notify(&mut self, outcome: &RunOutcome);
}

/// Supplies the source workbook path, or `None` to cancel before any work.
pub trait SourcePicker {
    fn pick_source(&mut self) -> Option<PathBuf>;
}

/// Supplies the output directory, or `None` to cancel before any work.
pub trait OutputPicker {
    fn pick_output_dir(&mut self) -> Option<PathBuf>;
}

/// Drives one interactive-style run: asks the pickers, bails out quietly if
/// the source picker declines, then runs the engine and delivers one
/// terminal notification. Returns `None` when the run was cancelled before
/// it started.
pub fn run_with_pickers(
    engine: &SplitEngine,
    source: &mut dyn SourcePicker,
    output: &mut dyn OutputPicker,
    progress: &mut dyn ProgressSink,
    notifier: &mut dyn Notifier,
) -> Option<Result<Summary>> {
    let source_path = source.pick_source()?;

    let output_dir = match output.pick_output_dir() {
        Some(dir) => dir,
        None => {
            notifier.notify(&RunOutcome::Failed(
                "no output directory selected; run cancelled".to_string(),
            ));
            return None;
        }
    };

    let mut ctx = RunContext::new(progress);
    let result = engine.run(&source_path, &output_dir, &mut ctx);
    match &result {
        Ok(summary) => notifier.notify(&RunOutcome::Completed(summary.clone())),
        Err(error) => notifier.notify(&RunOutcome::Failed(error.to_string())),
    }
    Some(result)
}
