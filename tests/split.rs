use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::Workbook;
use settlesplit::SplitError;
use settlesplit::config::SplitConfig;
use settlesplit::engine::{RunContext, SplitEngine, run_in_background};
use settlesplit::ports::{
    Notifier, OutputPicker, ProgressSink, RunOutcome, SourcePicker, run_with_pickers,
};
use tempfile::tempdir;

const RECORD_A: [(u16, &str); 5] = [(0, "2024"), (1, "01"), (2, "ACME"), (3, "KR"), (5, "Jan")];

/// Master fixture: Sheet1 header + one complete record + one record missing
/// the key field; auxiliary sheets with rows keyed both to the record and to
/// an unrelated counterparty.
fn write_master_fixture(path: &Path) {
    let mut workbook = Workbook::new();

    let sheet1 = workbook.add_worksheet();
    for column in 0..34u16 {
        sheet1
            .write_string(0, column, format!("H{column}"))
            .expect("header cell");
    }
    for (column, value) in RECORD_A {
        sheet1.write_string(1, column, value).expect("record cell");
    }
    sheet1.write_string(1, 6, "1234").expect("amount cell");
    for (column, value) in [(0, "2024"), (1, "01"), (3, "KR"), (5, "Jan")] {
        sheet1.write_string(2, column, value).expect("record cell");
    }

    let sheet2 = workbook.add_worksheet();
    sheet2.write_string(0, 0, "detail").expect("aux header");
    sheet2.write_string(1, 2, "ACME").expect("aux key");
    sheet2.write_string(1, 8, "5000").expect("aux amount");
    sheet2.write_string(2, 2, "OTHER").expect("aux key");
    sheet2.write_string(2, 8, "7777").expect("aux amount");

    let sheet3 = workbook.add_worksheet();
    sheet3.write_string(0, 0, "detail").expect("aux header");
    sheet3.write_string(1, 3, "ACME").expect("aux key");
    sheet3.write_string(1, 4, "900").expect("aux amount");

    let sheet4 = workbook.add_worksheet();
    sheet4.write_string(0, 0, "detail").expect("aux header");
    sheet4.write_string(1, 3, "ACME").expect("aux key");
    sheet4.write_string(1, 6, "10").expect("aux amount");

    let sheet5 = workbook.add_worksheet();
    sheet5.write_string(0, 0, "detail").expect("aux header");
    sheet5.write_string(1, 3, "ACME").expect("aux key");
    sheet5.write_string(1, 6, "11").expect("aux amount");
    sheet5.write_string(2, 0, "ACME").expect("aux key");
    sheet5.write_string(2, 6, "22").expect("aux amount");

    let sheet6 = workbook.add_worksheet();
    sheet6.write_string(0, 0, "detail").expect("aux header");

    workbook.save(path).expect("fixture saved");
}

/// Fixture with two identical records and blank auxiliary sheets, used for
/// collision handling.
fn write_duplicate_fixture(path: &Path) {
    let mut workbook = Workbook::new();

    let sheet1 = workbook.add_worksheet();
    for column in 0..34u16 {
        sheet1
            .write_string(0, column, format!("H{column}"))
            .expect("header cell");
    }
    for row in [1, 2] {
        for (column, value) in RECORD_A {
            sheet1.write_string(row, column, value).expect("record cell");
        }
    }
    for _ in 0..5 {
        workbook.add_worksheet();
    }

    workbook.save(path).expect("fixture saved");
}

fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("output directory read")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[derive(Default)]
struct RecordingProgress {
    seen: Vec<u8>,
}

impl ProgressSink for RecordingProgress {
    fn report(&mut self, percent: u8) {
        self.seen.push(percent);
    }
}

#[test]
fn split_produces_one_workbook_per_valid_row() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_master_fixture(&source);
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).expect("output directory");

    let engine = SplitEngine::new(SplitConfig::default());
    let mut progress = RecordingProgress::default();
    let mut ctx = RunContext::new(&mut progress);
    let summary = engine.run(&source, &out_dir, &mut ctx).expect("run");

    assert_eq!(summary.rows_processed, 2);
    assert_eq!(summary.rows_skipped, 1);
    assert!(summary.rows_failed.is_empty());
    assert_eq!(summary.rows_written(), 1);
    assert_eq!(output_names(&out_dir), vec!["2024~01_Jan_KR_ACME.xlsx"]);
    assert_eq!(progress.seen, vec![50, 100]);
}

#[test]
fn output_workbook_holds_record_filtered_rows_and_numeric_cells() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_master_fixture(&source);
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).expect("output directory");

    let engine = SplitEngine::new(SplitConfig::default());
    let mut progress = RecordingProgress::default();
    let mut ctx = RunContext::new(&mut progress);
    engine.run(&source, &out_dir, &mut ctx).expect("run");

    let mut output: Xlsx<_> =
        open_workbook(out_dir.join("2024~01_Jan_KR_ACME.xlsx")).expect("output opened");
    assert_eq!(output.sheet_names().len(), 6);

    let sheet1 = output
        .worksheet_range_at(0)
        .expect("sheet1 present")
        .expect("sheet1 range");
    assert_eq!(sheet1.get_value((0, 0)), Some(&DataType::String("H0".into())));
    assert_eq!(sheet1.get_value((0, 33)), Some(&DataType::String("H33".into())));
    assert_eq!(sheet1.get_value((1, 2)), Some(&DataType::String("ACME".into())));
    assert_eq!(sheet1.get_value((1, 6)), Some(&DataType::Float(1234.0)));

    let sheet2 = output
        .worksheet_range_at(1)
        .expect("sheet2 present")
        .expect("sheet2 range");
    assert_eq!(sheet2.get_value((0, 0)), Some(&DataType::String("detail".into())));
    assert_eq!(sheet2.get_value((1, 2)), Some(&DataType::String("ACME".into())));
    assert_eq!(sheet2.get_value((1, 8)), Some(&DataType::Float(5000.0)));
    assert_eq!(sheet2.get_value((2, 2)), None);

    let sheet5 = output
        .worksheet_range_at(4)
        .expect("sheet5 present")
        .expect("sheet5 range");
    assert_eq!(sheet5.get_value((1, 3)), Some(&DataType::String("ACME".into())));
    assert_eq!(sheet5.get_value((1, 6)), Some(&DataType::Float(11.0)));

    let sheet6 = output
        .worksheet_range_at(5)
        .expect("sheet6 present")
        .expect("sheet6 range");
    assert_eq!(sheet6.get_value((1, 0)), Some(&DataType::String("ACME".into())));
    assert_eq!(sheet6.get_value((1, 6)), Some(&DataType::Float(22.0)));
}

#[test]
fn repeated_runs_into_empty_directories_are_identical() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_master_fixture(&source);

    let engine = SplitEngine::new(SplitConfig::default());
    let mut summaries = Vec::new();
    for name in ["first", "second"] {
        let out_dir = temp_dir.path().join(name);
        fs::create_dir_all(&out_dir).expect("output directory");
        let mut progress = RecordingProgress::default();
        let mut ctx = RunContext::new(&mut progress);
        summaries.push(engine.run(&source, &out_dir, &mut ctx).expect("run"));
    }

    let first = output_names(&temp_dir.path().join("first"));
    let second = output_names(&temp_dir.path().join("second"));
    assert_eq!(first, second);
    assert_eq!(summaries[0].rows_processed, summaries[1].rows_processed);
    assert_eq!(summaries[0].rows_skipped, summaries[1].rows_skipped);
}

#[test]
fn colliding_names_are_suffixed_under_the_default_policy() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_duplicate_fixture(&source);
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).expect("output directory");

    let engine = SplitEngine::new(SplitConfig::default());
    let mut progress = RecordingProgress::default();
    let mut ctx = RunContext::new(&mut progress);
    let summary = engine.run(&source, &out_dir, &mut ctx).expect("run");

    assert_eq!(summary.rows_written(), 2);
    assert_eq!(
        output_names(&out_dir),
        vec!["2024~01_Jan_KR_ACME.xlsx", "2024~01_Jan_KR_ACME_2.xlsx"]
    );
}

#[test]
fn colliding_names_fail_the_row_under_the_fail_policy() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_duplicate_fixture(&source);
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).expect("output directory");

    let config: SplitConfig =
        serde_json::from_str(r#"{"on_collision": "fail"}"#).expect("config parsed");
    let engine = SplitEngine::new(config);
    let mut progress = RecordingProgress::default();
    let mut ctx = RunContext::new(&mut progress);
    let summary = engine.run(&source, &out_dir, &mut ctx).expect("run");

    assert_eq!(summary.rows_processed, 2);
    assert_eq!(summary.rows_failed.len(), 1);
    assert_eq!(summary.rows_failed[0].row, 2);
    assert!(summary.rows_failed[0].reason.contains("already exists"));
    assert_eq!(output_names(&out_dir), vec!["2024~01_Jan_KR_ACME.xlsx"]);
}

#[test]
fn column_removal_clears_configured_columns_without_shifting() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_master_fixture(&source);
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).expect("output directory");

    let config: SplitConfig =
        serde_json::from_str(r#"{"remove_columns": true}"#).expect("config parsed");
    let engine = SplitEngine::new(config);
    let mut progress = RecordingProgress::default();
    let mut ctx = RunContext::new(&mut progress);
    engine.run(&source, &out_dir, &mut ctx).expect("run");

    let mut output: Xlsx<_> =
        open_workbook(out_dir.join("2024~01_Jan_KR_ACME.xlsx")).expect("output opened");
    let sheet1 = output
        .worksheet_range_at(0)
        .expect("sheet1 present")
        .expect("sheet1 range");
    assert_eq!(sheet1.get_value((0, 5)), Some(&DataType::String("H5".into())));
    assert_eq!(sheet1.get_value((0, 6)), Some(&DataType::Empty));
    assert_eq!(sheet1.get_value((0, 9)), Some(&DataType::String("H9".into())));
    assert_eq!(sheet1.get_value((1, 6)), Some(&DataType::Empty));
}

#[test]
fn fewer_than_six_sheets_is_a_schema_error() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("short.xlsx");
    let mut workbook = Workbook::new();
    for _ in 0..5 {
        workbook.add_worksheet();
    }
    workbook.save(&source).expect("fixture saved");

    let engine = SplitEngine::new(SplitConfig::default());
    let mut progress = RecordingProgress::default();
    let mut ctx = RunContext::new(&mut progress);
    let error = engine
        .run(&source, temp_dir.path(), &mut ctx)
        .expect_err("schema validation must fail");

    assert!(matches!(
        error,
        SplitError::Schema {
            found: 5,
            required: 6
        }
    ));
    assert!(progress.seen.is_empty());
}

#[test]
fn unparseable_source_is_an_invalid_format_error() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("broken.xlsx");
    fs::write(&source, b"not a workbook").expect("fixture written");

    let engine = SplitEngine::new(SplitConfig::default());
    let mut progress = RecordingProgress::default();
    let mut ctx = RunContext::new(&mut progress);
    let error = engine
        .run(&source, temp_dir.path(), &mut ctx)
        .expect_err("open must fail");

    assert!(matches!(error, SplitError::InvalidFormat(_)));
}

#[test]
fn cancellation_stops_at_the_row_boundary() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_master_fixture(&source);
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).expect("output directory");

    let cancelled = AtomicBool::new(true);
    let engine = SplitEngine::new(SplitConfig::default());
    let mut progress = RecordingProgress::default();
    let mut ctx = RunContext::new(&mut progress).with_cancel(&cancelled);
    let summary = engine.run(&source, &out_dir, &mut ctx).expect("run");

    assert_eq!(summary.rows_processed, 0);
    assert!(output_names(&out_dir).is_empty());
}

#[test]
fn background_run_streams_monotonic_progress() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_master_fixture(&source);
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).expect("output directory");

    let engine = SplitEngine::new(SplitConfig::default());
    let (handle, receiver) =
        run_in_background(engine, source.clone(), out_dir.clone(), None);

    let percents: Vec<u8> = receiver.iter().collect();
    let summary = handle.join().expect("worker joined").expect("run");

    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percents.last(), Some(&100));
    assert_eq!(summary.rows_processed, 2);
}

struct FixedSource(PathBuf);

impl SourcePicker for FixedSource {
    fn pick_source(&mut self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

struct FixedOutput(PathBuf);

impl OutputPicker for FixedOutput {
    fn pick_output_dir(&mut self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

struct DecliningOutput;

impl OutputPicker for DecliningOutput {
    fn pick_output_dir(&mut self) -> Option<PathBuf> {
        None
    }
}

#[derive(Default)]
struct CaptureNotifier {
    completed_rows: Option<usize>,
    failure: Option<String>,
}

impl Notifier for CaptureNotifier {
    fn notify(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed(summary) => self.completed_rows = Some(summary.rows_processed),
            RunOutcome::Failed(message) => self.failure = Some(message.clone()),
        }
    }
}

#[test]
fn picker_front_door_notifies_completion() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_master_fixture(&source);
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(&out_dir).expect("output directory");

    let engine = SplitEngine::new(SplitConfig::default());
    let mut progress = RecordingProgress::default();
    let mut notifier = CaptureNotifier::default();
    let result = run_with_pickers(
        &engine,
        &mut FixedSource(source),
        &mut FixedOutput(out_dir),
        &mut progress,
        &mut notifier,
    );

    assert!(result.expect("run started").is_ok());
    assert_eq!(notifier.completed_rows, Some(2));
    assert!(notifier.failure.is_none());
}

#[test]
fn declined_output_folder_cancels_before_any_work() {
    let temp_dir = tempdir().expect("temporary directory");
    let source = temp_dir.path().join("master.xlsx");
    write_master_fixture(&source);

    let engine = SplitEngine::new(SplitConfig::default());
    let mut progress = RecordingProgress::default();
    let mut notifier = CaptureNotifier::default();
    let result = run_with_pickers(
        &engine,
        &mut FixedSource(source),
        &mut DecliningOutput,
        &mut progress,
        &mut notifier,
    );

    assert!(result.is_none());
    assert!(notifier.completed_rows.is_none());
    assert!(notifier.failure.expect("failure notified").contains("cancelled"));
    assert!(progress.seen.is_empty());
}

#[test]
fn config_file_round_trips_through_the_engine() {
    let temp_dir = tempdir().expect("temporary directory");
    let config_path = temp_dir.path().join("split.json");
    fs::write(
        &config_path,
        r#"{"filters": [{"source_sheet": 1, "target_sheet": 1, "compare_column": 2}]}"#,
    )
    .expect("config written");

    let config = SplitConfig::from_file(&config_path).expect("config loaded");
    assert_eq!(config.filters.len(), 1);
    assert_eq!(config.ranges.len(), 7);

    fs::write(&config_path, r#"{"unknown_table": []}"#).expect("config written");
    let error = SplitConfig::from_file(&config_path).expect_err("unknown field must fail");
    assert!(matches!(error, SplitError::Config(_)));
}
