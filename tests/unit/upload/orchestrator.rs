use super::*;

use std::collections::VecDeque;

use crate::entry::model::Entry;
use crate::render::composite::RenderConfig;
use crate::render::downscale::DownscaleConfig;

fn png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([120, 90, 40, 255]));
    let mut buf = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buf),
        image::ImageFormat::Png,
    )
    .unwrap();
    buf
}

fn images(n: usize) -> Vec<SourceImage> {
    (0..n)
        .map(|i| SourceImage::new(png(), format!("photo{i}.jpg")))
        .collect()
}

fn entries() -> EntryList {
    EntryList::new(vec![
        Entry::new("일자", "2024-01-15"),
        Entry::new("현장명", "양주신도시"),
    ])
}

fn target() -> ArchiveTarget {
    ArchiveTarget {
        endpoint: "https://archive.example/api".to_string(),
        form_name: "DL연간단가".to_string(),
        folder_structure: vec!["일자".to_string(), "현장명".to_string()],
        field_data: Vec::new(),
    }
}

fn orchestrator(config: UploadConfig) -> UploadOrchestrator {
    let renderer = CompositeRenderer::new(RenderConfig {
        width: 128,
        height: 96,
        font_bytes: None,
        overlay_cache_capacity: 4,
    })
    .unwrap();
    UploadOrchestrator::new(renderer, DownscalePipeline::new(DownscaleConfig::default()), config)
}

fn stored(n: usize) -> ArchiveOutcome {
    ArchiveOutcome::Stored(StoredRecord {
        file_url: format!("mem://root/photo{n}.jpg"),
        saved_filename: format!("photo{n}.jpg"),
        folder_path: "root/2024-01-15/양주신도시".to_string(),
        sheet_name: "DL연간단가".to_string(),
        row_number: n + 1,
    })
}

#[derive(Default)]
struct ScriptedTransport {
    script: VecDeque<StampResult<ArchiveOutcome>>,
    sends: usize,
    batch_calls: usize,
    filenames: Vec<String>,
    last_field_data: Vec<(String, String)>,
}

impl ScriptedTransport {
    fn answering(script: Vec<StampResult<ArchiveOutcome>>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &mut self,
        target: &ArchiveTarget,
        artifact: &CompositeArtifact,
    ) -> StampResult<ArchiveOutcome> {
        self.sends += 1;
        self.filenames.push(artifact.filename.clone());
        self.last_field_data = target.field_data.clone();
        self.script.pop_front().expect("script exhausted")
    }

    fn send_batch(
        &mut self,
        target: &ArchiveTarget,
        artifacts: &[CompositeArtifact],
    ) -> StampResult<Vec<ArchiveOutcome>> {
        self.batch_calls += 1;
        self.last_field_data = target.field_data.clone();
        artifacts
            .iter()
            .map(|_| self.script.pop_front().expect("script exhausted"))
            .collect()
    }
}

#[derive(Default)]
struct RecordedProgress {
    processing: Vec<u8>,
    uploading: Vec<u8>,
}

impl ProgressObserver for RecordedProgress {
    fn on_processing(&mut self, percent: u8) {
        self.processing.push(percent);
    }
    fn on_uploading(&mut self, percent: u8) {
        self.uploading.push(percent);
    }
}

struct FailingHistory;

impl HistoryStore for FailingHistory {
    fn append(&mut self, _record: &HistoryRecord) -> StampResult<()> {
        Err(StampError::persistence("disk full"))
    }
}

#[test]
fn per_item_batch_reports_dual_progress() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::answering(vec![Ok(stored(0)), Ok(stored(1))]);
    let mut history = MemoryHistory::new();
    let mut progress = RecordedProgress::default();

    let report = orch
        .run(&images(2), &entries(), &target(), &mut transport, &mut history, &mut progress)
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.records().len(), 2);
    assert!(report.ambiguous_warnings.is_empty());
    assert!(report.history_saved);
    assert_eq!(progress.processing, vec![0, 50, 100]);
    assert_eq!(progress.uploading, vec![0, 50, 100]);
    assert_eq!(transport.sends, 2);
    assert_eq!(transport.batch_calls, 0);
}

#[test]
fn filenames_join_entry_values_before_the_original_name() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::answering(vec![Ok(stored(0))]);

    orch.run(
        &images(1),
        &entries(),
        &target(),
        &mut transport,
        &mut MemoryHistory::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(transport.filenames, vec!["2024-01-15_양주신도시_photo0.jpg"]);
}

#[test]
fn empty_target_metadata_is_filled_from_the_entries() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::answering(vec![Ok(stored(0))]);

    orch.run(
        &images(1),
        &entries(),
        &target(),
        &mut transport,
        &mut MemoryHistory::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(transport.last_field_data, entries().merged_map());
}

#[test]
fn explicit_target_metadata_is_left_alone() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::answering(vec![Ok(stored(0))]);
    let mut target = target();
    target.field_data = vec![("공종".to_string(), "토공".to_string())];

    orch.run(
        &images(1),
        &entries(),
        &target,
        &mut transport,
        &mut MemoryHistory::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(transport.last_field_data, target.field_data);
}

#[test]
fn oversized_batches_are_rejected_before_any_work() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::default();

    let err = orch
        .run(
            &images(11),
            &entries(),
            &target(),
            &mut transport,
            &mut MemoryHistory::new(),
            &mut NoProgress,
        )
        .unwrap_err();

    assert!(matches!(err, StampError::Validation(_)));
    assert!(err.to_string().contains("maximum is 10"));
    assert_eq!(transport.sends, 0);
}

#[test]
fn empty_batches_and_blank_entries_are_rejected() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::default();

    let err = orch
        .run(
            &[],
            &entries(),
            &target(),
            &mut transport,
            &mut MemoryHistory::new(),
            &mut NoProgress,
        )
        .unwrap_err();
    assert!(matches!(err, StampError::Validation(_)));

    let mut blank = entries();
    blank.set_value("현장명", "");
    let err = orch
        .run(
            &images(1),
            &blank,
            &target(),
            &mut transport,
            &mut MemoryHistory::new(),
            &mut NoProgress,
        )
        .unwrap_err();
    assert!(matches!(err, StampError::Validation(_)));
    assert_eq!(transport.sends, 0);
}

#[test]
fn mid_batch_transport_failure_resets_progress_and_aborts() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::answering(vec![
        Ok(stored(0)),
        Err(StampError::network("connection reset")),
    ]);
    let mut progress = RecordedProgress::default();

    let err = orch
        .run(
            &images(3),
            &entries(),
            &target(),
            &mut transport,
            &mut MemoryHistory::new(),
            &mut progress,
        )
        .unwrap_err();

    assert!(matches!(err, StampError::Network(_)));
    // Two attempts: one stored, one failed, the third never tried.
    assert_eq!(transport.sends, 2);
    assert_eq!(progress.processing.last(), Some(&0));
    assert_eq!(progress.uploading.last(), Some(&0));
}

#[test]
fn batch_strategy_makes_one_aggregate_call() {
    let mut orch = orchestrator(UploadConfig {
        strategy: TransmitStrategy::Batch,
        ..UploadConfig::default()
    });
    let mut transport = ScriptedTransport::answering(vec![Ok(stored(0)), Ok(stored(1))]);
    let mut progress = RecordedProgress::default();

    let report = orch
        .run(
            &images(2),
            &entries(),
            &target(),
            &mut transport,
            &mut MemoryHistory::new(),
            &mut progress,
        )
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(transport.batch_calls, 1);
    assert_eq!(transport.sends, 0);
    assert_eq!(progress.uploading, vec![0, 100]);
}

#[test]
fn ambiguous_outcomes_collect_warnings_without_failing() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::answering(vec![
        Ok(stored(0)),
        Ok(ArchiveOutcome::Ambiguous {
            warning: "verify row 2 manually".to_string(),
        }),
    ]);

    let report = orch
        .run(
            &images(2),
            &entries(),
            &target(),
            &mut transport,
            &mut MemoryHistory::new(),
            &mut NoProgress,
        )
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.records().len(), 1);
    assert_eq!(report.ambiguous_warnings, vec!["verify row 2 manually"]);
}

#[test]
fn history_captures_the_batch_summary() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::answering(vec![Ok(stored(0)), Ok(stored(1))]);
    let mut history = MemoryHistory::new();

    orch.run(
        &images(2),
        &entries(),
        &target(),
        &mut transport,
        &mut history,
        &mut NoProgress,
    )
    .unwrap();

    let records = history.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.form_name, "DL연간단가");
    assert_eq!(record.site_name, "양주신도시");
    assert_eq!(record.image_count, 2);
    assert_eq!(record.image_urls.len(), 2);
    assert_eq!(record.thumbnails.len(), 2);
    assert!(!record.thumbnails[0].is_empty());
}

#[test]
fn history_failure_is_swallowed_after_successful_archival() {
    let mut orch = orchestrator(UploadConfig::default());
    let mut transport = ScriptedTransport::answering(vec![Ok(stored(0))]);

    let report = orch
        .run(
            &images(1),
            &entries(),
            &target(),
            &mut transport,
            &mut FailingHistory,
            &mut NoProgress,
        )
        .unwrap();

    assert!(!report.history_saved);
    assert_eq!(report.outcomes.len(), 1);
}

#[test]
fn percent_is_exact_at_the_boundaries() {
    assert_eq!(percent(0, 4), 0);
    assert_eq!(percent(1, 4), 25);
    assert_eq!(percent(4, 4), 100);
    assert_eq!(percent(1, 3), 33);
    assert_eq!(percent(0, 0), 0);
}
