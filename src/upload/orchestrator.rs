use crate::archive::writer::{ArchiveOutcome, SITE_FIELD, StoredRecord};
use crate::entry::model::{ArchiveTarget, CompositeArtifact, EntryList, SourceImage};
use crate::foundation::error::{StampError, StampResult};
use crate::render::composite::CompositeRenderer;
use crate::render::downscale::DownscalePipeline;
use crate::upload::transport::Transport;

/// Live progress percentages for the two batch phases.
///
/// `processing` advances per rendered image; `uploading` advances per
/// transmitted artifact (or jumps to 100 under the batch strategy). Both reset
/// to 0 on any transmission failure.
pub trait ProgressObserver {
    /// Rendering/compression progress, 0..=100.
    fn on_processing(&mut self, _percent: u8) {}

    /// Transmission progress, 0..=100.
    fn on_uploading(&mut self, _percent: u8) {}
}

/// Observer that discards all progress updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Best-effort local history of successful batches.
pub trait HistoryStore {
    /// Persist one batch summary.
    fn append(&mut self, record: &HistoryRecord) -> StampResult<()>;
}

/// Summary of one successfully archived batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Form the batch was submitted under.
    pub form_name: String,
    /// Site value at submission time (blank when the form has no site field).
    pub site_name: String,
    /// Merged field/value snapshot.
    pub data: Vec<(String, String)>,
    /// Locations of the archived artifacts (unambiguous ones only).
    pub image_urls: Vec<String>,
    /// Number of images in the batch.
    pub image_count: usize,
    /// Thumbnail JPEGs, one per artifact.
    pub thumbnails: Vec<Vec<u8>>,
}

/// In-memory [`HistoryStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryHistory {
    records: Vec<HistoryRecord>,
}

impl MemoryHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted records, oldest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, record: &HistoryRecord) -> StampResult<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// How Phase 2 moves artifacts to the archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransmitStrategy {
    /// Sequential per-item calls; first failure aborts the remaining queue.
    #[default]
    PerItem,
    /// One aggregate call carrying the whole batch.
    Batch,
}

/// Batch bounds and transmission strategy.
#[derive(Clone, Copy, Debug)]
pub struct UploadConfig {
    /// Maximum number of images accepted per batch.
    pub max_batch: usize,
    /// Phase-2 strategy.
    pub strategy: TransmitStrategy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_batch: 10,
            strategy: TransmitStrategy::PerItem,
        }
    }
}

/// Result of one fully transmitted batch.
#[derive(Clone, Debug)]
pub struct BatchReport {
    /// Per-artifact outcomes, in batch order.
    pub outcomes: Vec<ArchiveOutcome>,
    /// Warnings from ambiguous (rate-limited) writes.
    pub ambiguous_warnings: Vec<String>,
    /// Whether the history summary was persisted.
    pub history_saved: bool,
}

impl BatchReport {
    /// Stored records for the unambiguous outcomes, in batch order.
    pub fn records(&self) -> Vec<&StoredRecord> {
        self.outcomes.iter().filter_map(|o| o.record()).collect()
    }
}

/// Drives a bounded batch through render → compress → transmit with dual
/// progress tracking.
///
/// Rendering is CPU-bound and strictly sequential, so progress stays monotonic
/// and at most one decoded bitmap is resident at a time. Transmission is
/// likewise sequential; there is no mid-batch cancellation, no retry, and no
/// rollback of already-archived items.
pub struct UploadOrchestrator {
    renderer: CompositeRenderer,
    downscale: DownscalePipeline,
    config: UploadConfig,
}

impl UploadOrchestrator {
    /// Build an orchestrator from its stages.
    pub fn new(
        renderer: CompositeRenderer,
        downscale: DownscalePipeline,
        config: UploadConfig,
    ) -> Self {
        Self {
            renderer,
            downscale,
            config,
        }
    }

    /// Run one batch to completion.
    ///
    /// Validation and rendering failures abort before any network activity.
    /// A Phase-2 failure resets both progress counters and surfaces the
    /// error; artifacts archived before the failure stay archived.
    #[tracing::instrument(skip_all, fields(form = %target.form_name, images = images.len()))]
    pub fn run(
        &mut self,
        images: &[SourceImage],
        entries: &EntryList,
        target: &ArchiveTarget,
        transport: &mut dyn Transport,
        history: &mut dyn HistoryStore,
        progress: &mut dyn ProgressObserver,
    ) -> StampResult<BatchReport> {
        entries.validate()?;
        if images.is_empty() {
            return Err(StampError::validation("at least one image must be selected"));
        }
        if images.len() > self.config.max_batch {
            return Err(StampError::validation(format!(
                "batch holds {} images, the maximum is {}",
                images.len(),
                self.config.max_batch
            )));
        }

        progress.on_processing(0);
        progress.on_uploading(0);

        // Phase 1: render and compress, one image at a time.
        let prefix = entries.joined_values("_");
        let mut artifacts: Vec<CompositeArtifact> = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let frame = self.renderer.render(image, entries)?;
            let filename = format!("{prefix}_{}", image.original_name);
            artifacts.push(self.downscale.finish(frame, filename)?);
            progress.on_processing(percent(i + 1, images.len()));
        }

        // The entry snapshot becomes the archive metadata unless the target
        // already carries explicit field data.
        let mut target = target.clone();
        if target.field_data.is_empty() {
            target.field_data = entries.merged_map();
        }

        // Phase 2: transmit.
        let outcomes = match self.config.strategy {
            TransmitStrategy::PerItem => {
                let mut outcomes = Vec::with_capacity(artifacts.len());
                for (i, artifact) in artifacts.iter().enumerate() {
                    match transport.send(&target, artifact) {
                        Ok(outcome) => {
                            outcomes.push(outcome);
                            progress.on_uploading(percent(i + 1, artifacts.len()));
                        }
                        Err(e) => {
                            progress.on_processing(0);
                            progress.on_uploading(0);
                            return Err(e);
                        }
                    }
                }
                outcomes
            }
            TransmitStrategy::Batch => match transport.send_batch(&target, &artifacts) {
                Ok(outcomes) => {
                    progress.on_uploading(100);
                    outcomes
                }
                Err(e) => {
                    progress.on_processing(0);
                    progress.on_uploading(0);
                    return Err(e);
                }
            },
        };

        let ambiguous_warnings: Vec<String> = outcomes
            .iter()
            .filter_map(|o| match o {
                ArchiveOutcome::Ambiguous { warning } => Some(warning.clone()),
                ArchiveOutcome::Stored(_) => None,
            })
            .collect();

        // Bookkeeping only: archival already succeeded, so a history failure
        // is logged and swallowed.
        let record = HistoryRecord {
            form_name: target.form_name.clone(),
            site_name: target.field_value(SITE_FIELD).unwrap_or_default().to_string(),
            data: target.field_data.clone(),
            image_urls: outcomes
                .iter()
                .filter_map(|o| o.record().map(|r| r.file_url.clone()))
                .collect(),
            image_count: artifacts.len(),
            thumbnails: artifacts.iter().map(|a| a.thumbnail_jpeg.clone()).collect(),
        };
        let history_saved = match history.append(&record) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "history summary not persisted; batch still successful");
                false
            }
        };

        Ok(BatchReport {
            outcomes,
            ambiguous_warnings,
            history_saved,
        })
    }
}

fn percent(done: usize, total: usize) -> u8 {
    ((done * 100) / total.max(1)) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/upload/orchestrator.rs"]
mod tests;
