//! Fieldstamp captures structured field/value data from a worker-facing form,
//! stamps it as a rendered table onto photographs, and archives the results
//! into a hierarchical document store plus a per-form tabular record store.
//!
//! # Pipeline overview
//!
//! 1. **Capture**: an [`EntryList`] snapshots the form's ordered field/value pairs.
//! 2. **Render**: [`CompositeRenderer`] stretches each photo edge-to-edge onto a
//!    fixed canvas and composites a cached overlay table bottom-left.
//! 3. **Bound**: [`DownscalePipeline`] caps the long edge and derives a square
//!    thumbnail from the same composite.
//! 4. **Transmit**: [`UploadOrchestrator`] drives the batch sequentially through
//!    render → compress → transmit with dual progress tracking.
//! 5. **Archive**: [`ArchiveWriter`] resolves the folder path, avoids filename
//!    collisions, and reconciles the frozen sheet header — in-process against an
//!    [`ArchiveStore`], or remotely via [`RemoteArchiveClient`].
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Strictly sequential**: a single caller drives the batch; rendering and
//!   transmission are never parallelized, so progress is monotonic and at most
//!   one decoded bitmap is resident at a time.
//! - **At-least-once, no rollback**: a mid-batch transmission failure leaves
//!   already-archived artifacts in place; nothing is deleted to compensate.
//! - **Deterministic overlays**: identical entry lists reuse a cached raster,
//!   byte for byte.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod archive;
mod entry;
mod foundation;
mod normalize;
mod render;
mod upload;

pub use archive::remote::{RemoteArchiveClient, UploadPayload, UploadResponse};
pub use archive::store::{ArchiveStore, CellValue, FolderId, MemoryArchive, StoredFile};
pub use archive::writer::{
    ArchiveOutcome, ArchiveRequest, ArchiveWriter, HEADER_FILENAME, HEADER_FOLDER_PATH,
    HEADER_LINK, HEADER_TIMESTAMP, SITE_FIELD, StoredRecord, UNSET_SEGMENT, sanitize_segment,
    unique_filename,
};
pub use entry::model::{
    ArchiveTarget, CompositeArtifact, Entry, EntryList, Rotation, SourceImage,
};
pub use foundation::error::{StampError, StampResult};
pub use normalize::keymap::{KeyMap, KeyMapEntry, KeyNormalizer};
pub use render::composite::{CompositeRenderer, FrameRgba, RenderConfig};
pub use render::downscale::{
    DownscaleConfig, DownscalePipeline, bound_long_edge, square_thumbnail,
};
pub use render::overlay::TableLayout;
pub use render::text::{TextBrushRgba8, TextLayoutEngine};
pub use upload::orchestrator::{
    BatchReport, HistoryRecord, HistoryStore, MemoryHistory, NoProgress, ProgressObserver,
    TransmitStrategy, UploadConfig, UploadOrchestrator,
};
pub use upload::transport::{HttpTransport, StoreTransport, Transport};
