use crate::archive::store::{ArchiveStore, CellValue, FolderId};
use crate::foundation::error::{StampError, StampResult};

/// Header column holding the append timestamp (fixed prefix).
pub const HEADER_TIMESTAMP: &str = "작성일시";
/// Header column holding the stored filename (fixed suffix).
pub const HEADER_FILENAME: &str = "파일명";
/// Header column holding the artifact link (fixed suffix).
pub const HEADER_LINK: &str = "사진링크";
/// Header column holding the resolved folder path (fixed suffix).
pub const HEADER_FOLDER_PATH: &str = "폴더경로";
/// Site-like field consulted by the default two-level folder layout.
pub const SITE_FIELD: &str = "현장명";
/// Sentinel used when a path segment resolves to nothing usable.
pub const UNSET_SEGMENT: &str = "미지정";

/// One artifact plus the metadata under which it is archived.
#[derive(Clone, Debug)]
pub struct ArchiveRequest {
    /// Form name; keys the per-form sheet.
    pub form_name: String,
    /// Ordered field names defining the storage path; empty selects the
    /// two-level default (form name, then site).
    pub folder_structure: Vec<String>,
    /// Ordered field/value metadata.
    pub field_data: Vec<(String, String)>,
    /// Requested filename (may be adjusted to avoid collisions).
    pub filename: String,
    /// Artifact bytes.
    pub payload: Vec<u8>,
}

impl ArchiveRequest {
    fn field_value(&self, name: &str) -> Option<&str> {
        self.field_data
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Stable reference to an archived artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRecord {
    /// User-facing location of the stored binary.
    pub file_url: String,
    /// Name the binary ended up stored under.
    pub saved_filename: String,
    /// Slash-joined folder path from the root.
    pub folder_path: String,
    /// Sheet the record row was appended to.
    pub sheet_name: String,
    /// 1-based position of the appended row among data rows.
    pub row_number: usize,
}

/// Result of one archive write.
///
/// Rate-limited responses from an unreliable backing store most likely
/// succeeded despite the error-shaped reply, so they surface as a distinct
/// `Ambiguous` variant instead of a hard failure or a fake success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The write completed and returned a stable reference.
    Stored(StoredRecord),
    /// The store answered with a rate-limit-shaped error; the write probably
    /// landed. Carries manual-verification guidance.
    Ambiguous {
        /// Human-readable warning with verification guidance.
        warning: String,
    },
}

impl ArchiveOutcome {
    /// The stored record, when the write completed unambiguously.
    pub fn record(&self) -> Option<&StoredRecord> {
        match self {
            Self::Stored(r) => Some(r),
            Self::Ambiguous { .. } => None,
        }
    }
}

/// Idempotently places one artifact in a hierarchical store and appends a row
/// to the per-form sheet, returning a stable reference.
#[derive(Clone, Debug)]
pub struct ArchiveWriter {
    root_name: String,
}

impl ArchiveWriter {
    /// Writer anchored at the named root folder (created once on first use).
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
        }
    }

    /// Name of the fixed root folder.
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Archive one artifact: resolve its folder, store the binary under a
    /// collision-free name, and append the sheet row.
    #[tracing::instrument(skip(self, store, req), fields(form = %req.form_name, file = %req.filename))]
    pub fn write<S: ArchiveStore + ?Sized>(
        &self,
        store: &mut S,
        req: &ArchiveRequest,
    ) -> StampResult<ArchiveOutcome> {
        let folder = self.resolve_folder(store, req)?;
        let folder_path = store.folder_path(&folder)?;
        let saved_name = unique_filename(store, &folder, &req.filename)?;

        let stored = match store.store_file(&folder, &saved_name, &req.payload) {
            Ok(stored) => stored,
            Err(e) => return ambiguous_or(e),
        };

        let row_number = match self.append_record(store, req, &stored.url, &saved_name, &folder_path)
        {
            Ok(n) => n,
            Err(e) => return ambiguous_or(e),
        };

        Ok(ArchiveOutcome::Stored(StoredRecord {
            file_url: stored.url,
            saved_filename: saved_name,
            folder_path,
            sheet_name: req.form_name.clone(),
            row_number,
        }))
    }

    /// Walk (and create as needed) the folder path for `req`, returning the
    /// terminal folder. Idempotent under serialized calls.
    pub fn resolve_folder<S: ArchiveStore + ?Sized>(
        &self,
        store: &mut S,
        req: &ArchiveRequest,
    ) -> StampResult<FolderId> {
        let mut current = store.ensure_root(&self.root_name)?;
        for segment in self.path_segments(req) {
            current = store.ensure_child(&current, &segment)?;
        }
        Ok(current)
    }

    fn path_segments(&self, req: &ArchiveRequest) -> Vec<String> {
        if req.folder_structure.is_empty() {
            // Fixed two-level default: form name, then the site-like field.
            let site = req
                .field_value(SITE_FIELD)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(UNSET_SEGMENT);
            return vec![
                sanitize_segment(&req.form_name),
                sanitize_segment(site),
            ];
        }
        req.folder_structure
            .iter()
            .map(|field| {
                let value = req
                    .field_value(field)
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or(field);
                sanitize_segment(value)
            })
            .collect()
    }

    fn append_record<S: ArchiveStore + ?Sized>(
        &self,
        store: &mut S,
        req: &ArchiveRequest,
        file_url: &str,
        saved_name: &str,
        folder_path: &str,
    ) -> StampResult<usize> {
        let sheet = req.form_name.as_str();
        if !store.sheet_exists(sheet)? {
            let mut header = vec![HEADER_TIMESTAMP.to_string()];
            header.extend(req.field_data.iter().map(|(k, _)| k.clone()));
            header.extend([
                HEADER_FILENAME.to_string(),
                HEADER_LINK.to_string(),
                HEADER_FOLDER_PATH.to_string(),
            ]);
            store.create_sheet(sheet, &header)?;
        }

        // The existing header is authoritative: fields it never saw are
        // dropped, columns it has that the metadata lacks stay blank.
        let header = store.sheet_header(sheet)?;
        for (k, _) in &req.field_data {
            if !header.iter().any(|h| h == k) {
                tracing::debug!(field = %k, sheet, "field absent from frozen header, dropped");
            }
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let row: Vec<CellValue> = header
            .iter()
            .map(|col| match col.as_str() {
                HEADER_TIMESTAMP => CellValue::Text(timestamp.clone()),
                HEADER_FILENAME => CellValue::Text(saved_name.to_string()),
                HEADER_LINK => CellValue::Link {
                    url: file_url.to_string(),
                    label: saved_name.to_string(),
                },
                HEADER_FOLDER_PATH => CellValue::Text(folder_path.to_string()),
                other => CellValue::Text(
                    req.field_value(other).unwrap_or_default().to_string(),
                ),
            })
            .collect();

        store.append_row(sheet, &row)
    }
}

/// Strip path-unsafe and control characters from a folder path segment.
///
/// A segment that sanitizes to nothing becomes the unset sentinel so the
/// resolved path keeps its configured length.
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        UNSET_SEGMENT.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Find a collision-free name in `folder` by appending `_1`, `_2`, ... before
/// the extension until the name is unused.
pub fn unique_filename<S: ArchiveStore + ?Sized>(
    store: &S,
    folder: &FolderId,
    requested: &str,
) -> StampResult<String> {
    if !store.has_file(folder, requested)? {
        return Ok(requested.to_string());
    }
    let (stem, ext) = match requested.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
        _ => (requested.to_string(), String::new()),
    };
    for n in 1u32.. {
        let candidate = format!("{stem}_{n}{ext}");
        if !store.has_file(folder, &candidate)? {
            return Ok(candidate);
        }
    }
    unreachable!("suffix search is unbounded")
}

/// `true` when a store error message looks like a rate-limit response.
pub(crate) fn looks_rate_limited(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("rate-limit")
        || msg.contains("too many request")
        || msg.contains("quota")
}

fn ambiguous_or(e: StampError) -> StampResult<ArchiveOutcome> {
    let msg = e.to_string();
    if looks_rate_limited(&msg) {
        tracing::warn!(error = %msg, "rate-limited store response treated as probable success");
        return Ok(ArchiveOutcome::Ambiguous {
            warning: format!(
                "the store answered rate-limited ({msg}); the write most likely succeeded — \
                 verify the archived file and sheet row manually before retrying"
            ),
        });
    }
    Err(e)
}

#[cfg(test)]
#[path = "../../tests/unit/archive/writer.rs"]
mod tests;
