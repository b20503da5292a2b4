use crate::foundation::error::{StampError, StampResult};
use crate::foundation::math::Fnv1a64;

/// One field/value pair captured from a form.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Entry {
    /// Field label as defined by the form.
    pub field: String,
    /// Value captured for this submission.
    pub value: String,
}

impl Entry {
    /// Build an entry from a field label and value.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Ordered field/value pairs for one submission.
///
/// Order is the form's field order and is preserved everywhere downstream:
/// overlay table rows, sheet header creation, and the derived filename all
/// follow it. Field uniqueness is expected but not enforced.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EntryList {
    entries: Vec<Entry>,
}

impl EntryList {
    /// Build a list from already-populated entries.
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Seed a fresh list from a form's ordered field names.
    ///
    /// Values start blank except date-like fields, which are auto-filled with
    /// today's date as `YYYY-MM-DD`.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let entries = fields
            .iter()
            .map(|f| {
                let field = f.as_ref().to_string();
                let value = if is_date_field(&field) {
                    today.clone()
                } else {
                    String::new()
                };
                Entry { field, value }
            })
            .collect();
        Self { entries }
    }

    /// Ordered entries.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the list holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set the value of the first entry with the given field label.
    ///
    /// Returns `false` when no such field exists.
    pub fn set_value(&mut self, field: &str, value: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.field == field) {
            Some(e) => {
                e.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Value of the first entry with the given field label, if any.
    pub fn value_of(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.value.as_str())
    }

    /// Reject empty lists and blank values before any render or network work.
    pub fn validate(&self) -> StampResult<()> {
        if self.entries.is_empty() {
            return Err(StampError::validation("entry list must be non-empty"));
        }
        for e in &self.entries {
            if e.value.trim().is_empty() {
                return Err(StampError::validation(format!(
                    "field '{}' has no value",
                    e.field
                )));
            }
        }
        Ok(())
    }

    /// Cache key over the exact ordered (field, value) pairs.
    ///
    /// Lists with identical content hash identically, so repeated renders
    /// within a multi-photo batch reuse the same overlay raster.
    pub fn cache_key(&self) -> u64 {
        let mut hasher = Fnv1a64::new_default();
        for e in &self.entries {
            hasher.write_bytes(e.field.as_bytes());
            hasher.write_u8(0);
            hasher.write_bytes(e.value.as_bytes());
            hasher.write_u8(0);
        }
        hasher.finish()
    }

    /// Ordered field/value pairs for archive metadata.
    pub fn merged_map(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.field.clone(), e.value.clone()))
            .collect()
    }

    /// Non-empty values joined with `sep`, in entry order.
    pub fn joined_values(&self, sep: &str) -> String {
        self.entries
            .iter()
            .filter(|e| !e.value.trim().is_empty())
            .map(|e| e.value.as_str())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

fn is_date_field(name: &str) -> bool {
    let name = name.trim();
    name == "일자" || name.eq_ignore_ascii_case("date")
}

/// Quarter-turn rotation applied to a source photo before compositing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90° clockwise.
    Cw90,
    /// 180°.
    Cw180,
    /// 270° clockwise.
    Cw270,
}

impl Rotation {
    /// Parse from degrees; only {0, 90, 180, 270} are accepted.
    pub fn from_degrees(degrees: u32) -> StampResult<Self> {
        match degrees {
            0 => Ok(Self::None),
            90 => Ok(Self::Cw90),
            180 => Ok(Self::Cw180),
            270 => Ok(Self::Cw270),
            other => Err(StampError::validation(format!(
                "rotation must be one of 0/90/180/270, got {other}"
            ))),
        }
    }

    /// Rotation in degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }

    /// Rotation in radians.
    pub fn radians(self) -> f64 {
        f64::from(self.degrees()).to_radians()
    }

    /// `true` when the drawn region's width/height must be swapped (90°/270°).
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Cw90 | Self::Cw270)
    }
}

/// An undecoded source photo selected for one submission.
#[derive(Clone, Debug)]
pub struct SourceImage {
    /// Encoded image bytes (any format the decoder understands).
    pub bytes: Vec<u8>,
    /// Quarter-turn rotation to apply when compositing.
    pub rotation: Rotation,
    /// Original filename, kept as the tail of the derived artifact name.
    pub original_name: String,
}

impl SourceImage {
    /// Build a source image with no rotation.
    pub fn new(bytes: Vec<u8>, original_name: impl Into<String>) -> Self {
        Self {
            bytes,
            rotation: Rotation::None,
            original_name: original_name.into(),
        }
    }
}

/// A rendered photo with the burned-in metadata table, ready for transmission.
#[derive(Clone, Debug)]
pub struct CompositeArtifact {
    /// Full-size composite, JPEG-encoded.
    pub jpeg: Vec<u8>,
    /// Square thumbnail derived from the same composite, JPEG-encoded.
    pub thumbnail_jpeg: Vec<u8>,
    /// Derived filename (joined entry values + original name).
    pub filename: String,
    /// Width of the full-size composite in pixels.
    pub width: u32,
    /// Height of the full-size composite in pixels.
    pub height: u32,
}

/// Where and under which metadata a batch is archived.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArchiveTarget {
    /// Tenant-specific remote endpoint address.
    pub endpoint: String,
    /// Form name; also keys the per-form sheet.
    pub form_name: String,
    /// Ordered field names defining the storage path. Empty means the
    /// two-level default (form name, then site).
    pub folder_structure: Vec<String>,
    /// Ordered field/value metadata. When left empty the orchestrator fills it
    /// from the entry snapshot at transmit time.
    pub field_data: Vec<(String, String)>,
}

impl ArchiveTarget {
    /// Value of a metadata field by name, if present.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.field_data
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/entry/model.rs"]
mod tests;
