use std::collections::{BTreeMap, HashMap};

use crate::foundation::error::{StampError, StampResult};

/// Stable identifier for a folder in a hierarchical store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FolderId(pub String);

/// Handle to a stored binary returned by [`ArchiveStore::store_file`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    /// Stable user-facing location of the stored binary.
    pub url: String,
    /// Name the binary was stored under.
    pub name: String,
}

/// Cell content for tabular appends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellValue {
    /// Plain text cell.
    Text(String),
    /// User-facing hyperlink cell.
    Link {
        /// Link destination.
        url: String,
        /// Displayed label.
        label: String,
    },
}

impl CellValue {
    /// Displayed text of the cell (label for links).
    pub fn display(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Link { label, .. } => label,
        }
    }
}

/// Backing store for the archive writer: hierarchical folders holding binary
/// files, plus per-form sheets with frozen headers.
///
/// `ensure_*` operations are get-or-create and must be atomic with respect to
/// other calls through the same handle, which closes the check-then-create
/// race for serialized callers.
pub trait ArchiveStore {
    /// Get or create a top-level root folder by name.
    fn ensure_root(&mut self, name: &str) -> StampResult<FolderId>;

    /// Get or create a child folder by exact name under `parent`.
    fn ensure_child(&mut self, parent: &FolderId, name: &str) -> StampResult<FolderId>;

    /// `true` when `folder` already holds a file stored under `name`.
    fn has_file(&self, folder: &FolderId, name: &str) -> StampResult<bool>;

    /// Store a binary under `name` in `folder`. The name must be free.
    fn store_file(&mut self, folder: &FolderId, name: &str, bytes: &[u8])
    -> StampResult<StoredFile>;

    /// Slash-joined path of `folder` from its root.
    fn folder_path(&self, folder: &FolderId) -> StampResult<String>;

    /// `true` when a sheet with this name exists.
    fn sheet_exists(&self, sheet: &str) -> StampResult<bool>;

    /// Create a sheet with the given frozen header row.
    fn create_sheet(&mut self, sheet: &str, header: &[String]) -> StampResult<()>;

    /// The frozen header of an existing sheet.
    fn sheet_header(&self, sheet: &str) -> StampResult<Vec<String>>;

    /// Append a data row; returns its 1-based position among data rows.
    fn append_row(&mut self, sheet: &str, row: &[CellValue]) -> StampResult<usize>;
}

#[derive(Debug)]
struct FolderNode {
    name: String,
    parent: Option<FolderId>,
    children: HashMap<String, FolderId>,
    files: Vec<StoredFile>,
}

#[derive(Debug, Default)]
struct Sheet {
    header: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// In-memory [`ArchiveStore`], the reference model of the remote hierarchy
/// and the backing for local/offline archival and tests.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    folders: HashMap<FolderId, FolderNode>,
    roots: HashMap<String, FolderId>,
    sheets: BTreeMap<String, Sheet>,
    next_id: u64,
}

impl MemoryArchive {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> FolderId {
        let id = FolderId(format!("f{}", self.next_id));
        self.next_id += 1;
        id
    }

    fn node(&self, id: &FolderId) -> StampResult<&FolderNode> {
        self.folders
            .get(id)
            .ok_or_else(|| StampError::archive(format!("unknown folder id '{}'", id.0)))
    }

    /// Names of the files stored in `folder`, in store order.
    pub fn file_names(&self, folder: &FolderId) -> StampResult<Vec<String>> {
        Ok(self.node(folder)?.files.iter().map(|f| f.name.clone()).collect())
    }

    /// Header of a sheet, if it exists.
    pub fn header_of(&self, sheet: &str) -> Option<Vec<String>> {
        self.sheets.get(sheet).map(|s| s.header.clone())
    }

    /// Data rows of a sheet, if it exists.
    pub fn rows_of(&self, sheet: &str) -> Option<&[Vec<CellValue>]> {
        self.sheets.get(sheet).map(|s| s.rows.as_slice())
    }

    /// Resolve an existing child folder without creating it.
    pub fn find_child(&self, parent: &FolderId, name: &str) -> Option<FolderId> {
        self.folders
            .get(parent)
            .and_then(|n| n.children.get(name).cloned())
    }
}

impl ArchiveStore for MemoryArchive {
    fn ensure_root(&mut self, name: &str) -> StampResult<FolderId> {
        if let Some(id) = self.roots.get(name) {
            return Ok(id.clone());
        }
        let id = self.alloc_id();
        self.folders.insert(
            id.clone(),
            FolderNode {
                name: name.to_string(),
                parent: None,
                children: HashMap::new(),
                files: Vec::new(),
            },
        );
        self.roots.insert(name.to_string(), id.clone());
        Ok(id)
    }

    fn ensure_child(&mut self, parent: &FolderId, name: &str) -> StampResult<FolderId> {
        if let Some(id) = self.node(parent)?.children.get(name) {
            return Ok(id.clone());
        }
        let id = self.alloc_id();
        self.folders.insert(
            id.clone(),
            FolderNode {
                name: name.to_string(),
                parent: Some(parent.clone()),
                children: HashMap::new(),
                files: Vec::new(),
            },
        );
        let parent_node = self
            .folders
            .get_mut(parent)
            .ok_or_else(|| StampError::archive(format!("unknown folder id '{}'", parent.0)))?;
        parent_node.children.insert(name.to_string(), id.clone());
        Ok(id)
    }

    fn has_file(&self, folder: &FolderId, name: &str) -> StampResult<bool> {
        Ok(self.node(folder)?.files.iter().any(|f| f.name == name))
    }

    fn store_file(
        &mut self,
        folder: &FolderId,
        name: &str,
        bytes: &[u8],
    ) -> StampResult<StoredFile> {
        if self.has_file(folder, name)? {
            return Err(StampError::archive(format!(
                "file '{name}' already exists in folder"
            )));
        }
        let path = self.folder_path(folder)?;
        let stored = StoredFile {
            url: format!("mem://{path}/{name}?bytes={}", bytes.len()),
            name: name.to_string(),
        };
        let node = self
            .folders
            .get_mut(folder)
            .ok_or_else(|| StampError::archive(format!("unknown folder id '{}'", folder.0)))?;
        node.files.push(stored.clone());
        Ok(stored)
    }

    fn folder_path(&self, folder: &FolderId) -> StampResult<String> {
        let mut parts = Vec::new();
        let mut cursor = Some(folder.clone());
        while let Some(id) = cursor {
            let node = self.node(&id)?;
            parts.push(node.name.clone());
            cursor = node.parent.clone();
        }
        parts.reverse();
        Ok(parts.join("/"))
    }

    fn sheet_exists(&self, sheet: &str) -> StampResult<bool> {
        Ok(self.sheets.contains_key(sheet))
    }

    fn create_sheet(&mut self, sheet: &str, header: &[String]) -> StampResult<()> {
        if self.sheets.contains_key(sheet) {
            return Err(StampError::archive(format!("sheet '{sheet}' already exists")));
        }
        self.sheets.insert(
            sheet.to_string(),
            Sheet {
                header: header.to_vec(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn sheet_header(&self, sheet: &str) -> StampResult<Vec<String>> {
        self.sheets
            .get(sheet)
            .map(|s| s.header.clone())
            .ok_or_else(|| StampError::archive(format!("unknown sheet '{sheet}'")))
    }

    fn append_row(&mut self, sheet: &str, row: &[CellValue]) -> StampResult<usize> {
        let sheet = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| StampError::archive("cannot append to a missing sheet"))?;
        sheet.rows.push(row.to_vec());
        Ok(sheet.rows.len())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/archive/store.rs"]
mod tests;
