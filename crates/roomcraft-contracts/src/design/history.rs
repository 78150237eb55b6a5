use super::image::EncodedImage;

/// One generated image in a session's history.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedVersion {
    pub version_id: String,
    pub image: EncodedImage,
    pub prompt: String,
    /// Version the request was chained from; `None` when generated from the upload.
    pub parent_version_id: Option<String>,
    pub request_id: u64,
    pub created_at: String,
}

/// Linear undo/redo list of generated images with a movable cursor.
///
/// Appending while the cursor is behind the tail drops the redo branch first.
/// `revert` and `redo` only move the cursor; `len` changes through `append`
/// and `reset` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionHistory<T> {
    entries: Vec<T>,
    cursor: Option<usize>,
    issued: u64,
}

impl<T> Default for VersionHistory<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            issued: 0,
        }
    }
}

impl<T> VersionHistory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: T) -> usize {
        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }
        self.entries.push(entry);
        self.issued += 1;
        let tail = self.entries.len() - 1;
        self.cursor = Some(tail);
        tail
    }

    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|idx| self.entries.get(idx))
    }

    /// Moves the cursor one step back. Returns whether it moved.
    pub fn revert(&mut self) -> bool {
        match self.cursor {
            Some(idx) if idx > 0 => {
                self.cursor = Some(idx - 1);
                true
            }
            _ => false,
        }
    }

    /// Moves the cursor one step forward. Returns whether it moved.
    pub fn redo(&mut self) -> bool {
        match self.cursor {
            Some(idx) if idx + 1 < self.entries.len() => {
                self.cursor = Some(idx + 1);
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Cursor index, or `-1` when empty.
    pub fn cursor(&self) -> i64 {
        self.cursor.map(|idx| idx as i64).unwrap_or(-1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_revert(&self) -> bool {
        matches!(self.cursor, Some(idx) if idx > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(idx) if idx + 1 < self.entries.len())
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Total appends since creation; survives truncation and reset so ids stay unique.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl VersionHistory<GeneratedVersion> {
    pub fn next_version_id(&self) -> String {
        format!("v{}", self.issued + 1)
    }

    pub fn current_image(&self) -> Option<&EncodedImage> {
        self.current().map(|version| &version.image)
    }
}
