//! Source information attached to nodes and diagnostics

use crate::types::{FileId, Location, Range};
use serde::{Deserialize, Serialize};

/// A range of text in a specific source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// The file the range belongs to
    pub file_id: FileId,
    /// The range in that file
    pub range: Range,
}

impl Default for SourceInfo {
    fn default() -> Self {
        SourceInfo::point(FileId(0), Location::default())
    }
}

impl SourceInfo {
    /// Create source info for a range in an original file
    pub fn original(file_id: FileId, range: Range) -> Self {
        SourceInfo { file_id, range }
    }

    /// Create source info covering a single location
    pub fn point(file_id: FileId, location: Location) -> Self {
        SourceInfo {
            file_id,
            range: Range {
                start: location,
                end: location,
            },
        }
    }

    /// Create source info spanning `len` bytes (and characters) on one line
    /// starting at `start`.
    pub fn span(file_id: FileId, start: Location, len: usize) -> Self {
        SourceInfo {
            file_id,
            range: Range {
                start,
                end: Location {
                    offset: start.offset + len,
                    row: start.row,
                    column: start.column + len,
                },
            },
        }
    }

    /// Byte offset where this range starts.
    pub fn start_offset(&self) -> usize {
        self.range.start.offset
    }

    /// Byte offset where this range ends.
    pub fn end_offset(&self) -> usize {
        self.range.end.offset
    }

    /// Length of the range in bytes.
    pub fn length(&self) -> usize {
        self.range.end.offset.saturating_sub(self.range.start.offset)
    }
}
