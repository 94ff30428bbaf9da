//! Efficient file information for location lookups

use crate::types::Location;
use serde::{Deserialize, Serialize};

/// Line-break index over a file's content
///
/// Stores the byte offset of every `\n` so that byte offsets can be turned
/// into (row, column) pairs with a binary search instead of a rescan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInformation {
    /// Byte offsets of each newline character in the file
    line_breaks: Vec<usize>,

    /// Total length of the file in bytes
    total_length: usize,
}

impl FileInformation {
    /// Create file information by analyzing content
    ///
    /// # Example
    ///
    /// ```
    /// use xdt_source_map::FileInformation;
    ///
    /// let info = FileInformation::new("line 1\nline 2\nline 3");
    /// assert_eq!(info.line_count(), 3);
    /// ```
    pub fn new(content: &str) -> Self {
        let line_breaks: Vec<usize> = content
            .char_indices()
            .filter_map(|(idx, ch)| if ch == '\n' { Some(idx) } else { None })
            .collect();

        FileInformation {
            line_breaks,
            total_length: content.len(),
        }
    }

    /// Byte offset at which `row` (0-indexed) begins.
    pub fn line_start(&self, row: usize) -> Option<usize> {
        if row == 0 {
            Some(0)
        } else {
            self.line_breaks.get(row - 1).map(|pos| pos + 1)
        }
    }

    /// Row (0-indexed) containing `offset`.
    ///
    /// A newline belongs to the line it terminates.
    pub fn row_of(&self, offset: usize) -> usize {
        match self.line_breaks.binary_search(&offset) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    /// Convert a byte offset to a Location with row and column
    ///
    /// Columns are counted in characters, so `content` must be the same text
    /// this index was built from. Returns None if the offset is out of bounds
    /// or does not fall on a character boundary.
    ///
    /// # Example
    ///
    /// ```
    /// use xdt_source_map::FileInformation;
    ///
    /// let content = "hello\nwörld";
    /// let info = FileInformation::new(content);
    /// let loc = info.offset_to_location(9, content).unwrap();
    /// assert_eq!(loc.row, 1);
    /// assert_eq!(loc.column, 2);
    /// ```
    pub fn offset_to_location(&self, offset: usize, content: &str) -> Option<Location> {
        if offset > self.total_length || !content.is_char_boundary(offset) {
            return None;
        }

        let row = self.row_of(offset);
        let line_start = self.line_start(row)?;
        let column = content.get(line_start..offset)?.chars().count();

        Some(Location {
            offset,
            row,
            column,
        })
    }

    /// Get the total length of the file in bytes
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Get the number of lines in the file
    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file() {
        let info = FileInformation::new("");
        assert_eq!(info.total_length(), 0);
        assert_eq!(info.line_count(), 1);

        let loc = info.offset_to_location(0, "").unwrap();
        assert_eq!(loc.row, 0);
        assert_eq!(loc.column, 0);
    }

    #[test]
    fn test_multiple_lines() {
        let content = "line 1\nline 2\nline 3";
        let info = FileInformation::new(content);
        assert_eq!(info.line_count(), 3);

        // At first newline (offset 6 is '\n')
        let loc = info.offset_to_location(6, content).unwrap();
        assert_eq!(loc.row, 0);
        assert_eq!(loc.column, 6);

        // Start of second line
        let loc = info.offset_to_location(7, content).unwrap();
        assert_eq!(loc.row, 1);
        assert_eq!(loc.column, 0);

        // End of file
        let loc = info.offset_to_location(20, content).unwrap();
        assert_eq!(loc.row, 2);
        assert_eq!(loc.column, 6);
    }

    #[test]
    fn test_columns_count_characters() {
        // "café" is 5 bytes but 4 characters
        let content = "café=1";
        let info = FileInformation::new(content);
        let loc = info.offset_to_location(5, content).unwrap();
        assert_eq!(loc.column, 4);
    }

    #[test]
    fn test_offset_inside_multibyte_char() {
        let content = "é";
        let info = FileInformation::new(content);
        assert!(info.offset_to_location(1, content).is_none());
    }

    #[test]
    fn test_out_of_bounds() {
        let info = FileInformation::new("hello");
        assert!(info.offset_to_location(100, "hello").is_none());
    }

    #[test]
    fn test_line_start() {
        let info = FileInformation::new("a\n\nbc\n");
        assert_eq!(info.line_start(0), Some(0));
        assert_eq!(info.line_start(1), Some(2));
        assert_eq!(info.line_start(2), Some(3));
        assert_eq!(info.line_start(3), Some(6));
        assert_eq!(info.line_start(4), None);
    }
}
