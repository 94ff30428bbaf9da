//! Source context for managing files

use crate::file_info::FileInformation;
use crate::types::{FileId, Location};
use serde::{Deserialize, Serialize};

/// Context for managing source files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContext {
    files: Vec<SourceFile>,
}

/// A source file with content and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// File path or identifier
    pub path: String,
    /// File content (for ephemeral/in-memory files)
    /// When Some, content is stored in memory (e.g., for test files or stdin)
    /// When None, content should be read from disk using the path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// File information for efficient location lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInformation>,
}

impl SourceContext {
    /// Create a new empty source context
    pub fn new() -> Self {
        SourceContext { files: Vec::new() }
    }

    /// Add a file to the context and return its ID
    ///
    /// - If content is Some: Creates an ephemeral (in-memory) file.
    /// - If content is None: Creates a disk-backed file whose content is
    ///   read from disk when needed.
    pub fn add_file(&mut self, path: String, content: Option<String>) -> FileId {
        let id = FileId(self.files.len());

        let file_info = match &content {
            Some(c) => Some(FileInformation::new(c)),
            None => std::fs::read_to_string(&path)
                .ok()
                .map(|c| FileInformation::new(&c)),
        };

        self.files.push(SourceFile {
            path,
            content,
            file_info,
        });
        id
    }

    /// Get a file by ID
    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Path registered for a file, if any.
    pub fn path(&self, id: FileId) -> Option<&str> {
        self.get_file(id).map(|f| f.path.as_str())
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files have been registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolve a byte offset in a registered file to a location.
    pub fn locate(&self, id: FileId, offset: usize) -> Option<Location> {
        let file = self.get_file(id)?;
        let info = file.file_info.as_ref()?;
        let content = file.read_content()?;
        info.offset_to_location(offset, &content)
    }
}

impl SourceFile {
    /// The file's content, from memory or from disk.
    pub fn read_content(&self) -> Option<String> {
        match &self.content {
            Some(c) => Some(c.clone()),
            None => std::fs::read_to_string(&self.path).ok(),
        }
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        let ctx = SourceContext::new();
        assert!(ctx.get_file(FileId(0)).is_none());
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_add_and_get_file() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_file("web.config".to_string(), Some("<a/>".to_string()));

        assert_eq!(id, FileId(0));
        let file = ctx.get_file(id).unwrap();
        assert_eq!(file.path, "web.config");
        assert_eq!(file.file_info.as_ref().unwrap().total_length(), 4);
    }

    #[test]
    fn test_multiple_files() {
        let mut ctx = SourceContext::new();
        let id1 = ctx.add_file("web.config".to_string(), Some("<a/>".to_string()));
        let id2 = ctx.add_file("web.release.config".to_string(), Some("<b/>".to_string()));

        assert_eq!(id1, FileId(0));
        assert_eq!(id2, FileId(1));
        assert_eq!(ctx.path(id2), Some("web.release.config"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_file_without_content() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_file("does-not-exist.config".to_string(), None);

        let file = ctx.get_file(id).unwrap();
        assert!(file.file_info.is_none());
        assert!(ctx.locate(id, 0).is_none());
    }

    #[test]
    fn test_locate() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_file("t.xml".to_string(), Some("<a>\n  <b/>\n</a>".to_string()));
        let loc = ctx.locate(id, 6).unwrap();
        assert_eq!(loc.row, 1);
        assert_eq!(loc.column, 2);
    }

    #[test]
    fn test_serialization() {
        let mut ctx = SourceContext::new();
        ctx.add_file("test.xml".to_string(), Some("<test/>".to_string()));

        let json = serde_json::to_string(&ctx).unwrap();
        let deserialized: SourceContext = serde_json::from_str(&json).unwrap();

        let file = deserialized.get_file(FileId(0)).unwrap();
        assert_eq!(file.path, "test.xml");
        assert_eq!(file.file_info.as_ref().unwrap().total_length(), 7);
    }
}
