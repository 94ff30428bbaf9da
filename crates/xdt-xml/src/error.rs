//! Error types for loading and saving XML documents.

use thiserror::Error;
use xdt_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use xdt_source_map::{FileId, Location, SourceInfo};

/// Result type alias for xdt-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or saving a document.
///
/// All of these are fatal for the document involved: no partial document is
/// ever returned.
#[derive(Debug, Error)]
pub enum Error {
    /// The text is not well-formed XML.
    #[error("malformed XML at {line}:{column}: {message}")]
    MalformedXml {
        /// 1-based line of the reader position when parsing failed.
        line: usize,
        /// 1-based column of the reader position when parsing failed.
        column: usize,
        /// Byte offset of the reader position in the document text.
        offset: usize,
        message: String,
    },

    /// The text contains no root element.
    #[error("empty XML document: no root element found")]
    EmptyDocument,

    /// A second top-level element was found.
    #[error("invalid XML: multiple root elements (second root at {line}:{column})")]
    MultipleRoots {
        line: usize,
        column: usize,
        offset: usize,
    },

    /// Reading or writing a document failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Convert this error to a DiagnosticMessage with the appropriate X-1-* error code.
    ///
    /// `file_id` names the document the error belongs to, so that a
    /// [`SourceContext`](xdt_source_map::SourceContext) can render a snippet.
    pub fn to_diagnostic(&self, file_id: Option<FileId>) -> DiagnosticMessage {
        let point = |offset: usize, line: usize, column: usize| {
            file_id.map(|id| {
                SourceInfo::point(
                    id,
                    Location {
                        offset,
                        row: line.saturating_sub(1),
                        column: column.saturating_sub(1),
                    },
                )
            })
        };

        match self {
            Error::MalformedXml {
                line,
                column,
                offset,
                message,
            } => {
                let mut builder = DiagnosticMessageBuilder::error("Malformed XML")
                    .with_code("X-1-1")
                    .problem(message.clone())
                    .add_info(format!("The reader stopped at line {}, column {}", line, column));

                if let Some(loc) = point(*offset, *line, *column) {
                    builder = builder.with_location(loc);
                }

                builder.build()
            }

            Error::EmptyDocument => DiagnosticMessageBuilder::error("Empty XML Document")
                .with_code("X-1-2")
                .problem("The XML document contains no root element")
                .add_hint("Is the file empty or truncated?")
                .build(),

            Error::MultipleRoots {
                line,
                column,
                offset,
            } => {
                let mut builder = DiagnosticMessageBuilder::error("Malformed XML")
                    .with_code("X-1-1")
                    .problem("An XML document must have exactly one root element")
                    .add_detail(format!("A second root element starts at {}:{}", line, column))
                    .add_hint("Wrap the elements in a single root element?");

                if let Some(loc) = point(*offset, *line, *column) {
                    builder = builder.with_location(loc);
                }

                builder.build()
            }

            Error::Io { path, source } => DiagnosticMessageBuilder::error("I/O Error")
                .with_code("X-1-3")
                .problem(format!("Could not access `{}`", path))
                .add_detail(source.to_string())
                .build(),
        }
    }
}
