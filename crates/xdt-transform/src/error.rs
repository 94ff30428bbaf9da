//! Error types for the transform engine.
//!
//! [`Error`] is fatal: the transform document could not be loaded or the
//! options could not be read. [`TransformError`] is never fatal; the
//! orchestrator turns each one into a diagnostic and moves on.

use thiserror::Error;
use xdt_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use xdt_source_map::SourceInfo;
use xdt_xml::XPathError;

/// Result type alias for fatal transform errors.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The transform document could not be loaded.
    #[error(transparent)]
    Xml(#[from] xdt_xml::Error),

    /// An options file could not be read.
    #[error("could not read options from {path}: {source}")]
    OptionsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An options file is not valid TOML for [`TransformOptions`](crate::TransformOptions).
    #[error("invalid options in {path}: {source}")]
    InvalidOptions {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    pub fn to_diagnostic(&self, file_id: Option<xdt_source_map::FileId>) -> DiagnosticMessage {
        match self {
            Error::Xml(err) => err.to_diagnostic(file_id),
            Error::OptionsIo { path, source } => DiagnosticMessageBuilder::error("I/O Error")
                .with_code("X-1-3")
                .problem(format!("Could not read options file `{}`", path))
                .add_detail(source.to_string())
                .build(),
            Error::InvalidOptions { path, source } => {
                DiagnosticMessageBuilder::error("Invalid Options")
                    .with_code("X-0-1")
                    .problem(format!("`{}` is not a valid options file", path))
                    .add_detail(source.to_string())
                    .add_hint("Known keys are `indent_inserted`, `strip_directive_attributes` and `warn_on_unmatched`")
                    .build()
            }
        }
    }
}

/// A problem found while applying one directive.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("unrecognized transform: {name}")]
    UnrecognizedTransform { name: String },

    #[error("unrecognized locator: {name}")]
    UnrecognizedLocator { name: String },

    #[error("invalid arguments for {operation}: {message}")]
    ArgumentError { operation: String, message: String },

    /// A named argument matched nothing on the transform element.
    #[error("argument '{argument}' of {operation} did not match any attribute")]
    UnmatchedArgument { operation: String, argument: String },

    #[error("no node matched the given locator: {target}")]
    NoMatch { target: String },

    #[error("invalid XPath expression '{expression}': {source}")]
    Expression {
        expression: String,
        #[source]
        source: XPathError,
    },

    #[error("RemoveAll found nothing to remove at {target}")]
    NothingToRemove { target: String },

    #[error("no element in the source document matches '{path}'")]
    UnmatchedDescent { path: String },

    /// Cloning the template back out of its serialized form failed.
    #[error("could not clone the transform element: {message}")]
    MalformedClone { message: String },

    #[error("{0}")]
    Failed(String),
}

impl TransformError {
    /// Warnings are reported but leave the transform successful.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            TransformError::UnmatchedArgument { .. }
                | TransformError::NothingToRemove { .. }
                | TransformError::UnmatchedDescent { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            TransformError::UnrecognizedTransform { .. } => "X-2-1",
            TransformError::UnrecognizedLocator { .. } => "X-2-2",
            TransformError::ArgumentError { .. } | TransformError::UnmatchedArgument { .. } => {
                "X-2-3"
            }
            TransformError::NoMatch { .. } => "X-3-1",
            TransformError::Expression { .. } => "X-3-2",
            TransformError::NothingToRemove { .. } => "X-3-3",
            TransformError::UnmatchedDescent { .. } => "X-3-4",
            TransformError::MalformedClone { .. } => "X-1-1",
            TransformError::Failed(_) => "X-4-1",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            TransformError::UnrecognizedTransform { .. } => "Unrecognized Transform",
            TransformError::UnrecognizedLocator { .. } => "Unrecognized Locator",
            TransformError::ArgumentError { .. } => "Invalid Directive Arguments",
            TransformError::UnmatchedArgument { .. } => "Unused Directive Argument",
            TransformError::NoMatch { .. } => "No Matching Node",
            TransformError::Expression { .. } => "Invalid XPath Expression",
            TransformError::NothingToRemove { .. } => "Nothing To Remove",
            TransformError::UnmatchedDescent { .. } => "No Matching Element",
            TransformError::MalformedClone { .. } => "Malformed XML",
            TransformError::Failed(_) => "Transform Failed",
        }
    }

    /// Convert to a coded diagnostic pointing at `location`.
    pub fn to_diagnostic(&self, location: Option<SourceInfo>) -> DiagnosticMessage {
        let mut builder = if self.is_warning() {
            DiagnosticMessageBuilder::warning(self.title())
        } else {
            DiagnosticMessageBuilder::error(self.title())
        }
        .with_code(self.code())
        .problem(self.to_string());

        builder = match self {
            TransformError::UnrecognizedTransform { .. } => builder.add_hint(
                "Known transforms are Insert, InsertBefore, InsertAfter, InsertIfMissing, \
                 PrependChild, Remove, RemoveAll, Replace, SetAttributes, RemoveAttributes and Combine",
            ),
            TransformError::UnrecognizedLocator { .. } => {
                builder.add_hint("Use `Match(...)`, `Condition(...)` or `XPath(...)`")
            }
            TransformError::Expression { source, .. } => builder.add_detail(source.to_string()),
            TransformError::NoMatch { .. } => {
                builder.add_hint("Does the locator select an element of the source document?")
            }
            TransformError::UnmatchedDescent { .. } => builder.add_note(
                "Directives below this element were skipped because it matched nothing",
            ),
            _ => builder,
        };

        if let Some(location) = location {
            builder = builder.with_location(location);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdt_error_reporting::DiagnosticKind;

    #[test]
    fn test_codes_and_severity() {
        let err = TransformError::UnrecognizedTransform {
            name: "Frobnicate".to_string(),
        };
        assert_eq!(err.code(), "X-2-1");
        assert!(!err.is_warning());
        assert_eq!(err.to_string(), "unrecognized transform: Frobnicate");

        let warning = TransformError::NothingToRemove {
            target: "/a/b".to_string(),
        };
        let diag = warning.to_diagnostic(None);
        assert_eq!(diag.kind, DiagnosticKind::Warning);
        assert_eq!(diag.code.as_deref(), Some("X-3-3"));
    }

    #[test]
    fn test_expression_diagnostic_carries_detail() {
        let err = TransformError::Expression {
            expression: "/a[".to_string(),
            source: XPathError::UnexpectedEnd {
                expected: "expression".to_string(),
            },
        };
        let text = err.to_diagnostic(None).to_text(None);
        assert!(text.contains("[X-3-2]"));
        assert!(text.contains("/a["));
        assert!(text.contains("unexpected end of expression"));
    }

    #[test]
    fn test_unmatched_descent_notes_skipped_directives() {
        let err = TransformError::UnmatchedDescent {
            path: "/configuration/appSettings".to_string(),
        };
        let diag = err.to_diagnostic(None);
        assert_eq!(diag.kind, DiagnosticKind::Warning);
        assert_eq!(diag.details.len(), 1);
        assert!(diag.to_text(None).contains("were skipped"));
    }

    #[test]
    fn test_xml_error_passes_through() {
        let err: Error = xdt_xml::Error::EmptyDocument.into();
        assert_eq!(err.to_diagnostic(None).code.as_deref(), Some("X-1-2"));
    }
}
