//! Error reporting and diagnostic messages for xdt.
//!
//! Diagnostics follow a tidyverse-like structure: a short title, an optional
//! problem statement, detail bullets and hints. Each diagnostic may carry an
//! error code (`X-<subsystem>-<number>`) that is looked up in the embedded
//! catalog, and a [`SourceInfo`](xdt_source_map::SourceInfo) pointing into
//! either the source or the transform document.
//!
//! # Example
//!
//! ```
//! use xdt_error_reporting::{DiagnosticKind, DiagnosticMessageBuilder};
//!
//! let error = DiagnosticMessageBuilder::error("Unrecognized transform")
//!     .with_code("X-2-1")
//!     .problem("unrecognized transform: Frobnicate")
//!     .add_hint("Check the spelling of the operation name?")
//!     .build();
//!
//! assert_eq!(error.kind, DiagnosticKind::Error);
//! assert!(error.to_text(None).contains("Frobnicate"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;

// Re-export main types for convenience
pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_docs_url, get_error_info, get_subsystem};
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
