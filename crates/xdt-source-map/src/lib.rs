//! Source locations for xdt
//!
//! This crate provides the location bookkeeping shared by the XML document
//! model and the diagnostics layer: byte offsets, 0-indexed rows and columns,
//! and a [`SourceContext`] that remembers which file a [`FileId`] refers to.
//!
//! # Overview
//!
//! The core types are:
//! - [`SourceInfo`]: A range in a specific file
//! - [`SourceContext`]: Manages files and provides content for rendering
//! - [`FileInformation`]: Line-break index for offset to row/column lookups
//!
//! # Example
//!
//! ```rust
//! use xdt_source_map::*;
//!
//! let mut ctx = SourceContext::new();
//! let file_id = ctx.add_file("web.config".into(), Some("<configuration/>".into()));
//!
//! let range = Range {
//!     start: Location { offset: 1, row: 0, column: 1 },
//!     end: Location { offset: 14, row: 0, column: 14 },
//! };
//! let info = SourceInfo::original(file_id, range.clone());
//!
//! assert_eq!(info.range, range);
//! assert_eq!(ctx.get_file(file_id).unwrap().path, "web.config");
//! ```

pub mod context;
pub mod file_info;
pub mod source_info;
pub mod types;

// Re-export main types
pub use context::{SourceContext, SourceFile};
pub use file_info::FileInformation;
pub use source_info::SourceInfo;
pub use types::{FileId, Location, Range};
