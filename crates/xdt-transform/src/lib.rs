//! XML Document Transform engine.
//!
//! A transform document mirrors the structure of the document it edits and
//! marks elements with directives from the
//! `http://schemas.microsoft.com/XML-Document-Transform` namespace:
//!
//! ```xml
//! <configuration xmlns:xdt="http://schemas.microsoft.com/XML-Document-Transform">
//!   <appSettings>
//!     <add key="mode" value="release"
//!          xdt:Transform="SetAttributes(value)" xdt:Locator="Match(key)"/>
//!   </appSettings>
//!   <system.web>
//!     <compilation xdt:Transform="RemoveAttributes(debug)"/>
//!   </system.web>
//! </configuration>
//! ```
//!
//! [`XmlTransformation::apply`] edits the source document in place. The
//! source keeps its formatting everywhere a directive did not touch it, and
//! every problem comes back as a located diagnostic in a [`TransformReport`].
//!
//! # Modules
//!
//! - [`directive`]: reading `xdt:Transform` and `xdt:Locator`
//! - [`locator`]: finding target nodes in the source
//! - [`transforms`]: the named operations and their registry
//! - [`transformation`]: the walk over the transform document
//! - [`logger`]: the logging capability
//! - [`lookup`]: queries against the pre-transform document
//! - [`options`]: TOML-loadable options

pub mod directive;
pub mod error;
pub mod locator;
pub mod logger;
pub mod lookup;
pub mod options;
pub mod transformation;
pub mod transforms;

pub use directive::{Directive, LocatorSpec, OperationSpec, XDT_NAMESPACE, parse_directives};
pub use error::{Error, Result, TransformError};
pub use logger::{
    CollectingLogger, LogEntry, LogLocation, MessageType, TracingLogger, TransformationLogger,
};
pub use lookup::{OriginalDocument, OriginalDocumentLookup};
pub use options::TransformOptions;
pub use transformation::{
    DocumentKind, TransformContext, TransformDiagnostic, TransformReport, XmlTransformation,
};
pub use transforms::{ExecutionContext, Transform, TransformRegistry};
