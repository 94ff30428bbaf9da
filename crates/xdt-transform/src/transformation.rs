//! Walking the transform document and applying its directives.
//!
//! Each transform element is handled in the same order: parse its
//! directive, resolve its locator, run its operations left to right, then
//! descend into its children unless an operation consumed them. Problems
//! become diagnostics and never stop the walk.

use crate::directive::{has_directive, parse_directives};
use crate::error::{Result, TransformError};
use crate::locator;
use crate::logger::{LogLocation, MessageType, TracingLogger, TransformationLogger};
use crate::lookup::{OriginalDocument, OriginalDocumentLookup};
use crate::options::TransformOptions;
use crate::transforms::{ExecutionContext, TransformRegistry};
use std::fmt;
use std::io::Read;
use std::path::Path;
use xdt_error_reporting::{DiagnosticKind, DiagnosticMessage};
use xdt_source_map::{FileId, Location, SourceContext, SourceInfo};
use xdt_xml::{NamespaceContext, NodeId, NodeInfo, XmlDocument};

/// Which document a diagnostic points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Source,
    Transform,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Source => f.write_str("source"),
            DocumentKind::Transform => f.write_str("transform"),
        }
    }
}

/// One problem found while applying a transform.
#[derive(Debug, Clone)]
pub struct TransformDiagnostic {
    pub document: DocumentKind,
    /// 1-based; 0 when unknown.
    pub line: usize,
    /// 1-based; 0 when unknown.
    pub column: usize,
    pub message: DiagnosticMessage,
}

impl TransformDiagnostic {
    fn new(document: DocumentKind, error: &TransformError, info: Option<NodeInfo>) -> Self {
        let location = info.map(|info| {
            SourceInfo::point(
                info.file_id,
                Location {
                    offset: info.offset,
                    row: info.line.saturating_sub(1),
                    column: info.column.saturating_sub(1),
                },
            )
        });
        let (line, column) = info.map_or((0, 0), |info| (info.line, info.column));
        TransformDiagnostic {
            document,
            line,
            column,
            message: error.to_diagnostic(location),
        }
    }

    pub fn is_error(&self) -> bool {
        self.message.kind == DiagnosticKind::Error
    }
}

/// Collects diagnostics while a transform runs.
///
/// Diagnostics are only ever appended.
#[derive(Debug, Default)]
pub struct TransformContext {
    diagnostics: Vec<TransformDiagnostic>,
}

impl TransformContext {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add_diagnostic(&mut self, diagnostic: TransformDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[TransformDiagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(TransformDiagnostic::is_error)
    }

    pub fn into_report(self) -> TransformReport {
        TransformReport {
            diagnostics: self.diagnostics,
        }
    }
}

/// The outcome of applying or checking a transform.
#[derive(Debug, Clone, Default)]
pub struct TransformReport {
    diagnostics: Vec<TransformDiagnostic>,
}

impl TransformReport {
    /// True iff no error was reported. Warnings do not count.
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.iter().any(TransformDiagnostic::is_error)
    }

    pub fn diagnostics(&self) -> &[TransformDiagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &TransformDiagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &TransformDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.message.kind == DiagnosticKind::Warning)
    }

    /// Render every diagnostic, with snippets for files known to `ctx`.
    pub fn render(&self, ctx: &SourceContext) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.message.to_text(Some(ctx)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A loaded transform document, ready to be applied.
///
/// Content cloned out of the transform keeps the transform's coordinates,
/// so diagnostics only point at the right file when the transform and the
/// documents it is applied to have distinct [`FileId`]s.
///
/// # Example
///
/// ```rust
/// use xdt_transform::XmlTransformation;
/// use xdt_xml::{FileId, XmlDocument};
///
/// let mut source = XmlDocument::parse(
///     r#"<configuration><add name="X" connectionString="A"/></configuration>"#,
///     FileId(0),
/// ).unwrap();
///
/// let transformation = XmlTransformation::parse(
///     r#"<configuration xmlns:xdt="http://schemas.microsoft.com/XML-Document-Transform">
///   <add name="X" connectionString="B" xdt:Transform="SetAttributes(connectionString)" xdt:Locator="Match(name)"/>
/// </configuration>"#,
///     FileId(1),
/// ).unwrap();
///
/// let report = transformation.apply(&mut source, None);
/// assert!(report.succeeded());
/// assert_eq!(
///     source.to_xml_string(),
///     r#"<configuration><add name="X" connectionString="B"/></configuration>"#
/// );
/// ```
#[derive(Debug)]
pub struct XmlTransformation {
    document: XmlDocument,
    name: String,
    registry: TransformRegistry,
    options: TransformOptions,
}

impl XmlTransformation {
    pub fn new(document: XmlDocument, name: impl Into<String>) -> Self {
        Self {
            document,
            name: name.into(),
            registry: TransformRegistry::default(),
            options: TransformOptions::default(),
        }
    }

    pub fn parse(content: &str, file_id: FileId) -> Result<Self> {
        Ok(Self::new(XmlDocument::parse(content, file_id)?, "transform"))
    }

    pub fn load_path(path: impl AsRef<Path>, ctx: &mut SourceContext) -> Result<Self> {
        let path = path.as_ref();
        let document = XmlDocument::load_path(path, ctx)?;
        Ok(Self::new(document, path.display().to_string()))
    }

    pub fn load_reader<R: Read>(reader: R, name: &str, ctx: &mut SourceContext) -> Result<Self> {
        let document = XmlDocument::load_reader(reader, name, ctx)?;
        Ok(Self::new(document, name))
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Apply to `source` in place.
    ///
    /// A snapshot of `source` taken before the first edit backs
    /// `InsertIfMissing`. Diagnostics go to `logger`, or to `tracing` when
    /// there is none.
    pub fn apply(
        &self,
        source: &mut XmlDocument,
        logger: Option<&mut dyn TransformationLogger>,
    ) -> TransformReport {
        let original = OriginalDocument::snapshot(source);
        self.apply_with_lookup(source, Some(&original), logger)
    }

    /// Apply with a caller-provided view of the original document.
    pub fn apply_with_lookup(
        &self,
        source: &mut XmlDocument,
        lookup: Option<&dyn OriginalDocumentLookup>,
        logger: Option<&mut dyn TransformationLogger>,
    ) -> TransformReport {
        if source.file_id() == self.document.file_id() {
            tracing::warn!(
                file_id = source.file_id().0,
                "Source and transform documents share a file id"
            );
        }

        let mut fallback = TracingLogger;
        let logger: &mut dyn TransformationLogger = match logger {
            Some(logger) => logger,
            None => &mut fallback,
        };

        let document_node = source.document_node();
        let mut applier = Applier {
            transformation: self,
            source,
            lookup,
            logger,
            context: TransformContext::new(),
        };
        if let Some(root) = self.document.root_element() {
            applier.visit(root, document_node);
        }

        let Applier {
            context, logger, ..
        } = applier;
        let report = context.into_report();
        tracing::debug!(
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "Transform finished"
        );
        if report.succeeded() {
            logger.log_message(MessageType::Normal, "Transformation succeeded");
        } else {
            logger.log_message(MessageType::Normal, "Transformation failed");
        }
        report
    }

    /// Check every directive's syntax without a source document.
    pub fn check(&self) -> TransformReport {
        let mut context = TransformContext::new();
        let doc = &self.document;
        for element in doc.descendants(doc.document_node()) {
            if !doc.is_element(element) {
                continue;
            }
            let parsed = parse_directives(doc, element, &self.registry);
            for problem in parsed.problems {
                let info = problem.info.or_else(|| element_info(doc, element));
                context.add_diagnostic(TransformDiagnostic::new(
                    DocumentKind::Transform,
                    &problem.error,
                    info,
                ));
            }
        }
        context.into_report()
    }
}

/// Position of an element's name, for diagnostics.
fn element_info(doc: &XmlDocument, element: NodeId) -> Option<NodeInfo> {
    doc.info(element).map(|info| NodeInfo {
        offset: info.offset + 1,
        ..*info
    })
}

struct Applier<'t, 's> {
    transformation: &'t XmlTransformation,
    source: &'s mut XmlDocument,
    lookup: Option<&'s dyn OriginalDocumentLookup>,
    logger: &'s mut dyn TransformationLogger,
    context: TransformContext,
}

impl Applier<'_, '_> {
    fn visit(&mut self, element: NodeId, parent: NodeId) {
        let transformation = self.transformation;
        let transform = &transformation.document;

        let parsed = parse_directives(transform, element, &transformation.registry);
        let fallback_info = element_info(transform, element);
        for problem in &parsed.problems {
            self.report(&problem.error, problem.info.or(fallback_info));
        }
        if parsed.locator_failed {
            return;
        }

        let directive = parsed.directive;
        let ns = NamespaceContext::from_element(transform, element);
        let label = locator::describe(transform, element, &directive.locator);
        let operation_info = directive.transform_info.or(fallback_info);
        let locator_info = directive.locator_info.or(fallback_info);

        for operation in &directive.operations {
            let name = operation.transform.name();
            let targets = match locator::resolve(
                self.source,
                parent,
                transform,
                element,
                &directive.locator,
                &ns,
            ) {
                Ok(targets) => targets,
                Err(err) => {
                    self.report(&err, locator_info);
                    return;
                }
            };
            tracing::trace!(count = targets.len(), locator = %label, "Resolved locator");

            if operation.transform.requires_target() && targets.is_empty() {
                let err = TransformError::NoMatch {
                    target: label.clone(),
                };
                self.report(&err, locator_info);
                continue;
            }

            self.logger
                .start_section(&format!("Executing {} on {}", name, label));
            tracing::debug!(
                transform = name,
                line = operation_info.map_or(0, |info| info.line),
                "Executing transform"
            );

            let (result, warnings) = {
                let mut cx = ExecutionContext::new(
                    self.source,
                    transform,
                    element,
                    parent,
                    &directive.locator,
                    &ns,
                    &transformation.options,
                    &label,
                )
                .with_targets(targets)
                .with_lookup(self.lookup);
                let result = operation.transform.apply(&mut cx);
                (result, cx.take_warnings())
            };

            for warning in &warnings {
                self.report(warning, operation_info);
            }
            match result {
                Ok(count) => self.logger.log_message(
                    MessageType::Verbose,
                    &format!("Applied {} to {} node(s)", name, count),
                ),
                Err(err) => self.report(&err, operation_info),
            }
            self.logger.end_section(&format!("Done executing {}", name));
        }

        if directive.consumes_subtree() {
            return;
        }
        let children = transform.element_children(element);
        if children.is_empty() {
            return;
        }

        let targets = match locator::resolve(
            self.source,
            parent,
            transform,
            element,
            &directive.locator,
            &ns,
        ) {
            Ok(targets) => targets,
            Err(err) => {
                self.report(&err, locator_info);
                return;
            }
        };
        let targets: Vec<NodeId> = targets
            .into_iter()
            .filter(|t| self.source.is_element(*t) && !self.source.is_new_node(*t))
            .collect();

        if targets.is_empty() {
            let subtree_has_directives = transform
                .descendants(element)
                .into_iter()
                .any(|n| transform.is_element(n) && has_directive(transform, n));
            if directive.operations.is_empty()
                && transformation.options.warn_on_unmatched
                && subtree_has_directives
            {
                let err = TransformError::UnmatchedDescent {
                    path: transform.path(element),
                };
                self.report(&err, fallback_info);
            }
            return;
        }

        for target in targets {
            for child in &children {
                self.visit(*child, target);
            }
        }
    }

    fn report(&mut self, error: &TransformError, info: Option<NodeInfo>) {
        let diagnostic = TransformDiagnostic::new(DocumentKind::Transform, error, info);
        let location = LogLocation {
            file: self.transformation.name.clone(),
            line: diagnostic.line,
            column: diagnostic.column,
        };
        let message = error.to_string();
        if error.is_warning() {
            self.logger.log_warning(&message, Some(&location));
        } else {
            self.logger.log_error(&message, Some(&location));
        }
        self.context.add_diagnostic(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::CollectingLogger;

    const XDT: &str = r#"xmlns:xdt="http://schemas.microsoft.com/XML-Document-Transform""#;

    fn transform(body: &str) -> XmlTransformation {
        XmlTransformation::parse(&body.replace("XDT", XDT), FileId(1)).unwrap()
    }

    fn source(content: &str) -> XmlDocument {
        XmlDocument::parse(content, FileId(0)).unwrap()
    }

    #[test]
    fn test_sections_and_messages() {
        let mut doc = source("<a><b/></a>");
        let t = transform(r#"<a XDT><b xdt:Transform="Remove"/></a>"#);
        let mut logger = CollectingLogger::new();

        let report = t.apply(&mut doc, Some(&mut logger));
        assert!(report.succeeded());
        assert_eq!(doc.to_xml_string(), "<a></a>");
        assert_eq!(
            logger.log_text(),
            "Executing Remove on /a/b\n\
             \x20 Applied Remove to 1 node(s)\n\
             Done executing Remove\n\
             Transformation succeeded\n"
        );
    }

    #[test]
    fn test_required_target_missing() {
        let mut doc = source("<a><b/></a>");
        let t = transform(
            r#"<a XDT>
  <c xdt:Transform="Replace"/>
  <b xdt:Transform="SetAttributes" x="1"/>
</a>"#,
        );
        let mut logger = CollectingLogger::new();

        let report = t.apply(&mut doc, Some(&mut logger));
        assert!(!report.succeeded());
        assert_eq!(report.errors().count(), 1);
        let error = &report.diagnostics()[0];
        assert_eq!(error.message.code.as_deref(), Some("X-3-1"));
        assert_eq!((error.line, error.column), (2, 4));
        assert_eq!(
            logger.errors().collect::<Vec<_>>(),
            vec!["no node matched the given locator: /a/c"]
        );
        assert_eq!(doc.to_xml_string(), r#"<a><b x="1"/></a>"#);
    }

    #[test]
    fn test_remove_all_warning_keeps_success() {
        let mut doc = source("<a/>");
        let t = transform(r#"<a XDT><b xdt:Transform="RemoveAll"/></a>"#);

        let report = t.apply(&mut doc, Some(&mut CollectingLogger::new()));
        assert!(report.succeeded());
        let warnings: Vec<_> = report.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message.code.as_deref(), Some("X-3-3"));
    }

    #[test]
    fn test_unmatched_descent_warning() {
        let mut doc = source("<a><b/></a>");
        let body = r#"<a XDT><x><y xdt:Transform="Remove"/></x></a>"#;

        let report = transform(body).apply(&mut doc, Some(&mut CollectingLogger::new()));
        assert!(report.succeeded());
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(
            report.diagnostics()[0].message.message(),
            "no element in the source document matches '/a/x'"
        );

        let quiet = transform(body).with_options(TransformOptions {
            warn_on_unmatched: false,
            ..TransformOptions::default()
        });
        let report = quiet.apply(&mut doc, Some(&mut CollectingLogger::new()));
        assert!(report.diagnostics().is_empty());
    }

    #[test]
    fn test_inserted_content_is_not_transformed_again() {
        let mut doc = source("<a><b/></a>");
        let t = transform(
            r#"<a XDT><b xdt:Transform="Insert"><c xdt:Transform="Remove"/></b></a>"#,
        );
        let report = t.apply(&mut doc, Some(&mut CollectingLogger::new()));
        assert!(report.succeeded());
        assert_eq!(doc.to_xml_string(), "<a><b/><b><c/></b></a>");
    }

    #[test]
    fn test_check_reports_syntax_only() {
        let t = transform(
            r#"<a XDT>
  <b xdt:Transform="Nope"/>
  <c xdt:Locator="Match()"/>
  <d xdt:Transform="Remove" xdt:Locator="XPath(//d)"/>
</a>"#,
        );
        let report = t.check();
        let codes: Vec<_> = report
            .diagnostics()
            .iter()
            .map(|d| d.message.code.clone().unwrap_or_default())
            .collect();
        assert_eq!(codes, vec!["X-2-1", "X-2-3"]);
        assert_eq!(report.diagnostics()[1].line, 3);
    }

    #[test]
    fn test_report_render_uses_source_context() {
        let mut ctx = SourceContext::new();
        let content = "<a xmlns:xdt=\"http://schemas.microsoft.com/XML-Document-Transform\">\n  <b xdt:Transform=\"Bogus\"/>\n</a>";
        let t = XmlTransformation::load_reader(content.as_bytes(), "t.config", &mut ctx).unwrap();
        let mut doc = XmlDocument::load_reader("<a><b/></a>".as_bytes(), "s.config", &mut ctx).unwrap();

        let report = t.apply(&mut doc, Some(&mut CollectingLogger::new()));
        let rendered = report.render(&ctx);
        assert!(rendered.contains("[X-2-1]"));
        assert!(rendered.contains("t.config"));
        assert!(rendered.contains("unrecognized transform: Bogus"));
    }
}
