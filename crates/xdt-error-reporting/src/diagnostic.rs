//! Core diagnostic message types.
//!
//! This module defines the structures for representing diagnostic messages
//! (errors, warnings, info) following tidyverse-style guidelines.

use serde::{Deserialize, Serialize};
use xdt_source_map::{SourceContext, SourceInfo};

/// The kind of diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// An error; any error makes a transform unsuccessful
    Error,
    /// A warning that doesn't affect success but indicates a problem
    Warning,
    /// Informational message
    Info,
    /// A note providing additional context
    Note,
}

impl DiagnosticKind {
    fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Error => "Error",
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
            DiagnosticKind::Note => "Note",
        }
    }
}

/// How detail items should be presented (tidyverse x/i bullet style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailKind {
    /// Error detail (✖ bullet)
    Error,
    /// Info detail (ℹ bullet)
    Info,
    /// Note detail (plain bullet)
    Note,
}

impl DetailKind {
    fn bullet(self) -> &'static str {
        match self {
            DetailKind::Error => "✖",
            DetailKind::Info => "ℹ",
            DetailKind::Note => "•",
        }
    }

    fn as_json_str(self) -> &'static str {
        match self {
            DetailKind::Error => "error",
            DetailKind::Info => "info",
            DetailKind::Note => "note",
        }
    }
}

/// The content of a message or detail item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    /// Plain text content
    Plain(String),
    /// Markdown content (backticks mark code, names and expressions)
    Markdown(String),
}

impl MessageContent {
    /// Get the raw string content for display
    pub fn as_str(&self) -> &str {
        match self {
            MessageContent::Plain(s) => s,
            MessageContent::Markdown(s) => s,
        }
    }

    /// Convert to JSON value with type information
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            MessageContent::Plain(s) => json!({
                "type": "plain",
                "content": s
            }),
            MessageContent::Markdown(s) => json!({
                "type": "markdown",
                "content": s
            }),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Markdown(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Markdown(s.to_string())
    }
}

/// A detail item in a diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    /// The kind of detail (error, info, note)
    pub kind: DetailKind,
    /// The content of the detail
    pub content: MessageContent,
    /// Optional source location for this detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceInfo>,
}

/// A diagnostic message following tidyverse-style structure.
///
/// Structure:
/// 1. **Code**: Optional error code (e.g., "X-2-1") for searchability
/// 2. **Title**: Brief error message
/// 3. **Kind**: Error, Warning, Info
/// 4. **Problem**: What went wrong
/// 5. **Details**: Specific information (bulleted)
/// 6. **Hints**: Optional guidance for fixing (ends with ?)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Optional error code (e.g., "X-2-1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Brief title for the error
    pub title: String,

    /// The kind of diagnostic (Error, Warning, Info)
    pub kind: DiagnosticKind,

    /// The problem statement
    pub problem: Option<MessageContent>,

    /// Specific error details
    pub details: Vec<DetailItem>,

    /// Optional hints for fixing (ends with ?)
    pub hints: Vec<MessageContent>,

    /// Source location for this diagnostic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceInfo>,
}

impl DiagnosticMessage {
    /// Create a new diagnostic message with just a title and kind.
    ///
    /// Note: Consider using [`DiagnosticMessageBuilder`](crate::DiagnosticMessageBuilder)
    /// instead for better structure.
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            kind,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
        }
    }

    /// Create an error diagnostic.
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    /// Create a warning diagnostic.
    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    /// Create an info diagnostic.
    pub fn info(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, title)
    }

    /// Set the error code.
    ///
    /// # Example
    ///
    /// ```
    /// use xdt_error_reporting::DiagnosticMessage;
    ///
    /// let msg = DiagnosticMessage::error("Malformed XML").with_code("X-1-1");
    /// assert_eq!(msg.code.as_deref(), Some("X-1-1"));
    /// ```
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    /// The most specific one-line message: the problem statement if present,
    /// otherwise the title.
    pub fn message(&self) -> &str {
        self.problem
            .as_ref()
            .map(|p| p.as_str())
            .unwrap_or(&self.title)
    }

    /// Get the documentation URL for this error, if it has an error code.
    pub fn docs_url(&self) -> Option<&str> {
        self.code
            .as_ref()
            .and_then(|code| crate::catalog::get_docs_url(code))
    }

    /// Render this diagnostic message as text.
    ///
    /// When a [`SourceContext`] knows the diagnostic's file, the source
    /// snippet is rendered with ariadne; otherwise the output is a
    /// tidyverse-style block:
    ///
    /// ```text
    /// Error [X-3-1]: title at 3:7
    /// Problem statement here
    /// ✖ Error detail
    /// ℹ Info detail
    /// ? Hint
    /// ```
    ///
    /// # Example
    ///
    /// ```
    /// use xdt_error_reporting::DiagnosticMessageBuilder;
    ///
    /// let msg = DiagnosticMessageBuilder::error("Invalid locator")
    ///     .problem("Match requires at least one attribute name")
    ///     .add_hint("Write the locator as Match(name)?")
    ///     .build();
    /// let text = msg.to_text(None);
    /// assert!(text.contains("Error: Invalid locator"));
    /// assert!(text.contains("Match requires at least one attribute name"));
    /// ```
    pub fn to_text(&self, ctx: Option<&SourceContext>) -> String {
        let mut lines: Vec<String> = Vec::new();

        let ariadne_output = match (self.primary_location(), ctx) {
            (Some(loc), Some(ctx)) => self.render_ariadne_source_context(loc, ctx),
            _ => None,
        };

        match ariadne_output {
            Some(rendered) => {
                lines.push(rendered.trim_end().to_string());

                // ariadne shows title, code, problem and located details
                for detail in self.details.iter().filter(|d| d.location.is_none()) {
                    lines.push(format!("{} {}", detail.kind.bullet(), detail.content.as_str()));
                }
            }
            None => {
                let mut head = match &self.code {
                    Some(code) => format!("{} [{}]: {}", self.kind.label(), code, self.title),
                    None => format!("{}: {}", self.kind.label(), self.title),
                };
                if let Some(loc) = &self.location {
                    head.push_str(&format!(
                        " at {}:{}",
                        loc.range.start.line(),
                        loc.range.start.display_column()
                    ));
                }
                lines.push(head);

                if let Some(problem) = &self.problem {
                    lines.push(problem.as_str().to_string());
                }

                for detail in &self.details {
                    lines.push(format!("{} {}", detail.kind.bullet(), detail.content.as_str()));
                }
            }
        }

        for hint in &self.hints {
            lines.push(format!("? {}", hint.as_str()));
        }

        lines.join("\n")
    }

    /// Render this diagnostic message as a JSON value.
    ///
    /// # Example
    ///
    /// ```
    /// use xdt_error_reporting::DiagnosticMessage;
    ///
    /// let msg = DiagnosticMessage::warning("Nothing to remove");
    /// let json = msg.to_json();
    /// assert_eq!(json["kind"], "warning");
    /// assert_eq!(json["title"], "Nothing to remove");
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let kind_str = match self.kind {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
            DiagnosticKind::Note => "note",
        };

        let mut obj = json!({
            "kind": kind_str,
            "title": self.title,
        });

        if let Some(code) = &self.code {
            obj["code"] = json!(code);
        }

        if let Some(problem) = &self.problem {
            obj["problem"] = problem.to_json();
        }

        if !self.details.is_empty() {
            let details: Vec<_> = self
                .details
                .iter()
                .map(|d| {
                    let mut detail_obj = json!({
                        "kind": d.kind.as_json_str(),
                        "content": d.content.to_json()
                    });
                    if let Some(location) = &d.location {
                        detail_obj["location"] = json!(location);
                    }
                    detail_obj
                })
                .collect();
            obj["details"] = json!(details);
        }

        if !self.hints.is_empty() {
            let hints: Vec<_> = self.hints.iter().map(|h| h.to_json()).collect();
            obj["hints"] = json!(hints);
        }

        if let Some(location) = &self.location {
            obj["location"] = json!(location);
        }

        obj
    }

    fn primary_location(&self) -> Option<&SourceInfo> {
        self.location
            .as_ref()
            .or_else(|| self.details.iter().find_map(|d| d.location.as_ref()))
    }

    /// Render source context using ariadne (private helper for to_text).
    fn render_ariadne_source_context(
        &self,
        main_location: &SourceInfo,
        ctx: &SourceContext,
    ) -> Option<String> {
        use ariadne::{Color, Config, Label, Report, ReportKind, Source};

        let file = ctx.get_file(main_location.file_id)?;
        let content = file.read_content()?;

        // ariadne spans count characters
        let to_char = |offset: usize| -> Option<usize> {
            content.get(..offset).map(|prefix| prefix.chars().count())
        };

        let (report_kind, main_color) = match self.kind {
            DiagnosticKind::Error => (ReportKind::Error, Color::Red),
            DiagnosticKind::Warning => (ReportKind::Warning, Color::Yellow),
            DiagnosticKind::Info => (ReportKind::Advice, Color::Cyan),
            DiagnosticKind::Note => (ReportKind::Advice, Color::Blue),
        };

        let start = to_char(main_location.start_offset())?;
        let end = to_char(main_location.end_offset())?.max(start + 1);

        let mut report = Report::build(report_kind, file.path.clone(), start)
            .with_config(Config::default().with_color(false));

        if let Some(code) = &self.code {
            report = report.with_message(format!("[{}] {}", code, self.title));
        } else {
            report = report.with_message(&self.title);
        }

        report = report.with_label(
            Label::new((file.path.clone(), start..end))
                .with_message(self.message())
                .with_color(main_color),
        );

        for detail in &self.details {
            let Some(detail_loc) = &detail.location else {
                continue;
            };
            if detail_loc.file_id != main_location.file_id {
                continue;
            }
            if let (Some(detail_start), Some(detail_end)) = (
                to_char(detail_loc.start_offset()),
                to_char(detail_loc.end_offset()),
            ) {
                let detail_color = match detail.kind {
                    DetailKind::Error => Color::Red,
                    DetailKind::Info => Color::Cyan,
                    DetailKind::Note => Color::Blue,
                };
                report = report.with_label(
                    Label::new((
                        file.path.clone(),
                        detail_start..detail_end.max(detail_start + 1),
                    ))
                    .with_message(detail.content.as_str())
                    .with_color(detail_color),
                );
            }
        }

        let report = report.finish();
        let mut output = Vec::new();
        report
            .write((file.path.clone(), Source::from(content.as_str())), &mut output)
            .ok()?;

        String::from_utf8(output).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DiagnosticMessageBuilder;
    use xdt_source_map::{FileId, Location, Range};

    fn location(offset: usize, row: usize, column: usize, len: usize) -> SourceInfo {
        SourceInfo::original(
            FileId(0),
            Range {
                start: Location {
                    offset,
                    row,
                    column,
                },
                end: Location {
                    offset: offset + len,
                    row,
                    column: column + len,
                },
            },
        )
    }

    #[test]
    fn test_diagnostic_message_constructors() {
        let error = DiagnosticMessage::error("Error");
        assert_eq!(error.kind, DiagnosticKind::Error);
        assert!(error.is_error());
        assert!(error.code.is_none());

        let warning = DiagnosticMessage::warning("Warning");
        assert_eq!(warning.kind, DiagnosticKind::Warning);
        assert!(!warning.is_error());
    }

    #[test]
    fn test_message_prefers_problem() {
        let msg = DiagnosticMessageBuilder::error("No Matching Node")
            .problem("no node matched the given locator")
            .build();
        assert_eq!(msg.message(), "no node matched the given locator");

        let bare = DiagnosticMessage::error("Just a title");
        assert_eq!(bare.message(), "Just a title");
    }

    #[test]
    fn test_docs_url() {
        let msg = DiagnosticMessage::error("Internal Error").with_code("X-0-1");
        assert!(msg.docs_url().unwrap().contains("X-0-1"));
        assert!(DiagnosticMessage::error("x").docs_url().is_none());
    }

    #[test]
    fn test_to_text_simple_error() {
        let msg = DiagnosticMessage::error("Something went wrong");
        assert_eq!(msg.to_text(None), "Error: Something went wrong");
    }

    #[test]
    fn test_to_text_with_code() {
        let msg = DiagnosticMessage::error("Something went wrong").with_code("X-4-1");
        assert_eq!(msg.to_text(None), "Error [X-4-1]: Something went wrong");
    }

    #[test]
    fn test_to_text_full_message() {
        let msg = DiagnosticMessageBuilder::warning("Nothing To Remove")
            .with_code("X-3-3")
            .problem("RemoveAll matched no nodes")
            .add_info("The locator was evaluated against `/configuration/appSettings`")
            .add_hint("Is the locator too narrow?")
            .build();

        insta::assert_snapshot!(msg.to_text(None), @r"
        Warning [X-3-3]: Nothing To Remove
        RemoveAll matched no nodes
        ℹ The locator was evaluated against `/configuration/appSettings`
        ? Is the locator too narrow?
        ");
    }

    #[test]
    fn test_location_in_to_text_without_context() {
        let msg = DiagnosticMessageBuilder::error("Invalid syntax")
            .with_location(location(100, 10, 5, 3))
            .build();

        let text = msg.to_text(None);
        assert!(text.contains("Invalid syntax at 11:6"));
    }

    #[test]
    fn test_location_in_to_text_with_context() {
        let mut ctx = SourceContext::new();
        let file_id = ctx.add_file(
            "web.release.config".to_string(),
            Some("<configuration>\n  <bogus/>\n</configuration>".to_string()),
        );

        let loc = SourceInfo::span(
            file_id,
            Location {
                offset: 19,
                row: 1,
                column: 3,
            },
            5,
        );

        let msg = DiagnosticMessageBuilder::error("Unrecognized Transform")
            .with_code("X-2-1")
            .problem("unrecognized transform: Bogus")
            .with_location(loc)
            .build();

        let text = msg.to_text(Some(&ctx));
        assert!(text.contains("web.release.config"));
        assert!(text.contains("[X-2-1] Unrecognized Transform"));
        assert!(text.contains("unrecognized transform: Bogus"));
    }

    #[test]
    fn test_to_json_full_message() {
        let msg = DiagnosticMessageBuilder::error("Invalid input")
            .with_code("X-2-3")
            .problem("SetAttributes takes attribute names")
            .add_detail("Found an empty argument")
            .add_hint("Remove the trailing comma?")
            .build();

        let json = msg.to_json();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["code"], "X-2-3");
        assert_eq!(json["problem"]["content"], "SetAttributes takes attribute names");
        assert_eq!(json["details"][0]["kind"], "error");
        assert_eq!(json["hints"][0]["content"], "Remove the trailing comma?");
        assert!(json.get("location").is_none());
    }

    #[test]
    fn test_location_in_to_json() {
        let msg = DiagnosticMessageBuilder::error("Invalid syntax")
            .with_location(location(100, 10, 5, 10))
            .build();

        let json = msg.to_json();
        let range = &json["location"]["range"];
        assert_eq!(range["start"]["row"], 10);
        assert_eq!(range["start"]["column"], 5);
        assert_eq!(range["end"]["offset"], 110);
    }
}
