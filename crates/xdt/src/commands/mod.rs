//! Command implementations for the xdt CLI
//!
//! Each command returns whether it succeeded; `main` turns a failure into
//! exit status 1. Diagnostics are written to stderr so that stdout can
//! carry the transformed document.

pub mod apply;
pub mod check;

use serde_json::json;
use xdt_error_reporting::{DiagnosticMessage, get_subsystem};
use xdt_source_map::{FileId, SourceContext};
use xdt_transform::TransformReport;
use xdt_xml::XmlDocument;

/// Load a document, turning failure into a diagnostic that can point into
/// the file when it was read but did not parse.
pub(crate) fn load_document(
    path: &str,
    ctx: &mut SourceContext,
) -> Result<XmlDocument, DiagnosticMessage> {
    let before = ctx.len();
    XmlDocument::load_path(path, ctx).map_err(|err| {
        let file_id = (ctx.len() > before).then_some(FileId(before));
        err.to_diagnostic(file_id)
    })
}

pub(crate) fn report_to_json(report: &TransformReport) -> serde_json::Value {
    let diagnostics: Vec<serde_json::Value> = report
        .diagnostics()
        .iter()
        .map(|d| {
            let mut value = d.message.to_json();
            value["document"] = json!(d.document.to_string());
            value["line"] = json!(d.line);
            value["column"] = json!(d.column);
            if let Some(subsystem) = d.message.code.as_deref().and_then(get_subsystem) {
                value["subsystem"] = json!(subsystem);
            }
            value
        })
        .collect();
    json!({
        "succeeded": report.succeeded(),
        "diagnostics": diagnostics,
    })
}

/// Print a fatal load error in the requested format.
pub(crate) fn print_fatal(message: &DiagnosticMessage, ctx: &SourceContext, as_json: bool) {
    if as_json {
        let value = json!({
            "succeeded": false,
            "diagnostics": [message.to_json()],
        });
        eprintln!("{}", value);
    } else {
        eprintln!("{}", message.to_text(Some(ctx)));
    }
}

/// Print a report's diagnostics, if any, in the requested format.
pub(crate) fn print_report(report: &TransformReport, ctx: &SourceContext, as_json: bool) {
    if as_json {
        eprintln!("{}", report_to_json(report));
    } else if !report.diagnostics().is_empty() {
        eprintln!("{}", report.render(ctx));
    }
}
