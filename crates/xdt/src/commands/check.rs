//! Check command implementation.

use super::{load_document, print_fatal, print_report};
use anyhow::Result;
use xdt_source_map::SourceContext;
use xdt_transform::XmlTransformation;

/// Arguments for the check command
#[derive(Debug)]
pub struct CheckArgs {
    pub transform: String,
    pub json: bool,
}

/// Execute the check command
///
/// Only directive syntax is checked; nothing is matched against a source.
pub fn execute(args: CheckArgs) -> Result<bool> {
    let mut ctx = SourceContext::new();
    let transformation = match load_document(&args.transform, &mut ctx) {
        Ok(doc) => XmlTransformation::new(doc, args.transform.clone()),
        Err(message) => {
            print_fatal(&message, &ctx, args.json);
            return Ok(false);
        }
    };

    let report = transformation.check();
    print_report(&report, &ctx, args.json);
    if report.succeeded() && !args.json {
        println!("No problems found in {}", args.transform);
    }
    Ok(report.succeeded())
}
