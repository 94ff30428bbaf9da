//! Apply command implementation.

use super::{load_document, print_fatal, print_report};
use anyhow::{Context, Result};
use tracing::debug;
use xdt_source_map::SourceContext;
use xdt_transform::{CollectingLogger, TransformOptions, XmlTransformation};

/// Arguments for the apply command
#[derive(Debug)]
pub struct ApplyArgs {
    pub source: String,
    pub transform: String,
    /// Output file; stdout when absent
    pub output: Option<String>,
    /// TOML options file
    pub config: Option<String>,
    pub json: bool,
}

/// Execute the apply command
///
/// The result is only written when the transform succeeded.
pub fn execute(args: ApplyArgs) -> Result<bool> {
    let options = match &args.config {
        Some(path) => TransformOptions::from_path(path)
            .with_context(|| format!("loading options from {}", path))?,
        None => TransformOptions::default(),
    };

    let mut ctx = SourceContext::new();
    let mut source = match load_document(&args.source, &mut ctx) {
        Ok(doc) => doc,
        Err(message) => {
            print_fatal(&message, &ctx, args.json);
            return Ok(false);
        }
    };
    let transformation = match load_document(&args.transform, &mut ctx) {
        Ok(doc) => XmlTransformation::new(doc, args.transform.clone()).with_options(options),
        Err(message) => {
            print_fatal(&message, &ctx, args.json);
            return Ok(false);
        }
    };

    debug!(source = %args.source, transform = %args.transform, "Applying transform");
    let mut logger = CollectingLogger::new();
    let report = transformation.apply(&mut source, Some(&mut logger));
    debug!("{}", logger.log_text());

    print_report(&report, &ctx, args.json);
    if !report.succeeded() {
        return Ok(false);
    }

    match &args.output {
        Some(path) => source
            .save_to_path(path)
            .with_context(|| format!("writing {}", path))?,
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            source.save(&mut out).context("writing to stdout")?;
        }
    }
    Ok(true)
}
