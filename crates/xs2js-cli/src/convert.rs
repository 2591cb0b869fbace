//! # Convert Subcommand
//!
//! Converts a set of XSD files as one batch and writes one JSON Schema
//! document per input into the output directory, named by its identifier.
//!
//! Documents are written as RFC 8785 canonical JSON unless `--pretty` is
//! given, so repeated runs over the same inputs produce identical files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use xs2js_convert::{process_all_schemas, BatchResult, OutputDocument};

use crate::{load_options, read_schemas, report_batch_error};

/// Arguments for the convert subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// XSD files converted together as one batch.
    #[arg(required = true)]
    pub schemas: Vec<PathBuf>,

    /// Directory receiving the emitted documents.
    #[arg(long, short = 'o')]
    pub out_dir: PathBuf,

    /// Conversion options (YAML).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write indented JSON instead of canonical JSON.
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the convert subcommand.
pub fn run_convert(args: &ConvertArgs) -> Result<u8> {
    let options = load_options(args.config.as_deref())?;
    let schemas = read_schemas(&args.schemas)?;

    let result = match process_all_schemas(&schemas, &options) {
        Ok(result) => result,
        Err(e) => {
            report_batch_error(&e);
            return Ok(1);
        }
    };

    let written = write_outputs(&result, &args.out_dir, args.pretty)?;
    for (document, digest) in result.outputs().zip(&written) {
        println!("{:<32} {digest}", document.filename());
    }
    for diagnostic in result.diagnostics() {
        eprintln!("  warning[{}] {diagnostic}", diagnostic.code());
    }
    info!(
        documents = written.len(),
        diagnostics = result.diagnostics().len(),
        out_dir = %args.out_dir.display(),
        "conversion complete"
    );
    Ok(0)
}

/// Write every document of `result` into `out_dir`, returning each
/// document's digest in output order.
pub fn write_outputs(result: &BatchResult, out_dir: &Path, pretty: bool) -> Result<Vec<String>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;

    result
        .outputs()
        .map(|document| {
            let path = out_dir.join(document.filename());
            std::fs::write(&path, render(document, pretty)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            let digest = document
                .digest()
                .with_context(|| format!("failed to digest {}", document.filename()))?;
            Ok(digest.to_string())
        })
        .collect()
}

fn render(document: &OutputDocument, pretty: bool) -> Result<Vec<u8>> {
    if pretty {
        let mut text = document.to_pretty_string()?;
        text.push('\n');
        Ok(text.into_bytes())
    } else {
        let bytes = document
            .canonical_bytes()
            .with_context(|| format!("failed to canonicalize {}", document.filename()))?;
        Ok(bytes.into_bytes())
    }
}
