//! # xs2js-cli — Command-Line Front End
//!
//! Supplies the filename → text mapping a batch needs from files on disk,
//! and consumes the resulting documents.
//!
//! ## Subcommands
//!
//! - `xs2js convert` — convert a set of XSD files and write one JSON Schema
//!   document per input.
//! - `xs2js validate` — convert, then validate JSON or YAML instances
//!   against one of the emitted documents.
//!
//! ```bash
//! xs2js convert BaseTypes.xsd ExampleTypes.xsd --out-dir schemas/
//! xs2js validate BaseTypes.xsd ExampleTypes.xsd \
//!     --schema ExampleTypes.json --instance person.json
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; conversion and validation are delegated
//!   to `xs2js-convert`.
//! - Handlers return an exit code; `Err` is reserved for I/O and
//!   configuration problems.

pub mod convert;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use xs2js_convert::{BatchError, ConversionOptions};

/// Read every schema file into a `(filename, text)` pair.
///
/// The batch key is the file name without its directory, which is also the
/// name other documents use in `schemaLocation`.
pub fn read_schemas(paths: &[PathBuf]) -> Result<Vec<(String, String)>> {
    paths
        .iter()
        .map(|path| {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("not a file name: {}", path.display()))?
                .to_string();
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read schema: {}", path.display()))?;
            Ok((filename, text))
        })
        .collect()
}

/// Load conversion options from a YAML (or JSON) file, or the defaults.
pub fn load_options(config: Option<&Path>) -> Result<ConversionOptions> {
    let Some(path) = config else {
        return Ok(ConversionOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("invalid conversion options in {}", path.display()))
}

/// Print every error of a failed batch, fatal ones marked.
pub fn report_batch_error(err: &BatchError) {
    eprintln!("conversion failed with {} error(s):", err.errors().len());
    for e in err.errors() {
        let marker = if e.is_fatal() { "error" } else { "warning" };
        eprintln!("  {marker}[{}] {e}", e.code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xs2js_convert::{AdditionalProperties, ResolutionMode};

    #[test]
    fn test_read_schemas_keys_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let path = nested.join("A.xsd");
        std::fs::write(&path, "<xs:schema/>").unwrap();

        let schemas = read_schemas(&[path]).unwrap();
        assert_eq!(schemas, vec![("A.xsd".to_string(), "<xs:schema/>".to_string())]);
    }

    #[test]
    fn test_read_schemas_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_schemas(&[dir.path().join("absent.xsd")]).unwrap_err();
        assert!(err.to_string().contains("absent.xsd"));
    }

    #[test]
    fn test_load_options_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xs2js.yaml");
        std::fs::write(&path, "additional_properties: open\nresolution: lenient\nparallel: false\n")
            .unwrap();

        let opts = load_options(Some(&path)).unwrap();
        assert_eq!(opts.additional_properties, AdditionalProperties::Open);
        assert_eq!(opts.resolution, ResolutionMode::Lenient);
        assert!(!opts.parallel);
        assert_eq!(opts.text_property, "#text");
    }

    #[test]
    fn test_load_options_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xs2js.yaml");
        std::fs::write(&path, "strictness: high\n").unwrap();
        assert!(load_options(Some(&path)).is_err());
    }

    #[test]
    fn test_load_options_default() {
        assert_eq!(load_options(None).unwrap(), ConversionOptions::default());
    }
}
