//! # Validate Subcommand
//!
//! Converts a set of XSD files, loads every emitted document into one
//! schema set, and validates instance files against the document named by
//! `--schema`. Instances ending in `.yaml` or `.yml` are read as YAML,
//! everything else as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use tracing::debug;
use xs2js_convert::{process_all_schemas, SchemaSet, SchemaValidationError};

use crate::{load_options, read_schemas, report_batch_error};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// XSD files converted together as one batch.
    #[arg(required = true)]
    pub schemas: Vec<PathBuf>,

    /// Identifier of the document to validate against (e.g. `ExampleTypes.json`)
    /// or the XSD file name it was converted from.
    #[arg(long)]
    pub schema: String,

    /// Instance files to validate.
    #[arg(long = "instance", required = true)]
    pub instances: Vec<PathBuf>,

    /// Conversion options (YAML).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute the validate subcommand. Exits 1 if the batch fails or any
/// instance is invalid.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let options = load_options(args.config.as_deref())?;
    let schemas = read_schemas(&args.schemas)?;

    let result = match process_all_schemas(&schemas, &options) {
        Ok(result) => result,
        Err(e) => {
            report_batch_error(&e);
            return Ok(1);
        }
    };
    let identifier = result
        .get_result(&args.schema)
        .with_context(|| format!("no document '{}' in this batch", args.schema))?
        .filename()
        .to_string();
    let set = SchemaSet::from_result(&result);
    debug!(documents = set.len(), schema = %identifier, "schema set loaded");

    let mut invalid = 0usize;
    for path in &args.instances {
        let instance = read_instance(path)?;
        match set.validate_document(&instance, &identifier) {
            Ok(()) => println!("VALID    {}", path.display()),
            Err(SchemaValidationError::ValidationFailed { violations, .. }) => {
                invalid += 1;
                println!("INVALID  {} ({} violation(s))", path.display(), violations.len());
                println!("{violations}");
            }
            Err(e) => return Err(e).context("failed to build validator"),
        }
    }

    println!();
    println!(
        "{} of {} instance(s) valid against {identifier}",
        args.instances.len() - invalid,
        args.instances.len()
    );
    Ok(if invalid == 0 { 0 } else { 1 })
}

/// Read a JSON or YAML instance.
pub fn read_instance(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read instance: {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("invalid YAML instance: {}", path.display()))
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON instance: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="urn:n" targetNamespace="urn:n">
        <xs:complexType name="PersonNameType"><xs:sequence>
            <xs:element name="FirstName" type="xs:string"/>
            <xs:element name="LastName" type="xs:string"/>
        </xs:sequence></xs:complexType>
    </xs:schema>"#;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn args(dir: &Path, schema: &str, instances: Vec<PathBuf>) -> ValidateArgs {
        ValidateArgs {
            schemas: vec![write(dir, "Names.xsd", NAMES)],
            schema: schema.to_string(),
            instances,
            config: None,
        }
    }

    #[test]
    fn test_valid_json_and_yaml_instances() {
        let dir = tempfile::tempdir().unwrap();
        let json = write(
            dir.path(),
            "kevin.json",
            r#"{"PersonNameType": {"FirstName": "Kevin", "LastName": "Darley"}}"#,
        );
        let yaml = write(
            dir.path(),
            "carrie.yaml",
            "PersonNameType:\n  FirstName: Carrie\n  LastName: Brown\n",
        );
        let code = run_validate(&args(dir.path(), "Names.json", vec![json, yaml])).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_invalid_instance_exits_non_zero() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(
            dir.path(),
            "bad.json",
            r#"{"PersonNameType": {"errorName": "Kevin", "LastName": "Darley"}}"#,
        );
        let code = run_validate(&args(dir.path(), "Names.xsd", vec![bad])).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn test_unknown_schema_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let json = write(dir.path(), "x.json", "{}");
        assert!(run_validate(&args(dir.path(), "Other.json", vec![json])).is_err());
    }

    #[test]
    fn test_read_instance_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "broken.json", "{\"a\": ");
        assert!(read_instance(&path).is_err());
    }
}
