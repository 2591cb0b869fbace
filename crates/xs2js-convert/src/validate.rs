//! # Validation Harness
//!
//! Loads a set of emitted documents into the `jsonschema` crate (draft-07)
//! and validates JSON instances against any of them.
//!
//! ## Reference Resolution
//!
//! Emitted documents carry relative `$id`s (`BaseTypes.json`) and
//! cross-document pointers of the form `BaseTypes.json#/definitions/Code`.
//! The validator resolves those against its default base URI and asks the
//! retriever for the document; the retriever answers from the documents
//! added to the set, matched on the last path segment of the URI. An
//! identifier outside the set is an error, never a network request and
//! never a permissive stand-in, so a document loaded without the documents
//! it references fails to compile.
//!
//! ## Formats
//!
//! Date and time types are emitted with `format` hints only; format
//! assertion is off.

use std::collections::BTreeMap;
use std::fmt;

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;
use thiserror::Error;

use crate::assembler::{percent_decode, OutputDocument};
use crate::batch::BatchResult;

/// Resolves cross-document references from the documents of a set.
struct LocalSchemaRetriever {
    /// Documents keyed by identifier.
    documents: BTreeMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        if let Some(value) = self.documents.get(uri_str) {
            return Ok(value.clone());
        }

        let without_fragment = uri_str.split('#').next().unwrap_or(uri_str);
        let identifier = without_fragment
            .rsplit('/')
            .next()
            .unwrap_or(without_fragment);
        let decoded = percent_decode(identifier);
        decoded
            .as_deref()
            .and_then(|d| self.documents.get(d))
            .or_else(|| self.documents.get(identifier))
            .cloned()
            .ok_or_else(|| format!("'{uri_str}' is not part of this schema set").into())
    }
}

/// Error during validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The instance did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Identifier of the document validated against.
        schema_name: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// No document with this identifier was added to the set.
    #[error("schema '{schema_name}' is not part of this schema set")]
    SchemaNotFound {
        /// The requested identifier.
        schema_name: String,
    },

    /// The compiled validator could not be built (invalid schema, or a
    /// reference to a document outside the set).
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Identifier of the document.
        schema_name: String,
        /// Reason the validator could not be built.
        reason: String,
    },
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer path to the violating value in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// The failing keyword, e.g. `required` or `maxLength`.
    pub keyword: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl Violation {
    fn keyword_of(schema_path: &str) -> String {
        schema_path.rsplit('/').next().unwrap_or_default().to_string()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {} [{}]", self.message, self.keyword)
        } else {
            write!(f, "  {}: {} [{}]", self.instance_path, self.message, self.keyword)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Whether any violation was raised by `keyword`.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.violations.iter().any(|v| v.keyword == keyword)
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A set of emitted documents that reference each other.
///
/// Validators are compiled per call; the set itself is plain data and can
/// be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    /// Documents keyed by identifier.
    documents: BTreeMap<String, Value>,
}

impl SchemaSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding every document of a batch.
    pub fn from_result(result: &BatchResult) -> Self {
        Self::from_outputs(result.outputs())
    }

    /// A set holding the given documents.
    pub fn from_outputs<'a>(documents: impl IntoIterator<Item = &'a OutputDocument>) -> Self {
        let mut set = Self::new();
        for document in documents {
            set.add_document(document);
        }
        set
    }

    /// Add an emitted document under its identifier.
    pub fn add_document(&mut self, document: &OutputDocument) {
        self.add(document.filename(), document.json_schema().clone());
    }

    /// Add a schema under `identifier`, replacing any previous one.
    pub fn add(&mut self, identifier: impl Into<String>, schema: Value) {
        self.documents.insert(identifier.into(), schema);
    }

    /// Returns the number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Identifiers of all documents, sorted.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Look up a document by identifier.
    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.documents.get(identifier)
    }

    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft7);
        opts.should_validate_formats(false);
        opts.with_retriever(LocalSchemaRetriever {
            documents: self.documents.clone(),
        });
        opts
    }

    /// Build a compiled `Validator` for the document `identifier`, with
    /// every other document of the set available to `$ref`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::SchemaNotFound` if the document is
    /// not in the set, `SchemaValidationError::ValidatorBuildError` if it
    /// cannot be compiled, including when it references a document outside
    /// the set.
    pub fn build_validator(&self, identifier: &str) -> Result<Validator, SchemaValidationError> {
        let schema = self
            .documents
            .get(identifier)
            .ok_or_else(|| SchemaValidationError::SchemaNotFound {
                schema_name: identifier.to_string(),
            })?;
        self.build_options()
            .build(schema)
            .map_err(|e| SchemaValidationError::ValidatorBuildError {
                schema_name: identifier.to_string(),
                reason: e.to_string(),
            })
    }

    /// Validate an instance against the document `identifier`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::ValidationFailed` with every violation
    /// if the instance is invalid, and the errors of
    /// [`build_validator`](Self::build_validator) if the document cannot be
    /// compiled.
    pub fn validate_document(
        &self,
        instance: &Value,
        identifier: &str,
    ) -> Result<(), SchemaValidationError> {
        let validator = self.build_validator(identifier)?;
        let violations: Vec<Violation> = validator
            .iter_errors(instance)
            .map(|e| {
                let schema_path = e.schema_path.to_string();
                Violation {
                    instance_path: e.instance_path.to_string(),
                    keyword: Violation::keyword_of(&schema_path),
                    schema_path,
                    message: e.to_string(),
                }
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::ValidationFailed {
                schema_name: identifier.to_string(),
                violations: ValidationViolations { violations },
            })
        }
    }
}
