//! # Error Types — Conversion Error Taxonomy
//!
//! Defines every error a conversion batch can produce. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Structural and resolution errors (duplicate file, malformed markup,
//!   unresolved namespace or type, derivation cycles) are fatal: a batch that
//!   hits one exposes no output at all, because cross-document pointers
//!   could otherwise point at nothing.
//! - Per-declaration problems (unsupported constructs, facets that widen
//!   their base) are recorded and travel with an otherwise-successful result.
//! - A failed batch reports every collected error, never only the first.

use std::fmt;

use thiserror::Error;

use crate::qname::QName;

/// One entry of the conversion error taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Two documents in one batch share a filename.
    #[error("duplicate file '{filename}' in batch")]
    DuplicateFile {
        /// The repeated filename.
        filename: String,
    },

    /// The schema text is not well-formed XML or not an `xs:schema` document.
    #[error("malformed schema '{filename}': {reason}")]
    MalformedSchema {
        /// Document that failed to parse.
        filename: String,
        /// Parser message.
        reason: String,
    },

    /// A recognized construct that has no faithful mapping; it was converted
    /// with a degraded (pass-through) shape.
    #[error("unsupported construct in '{filename}' at {location}: {construct}")]
    UnsupportedConstruct {
        /// Document containing the construct.
        filename: String,
        /// Declaration path, e.g. `complexType PersonType/sequence`.
        location: String,
        /// What was skipped or degraded.
        construct: String,
    },

    /// An import, include or reference names a namespace no document of the
    /// batch declares as its `targetNamespace`.
    #[error("unresolved namespace '{namespace}' referenced from '{filename}'")]
    UnresolvedNamespace {
        /// Document holding the import or reference.
        filename: String,
        /// The namespace URI nobody declares.
        namespace: String,
    },

    /// A type, element, group or attribute reference names a declaration
    /// that does not exist.
    #[error("unresolved reference in '{filename}': {referencing} refers to missing {missing}")]
    UnresolvedTypeReference {
        /// Document holding the reference.
        filename: String,
        /// The declaration that carries the reference.
        referencing: String,
        /// The qualified name that could not be found.
        missing: QName,
    },

    /// Two top-level declarations of the same kind share a qualified name.
    #[error("duplicate {kind} declaration {name} in '{filename}' (first declared in '{first_filename}')")]
    DuplicateDeclaration {
        /// Document holding the second declaration.
        filename: String,
        /// Declaration kind: `type`, `element`, `group`, `attribute`, `attributeGroup`.
        kind: &'static str,
        /// The clashing name.
        name: QName,
        /// Document holding the first declaration.
        first_filename: String,
    },

    /// A restriction or extension chain loops back on itself.
    #[error("derivation cycle in '{filename}' through {name}")]
    DerivationCycle {
        /// Document declaring the type where the cycle was detected.
        filename: String,
        /// Type whose base chain revisits itself.
        name: QName,
    },

    /// A derived type states a facet less restrictive than its base. The
    /// base value is kept.
    #[error("facet '{facet}' of {type_name} in '{filename}' widens its base ({value} is less restrictive than {base_value})")]
    FacetNarrowing {
        /// Document declaring the derived type.
        filename: String,
        /// The derived type, or the element/attribute for anonymous types.
        type_name: String,
        /// Facet name, e.g. `maxLength`.
        facet: String,
        /// Effective value inherited from the base chain.
        base_value: String,
        /// The wider value stated by the derived type.
        value: String,
    },

    /// A result was requested for a filename that no successful batch covered.
    #[error("no converted result for '{filename}'")]
    NotProcessed {
        /// The requested filename.
        filename: String,
    },
}

impl SchemaError {
    /// Whether this error aborts the whole batch.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedConstruct { .. } | Self::FacetNarrowing { .. }
        )
    }

    /// The document the error belongs to.
    pub fn filename(&self) -> &str {
        match self {
            Self::DuplicateFile { filename }
            | Self::MalformedSchema { filename, .. }
            | Self::UnsupportedConstruct { filename, .. }
            | Self::UnresolvedNamespace { filename, .. }
            | Self::UnresolvedTypeReference { filename, .. }
            | Self::DuplicateDeclaration { filename, .. }
            | Self::DerivationCycle { filename, .. }
            | Self::FacetNarrowing { filename, .. }
            | Self::NotProcessed { filename } => filename,
        }
    }

    /// Short stable name of the error class, used in CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateFile { .. } => "DuplicateFileError",
            Self::MalformedSchema { .. } => "MalformedSchemaError",
            Self::UnsupportedConstruct { .. } => "UnsupportedConstructError",
            Self::UnresolvedNamespace { .. } => "UnresolvedNamespaceError",
            Self::UnresolvedTypeReference { .. } => "UnresolvedTypeReferenceError",
            Self::DuplicateDeclaration { .. } => "DuplicateDeclarationError",
            Self::DerivationCycle { .. } => "DerivationCycleError",
            Self::FacetNarrowing { .. } => "FacetNarrowingViolation",
            Self::NotProcessed { .. } => "NotProcessedError",
        }
    }
}

/// A batch that failed. Carries every error collected before the batch
/// stopped, fatal and non-fatal alike.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchError {
    errors: Vec<SchemaError>,
}

impl BatchError {
    /// Wrap the collected errors. At least one of them should be fatal.
    pub fn new(errors: Vec<SchemaError>) -> Self {
        Self { errors }
    }

    /// All collected errors, in the order they were found.
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// Only the errors that caused the abort.
    pub fn fatal(&self) -> impl Iterator<Item = &SchemaError> {
        self.errors.iter().filter(|e| e.is_fatal())
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<SchemaError> {
        self.errors
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema batch failed with {} error(s)", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  [{}] {e}", e.code())?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unresolved() -> SchemaError {
        SchemaError::UnresolvedTypeReference {
            filename: "ExampleTypes.xsd".to_string(),
            referencing: "element FirstName".to_string(),
            missing: QName::new("urn:example", "Char_20"),
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(unresolved().is_fatal());
        assert!(SchemaError::DuplicateFile {
            filename: "a.xsd".into()
        }
        .is_fatal());
        assert!(!SchemaError::UnsupportedConstruct {
            filename: "a.xsd".into(),
            location: "complexType T".into(),
            construct: "mixed content".into(),
        }
        .is_fatal());
        assert!(!SchemaError::FacetNarrowing {
            filename: "a.xsd".into(),
            type_name: "T".into(),
            facet: "maxLength".into(),
            base_value: "10".into(),
            value: "20".into(),
        }
        .is_fatal());
    }

    #[test]
    fn test_unresolved_reference_names_both_sides() {
        let msg = unresolved().to_string();
        assert!(msg.contains("element FirstName"));
        assert!(msg.contains("{urn:example}Char_20"));
    }

    #[test]
    fn test_batch_error_lists_every_error() {
        let err = BatchError::new(vec![
            unresolved(),
            SchemaError::UnresolvedNamespace {
                filename: "b.xsd".into(),
                namespace: "urn:missing".into(),
            },
        ]);
        let text = err.to_string();
        assert!(text.contains("2 error(s)"));
        assert!(text.contains("UnresolvedTypeReferenceError"));
        assert!(text.contains("urn:missing"));
        assert_eq!(err.fatal().count(), 2);
    }

    #[test]
    fn test_filename_accessor() {
        assert_eq!(unresolved().filename(), "ExampleTypes.xsd");
    }
}
