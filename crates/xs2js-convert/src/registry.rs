//! # Namespace Registry
//!
//! Owns the schema units of one batch and answers "which documents declare
//! namespace X".
//!
//! ## Two-Phase Barrier
//!
//! Registration and resolution are separate types. [`NamespaceRegistry`]
//! accepts units and attaches parse results; [`SealedRegistry`] answers
//! namespace queries and accepts nothing. Sealing consumes the registry, so
//! no unit can be added once linking has started. Because resolution only
//! happens after sealing, a document may import a namespace declared by a
//! document registered later in the same batch.

use std::collections::BTreeMap;

use xs2js_core::SchemaError;

use crate::ast::{ImportKind, SchemaDocument};

/// One input document of a batch.
#[derive(Debug, Clone)]
pub struct SchemaUnit {
    filename: String,
    identifier: String,
    raw: String,
    document: Option<SchemaDocument>,
}

impl SchemaUnit {
    /// Create a unit from its filename, output identifier and raw text.
    pub fn new(
        filename: impl Into<String>,
        identifier: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            identifier: identifier.into(),
            raw: raw.into(),
            document: None,
        }
    }

    /// Input filename, the unit's identity.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Identifier of the emitted document (`BaseTypes.json`).
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Raw schema text as submitted.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed declarations. `None` until the parse phase attached them.
    pub fn document(&self) -> Option<&SchemaDocument> {
        self.document.as_ref()
    }

    /// `targetNamespace`, empty until parsed or when absent.
    pub fn target_namespace(&self) -> &str {
        self.document
            .as_ref()
            .map(|d| d.target_namespace.as_str())
            .unwrap_or("")
    }

    /// Namespaces this unit imports or includes, deduplicated, in document order.
    pub fn imported_namespaces(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(doc) = &self.document {
            for import in &doc.imports {
                let ns = match import.kind {
                    ImportKind::Import => import.namespace.as_str(),
                    ImportKind::Include => doc.target_namespace.as_str(),
                };
                if !out.contains(&ns) {
                    out.push(ns);
                }
            }
        }
        out
    }
}

/// Registration phase of a batch.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    units: BTreeMap<String, SchemaUnit>,
}

impl NamespaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit keyed by filename.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::DuplicateFile` if the filename, or the output
    /// identifier derived from it, is already registered.
    pub fn register(&mut self, unit: SchemaUnit) -> Result<(), SchemaError> {
        let clash = self.units.contains_key(unit.filename())
            || self
                .units
                .values()
                .any(|u| u.identifier() == unit.identifier());
        if clash {
            return Err(SchemaError::DuplicateFile {
                filename: unit.filename().to_string(),
            });
        }
        self.units.insert(unit.filename().to_string(), unit);
        Ok(())
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Registered units, ordered by filename.
    pub fn units(&self) -> impl Iterator<Item = &SchemaUnit> {
        self.units.values()
    }

    /// Attach parsed declarations to a registered unit.
    pub fn attach(&mut self, filename: &str, document: SchemaDocument) {
        if let Some(unit) = self.units.get_mut(filename) {
            unit.document = Some(document);
        }
    }

    /// End registration and build the namespace index. Units without
    /// attached declarations are dropped.
    pub fn seal(self) -> SealedRegistry {
        let units: BTreeMap<String, SchemaUnit> = self
            .units
            .into_iter()
            .filter(|(_, u)| u.document.is_some())
            .collect();
        let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for unit in units.values() {
            by_namespace
                .entry(unit.target_namespace().to_string())
                .or_default()
                .push(unit.filename().to_string());
        }
        SealedRegistry {
            units,
            by_namespace,
        }
    }
}

/// Resolution phase of a batch. Read-only.
#[derive(Debug)]
pub struct SealedRegistry {
    units: BTreeMap<String, SchemaUnit>,
    by_namespace: BTreeMap<String, Vec<String>>,
}

impl SealedRegistry {
    /// Look up a unit by filename.
    pub fn unit(&self, filename: &str) -> Option<&SchemaUnit> {
        self.units.get(filename)
    }

    /// All units, ordered by filename.
    pub fn units(&self) -> impl Iterator<Item = &SchemaUnit> {
        self.units.values()
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry holds no unit.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether some unit declares `namespace` as its target namespace.
    pub fn declares(&self, namespace: &str) -> bool {
        self.by_namespace.contains_key(namespace)
    }

    /// The units whose target namespace is `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnresolvedNamespace` naming `from` if no unit in
    /// the batch declares the namespace.
    pub fn resolve_import(
        &self,
        from: &SchemaUnit,
        namespace: &str,
    ) -> Result<Vec<&SchemaUnit>, SchemaError> {
        match self.by_namespace.get(namespace) {
            Some(filenames) => Ok(filenames
                .iter()
                .filter_map(|f| self.units.get(f))
                .collect()),
            None => Err(SchemaError::UnresolvedNamespace {
                filename: from.filename().to_string(),
                namespace: namespace.to_string(),
            }),
        }
    }
}
