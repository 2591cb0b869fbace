//! # Conversion Pass
//!
//! One [`Converter`] turns the declarations of one unit into JSON Schema
//! fragments: named types into `definitions`, reused model groups into
//! `definitions/group.<Name>`, global elements into root `properties`.
//!
//! The work is split by concern: [`constraint`] maps simple types and their
//! facets, [`structure`] maps complex types, particles and attributes.
//!
//! ## Recursion
//!
//! A named type is emitted once, in its declaring document, and every use
//! site receives a `$ref` to it. Recursive structures therefore terminate
//! without bookkeeping. Expansions that do inline another declaration (base
//! type chains, model groups, attribute groups) go through the converter's
//! own visited sets; a converter is created per unit and per call, so
//! conversions running on different threads share no state.

pub mod constraint;
pub mod structure;

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use xs2js_core::{QName, SchemaError};

use crate::assembler::ref_string;
use crate::ast::{ElementDecl, TypeDef, TypeNode};
use crate::graph::TypeGraph;
use crate::options::ConversionOptions;
use crate::registry::SchemaUnit;

/// The converted top-level declarations of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedUnit {
    /// `definitions` members: named types and reused model groups.
    pub definitions: Map<String, Value>,
    /// Global elements, as root property name and schema.
    pub elements: Vec<(String, Value)>,
    /// Named types, exposed as root properties that reference their definition.
    pub types: Vec<String>,
}

#[derive(Debug, Default)]
struct Visited {
    simple: BTreeSet<QName>,
    complex: BTreeSet<QName>,
    groups: BTreeSet<QName>,
    attribute_groups: BTreeSet<QName>,
}

/// Converts the declarations of one unit against a linked graph.
pub struct Converter<'g, 'r> {
    graph: &'g TypeGraph<'r>,
    options: &'g ConversionOptions,
    unit: &'r SchemaUnit,
    diagnostics: Vec<SchemaError>,
    visited: Visited,
}

impl<'g, 'r> Converter<'g, 'r> {
    /// A converter for `unit`.
    pub fn new(
        graph: &'g TypeGraph<'r>,
        options: &'g ConversionOptions,
        unit: &'r SchemaUnit,
    ) -> Self {
        Self {
            graph,
            options,
            unit,
            diagnostics: Vec::new(),
            visited: Visited::default(),
        }
    }

    /// Convert every top-level declaration of the unit.
    ///
    /// Returns the converted declarations and every problem found. A
    /// declaration that fails fatally is left out and its error returned;
    /// the others are still converted so a failed batch reports everything.
    pub fn convert_unit(mut self) -> (ConvertedUnit, Vec<SchemaError>) {
        let mut out = ConvertedUnit::default();
        let mut errors = Vec::new();
        let Some(doc) = self.unit.document() else {
            return (out, errors);
        };

        for node in &doc.types {
            self.visited = Visited::default();
            match self.convert_named_type(node) {
                Ok(schema) => {
                    debug!(
                        filename = self.unit.filename(),
                        name = %node.name,
                        "converted type"
                    );
                    out.definitions.insert(node.name.local.clone(), schema);
                    out.types.push(node.name.local.clone());
                }
                Err(e) => errors.push(e),
            }
        }

        for group in &doc.groups {
            if !self.graph.is_reused_group(&group.name) {
                continue;
            }
            self.visited = Visited::default();
            self.visited.groups.insert(group.name.clone());
            match self.group_definition(&group.group, &format!("group {}", group.name.local)) {
                Ok(mut schema) => {
                    if let (Some(doc), Value::Object(map)) = (&group.documentation, &mut schema) {
                        map.insert("description".into(), json!(doc));
                    }
                    debug!(filename = self.unit.filename(), name = %group.name, "converted group");
                    out.definitions
                        .insert(format!("group.{}", group.name.local), schema);
                }
                Err(e) => errors.push(e),
            }
        }

        for element in &doc.elements {
            self.visited = Visited::default();
            let location = format!("element {}", element.name.local);
            match self.element_schema(self.unit, element, &location) {
                Ok(schema) => {
                    debug!(filename = self.unit.filename(), name = %element.name, "converted element");
                    out.elements.push((element.name.local.clone(), schema));
                }
                Err(e) => errors.push(e),
            }
        }

        for diagnostic in &self.diagnostics {
            warn!(code = diagnostic.code(), "{diagnostic}");
        }
        errors.extend(self.diagnostics);
        (out, errors)
    }

    fn convert_named_type(&mut self, node: &TypeNode) -> Result<Value, SchemaError> {
        let schema = match &node.def {
            TypeDef::Simple(simple) => {
                self.visited.simple.insert(node.name.clone());
                self.convert_simple_type(self.unit, simple, &node.name.local, true)?
            }
            TypeDef::Complex(complex) => {
                self.visited.complex.insert(node.name.clone());
                let location = format!("complexType {}", node.name.local);
                self.convert_complex_type(self.unit, complex, &location)?
            }
        };
        let mut extras = Map::new();
        if let Some(doc) = &node.documentation {
            extras.insert("description".into(), json!(doc));
        }
        Ok(with_keywords(schema, extras))
    }

    // ─── Shared Helpers ──────────────────────────────────────────────

    /// A `$ref` to `section/name` in `target`'s document, relative when the
    /// target is the unit being converted.
    fn pointer(&self, target: &SchemaUnit, section: &str, name: &str) -> Value {
        let document = (target.filename() != self.unit.filename()).then(|| target.identifier());
        json!({ "$ref": ref_string(document, section, name) })
    }

    /// External property name of an element or attribute.
    fn property_name(&self, scope: &SchemaUnit, name: &QName, qualified: bool) -> String {
        if self.options.qualified_property_names && qualified && !name.namespace.is_empty() {
            let prefix = scope
                .document()
                .and_then(|d| d.prefix_for(&name.namespace))
                .or_else(|| self.unit.document().and_then(|d| d.prefix_for(&name.namespace)));
            if let Some(prefix) = prefix {
                return format!("{prefix}:{}", name.local);
            }
        }
        name.local.clone()
    }

    /// Record a non-fatal diagnostic. Problems inside declarations of other
    /// units are reported by those units' converters and skipped here.
    fn diagnose(&mut self, scope: &SchemaUnit, location: &str, construct: impl Into<String>) {
        if scope.filename() != self.unit.filename() {
            return;
        }
        self.record(SchemaError::UnsupportedConstruct {
            filename: scope.filename().to_string(),
            location: location.to_string(),
            construct: construct.into(),
        });
    }

    /// Record a diagnostic once. Declarations expanded at several use sites
    /// would otherwise repeat it.
    fn record(&mut self, error: SchemaError) {
        if !self.diagnostics.contains(&error) {
            self.diagnostics.push(error);
        }
    }

    fn unresolved(&self, scope: &SchemaUnit, referencing: &str, missing: &QName) -> SchemaError {
        SchemaError::UnresolvedTypeReference {
            filename: scope.filename().to_string(),
            referencing: referencing.to_string(),
            missing: missing.clone(),
        }
    }

    fn cycle(scope: &SchemaUnit, name: &QName) -> SchemaError {
        SchemaError::DerivationCycle {
            filename: scope.filename().to_string(),
            name: name.clone(),
        }
    }

    /// Schema of an element declaration: its type plus annotation, `fixed`,
    /// `default` and `nillable`.
    fn element_schema(
        &mut self,
        scope: &'r SchemaUnit,
        decl: &ElementDecl,
        location: &str,
    ) -> Result<Value, SchemaError> {
        let base = self.element_type_schema(scope, &decl.type_ref, &decl.name.local, location)?;
        let mut extras = Map::new();
        if let Some(doc) = &decl.documentation {
            extras.insert("description".into(), json!(doc));
        }
        if decl.fixed.is_some() || decl.default.is_some() {
            match self.literal_space(scope, &decl.type_ref) {
                Some(space) => {
                    if let Some(fixed) = &decl.fixed {
                        extras.insert("const".into(), crate::facets::typed_literal(space, fixed));
                    }
                    if let Some(default) = &decl.default {
                        extras.insert("default".into(), crate::facets::typed_literal(space, default));
                    }
                }
                None => self.diagnose(
                    scope,
                    location,
                    "fixed or default value on an element with complex content",
                ),
            }
        }
        let schema = with_keywords(base, extras);
        Ok(if decl.nillable {
            json!({ "anyOf": [schema, { "type": "null" }] })
        } else {
            schema
        })
    }
}

/// Add keywords next to `schema`. A `$ref` ignores sibling keywords in
/// draft-07, so a reference is wrapped in `allOf` first.
pub(crate) fn with_keywords(schema: Value, extras: Map<String, Value>) -> Value {
    if extras.is_empty() {
        return schema;
    }
    match schema {
        Value::Object(mut map) if !map.contains_key("$ref") => {
            map.extend(extras);
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("allOf".into(), json!([other]));
            map.extend(extras);
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_keywords_merges_into_plain_schema() {
        let mut extras = Map::new();
        extras.insert("description".into(), json!("d"));
        let out = with_keywords(json!({"type": "string"}), extras);
        assert_eq!(out, json!({"type": "string", "description": "d"}));
    }

    #[test]
    fn test_with_keywords_wraps_reference() {
        let mut extras = Map::new();
        extras.insert("const".into(), json!("x"));
        let out = with_keywords(json!({"$ref": "#/definitions/T"}), extras);
        assert_eq!(out, json!({"allOf": [{"$ref": "#/definitions/T"}], "const": "x"}));
    }

    #[test]
    fn test_with_keywords_no_extras_is_identity() {
        let schema = json!({"$ref": "A.json#/definitions/T"});
        assert_eq!(with_keywords(schema.clone(), Map::new()), schema);
    }
}
