//! # Constraint Converter
//!
//! Maps simple types to JSON Schema. A restriction chain is walked from the
//! derived type down to its built-in root and flattened into one
//! [`EffectiveFacets`] value, so the emitted definition carries every
//! inherited constraint itself instead of referencing its base.
//!
//! Facet problems are reported against the declaration that states the
//! facet, and only while converting that declaration. Walking a base type
//! of another document does not repeat its diagnostics.

use serde_json::{json, Value};
use xs2js_core::{QName, SchemaError};

use super::Converter;
use crate::ast::{ElementType, FacetKind, SimpleBase, SimpleType, SimpleVariety, TypeDef};
use crate::builtins::{self, Builtin, ValueSpace};
use crate::facets::{EffectiveFacets, FacetIssue};
use crate::registry::SchemaUnit;

/// The flattened form of a simple type.
#[derive(Debug, Clone)]
pub(crate) enum SimpleShape {
    /// An atomic type: its built-in root and effective facets.
    Atomic {
        builtin: &'static Builtin,
        facets: EffectiveFacets,
    },
    /// `xs:list`: item schema and the list's length facets.
    List { item: Value, facets: EffectiveFacets },
    /// `xs:union`: member schemas.
    Union { members: Vec<Value> },
}

impl SimpleShape {
    fn render(&self) -> Value {
        match self {
            Self::Atomic { builtin, facets } => Value::Object(facets.render(builtin)),
            Self::List { item, facets } => {
                let mut out = serde_json::Map::new();
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), item.clone());
                if let Some(n) = facets.min_length {
                    out.insert("minItems".into(), json!(n));
                }
                if let Some(n) = facets.max_length {
                    out.insert("maxItems".into(), json!(n));
                }
                Value::Object(out)
            }
            Self::Union { members } => json!({ "anyOf": members }),
        }
    }
}

impl<'g, 'r> Converter<'g, 'r> {
    /// Convert a simple type declared in `scope`.
    ///
    /// `type_name` names the type (or the element or attribute carrying an
    /// anonymous type) in diagnostics. Facet problems are recorded only when
    /// `report` is set.
    pub fn convert_simple_type(
        &mut self,
        scope: &'r SchemaUnit,
        simple: &SimpleType,
        type_name: &str,
        report: bool,
    ) -> Result<Value, SchemaError> {
        Ok(self.simple_shape(scope, simple, type_name, report)?.render())
    }

    pub(crate) fn simple_shape(
        &mut self,
        scope: &'r SchemaUnit,
        simple: &SimpleType,
        type_name: &str,
        report: bool,
    ) -> Result<SimpleShape, SchemaError> {
        match &simple.variety {
            SimpleVariety::Restriction { base, facets } => {
                let mut shape = self.restriction_base(scope, base, type_name, report)?;
                let issues = match &mut shape {
                    SimpleShape::Atomic { builtin, facets: effective } => {
                        effective.apply(facets, builtin.space)
                    }
                    SimpleShape::List {
                        facets: effective, ..
                    } => {
                        let (lengths, others): (Vec<_>, Vec<_>) =
                            facets.iter().cloned().partition(|f| {
                                matches!(
                                    f.kind,
                                    FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength
                                )
                            });
                        let mut issues = effective.apply(&lengths, ValueSpace::String);
                        issues.extend(
                            others
                                .iter()
                                .filter(|f| f.kind != FacetKind::WhiteSpace)
                                .map(|f| FacetIssue::NotApplicable { facet: f.kind }),
                        );
                        issues
                    }
                    SimpleShape::Union { .. } => facets
                        .iter()
                        .filter(|f| f.kind != FacetKind::WhiteSpace)
                        .map(|f| FacetIssue::NotApplicable { facet: f.kind })
                        .collect(),
                };
                if report {
                    for issue in issues {
                        self.record_issue(scope, type_name, issue);
                    }
                }
                Ok(shape)
            }
            SimpleVariety::List { item } => {
                let item = self.simple_base_schema(scope, item, type_name, report)?;
                Ok(SimpleShape::List {
                    item,
                    facets: EffectiveFacets::default(),
                })
            }
            SimpleVariety::Union { members } => {
                let members = members
                    .iter()
                    .map(|m| self.simple_base_schema(scope, m, type_name, report))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SimpleShape::Union { members })
            }
        }
    }

    /// The flattened shape a restriction starts from.
    fn restriction_base(
        &mut self,
        scope: &'r SchemaUnit,
        base: &SimpleBase,
        type_name: &str,
        report: bool,
    ) -> Result<SimpleShape, SchemaError> {
        let name = match base {
            SimpleBase::Inline(inline) => return self.simple_shape(scope, inline, type_name, report),
            SimpleBase::Named(name) => name,
        };
        if name.is_builtin() {
            return self.builtin_shape(scope, name, type_name);
        }
        let located = self
            .graph
            .type_decl(scope, name)
            .ok_or_else(|| self.unresolved(scope, &format!("simpleType {type_name}"), name))?;
        match &located.decl.def {
            TypeDef::Simple(base_simple) => {
                let base_name = located.decl.name.clone();
                if !self.visited.simple.insert(base_name.clone()) {
                    return Err(Self::cycle(scope, &base_name));
                }
                let result = self.simple_shape(located.unit, base_simple, &base_name.local, false);
                self.visited.simple.remove(&base_name);
                result
            }
            TypeDef::Complex(_) => {
                self.diagnose(
                    scope,
                    &format!("simpleType {type_name}"),
                    format!("simple type restricting complex type {}", located.decl.name),
                );
                self.builtin_shape(scope, &QName::xs("anySimpleType"), type_name)
            }
        }
    }

    fn builtin_shape(
        &self,
        scope: &SchemaUnit,
        name: &QName,
        type_name: &str,
    ) -> Result<SimpleShape, SchemaError> {
        let local = if name.local == "anyType" {
            "anySimpleType"
        } else {
            name.local.as_str()
        };
        let builtin = builtins::lookup(local)
            .ok_or_else(|| self.unresolved(scope, &format!("simpleType {type_name}"), name))?;
        Ok(SimpleShape::Atomic {
            builtin,
            facets: EffectiveFacets::for_builtin(builtin),
        })
    }

    /// Schema for a simple type used by a list, union or attribute: built-ins
    /// inline, named types by reference, anonymous types converted in place.
    pub(crate) fn simple_base_schema(
        &mut self,
        scope: &'r SchemaUnit,
        base: &SimpleBase,
        type_name: &str,
        report: bool,
    ) -> Result<Value, SchemaError> {
        match base {
            SimpleBase::Named(name) => self.type_reference(scope, name, &format!("simpleType {type_name}")),
            SimpleBase::Inline(inline) => self.convert_simple_type(scope, inline, type_name, report),
        }
    }

    /// Schema for a type referenced by name: built-ins inline, user types as
    /// a reference to their definition.
    pub(crate) fn type_reference(
        &self,
        scope: &SchemaUnit,
        name: &QName,
        referencing: &str,
    ) -> Result<Value, SchemaError> {
        if name.is_builtin() {
            return builtins::schema_for(&name.local)
                .ok_or_else(|| self.unresolved(scope, referencing, name));
        }
        let located = self
            .graph
            .type_decl(scope, name)
            .ok_or_else(|| self.unresolved(scope, referencing, name))?;
        Ok(self.pointer(located.unit, "definitions", &located.decl.name.local))
    }

    /// Schema of an element's declared type.
    pub(crate) fn element_type_schema(
        &mut self,
        scope: &'r SchemaUnit,
        type_ref: &ElementType,
        element_name: &str,
        location: &str,
    ) -> Result<Value, SchemaError> {
        match type_ref {
            ElementType::Named(name) => self.type_reference(scope, name, location),
            ElementType::Simple(simple) => self.convert_simple_type(scope, simple, element_name, true),
            ElementType::Complex(complex) => self.convert_complex_type(scope, complex, location),
            ElementType::Any => Ok(json!({})),
        }
    }

    /// Value space used to type `fixed` and `default` literals of an
    /// element. `None` for complex and untyped content.
    pub(crate) fn literal_space(&mut self, scope: &'r SchemaUnit, type_ref: &ElementType) -> Option<ValueSpace> {
        match type_ref {
            ElementType::Named(name) => self.named_space(scope, name),
            ElementType::Simple(simple) => self.shape_space(scope, simple),
            ElementType::Complex(_) | ElementType::Any => None,
        }
    }

    /// Value space of a simple type given by name, for attribute literals.
    pub(crate) fn named_space(&mut self, scope: &'r SchemaUnit, name: &QName) -> Option<ValueSpace> {
        if name.is_builtin() {
            return builtins::lookup(&name.local).map(|b| b.space);
        }
        let located = self.graph.type_decl(scope, name)?;
        match &located.decl.def {
            TypeDef::Simple(simple) => self.shape_space(located.unit, simple),
            TypeDef::Complex(_) => None,
        }
    }

    pub(crate) fn shape_space(&mut self, scope: &'r SchemaUnit, simple: &SimpleType) -> Option<ValueSpace> {
        match self.simple_shape(scope, simple, "", false).ok()? {
            SimpleShape::Atomic { builtin, .. } => Some(builtin.space),
            SimpleShape::List { .. } | SimpleShape::Union { .. } => Some(ValueSpace::String),
        }
    }

    fn record_issue(&mut self, scope: &SchemaUnit, type_name: &str, issue: FacetIssue) {
        if scope.filename() != self.unit.filename() {
            return;
        }
        let location = format!("simpleType {type_name}");
        match issue {
            FacetIssue::Narrowing {
                facet,
                base_value,
                value,
            } => self.record(SchemaError::FacetNarrowing {
                filename: scope.filename().to_string(),
                type_name: type_name.to_string(),
                facet: facet.as_str().to_string(),
                base_value,
                value,
            }),
            FacetIssue::NotApplicable { facet } => self.diagnose(
                scope,
                &location,
                format!("facet {} has no JSON Schema mapping for this type; ignored", facet.as_str()),
            ),
            FacetIssue::Invalid { facet, value } => self.diagnose(
                scope,
                &location,
                format!("invalid {} value '{value}'; ignored", facet.as_str()),
            ),
            FacetIssue::Partial { facet, detail } => self.diagnose(
                scope,
                &location,
                format!("facet {}: {detail}", facet.as_str()),
            ),
            FacetIssue::Untranslatable { value, reason } => self.diagnose(
                scope,
                &location,
                format!("pattern '{value}' uses {reason}; ignored"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::batch::process_all_schemas;
    use crate::options::ConversionOptions;

    fn convert(raw: &str) -> crate::BatchResult {
        process_all_schemas(&[("T.xsd", raw)], &ConversionOptions::default()).expect("batch")
    }

    fn schema(types: &str) -> String {
        format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="urn:t" targetNamespace="urn:t">{types}</xs:schema>"#
        )
    }

    #[test]
    fn test_restriction_chain_flattened() {
        let result = convert(&schema(
            r#"<xs:simpleType name="C"><xs:restriction base="xs:string"><xs:minLength value="1"/></xs:restriction></xs:simpleType>
               <xs:simpleType name="Char_20"><xs:restriction base="C"><xs:maxLength value="20"/></xs:restriction></xs:simpleType>"#,
        ));
        let doc = result.get_result("T.xsd").unwrap();
        assert_eq!(
            doc.json_schema()["definitions"]["Char_20"],
            json!({"type": "string", "minLength": 1, "maxLength": 20})
        );
    }

    #[test]
    fn test_narrowing_violation_recorded_and_base_kept() {
        let result = convert(&schema(
            r#"<xs:simpleType name="Short"><xs:restriction base="xs:string"><xs:maxLength value="5"/></xs:restriction></xs:simpleType>
               <xs:simpleType name="Wider"><xs:restriction base="Short"><xs:maxLength value="50"/></xs:restriction></xs:simpleType>"#,
        ));
        let doc = result.get_result("T.xsd").unwrap();
        assert_eq!(doc.json_schema()["definitions"]["Wider"]["maxLength"], 5);
        let narrowing: Vec<_> = result
            .diagnostics()
            .iter()
            .filter(|d| d.code() == "FacetNarrowingViolation")
            .collect();
        assert_eq!(narrowing.len(), 1);
        assert!(narrowing[0].to_string().contains("Wider"));
    }

    #[test]
    fn test_enumeration_typed_for_integers() {
        let result = convert(&schema(
            r#"<xs:simpleType name="Level"><xs:restriction base="xs:int">
                 <xs:enumeration value="1"/><xs:enumeration value="2"/>
               </xs:restriction></xs:simpleType>"#,
        ));
        let def = &result.get_result("T.xsd").unwrap().json_schema()["definitions"]["Level"];
        assert_eq!(def["enum"], json!([1, 2]));
        assert_eq!(def["type"], "integer");
    }

    #[test]
    fn test_numeric_enumeration_narrowing_by_value() {
        let result = convert(&schema(
            r#"<xs:simpleType name="Level"><xs:restriction base="xs:int">
                 <xs:enumeration value="1"/><xs:enumeration value="2"/>
               </xs:restriction></xs:simpleType>
               <xs:simpleType name="Low"><xs:restriction base="Level">
                 <xs:enumeration value="01"/>
               </xs:restriction></xs:simpleType>"#,
        ));
        assert!(result.diagnostics().is_empty());
        let def = &result.get_result("T.xsd").unwrap().json_schema()["definitions"]["Low"];
        assert_eq!(def["enum"], json!([1]));
    }

    #[test]
    fn test_special_float_enumeration_diagnosed() {
        let result = convert(&schema(
            r#"<xs:simpleType name="Limit"><xs:restriction base="xs:double">
                 <xs:enumeration value="0.5"/><xs:enumeration value="INF"/>
               </xs:restriction></xs:simpleType>"#,
        ));
        let def = &result.get_result("T.xsd").unwrap().json_schema()["definitions"]["Limit"];
        assert_eq!(def["enum"], json!([0.5]));
        assert_eq!(result.diagnostics().len(), 1);
        let message = result.diagnostics()[0].to_string();
        assert!(message.contains("simpleType Limit") && message.contains("'INF'"));
    }

    #[test]
    fn test_list_and_union() {
        let result = convert(&schema(
            r#"<xs:simpleType name="Code"><xs:restriction base="xs:string"><xs:length value="2"/></xs:restriction></xs:simpleType>
               <xs:simpleType name="Codes"><xs:list itemType="Code"/></xs:simpleType>
               <xs:simpleType name="FewCodes"><xs:restriction base="Codes"><xs:maxLength value="3"/></xs:restriction></xs:simpleType>
               <xs:simpleType name="CodeOrNumber"><xs:union memberTypes="Code xs:int"/></xs:simpleType>"#,
        ));
        let defs = &result.get_result("T.xsd").unwrap().json_schema()["definitions"];
        assert_eq!(
            defs["Codes"],
            json!({"type": "array", "items": {"$ref": "#/definitions/Code"}})
        );
        assert_eq!(defs["FewCodes"]["maxItems"], 3);
        assert_eq!(
            defs["CodeOrNumber"]["anyOf"][0],
            json!({"$ref": "#/definitions/Code"})
        );
        assert_eq!(defs["CodeOrNumber"]["anyOf"][1]["type"], "integer");
    }

    #[test]
    fn test_date_bounds_reported_unsupported() {
        let result = convert(&schema(
            r#"<xs:simpleType name="Recent"><xs:restriction base="xs:date"><xs:minInclusive value="2000-01-01"/></xs:restriction></xs:simpleType>"#,
        ));
        let def = &result.get_result("T.xsd").unwrap().json_schema()["definitions"]["Recent"];
        assert_eq!(def, &json!({"type": "string", "format": "date"}));
        assert!(result
            .diagnostics()
            .iter()
            .any(|d| d.code() == "UnsupportedConstructError" && d.to_string().contains("minInclusive")));
    }
}
