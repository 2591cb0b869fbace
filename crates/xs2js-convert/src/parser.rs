//! # Schema Parser
//!
//! Turns the raw text of one schema unit into a [`SchemaDocument`].
//!
//! ## Prefix Resolution
//!
//! QName-valued attributes (`type`, `base`, `ref`, `itemType`,
//! `memberTypes`) are resolved against the in-scope namespace declarations
//! of the node that carries them, not only those of `xs:schema`: a
//! reference such as `type="q1:PersonNameType" xmlns:q1="..."` declares its
//! prefix on the element itself. An unprefixed name takes the node's default
//! namespace. An undeclared prefix makes the document malformed.
//!
//! ## Failure Model
//!
//! Markup that cannot be read (not XML, root is not `xs:schema`, bad
//! occurrence bounds, undeclared prefixes) fails the unit with
//! `MalformedSchema`. Constructs the converter recognizes but does not map
//! (assertions, identity constraints, notations, redefinitions) are skipped
//! and recorded as `UnsupportedConstruct` diagnostics.

use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;
use xs2js_core::{QName, SchemaError, XS_NAMESPACE};

use crate::ast::{
    AttributeDecl, AttributeGroupDef, AttributeUse, AttributeUseKind, ComplexContent, ComplexType,
    Compositor, Derivation, ElementDecl, ElementType, Facet, FacetKind, Form, GroupDef, Import,
    ImportKind, MaxOccurs, ModelGroup, Particle, SchemaDocument, SimpleBase, SimpleType,
    SimpleVariety, Term, TypeDef, TypeNode,
};
use crate::registry::SchemaUnit;

/// Declarations and non-fatal diagnostics of one parsed unit.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// The parsed declarations.
    pub document: SchemaDocument,
    /// Unsupported constructs that were skipped.
    pub diagnostics: Vec<SchemaError>,
}

/// Parse a registered unit.
///
/// # Errors
///
/// Returns `SchemaError::MalformedSchema` when the text cannot be read as a
/// schema document.
pub fn parse(unit: &SchemaUnit) -> Result<ParseOutcome, SchemaError> {
    parse_schema(unit.filename(), unit.raw())
}

/// Parse raw schema text on behalf of `filename`.
///
/// # Errors
///
/// Returns `SchemaError::MalformedSchema` when the text cannot be read as a
/// schema document.
pub fn parse_schema(filename: &str, raw: &str) -> Result<ParseOutcome, SchemaError> {
    // Inline schema literals often carry indentation before the XML declaration.
    let text = raw.trim_start();
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, opts).map_err(|e| SchemaError::MalformedSchema {
        filename: filename.to_string(),
        reason: format!("XML: {e}"),
    })?;

    let root = doc.root_element();
    if !is_xs(&root, "schema") {
        return Err(SchemaError::MalformedSchema {
            filename: filename.to_string(),
            reason: format!(
                "root element must be xs:schema, found '{}'",
                root.tag_name().name()
            ),
        });
    }

    let mut parser = Parser::new(filename, &root);
    let document = parser.parse_schema(&root)?;
    debug!(
        filename,
        target_namespace = %document.target_namespace,
        types = document.types.len(),
        elements = document.elements.len(),
        groups = document.groups.len(),
        diagnostics = parser.diagnostics.len(),
        "parsed schema unit"
    );
    Ok(ParseOutcome {
        document,
        diagnostics: parser.diagnostics,
    })
}

// ─── Node Helpers ────────────────────────────────────────────────────

fn is_xs(node: &Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XS_NAMESPACE)
        && node.tag_name().name() == local
}

/// Element children in the XML Schema namespace, annotations excluded.
fn xs_children<'a, 'input>(node: &Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| {
        c.is_element()
            && c.tag_name().namespace() == Some(XS_NAMESPACE)
            && c.tag_name().name() != "annotation"
    })
}

/// Text of `xs:annotation/xs:documentation` children, trimmed and joined.
fn documentation(node: &Node<'_, '_>) -> Option<String> {
    let parts: Vec<String> = node
        .children()
        .filter(|c| is_xs(c, "annotation"))
        .flat_map(|a| a.children().filter(|c| is_xs(c, "documentation")))
        .map(|d| {
            d.descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect::<String>()
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

// ─── Parser ──────────────────────────────────────────────────────────

struct Parser<'f> {
    filename: &'f str,
    target_namespace: String,
    element_form_default: Form,
    attribute_form_default: Form,
    diagnostics: Vec<SchemaError>,
}

impl<'f> Parser<'f> {
    fn new(filename: &'f str, root: &Node<'_, '_>) -> Self {
        Self {
            filename,
            target_namespace: root.attribute("targetNamespace").unwrap_or("").to_string(),
            element_form_default: Form::parse(
                root.attribute("elementFormDefault"),
                Form::Unqualified,
            ),
            attribute_form_default: Form::parse(
                root.attribute("attributeFormDefault"),
                Form::Unqualified,
            ),
            diagnostics: Vec::new(),
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::MalformedSchema {
            filename: self.filename.to_string(),
            reason: reason.into(),
        }
    }

    fn unsupported(&mut self, location: &str, construct: impl Into<String>) {
        self.diagnostics.push(SchemaError::UnsupportedConstruct {
            filename: self.filename.to_string(),
            location: location.to_string(),
            construct: construct.into(),
        });
    }

    fn required_attr<'a>(
        &self,
        node: &Node<'a, '_>,
        attr: &str,
        location: &str,
    ) -> Result<&'a str, SchemaError> {
        node.attribute(attr).ok_or_else(|| {
            self.malformed(format!(
                "{location}: <{}> is missing attribute '{attr}'",
                node.tag_name().name()
            ))
        })
    }

    /// Resolve a QName-valued attribute against the node's in-scope prefixes.
    fn resolve_qname(&self, node: &Node<'_, '_>, value: &str) -> Result<QName, SchemaError> {
        let value = value.trim();
        match value.split_once(':') {
            Some((prefix, local)) => {
                let ns = node.lookup_namespace_uri(Some(prefix)).ok_or_else(|| {
                    self.malformed(format!("undeclared prefix '{prefix}' in '{value}'"))
                })?;
                Ok(QName::new(ns, local))
            }
            None => Ok(QName::new(
                node.lookup_namespace_uri(None).unwrap_or(""),
                value,
            )),
        }
    }

    fn qname_attr(
        &self,
        node: &Node<'_, '_>,
        attr: &str,
    ) -> Result<Option<QName>, SchemaError> {
        node.attribute(attr)
            .map(|v| self.resolve_qname(node, v))
            .transpose()
    }

    fn global_name(&self, local: &str) -> QName {
        QName::new(self.target_namespace.clone(), local)
    }

    /// Namespace of a local element or attribute given its `form` attribute.
    fn local_qualified(&self, node: &Node<'_, '_>, default: Form) -> bool {
        Form::parse(node.attribute("form"), default) == Form::Qualified
    }

    fn local_name(&self, local: &str, qualified: bool) -> QName {
        if qualified {
            self.global_name(local)
        } else {
            QName::new("", local)
        }
    }

    // ─── Top Level ───────────────────────────────────────────────────

    fn parse_schema(&mut self, root: &Node<'_, '_>) -> Result<SchemaDocument, SchemaError> {
        let mut doc = SchemaDocument {
            target_namespace: self.target_namespace.clone(),
            element_form_default: self.element_form_default,
            attribute_form_default: self.attribute_form_default,
            prefixes: root
                .namespaces()
                .map(|ns| (ns.name().unwrap_or("").to_string(), ns.uri().to_string()))
                .collect(),
            documentation: documentation(root),
            ..SchemaDocument::default()
        };

        for child in xs_children(root) {
            match child.tag_name().name() {
                "import" => doc.imports.push(Import {
                    kind: ImportKind::Import,
                    namespace: child.attribute("namespace").unwrap_or("").to_string(),
                    location: child.attribute("schemaLocation").map(str::to_string),
                }),
                "include" => doc.imports.push(Import {
                    kind: ImportKind::Include,
                    namespace: self.target_namespace.clone(),
                    location: child.attribute("schemaLocation").map(str::to_string),
                }),
                kind @ ("redefine" | "override") => {
                    // Treated as a plain include; the redefinitions are dropped.
                    self.unsupported("schema", format!("xs:{kind}"));
                    doc.imports.push(Import {
                        kind: ImportKind::Include,
                        namespace: self.target_namespace.clone(),
                        location: child.attribute("schemaLocation").map(str::to_string),
                    });
                }
                "simpleType" => {
                    let name = self.required_attr(&child, "name", "schema")?;
                    let location = format!("simpleType {name}");
                    let simple = self.parse_simple_type(&child, &location)?;
                    doc.types.push(TypeNode {
                        name: self.global_name(name),
                        def: TypeDef::Simple(simple),
                        documentation: documentation(&child),
                    });
                }
                "complexType" => {
                    let name = self.required_attr(&child, "name", "schema")?;
                    let location = format!("complexType {name}");
                    let complex = self.parse_complex_type(&child, &location)?;
                    doc.types.push(TypeNode {
                        name: self.global_name(name),
                        def: TypeDef::Complex(complex),
                        documentation: documentation(&child),
                    });
                }
                "element" => {
                    let name = self.required_attr(&child, "name", "schema")?;
                    let location = format!("element {name}");
                    let qname = self.global_name(name);
                    let decl = self.parse_element_decl(&child, qname, true, &location)?;
                    doc.elements.push(decl);
                }
                "group" => {
                    let name = self.required_attr(&child, "name", "schema")?;
                    let location = format!("group {name}");
                    let group = xs_children(&child)
                        .find(|c| matches!(c.tag_name().name(), "sequence" | "choice" | "all"))
                        .map(|c| self.parse_model_group(&c, &location))
                        .transpose()?
                        .ok_or_else(|| {
                            self.malformed(format!("{location}: group without a compositor"))
                        })?;
                    doc.groups.push(GroupDef {
                        name: self.global_name(name),
                        group,
                        documentation: documentation(&child),
                    });
                }
                "attribute" => {
                    let name = self.required_attr(&child, "name", "schema")?;
                    let location = format!("attribute {name}");
                    let qname = self.global_name(name);
                    let decl = self.parse_attribute_decl(&child, qname, true, &location)?;
                    doc.attributes.push(decl);
                }
                "attributeGroup" => {
                    let name = self.required_attr(&child, "name", "schema")?;
                    let location = format!("attributeGroup {name}");
                    let (attributes, any_attribute) =
                        self.parse_attribute_uses(&child, &location)?;
                    doc.attribute_groups.push(AttributeGroupDef {
                        name: self.global_name(name),
                        attributes,
                        any_attribute,
                    });
                }
                other => self.unsupported("schema", format!("xs:{other}")),
            }
        }
        Ok(doc)
    }

    // ─── Simple Types ────────────────────────────────────────────────

    fn parse_simple_type(
        &mut self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<SimpleType, SchemaError> {
        for child in xs_children(node) {
            match child.tag_name().name() {
                "restriction" => {
                    let base = self.simple_base(&child, "base", location)?;
                    let facets = self.parse_facets(&child, location)?;
                    return Ok(SimpleType {
                        variety: SimpleVariety::Restriction { base, facets },
                    });
                }
                "list" => {
                    let item = self.simple_base(&child, "itemType", location)?;
                    return Ok(SimpleType {
                        variety: SimpleVariety::List { item },
                    });
                }
                "union" => {
                    let mut members = Vec::new();
                    if let Some(list) = child.attribute("memberTypes") {
                        for name in list.split_whitespace() {
                            members.push(SimpleBase::Named(self.resolve_qname(&child, name)?));
                        }
                    }
                    for inline in xs_children(&child).filter(|c| c.tag_name().name() == "simpleType") {
                        let nested = self.parse_simple_type(&inline, location)?;
                        members.push(SimpleBase::Inline(Box::new(nested)));
                    }
                    if members.is_empty() {
                        return Err(self.malformed(format!("{location}: union without member types")));
                    }
                    return Ok(SimpleType {
                        variety: SimpleVariety::Union { members },
                    });
                }
                other => self.unsupported(location, format!("xs:{other} in simpleType")),
            }
        }
        Err(self.malformed(format!(
            "{location}: simpleType without restriction, list or union"
        )))
    }

    /// A named base from `attr`, or the nested anonymous `xs:simpleType`.
    fn simple_base(
        &mut self,
        node: &Node<'_, '_>,
        attr: &str,
        location: &str,
    ) -> Result<SimpleBase, SchemaError> {
        if let Some(name) = self.qname_attr(node, attr)? {
            return Ok(SimpleBase::Named(name));
        }
        match xs_children(node).find(|c| c.tag_name().name() == "simpleType") {
            Some(inline) => Ok(SimpleBase::Inline(Box::new(
                self.parse_simple_type(&inline, location)?,
            ))),
            None => Err(self.malformed(format!(
                "{location}: <{}> needs '{attr}' or a nested simpleType",
                node.tag_name().name()
            ))),
        }
    }

    fn parse_facets(
        &mut self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<Vec<Facet>, SchemaError> {
        let mut facets = Vec::new();
        for child in xs_children(node) {
            let name = child.tag_name().name();
            match FacetKind::from_local_name(name) {
                Some(kind) => {
                    let value = self.required_attr(&child, "value", location)?;
                    facets.push(Facet {
                        kind,
                        value: value.to_string(),
                    });
                }
                // Nested base type and attribute declarations are read elsewhere.
                None if matches!(
                    name,
                    "simpleType" | "attribute" | "attributeGroup" | "anyAttribute"
                ) => {}
                None => self.unsupported(location, format!("facet xs:{name}")),
            }
        }
        Ok(facets)
    }

    // ─── Complex Types ───────────────────────────────────────────────

    fn parse_complex_type(
        &mut self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<ComplexType, SchemaError> {
        let mut complex = ComplexType {
            mixed: node.attribute("mixed") == Some("true"),
            ..ComplexType::default()
        };
        let (attributes, any_attribute) = self.parse_attribute_uses(node, location)?;
        complex.attributes = attributes;
        complex.any_attribute = any_attribute;

        for child in xs_children(node) {
            match child.tag_name().name() {
                "sequence" | "choice" | "all" => {
                    let particle = self.parse_particle_group(&child, location)?;
                    complex.content = ComplexContent::Particle(particle);
                }
                "group" => {
                    let particle = self.parse_group_ref(&child, location)?;
                    complex.content = ComplexContent::Particle(particle);
                }
                "simpleContent" => {
                    let (derivation_node, derivation) = self.derivation_child(&child, location)?;
                    let base = self.derivation_base(&derivation_node, location)?;
                    let facets = match derivation {
                        Derivation::Restriction => self.parse_facets(&derivation_node, location)?,
                        Derivation::Extension => Vec::new(),
                    };
                    let (attributes, any_attribute) =
                        self.parse_attribute_uses(&derivation_node, location)?;
                    complex.attributes.extend(attributes);
                    complex.any_attribute |= any_attribute;
                    complex.content = ComplexContent::Simple {
                        base,
                        derivation,
                        facets,
                    };
                }
                "complexContent" => {
                    if child.attribute("mixed") == Some("true") {
                        complex.mixed = true;
                    }
                    let (derivation_node, derivation) = self.derivation_child(&child, location)?;
                    let base = self.derivation_base(&derivation_node, location)?;
                    let mut particle = None;
                    for inner in xs_children(&derivation_node) {
                        match inner.tag_name().name() {
                            "sequence" | "choice" | "all" => {
                                particle = Some(self.parse_particle_group(&inner, location)?);
                            }
                            "group" => particle = Some(self.parse_group_ref(&inner, location)?),
                            "attribute" | "attributeGroup" | "anyAttribute" => {}
                            other => self.unsupported(location, format!("xs:{other} in complexContent")),
                        }
                    }
                    let (attributes, any_attribute) =
                        self.parse_attribute_uses(&derivation_node, location)?;
                    complex.attributes.extend(attributes);
                    complex.any_attribute |= any_attribute;
                    complex.content = match derivation {
                        Derivation::Extension => ComplexContent::Extension { base, particle },
                        Derivation::Restriction => ComplexContent::Restriction { base, particle },
                    };
                }
                "attribute" | "attributeGroup" | "anyAttribute" => {}
                other => self.unsupported(location, format!("xs:{other} in complexType")),
            }
        }
        Ok(complex)
    }

    fn derivation_child<'a, 'input>(
        &self,
        node: &Node<'a, 'input>,
        location: &str,
    ) -> Result<(Node<'a, 'input>, Derivation), SchemaError> {
        xs_children(node)
            .find_map(|c| match c.tag_name().name() {
                "extension" => Some((c, Derivation::Extension)),
                "restriction" => Some((c, Derivation::Restriction)),
                _ => None,
            })
            .ok_or_else(|| {
                self.malformed(format!(
                    "{location}: <{}> without extension or restriction",
                    node.tag_name().name()
                ))
            })
    }

    fn derivation_base(&self, node: &Node<'_, '_>, location: &str) -> Result<QName, SchemaError> {
        let base = self.required_attr(node, "base", location)?;
        self.resolve_qname(node, base)
    }

    // ─── Particles ───────────────────────────────────────────────────

    fn parse_occurs(
        &self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<(u64, MaxOccurs), SchemaError> {
        let min = match node.attribute("minOccurs") {
            None => 1,
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                self.malformed(format!("{location}: invalid minOccurs '{v}'"))
            })?,
        };
        let max = match node.attribute("maxOccurs").map(str::trim) {
            None => MaxOccurs::Bounded(1),
            Some("unbounded") => MaxOccurs::Unbounded,
            Some(v) => MaxOccurs::Bounded(v.parse::<u64>().map_err(|_| {
                self.malformed(format!("{location}: invalid maxOccurs '{v}'"))
            })?),
        };
        if let MaxOccurs::Bounded(m) = max {
            if m < min {
                return Err(self.malformed(format!(
                    "{location}: maxOccurs {m} is below minOccurs {min}"
                )));
            }
        }
        Ok((min, max))
    }

    fn parse_particle_group(
        &mut self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<Particle, SchemaError> {
        let (min_occurs, max_occurs) = self.parse_occurs(node, location)?;
        let group = self.parse_model_group(node, location)?;
        Ok(Particle {
            min_occurs,
            max_occurs,
            term: Term::Group(group),
        })
    }

    fn parse_group_ref(
        &mut self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<Particle, SchemaError> {
        let (min_occurs, max_occurs) = self.parse_occurs(node, location)?;
        let name = self.required_attr(node, "ref", location)?;
        Ok(Particle {
            min_occurs,
            max_occurs,
            term: Term::GroupRef(self.resolve_qname(node, name)?),
        })
    }

    fn parse_model_group(
        &mut self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<ModelGroup, SchemaError> {
        let compositor = match node.tag_name().name() {
            "choice" => Compositor::Choice,
            "all" => Compositor::All,
            _ => Compositor::Sequence,
        };
        let location = format!("{location}/{}", node.tag_name().name());
        let mut particles = Vec::new();
        for child in xs_children(node) {
            match child.tag_name().name() {
                "element" => particles.push(self.parse_element_particle(&child, &location)?),
                "sequence" | "choice" | "all" => {
                    particles.push(self.parse_particle_group(&child, &location)?)
                }
                "group" => particles.push(self.parse_group_ref(&child, &location)?),
                "any" => {
                    let (min_occurs, max_occurs) = self.parse_occurs(&child, &location)?;
                    particles.push(Particle {
                        min_occurs,
                        max_occurs,
                        term: Term::Any,
                    });
                }
                other => self.unsupported(&location, format!("xs:{other} in model group")),
            }
        }
        Ok(ModelGroup {
            compositor,
            particles,
        })
    }

    fn parse_element_particle(
        &mut self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<Particle, SchemaError> {
        let (min_occurs, max_occurs) = self.parse_occurs(node, location)?;
        let term = match self.qname_attr(node, "ref")? {
            Some(target) => Term::ElementRef(target),
            None => {
                let name = self.required_attr(node, "name", location)?;
                let qualified = self.local_qualified(node, self.element_form_default);
                let qname = self.local_name(name, qualified);
                let location = format!("{location}/element {name}");
                Term::Element(self.parse_element_decl(node, qname, qualified, &location)?)
            }
        };
        Ok(Particle {
            min_occurs,
            max_occurs,
            term,
        })
    }

    // ─── Declarations ────────────────────────────────────────────────

    fn parse_element_decl(
        &mut self,
        node: &Node<'_, '_>,
        name: QName,
        qualified: bool,
        location: &str,
    ) -> Result<ElementDecl, SchemaError> {
        let mut type_ref = match self.qname_attr(node, "type")? {
            Some(q) => ElementType::Named(q),
            None => ElementType::Any,
        };
        for child in xs_children(node) {
            match child.tag_name().name() {
                "simpleType" => {
                    type_ref = ElementType::Simple(self.parse_simple_type(&child, location)?);
                }
                "complexType" => {
                    type_ref = ElementType::Complex(Box::new(
                        self.parse_complex_type(&child, location)?,
                    ));
                }
                other @ ("key" | "keyref" | "unique") => {
                    self.unsupported(location, format!("identity constraint xs:{other}"));
                }
                other => self.unsupported(location, format!("xs:{other} in element")),
            }
        }
        if node.attribute("substitutionGroup").is_some() {
            self.unsupported(location, "substitutionGroup");
        }
        Ok(ElementDecl {
            name,
            qualified: qualified && !self.target_namespace.is_empty(),
            type_ref,
            nillable: node.attribute("nillable") == Some("true"),
            default: node.attribute("default").map(str::to_string),
            fixed: node.attribute("fixed").map(str::to_string),
            documentation: documentation(node),
        })
    }

    fn parse_attribute_decl(
        &mut self,
        node: &Node<'_, '_>,
        name: QName,
        qualified: bool,
        location: &str,
    ) -> Result<AttributeDecl, SchemaError> {
        let type_ref = match self.qname_attr(node, "type")? {
            Some(q) => Some(SimpleBase::Named(q)),
            None => xs_children(node)
                .find(|c| c.tag_name().name() == "simpleType")
                .map(|c| self.parse_simple_type(&c, location))
                .transpose()?
                .map(|s| SimpleBase::Inline(Box::new(s))),
        };
        Ok(AttributeDecl {
            name,
            qualified: qualified && !self.target_namespace.is_empty(),
            type_ref,
            default: node.attribute("default").map(str::to_string),
            fixed: node.attribute("fixed").map(str::to_string),
            documentation: documentation(node),
        })
    }

    fn parse_use(&self, node: &Node<'_, '_>, location: &str) -> Result<AttributeUseKind, SchemaError> {
        match node.attribute("use") {
            None | Some("optional") => Ok(AttributeUseKind::Optional),
            Some("required") => Ok(AttributeUseKind::Required),
            Some("prohibited") => Ok(AttributeUseKind::Prohibited),
            Some(other) => Err(self.malformed(format!("{location}: invalid use '{other}'"))),
        }
    }

    /// Attribute uses declared directly under `node`, plus whether an
    /// `xs:anyAttribute` wildcard is present.
    fn parse_attribute_uses(
        &mut self,
        node: &Node<'_, '_>,
        location: &str,
    ) -> Result<(Vec<AttributeUse>, bool), SchemaError> {
        let mut uses = Vec::new();
        let mut any_attribute = false;
        for child in xs_children(node) {
            match child.tag_name().name() {
                "attribute" => {
                    let use_kind = self.parse_use(&child, location)?;
                    match self.qname_attr(&child, "ref")? {
                        Some(name) => uses.push(AttributeUse::Ref {
                            name,
                            use_kind,
                            default: child.attribute("default").map(str::to_string),
                            fixed: child.attribute("fixed").map(str::to_string),
                        }),
                        None => {
                            let local = self.required_attr(&child, "name", location)?;
                            let qualified =
                                self.local_qualified(&child, self.attribute_form_default);
                            let qname = self.local_name(local, qualified);
                            let location = format!("{location}/@{local}");
                            let decl =
                                self.parse_attribute_decl(&child, qname, qualified, &location)?;
                            uses.push(AttributeUse::Local { decl, use_kind });
                        }
                    }
                }
                "attributeGroup" => {
                    let name = self.required_attr(&child, "ref", location)?;
                    uses.push(AttributeUse::GroupRef(self.resolve_qname(&child, name)?));
                }
                "anyAttribute" => any_attribute = true,
                _ => {}
            }
        }
        Ok((uses, any_attribute))
    }
}
