//! # Type Graph
//!
//! The cross-document declaration index of one batch. Declarations are kept
//! where the parser put them, inside their units; the graph maps each
//! qualified name to a borrowed [`Located`] declaration. References between
//! declarations stay `QName`s and are looked up on demand, so recursive and
//! mutually recursive types need no special representation.
//!
//! ## Linking
//!
//! [`TypeGraph::link_all`] runs once, after the registry is sealed. It:
//!
//! 1. indexes every top-level declaration by kind and qualified name,
//!    rejecting duplicates;
//! 2. resolves every import against the registry;
//! 3. walks every reference of every declaration and checks that it
//!    resolves, in strict or lenient mode;
//! 4. rejects derivation chains and group definitions that loop back on
//!    themselves;
//! 5. counts model group uses, to decide which groups are emitted once and
//!    referenced.
//!
//! Every problem is collected; linking never stops at the first.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use xs2js_core::{QName, SchemaError, XS_NAMESPACE};

use crate::ast::{
    AttributeDecl, AttributeGroupDef, AttributeUse, ComplexContent, ComplexType, ElementDecl,
    ElementType, GroupDef, ImportKind, ModelGroup, Particle, SimpleBase, SimpleType,
    SimpleVariety, Term, TypeDef, TypeNode,
};
use crate::builtins;
use crate::options::{ConversionOptions, ResolutionMode};
use crate::registry::{SchemaUnit, SealedRegistry};

/// Kind of a top-level declaration. Each kind has its own symbol space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclKind {
    /// Named simple or complex type.
    Type,
    /// Global element.
    Element,
    /// Named model group.
    Group,
    /// Global attribute.
    Attribute,
    /// Named attribute group.
    AttributeGroup,
}

impl DeclKind {
    /// The XSD spelling of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Element => "element",
            Self::Group => "group",
            Self::Attribute => "attribute",
            Self::AttributeGroup => "attributeGroup",
        }
    }
}

/// A declaration together with the unit that declares it.
#[derive(Debug)]
pub struct Located<'r, T> {
    /// Declaring unit.
    pub unit: &'r SchemaUnit,
    /// The declaration.
    pub decl: &'r T,
}

impl<T> Clone for Located<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Located<'_, T> {}

/// The linked declaration index of a batch.
#[derive(Debug)]
pub struct TypeGraph<'r> {
    registry: &'r SealedRegistry,
    resolution: ResolutionMode,
    types: BTreeMap<QName, Located<'r, TypeNode>>,
    elements: BTreeMap<QName, Located<'r, ElementDecl>>,
    groups: BTreeMap<QName, Located<'r, GroupDef>>,
    attributes: BTreeMap<QName, Located<'r, AttributeDecl>>,
    attribute_groups: BTreeMap<QName, Located<'r, AttributeGroupDef>>,
    group_uses: BTreeMap<QName, usize>,
}

impl<'r> TypeGraph<'r> {
    /// Index and check every declaration of a sealed registry.
    ///
    /// Returns the graph and every problem found, fatal or not.
    pub fn link_all(
        registry: &'r SealedRegistry,
        options: &ConversionOptions,
    ) -> (Self, Vec<SchemaError>) {
        let mut graph = Self {
            registry,
            resolution: options.resolution,
            types: BTreeMap::new(),
            elements: BTreeMap::new(),
            groups: BTreeMap::new(),
            attributes: BTreeMap::new(),
            attribute_groups: BTreeMap::new(),
            group_uses: BTreeMap::new(),
        };
        let mut errors = Vec::new();
        graph.index(&mut errors);

        for unit in registry.units() {
            let Some(doc) = unit.document() else { continue };
            for import in &doc.imports {
                if import.kind == ImportKind::Import && import.namespace == XS_NAMESPACE {
                    continue;
                }
                if let Err(e) = registry.resolve_import(unit, &import.namespace) {
                    errors.push(e);
                }
            }
        }

        let mut refs = Vec::new();
        for unit in registry.units() {
            collect_unit_refs(unit, &mut refs);
        }
        let mut reported = BTreeSet::new();
        for r in &refs {
            match graph.resolve_name(r.kind, r.unit, &r.name) {
                Some(Resolved { name, aliased }) => {
                    if r.kind == DeclKind::Group {
                        *graph.group_uses.entry(name.clone()).or_default() += 1;
                    }
                    if aliased && reported.insert((r.unit.filename(), r.kind, r.name.clone())) {
                        errors.push(SchemaError::UnsupportedConstruct {
                            filename: r.unit.filename().to_string(),
                            location: r.referencing.clone(),
                            construct: format!(
                                "{} reference {} resolved by local name to {}",
                                r.kind.as_str(),
                                r.name,
                                name
                            ),
                        });
                    }
                }
                None => {
                    if reported.insert((r.unit.filename(), r.kind, r.name.clone())) {
                        errors.push(graph.unresolved(r));
                    }
                }
            }
        }

        graph.check_cycles(&mut errors);

        debug!(
            units = registry.len(),
            types = graph.types.len(),
            elements = graph.elements.len(),
            groups = graph.groups.len(),
            references = refs.len(),
            problems = errors.len(),
            "linked type graph"
        );
        (graph, errors)
    }

    fn index(&mut self, errors: &mut Vec<SchemaError>) {
        let registry = self.registry;
        for unit in registry.units() {
            let Some(doc) = unit.document() else { continue };
            for t in &doc.types {
                insert_unique(&mut self.types, DeclKind::Type, &t.name, unit, t, errors);
            }
            for e in &doc.elements {
                insert_unique(&mut self.elements, DeclKind::Element, &e.name, unit, e, errors);
            }
            for g in &doc.groups {
                insert_unique(&mut self.groups, DeclKind::Group, &g.name, unit, g, errors);
            }
            for a in &doc.attributes {
                insert_unique(&mut self.attributes, DeclKind::Attribute, &a.name, unit, a, errors);
            }
            for ag in &doc.attribute_groups {
                insert_unique(
                    &mut self.attribute_groups,
                    DeclKind::AttributeGroup,
                    &ag.name,
                    unit,
                    ag,
                    errors,
                );
            }
        }
    }

    fn contains(&self, kind: DeclKind, name: &QName) -> bool {
        match kind {
            DeclKind::Type => self.types.contains_key(name),
            DeclKind::Element => self.elements.contains_key(name),
            DeclKind::Group => self.groups.contains_key(name),
            DeclKind::Attribute => self.attributes.contains_key(name),
            DeclKind::AttributeGroup => self.attribute_groups.contains_key(name),
        }
    }

    /// Resolve a reference made from `from`.
    ///
    /// Built-in type names resolve to themselves. A name missing from its
    /// namespace resolves, in lenient mode, to the unique declaration with
    /// the same local name in `from`'s own or imported namespaces.
    pub fn resolve_name(&self, kind: DeclKind, from: &SchemaUnit, name: &QName) -> Option<Resolved> {
        if name.is_builtin() {
            return (kind == DeclKind::Type && builtins::is_known(&name.local)).then(|| Resolved {
                name: name.clone(),
                aliased: false,
            });
        }
        if self.contains(kind, name) {
            return Some(Resolved {
                name: name.clone(),
                aliased: false,
            });
        }
        if self.resolution != ResolutionMode::Lenient {
            return None;
        }
        let mut namespaces = vec![from.target_namespace()];
        for ns in from.imported_namespaces() {
            if !namespaces.contains(&ns) {
                namespaces.push(ns);
            }
        }
        let mut candidates = namespaces
            .into_iter()
            .map(|ns| QName::new(ns, name.local.clone()))
            .filter(|q| self.contains(kind, q));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(Resolved {
                name: only,
                aliased: true,
            }),
            _ => None,
        }
    }

    fn unresolved(&self, r: &Reference<'_>) -> SchemaError {
        let namespace_known = r.name.namespace == XS_NAMESPACE
            || self.registry.declares(&r.name.namespace);
        if namespace_known {
            SchemaError::UnresolvedTypeReference {
                filename: r.unit.filename().to_string(),
                referencing: r.referencing.clone(),
                missing: r.name.clone(),
            }
        } else {
            SchemaError::UnresolvedNamespace {
                filename: r.unit.filename().to_string(),
                namespace: r.name.namespace.clone(),
            }
        }
    }

    // ─── Lookups ─────────────────────────────────────────────────────

    /// The named type a reference from `from` denotes.
    pub fn type_decl(&self, from: &SchemaUnit, name: &QName) -> Option<Located<'r, TypeNode>> {
        let resolved = self.resolve_name(DeclKind::Type, from, name)?;
        self.types.get(&resolved.name).copied()
    }

    /// The global element a reference from `from` denotes.
    pub fn element_decl(&self, from: &SchemaUnit, name: &QName) -> Option<Located<'r, ElementDecl>> {
        let resolved = self.resolve_name(DeclKind::Element, from, name)?;
        self.elements.get(&resolved.name).copied()
    }

    /// The model group a reference from `from` denotes.
    pub fn group_decl(&self, from: &SchemaUnit, name: &QName) -> Option<Located<'r, GroupDef>> {
        let resolved = self.resolve_name(DeclKind::Group, from, name)?;
        self.groups.get(&resolved.name).copied()
    }

    /// The global attribute a reference from `from` denotes.
    pub fn attribute_decl(
        &self,
        from: &SchemaUnit,
        name: &QName,
    ) -> Option<Located<'r, AttributeDecl>> {
        let resolved = self.resolve_name(DeclKind::Attribute, from, name)?;
        self.attributes.get(&resolved.name).copied()
    }

    /// The attribute group a reference from `from` denotes.
    pub fn attribute_group_decl(
        &self,
        from: &SchemaUnit,
        name: &QName,
    ) -> Option<Located<'r, AttributeGroupDef>> {
        let resolved = self.resolve_name(DeclKind::AttributeGroup, from, name)?;
        self.attribute_groups.get(&resolved.name).copied()
    }

    /// Number of references to a model group across the batch.
    pub fn group_use_count(&self, name: &QName) -> usize {
        self.group_uses.get(name).copied().unwrap_or(0)
    }

    /// Whether a model group is referenced more than once and is therefore
    /// emitted once as a definition.
    pub fn is_reused_group(&self, name: &QName) -> bool {
        self.group_use_count(name) > 1
    }

    /// Number of named types in the batch.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // ─── Cycles ──────────────────────────────────────────────────────

    fn check_cycles(&self, errors: &mut Vec<SchemaError>) {
        let mut in_cycle = BTreeSet::new();
        for (name, located) in &self.types {
            if in_cycle.contains(name) {
                continue;
            }
            let mut chain = vec![name.clone()];
            let mut current = *located;
            while let Some(base) = current.decl.base_type() {
                let Some(next) = self.type_decl(current.unit, base) else { break };
                if chain.contains(&next.decl.name) {
                    in_cycle.extend(chain.iter().cloned());
                    errors.push(SchemaError::DerivationCycle {
                        filename: located.unit.filename().to_string(),
                        name: name.clone(),
                    });
                    break;
                }
                chain.push(next.decl.name.clone());
                current = next;
            }
        }

        for (name, located) in &self.groups {
            let mut path = vec![name.clone()];
            if self.group_reaches(located.unit, &located.decl.group, &mut path) {
                errors.push(SchemaError::DerivationCycle {
                    filename: located.unit.filename().to_string(),
                    name: name.clone(),
                });
            }
        }
    }

    /// Whether expanding `group` reaches a group already on `path`.
    fn group_reaches(&self, from: &SchemaUnit, group: &ModelGroup, path: &mut Vec<QName>) -> bool {
        for particle in &group.particles {
            match &particle.term {
                Term::Group(nested) => {
                    if self.group_reaches(from, nested, path) {
                        return true;
                    }
                }
                Term::GroupRef(q) => {
                    let Some(target) = self.group_decl(from, q) else { continue };
                    if path.contains(&target.decl.name) {
                        return true;
                    }
                    path.push(target.decl.name.clone());
                    let found = self.group_reaches(target.unit, &target.decl.group, path);
                    path.pop();
                    if found {
                        return true;
                    }
                }
                Term::Element(_) | Term::ElementRef(_) | Term::Any => {}
            }
        }
        false
    }
}

/// Outcome of resolving a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The declaration's actual name.
    pub name: QName,
    /// Found by the lenient local-name fallback.
    pub aliased: bool,
}

fn insert_unique<'r, T>(
    map: &mut BTreeMap<QName, Located<'r, T>>,
    kind: DeclKind,
    name: &QName,
    unit: &'r SchemaUnit,
    decl: &'r T,
    errors: &mut Vec<SchemaError>,
) {
    if let Some(first) = map.get(name) {
        errors.push(SchemaError::DuplicateDeclaration {
            filename: unit.filename().to_string(),
            kind: kind.as_str(),
            name: name.clone(),
            first_filename: first.unit.filename().to_string(),
        });
        return;
    }
    map.insert(name.clone(), Located { unit, decl });
}

// ─── Reference Walk ──────────────────────────────────────────────────

struct Reference<'r> {
    unit: &'r SchemaUnit,
    kind: DeclKind,
    name: QName,
    referencing: String,
}

struct RefCollector<'a, 'r> {
    unit: &'r SchemaUnit,
    out: &'a mut Vec<Reference<'r>>,
}

fn collect_unit_refs<'r>(unit: &'r SchemaUnit, out: &mut Vec<Reference<'r>>) {
    let Some(doc) = unit.document() else { return };
    let mut c = RefCollector { unit, out };
    for t in &doc.types {
        let location = format!("type {}", t.name.local);
        match &t.def {
            TypeDef::Simple(s) => c.simple(s, &location),
            TypeDef::Complex(ct) => c.complex(ct, &location),
        }
    }
    for e in &doc.elements {
        c.element(e, &format!("element {}", e.name.local));
    }
    for g in &doc.groups {
        c.model_group(&g.group, &format!("group {}", g.name.local));
    }
    for a in &doc.attributes {
        c.attribute(a, &format!("attribute {}", a.name.local));
    }
    for ag in &doc.attribute_groups {
        c.attribute_uses(&ag.attributes, &format!("attributeGroup {}", ag.name.local));
    }
}

impl RefCollector<'_, '_> {
    fn push(&mut self, kind: DeclKind, name: &QName, location: &str) {
        self.out.push(Reference {
            unit: self.unit,
            kind,
            name: name.clone(),
            referencing: location.to_string(),
        });
    }

    fn simple_base(&mut self, base: &SimpleBase, location: &str) {
        match base {
            SimpleBase::Named(q) => self.push(DeclKind::Type, q, location),
            SimpleBase::Inline(s) => self.simple(s, location),
        }
    }

    fn simple(&mut self, s: &SimpleType, location: &str) {
        match &s.variety {
            SimpleVariety::Restriction { base, .. } => self.simple_base(base, location),
            SimpleVariety::List { item } => self.simple_base(item, location),
            SimpleVariety::Union { members } => {
                for m in members {
                    self.simple_base(m, location);
                }
            }
        }
    }

    fn complex(&mut self, ct: &ComplexType, location: &str) {
        match &ct.content {
            ComplexContent::Empty => {}
            ComplexContent::Particle(p) => self.particle(p, location),
            ComplexContent::Extension { base, particle }
            | ComplexContent::Restriction { base, particle } => {
                self.push(DeclKind::Type, base, location);
                if let Some(p) = particle {
                    self.particle(p, location);
                }
            }
            ComplexContent::Simple { base, .. } => self.push(DeclKind::Type, base, location),
        }
        self.attribute_uses(&ct.attributes, location);
    }

    fn particle(&mut self, p: &Particle, location: &str) {
        match &p.term {
            Term::Element(e) => self.element(e, &format!("{location}/element {}", e.name.local)),
            Term::ElementRef(q) => self.push(DeclKind::Element, q, location),
            Term::Group(g) => self.model_group(g, location),
            Term::GroupRef(q) => self.push(DeclKind::Group, q, location),
            Term::Any => {}
        }
    }

    fn model_group(&mut self, g: &ModelGroup, location: &str) {
        for p in &g.particles {
            self.particle(p, location);
        }
    }

    fn element(&mut self, e: &ElementDecl, location: &str) {
        match &e.type_ref {
            ElementType::Named(q) => self.push(DeclKind::Type, q, location),
            ElementType::Simple(s) => self.simple(s, location),
            ElementType::Complex(ct) => self.complex(ct, location),
            ElementType::Any => {}
        }
    }

    fn attribute(&mut self, a: &AttributeDecl, location: &str) {
        if let Some(t) = &a.type_ref {
            self.simple_base(t, location);
        }
    }

    fn attribute_uses(&mut self, uses: &[AttributeUse], location: &str) {
        for u in uses {
            match u {
                AttributeUse::Local { decl, .. } => {
                    self.attribute(decl, &format!("{location}/@{}", decl.name.local))
                }
                AttributeUse::Ref { name, .. } => self.push(DeclKind::Attribute, name, location),
                AttributeUse::GroupRef(q) => self.push(DeclKind::AttributeGroup, q, location),
            }
        }
    }
}
