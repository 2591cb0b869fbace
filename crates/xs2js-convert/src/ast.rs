//! # Schema Declarations
//!
//! The abstract syntax produced by the parser for one XSD document. Every
//! reference to another declaration is stored as a `QName` and resolved by
//! lookup at conversion time, never as an embedded pointer: the declaration
//! graph of a batch can be cyclic (type A holds an element of type B which
//! holds an element of type A) and spans documents.

use xs2js_core::QName;

// ─── Document ────────────────────────────────────────────────────────

/// Whether local declarations are namespace-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Form {
    /// Local names carry the target namespace.
    Qualified,
    /// Local names are in no namespace.
    #[default]
    Unqualified,
}

impl Form {
    pub(crate) fn parse(value: Option<&str>, default: Form) -> Form {
        match value {
            Some("qualified") => Form::Qualified,
            Some("unqualified") => Form::Unqualified,
            _ => default,
        }
    }
}

/// `xs:import` or `xs:include`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// Pulls in declarations of another namespace.
    Import,
    /// Pulls in declarations of the same namespace from another document.
    Include,
}

/// A namespace dependency declared at the top of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Import or include.
    pub kind: ImportKind,
    /// Namespace URI of the dependency. Empty for a no-namespace import.
    pub namespace: String,
    /// `schemaLocation` hint, informational only: resolution is by namespace.
    pub location: Option<String>,
}

/// Everything parsed out of one `xs:schema` document.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    /// `targetNamespace`, empty when absent.
    pub target_namespace: String,
    /// `elementFormDefault`.
    pub element_form_default: Form,
    /// `attributeFormDefault`.
    pub attribute_form_default: Form,
    /// Prefix bindings declared on the `xs:schema` element. The empty key is
    /// the default namespace.
    pub prefixes: Vec<(String, String)>,
    /// Imports and includes, in document order.
    pub imports: Vec<Import>,
    /// Top-level `xs:annotation/xs:documentation`.
    pub documentation: Option<String>,
    /// Named simple and complex types.
    pub types: Vec<TypeNode>,
    /// Global element declarations.
    pub elements: Vec<ElementDecl>,
    /// Named model groups.
    pub groups: Vec<GroupDef>,
    /// Global attribute declarations.
    pub attributes: Vec<AttributeDecl>,
    /// Named attribute groups.
    pub attribute_groups: Vec<AttributeGroupDef>,
}

impl SchemaDocument {
    /// The prefix bound to `namespace` on the schema element, if any.
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(prefix, uri)| !prefix.is_empty() && uri == namespace)
            .map(|(prefix, _)| prefix.as_str())
    }
}

// ─── Types ───────────────────────────────────────────────────────────

/// A named top-level type. Unique per qualified name across a batch.
#[derive(Debug, Clone)]
pub struct TypeNode {
    /// Qualified name of the type.
    pub name: QName,
    /// Simple or complex definition.
    pub def: TypeDef,
    /// `xs:annotation/xs:documentation`.
    pub documentation: Option<String>,
}

impl TypeNode {
    /// The base type a restriction or extension derives from, if any.
    pub fn base_type(&self) -> Option<&QName> {
        match &self.def {
            TypeDef::Simple(simple) => match &simple.variety {
                SimpleVariety::Restriction {
                    base: SimpleBase::Named(q),
                    ..
                } => Some(q),
                _ => None,
            },
            TypeDef::Complex(complex) => complex.content.base(),
        }
    }
}

/// Simple or complex type definition.
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// `xs:simpleType`.
    Simple(SimpleType),
    /// `xs:complexType`.
    Complex(ComplexType),
}

/// `xs:simpleType` body.
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// Restriction, list or union.
    pub variety: SimpleVariety,
}

/// The three ways to define a simple type.
#[derive(Debug, Clone)]
pub enum SimpleVariety {
    /// Restriction of a base type by facets.
    Restriction {
        /// Type being restricted.
        base: SimpleBase,
        /// Facets in document order.
        facets: Vec<Facet>,
    },
    /// Whitespace-separated list of an item type.
    List {
        /// Item type.
        item: SimpleBase,
    },
    /// Value of any of the member types.
    Union {
        /// Member types, in declaration order.
        members: Vec<SimpleBase>,
    },
}

/// Reference to a simple type: by name or inline.
#[derive(Debug, Clone)]
pub enum SimpleBase {
    /// Named type, built-in or user-defined.
    Named(QName),
    /// Anonymous nested `xs:simpleType`.
    Inline(Box<SimpleType>),
}

/// A constraining facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    /// Which facet.
    pub kind: FacetKind,
    /// Lexical value, as written.
    pub value: String,
}

/// The facets the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// `xs:length`.
    Length,
    /// `xs:minLength`.
    MinLength,
    /// `xs:maxLength`.
    MaxLength,
    /// `xs:pattern`.
    Pattern,
    /// `xs:enumeration`.
    Enumeration,
    /// `xs:minInclusive`.
    MinInclusive,
    /// `xs:maxInclusive`.
    MaxInclusive,
    /// `xs:minExclusive`.
    MinExclusive,
    /// `xs:maxExclusive`.
    MaxExclusive,
    /// `xs:totalDigits`.
    TotalDigits,
    /// `xs:fractionDigits`.
    FractionDigits,
    /// `xs:whiteSpace`. Accepted and ignored: JSON strings are not normalized.
    WhiteSpace,
}

impl FacetKind {
    /// Map an XSD facet element name to its kind.
    pub fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "length" => Self::Length,
            "minLength" => Self::MinLength,
            "maxLength" => Self::MaxLength,
            "pattern" => Self::Pattern,
            "enumeration" => Self::Enumeration,
            "minInclusive" => Self::MinInclusive,
            "maxInclusive" => Self::MaxInclusive,
            "minExclusive" => Self::MinExclusive,
            "maxExclusive" => Self::MaxExclusive,
            "totalDigits" => Self::TotalDigits,
            "fractionDigits" => Self::FractionDigits,
            "whiteSpace" => Self::WhiteSpace,
            _ => return None,
        })
    }

    /// The XSD spelling of the facet.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Pattern => "pattern",
            Self::Enumeration => "enumeration",
            Self::MinInclusive => "minInclusive",
            Self::MaxInclusive => "maxInclusive",
            Self::MinExclusive => "minExclusive",
            Self::MaxExclusive => "maxExclusive",
            Self::TotalDigits => "totalDigits",
            Self::FractionDigits => "fractionDigits",
            Self::WhiteSpace => "whiteSpace",
        }
    }
}

/// `xs:complexType` body.
#[derive(Debug, Clone, Default)]
pub struct ComplexType {
    /// Content model.
    pub content: ComplexContent,
    /// Attribute uses declared directly on the type (or on its derivation).
    pub attributes: Vec<AttributeUse>,
    /// `xs:anyAttribute` present.
    pub any_attribute: bool,
    /// `mixed="true"`.
    pub mixed: bool,
}

/// Content model of a complex type.
#[derive(Debug, Clone, Default)]
pub enum ComplexContent {
    /// No child elements.
    #[default]
    Empty,
    /// A model group directly under the type.
    Particle(Particle),
    /// `complexContent/extension`: base content followed by `particle`.
    Extension {
        /// Base complex type.
        base: QName,
        /// Added content.
        particle: Option<Particle>,
    },
    /// `complexContent/restriction`: `particle` replaces the base content.
    Restriction {
        /// Base complex type.
        base: QName,
        /// Restricted content.
        particle: Option<Particle>,
    },
    /// `simpleContent`: character data plus attributes.
    Simple {
        /// Simple type or simple-content complex type the text derives from.
        base: QName,
        /// Extension or restriction.
        derivation: Derivation,
        /// Facets of a restriction.
        facets: Vec<Facet>,
    },
}

impl ComplexContent {
    /// The base type of a derivation, if any.
    pub fn base(&self) -> Option<&QName> {
        match self {
            Self::Extension { base, .. }
            | Self::Restriction { base, .. }
            | Self::Simple { base, .. } => Some(base),
            Self::Empty | Self::Particle(_) => None,
        }
    }
}

/// Derivation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// `xs:extension`.
    Extension,
    /// `xs:restriction`.
    Restriction,
}

// ─── Particles ───────────────────────────────────────────────────────

/// Upper occurrence bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MaxOccurs {
    /// At most this many.
    Bounded(u64),
    /// `maxOccurs="unbounded"`.
    Unbounded,
}

impl MaxOccurs {
    /// Product of two upper bounds.
    pub fn times(self, other: MaxOccurs) -> MaxOccurs {
        match (self, other) {
            (MaxOccurs::Bounded(a), MaxOccurs::Bounded(b)) => MaxOccurs::Bounded(a.saturating_mul(b)),
            (MaxOccurs::Bounded(0), _) | (_, MaxOccurs::Bounded(0)) => MaxOccurs::Bounded(0),
            _ => MaxOccurs::Unbounded,
        }
    }

    /// Sum of two upper bounds.
    pub fn plus(self, other: MaxOccurs) -> MaxOccurs {
        match (self, other) {
            (MaxOccurs::Bounded(a), MaxOccurs::Bounded(b)) => MaxOccurs::Bounded(a.saturating_add(b)),
            _ => MaxOccurs::Unbounded,
        }
    }

    /// Whether more than one occurrence is allowed.
    pub fn is_repeated(self) -> bool {
        !matches!(self, MaxOccurs::Bounded(0) | MaxOccurs::Bounded(1))
    }
}

/// A term with occurrence bounds.
#[derive(Debug, Clone)]
pub struct Particle {
    /// `minOccurs`, default 1.
    pub min_occurs: u64,
    /// `maxOccurs`, default 1.
    pub max_occurs: MaxOccurs,
    /// What occurs.
    pub term: Term,
}

/// The content of a particle.
#[derive(Debug, Clone)]
pub enum Term {
    /// Local element declaration.
    Element(ElementDecl),
    /// `xs:element ref=`.
    ElementRef(QName),
    /// Nested `xs:sequence`, `xs:choice` or `xs:all`.
    Group(ModelGroup),
    /// `xs:group ref=`.
    GroupRef(QName),
    /// `xs:any` wildcard.
    Any,
}

/// Compositor of a model group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    /// `xs:sequence`.
    Sequence,
    /// `xs:choice`.
    Choice,
    /// `xs:all`.
    All,
}

/// A compositor with its member particles.
#[derive(Debug, Clone)]
pub struct ModelGroup {
    /// Sequence, choice or all.
    pub compositor: Compositor,
    /// Members in document order.
    pub particles: Vec<Particle>,
}

// ─── Declarations ────────────────────────────────────────────────────

/// The type of an element.
#[derive(Debug, Clone)]
pub enum ElementType {
    /// `type="..."`.
    Named(QName),
    /// Nested anonymous simple type.
    Simple(SimpleType),
    /// Nested anonymous complex type.
    Complex(Box<ComplexType>),
    /// No type given: `xs:anyType`.
    Any,
}

/// An element declaration, global or local.
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Qualified name. Local unqualified elements have an empty namespace.
    pub name: QName,
    /// Whether the name is namespace-qualified in instances.
    pub qualified: bool,
    /// Declared type.
    pub type_ref: ElementType,
    /// `nillable="true"`.
    pub nillable: bool,
    /// `default` literal.
    pub default: Option<String>,
    /// `fixed` literal.
    pub fixed: Option<String>,
    /// `xs:annotation/xs:documentation`.
    pub documentation: Option<String>,
}

/// `use` of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUseKind {
    /// `use="optional"`, the default.
    #[default]
    Optional,
    /// `use="required"`.
    Required,
    /// `use="prohibited"`.
    Prohibited,
}

/// An attribute declaration, global or local.
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    /// Qualified name.
    pub name: QName,
    /// Whether the name is namespace-qualified in instances.
    pub qualified: bool,
    /// Declared simple type, `None` for `xs:anySimpleType`.
    pub type_ref: Option<SimpleBase>,
    /// `default` literal.
    pub default: Option<String>,
    /// `fixed` literal.
    pub fixed: Option<String>,
    /// `xs:annotation/xs:documentation`.
    pub documentation: Option<String>,
}

/// An attribute slot of a complex type or attribute group.
#[derive(Debug, Clone)]
pub enum AttributeUse {
    /// Local declaration.
    Local {
        /// The declaration.
        decl: AttributeDecl,
        /// Required, optional or prohibited.
        use_kind: AttributeUseKind,
    },
    /// `xs:attribute ref=`.
    Ref {
        /// Global attribute referenced.
        name: QName,
        /// Required, optional or prohibited.
        use_kind: AttributeUseKind,
        /// Default overriding the global one.
        default: Option<String>,
        /// Fixed value overriding the global one.
        fixed: Option<String>,
    },
    /// `xs:attributeGroup ref=`.
    GroupRef(QName),
}

/// A named model group, `xs:group name=`.
#[derive(Debug, Clone)]
pub struct GroupDef {
    /// Qualified name.
    pub name: QName,
    /// The group's compositor and members.
    pub group: ModelGroup,
    /// `xs:annotation/xs:documentation`.
    pub documentation: Option<String>,
}

/// A named attribute group, `xs:attributeGroup name=`.
#[derive(Debug, Clone)]
pub struct AttributeGroupDef {
    /// Qualified name.
    pub name: QName,
    /// Members.
    pub attributes: Vec<AttributeUse>,
    /// `xs:anyAttribute` present.
    pub any_attribute: bool,
}
