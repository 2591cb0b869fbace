//! # Structure Converter
//!
//! Maps complex types to object shapes. A content model is walked once and
//! collected into an [`ObjectShape`]: one slot per element or attribute
//! name, with the occurrence bounds of every enclosing particle multiplied
//! in. The shape is then rendered:
//!
//! - `maxOccurs` above one makes the property an array, with `minItems`
//!   and `maxItems` from the effective bounds;
//! - an effective `minOccurs` of at least one makes it required;
//! - each `xs:choice` becomes a `oneOf` whose branches are made mutually
//!   exclusive by the member names they carry;
//! - a named model group used more than once is referenced from
//!   `#/definitions/group.<Name>` instead of being inlined.
//!
//! Sequences and `xs:all` flatten into the parent's property set, so
//! element order is not validated.

use serde_json::{json, Map, Value};
use xs2js_core::{QName, SchemaError};

use super::{with_keywords, Converter};
use crate::ast::{
    AttributeDecl, AttributeUse, AttributeUseKind, ComplexContent, ComplexType, Compositor,
    Derivation, Facet, MaxOccurs, ModelGroup, Particle, SimpleBase, SimpleType, SimpleVariety,
    Term, TypeDef,
};
use crate::builtins::{self, ValueSpace};
use crate::facets::typed_literal;
use crate::registry::SchemaUnit;

// ─── Object Shapes ───────────────────────────────────────────────────

/// One property of an object shape.
#[derive(Debug, Clone, PartialEq)]
struct Slot {
    item: Value,
    min: u64,
    max: MaxOccurs,
    required: bool,
    attribute: bool,
}

impl Slot {
    fn render(self) -> Value {
        if !self.max.is_repeated() {
            return self.item;
        }
        let mut out = Map::new();
        out.insert("type".into(), json!("array"));
        out.insert("items".into(), self.item);
        if self.min > 0 {
            out.insert("minItems".into(), json!(self.min));
        }
        if let MaxOccurs::Bounded(n) = self.max {
            out.insert("maxItems".into(), json!(n));
        }
        Value::Object(out)
    }
}

/// How a slot joins a shape that already has one of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    /// Another occurrence in the same content model: bounds add up.
    Repeat,
    /// Another branch of the same choice: the wider bound wins.
    Alternative,
}

/// The collected content of a complex type or model group.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectShape {
    properties: Vec<(String, Slot)>,
    choices: Vec<Value>,
    group_refs: Vec<Value>,
    text: Option<Value>,
    open: bool,
}

impl ObjectShape {
    fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|(n, _)| n == name)
    }

    fn names(&self) -> Vec<String> {
        self.properties.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Add an element slot. Returns `false` when the name was already taken
    /// by an attribute, in which case the slot is dropped.
    fn add_element(&mut self, name: String, slot: Slot, merge: Merge) -> bool {
        let Some(i) = self.position(&name) else {
            self.properties.push((name, slot));
            return true;
        };
        let existing = &mut self.properties[i].1;
        if existing.attribute {
            return false;
        }
        if existing.item != slot.item {
            let previous = std::mem::take(&mut existing.item);
            existing.item = json!({ "anyOf": [previous, slot.item] });
        }
        match merge {
            Merge::Repeat => {
                existing.min = existing.min.saturating_add(slot.min);
                existing.max = existing.max.plus(slot.max);
                existing.required |= slot.required;
            }
            Merge::Alternative => {
                existing.min = existing.min.min(slot.min);
                existing.max = existing.max.max(slot.max);
                existing.required &= slot.required;
            }
        }
        true
    }

    /// Add an attribute slot. A later attribute of the same name replaces
    /// the earlier one (a derived type overriding its base). Returns `false`
    /// when the name is taken by an element.
    fn add_attribute(&mut self, name: String, item: Value, required: bool) -> bool {
        let slot = Slot {
            item,
            min: u64::from(required),
            max: MaxOccurs::Bounded(1),
            required,
            attribute: true,
        };
        match self.position(&name) {
            Some(i) if self.properties[i].1.attribute => {
                self.properties[i].1 = slot;
                true
            }
            Some(_) => false,
            None => {
                self.properties.push((name, slot));
                true
            }
        }
    }

    fn remove_attribute(&mut self, name: &str) {
        self.properties.retain(|(n, s)| !(s.attribute && n == name));
    }

    fn render(self, closed: bool, text_property: &str) -> Value {
        let mut out = Map::new();
        out.insert("type".into(), json!("object"));

        let mut properties = Map::new();
        let mut required = Vec::new();
        if let Some(text) = self.text {
            properties.insert(text_property.to_string(), text);
            required.push(json!(text_property));
        }
        for (name, slot) in self.properties {
            if slot.required {
                required.push(json!(name));
            }
            properties.insert(name, slot.render());
        }
        if !properties.is_empty() {
            out.insert("properties".into(), Value::Object(properties));
        }
        if !required.is_empty() {
            out.insert("required".into(), Value::Array(required));
        }
        if closed && !self.open {
            out.insert("additionalProperties".into(), json!(false));
        }

        let mut constraints = self.choices;
        constraints.extend(self.group_refs);
        if constraints.len() == 1 {
            match constraints.pop() {
                Some(Value::Object(map)) if !map.contains_key("$ref") => out.extend(map),
                Some(other) => {
                    out.insert("allOf".into(), json!([other]));
                }
                None => {}
            }
        } else if !constraints.is_empty() {
            out.insert("allOf".into(), Value::Array(constraints));
        }
        Value::Object(out)
    }
}

/// `{"required": [name]}` for each name.
fn presence(names: &[String]) -> Vec<Value> {
    names.iter().map(|n| json!({ "required": [n] })).collect()
}

/// Which parts of a base type a derivation inherits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inherit {
    /// Content model and attributes (extension).
    Full,
    /// Attributes only (restriction replaces the content model).
    AttributesOnly,
}

// ─── Complex Types ───────────────────────────────────────────────────

impl<'g, 'r> Converter<'g, 'r> {
    /// Convert a complex type declared in `scope`.
    pub fn convert_complex_type(
        &mut self,
        scope: &'r SchemaUnit,
        complex: &ComplexType,
        location: &str,
    ) -> Result<Value, SchemaError> {
        let mut shape = ObjectShape::default();
        self.collect_complex(scope, complex, &mut shape, location, Inherit::Full)?;
        Ok(shape.render(self.options.closed(), &self.options.text_property))
    }

    /// The definition of a reused model group. The object is left open: the
    /// types that reference the group list its members themselves and decide
    /// whether unknown members are allowed.
    pub(crate) fn group_definition(
        &mut self,
        group: &ModelGroup,
        location: &str,
    ) -> Result<Value, SchemaError> {
        let mut shape = ObjectShape::default();
        let unit = self.unit;
        self.collect_group(unit, group, 1, MaxOccurs::Bounded(1), &mut shape, location, true)?;
        Ok(shape.render(false, &self.options.text_property))
    }

    fn collect_complex(
        &mut self,
        scope: &'r SchemaUnit,
        complex: &ComplexType,
        shape: &mut ObjectShape,
        location: &str,
        inherit: Inherit,
    ) -> Result<(), SchemaError> {
        if complex.mixed && inherit == Inherit::Full {
            self.diagnose(scope, location, "mixed content; character data ignored");
        }
        let full = inherit == Inherit::Full;
        let one = MaxOccurs::Bounded(1);
        match &complex.content {
            ComplexContent::Empty => {}
            ComplexContent::Particle(particle) => {
                if full {
                    self.collect_particle(scope, particle, 1, one, shape, location, false)?;
                }
            }
            ComplexContent::Extension { base, particle } => {
                self.collect_base(scope, base, shape, location, inherit)?;
                if let (true, Some(p)) = (full, particle) {
                    self.collect_particle(scope, p, 1, one, shape, location, false)?;
                }
            }
            ComplexContent::Restriction { base, particle } => {
                self.collect_base(scope, base, shape, location, Inherit::AttributesOnly)?;
                if let (true, Some(p)) = (full, particle) {
                    self.collect_particle(scope, p, 1, one, shape, location, false)?;
                }
            }
            ComplexContent::Simple {
                base,
                derivation,
                facets,
            } => self.simple_content(scope, base, *derivation, facets, shape, location)?,
        }
        self.collect_attributes(scope, &complex.attributes, shape, location)?;
        if complex.any_attribute {
            shape.open = true;
        }
        Ok(())
    }

    /// Collect what a `complexContent` derivation inherits from its base.
    fn collect_base(
        &mut self,
        scope: &'r SchemaUnit,
        base: &QName,
        shape: &mut ObjectShape,
        location: &str,
        inherit: Inherit,
    ) -> Result<(), SchemaError> {
        if base.is_builtin() {
            if base.local != "anyType" {
                self.diagnose(scope, location, format!("complex content derived from {base}"));
            }
            return Ok(());
        }
        let located = self
            .graph
            .type_decl(scope, base)
            .ok_or_else(|| self.unresolved(scope, location, base))?;
        match &located.decl.def {
            TypeDef::Complex(base_complex) => {
                let name = located.decl.name.clone();
                if !self.visited.complex.insert(name.clone()) {
                    return Err(Self::cycle(scope, &name));
                }
                let result = self.collect_complex(located.unit, base_complex, shape, location, inherit);
                self.visited.complex.remove(&name);
                result
            }
            TypeDef::Simple(_) => {
                self.diagnose(
                    scope,
                    location,
                    format!("complex content derived from simple type {}", located.decl.name),
                );
                Ok(())
            }
        }
    }

    /// `simpleContent`: the character data becomes the text property.
    fn simple_content(
        &mut self,
        scope: &'r SchemaUnit,
        base: &QName,
        derivation: Derivation,
        facets: &[Facet],
        shape: &mut ObjectShape,
        location: &str,
    ) -> Result<(), SchemaError> {
        let type_name = location.rsplit(' ').next().unwrap_or(location);
        let base_complex = if base.is_builtin() {
            None
        } else {
            let located = self
                .graph
                .type_decl(scope, base)
                .ok_or_else(|| self.unresolved(scope, location, base))?;
            match &located.decl.def {
                TypeDef::Complex(complex) => Some((located, complex)),
                TypeDef::Simple(_) => None,
            }
        };

        let Some((located, complex)) = base_complex else {
            shape.text = Some(if derivation == Derivation::Restriction && !facets.is_empty() {
                let restricted = restriction_of(base, facets);
                self.convert_simple_type(scope, &restricted, type_name, true)?
            } else {
                self.type_reference(scope, base, location)?
            });
            return Ok(());
        };

        let name = located.decl.name.clone();
        if !self.visited.complex.insert(name.clone()) {
            return Err(Self::cycle(scope, &name));
        }
        let result = self.collect_complex(located.unit, complex, shape, location, Inherit::Full);
        self.visited.complex.remove(&name);
        result?;

        if derivation == Derivation::Restriction && !facets.is_empty() {
            match self.text_root(located.unit, &name) {
                Some((root_scope, root)) => {
                    let restricted = restriction_of(&root, facets);
                    let narrowed = self.convert_simple_type(root_scope, &restricted, type_name, false)?;
                    shape.text = Some(match shape.text.take() {
                        Some(inherited) => json!({ "allOf": [inherited, narrowed] }),
                        None => narrowed,
                    });
                }
                None => self.diagnose(
                    scope,
                    location,
                    format!("facets restricting {name}, which has no simple content"),
                ),
            }
        }
        Ok(())
    }

    /// The simple type at the bottom of a chain of `simpleContent` types.
    fn text_root(&self, scope: &'r SchemaUnit, name: &QName) -> Option<(&'r SchemaUnit, QName)> {
        let mut current = (scope, name.clone());
        for _ in 0..=self.graph.type_count() {
            let (unit, name) = &current;
            if name.is_builtin() {
                return Some(current);
            }
            let located = self.graph.type_decl(unit, name)?;
            match &located.decl.def {
                TypeDef::Simple(_) => return Some((located.unit, located.decl.name.clone())),
                TypeDef::Complex(complex) => match &complex.content {
                    ComplexContent::Simple { base, .. } => current = (located.unit, base.clone()),
                    _ => return None,
                },
            }
        }
        None
    }

    // ─── Particles ───────────────────────────────────────────────────

    /// Collect one particle. `min` and `max` are the occurrence bounds of
    /// the enclosing particles, multiplied out. `nested` is set inside a
    /// choice branch, where group references are always inlined.
    #[allow(clippy::too_many_arguments)]
    fn collect_particle(
        &mut self,
        scope: &'r SchemaUnit,
        particle: &Particle,
        min: u64,
        max: MaxOccurs,
        shape: &mut ObjectShape,
        location: &str,
        nested: bool,
    ) -> Result<(), SchemaError> {
        let min = particle.min_occurs.saturating_mul(min);
        let max = particle.max_occurs.times(max);
        if max == MaxOccurs::Bounded(0) {
            return Ok(());
        }
        match &particle.term {
            Term::Element(decl) => {
                let element_location = format!("{location}/element {}", decl.name.local);
                let item = self.element_schema(scope, decl, &element_location)?;
                let name = self.property_name(scope, &decl.name, decl.qualified);
                self.add_element_slot(scope, shape, name, item, min, max, location);
            }
            Term::ElementRef(q) => {
                let located = self
                    .graph
                    .element_decl(scope, q)
                    .ok_or_else(|| self.unresolved(scope, location, q))?;
                let name =
                    self.property_name(located.unit, &located.decl.name, located.decl.qualified);
                let item = self.pointer(located.unit, "properties", &located.decl.name.local);
                self.add_element_slot(scope, shape, name, item, min, max, location);
            }
            Term::Any => shape.open = true,
            Term::Group(group) => self.collect_group(scope, group, min, max, shape, location, nested)?,
            Term::GroupRef(q) => {
                let located = self
                    .graph
                    .group_decl(scope, q)
                    .ok_or_else(|| self.unresolved(scope, location, q))?;
                let name = located.decl.name.clone();
                if !self.visited.groups.insert(name.clone()) {
                    return Err(Self::cycle(scope, &name));
                }
                let referenced = !nested
                    && min == 1
                    && max == MaxOccurs::Bounded(1)
                    && self.graph.is_reused_group(&name);
                let result = if referenced {
                    let mut members = ObjectShape::default();
                    let collected = self.collect_group(
                        located.unit,
                        &located.decl.group,
                        1,
                        MaxOccurs::Bounded(1),
                        &mut members,
                        location,
                        true,
                    );
                    if collected.is_ok() {
                        for member in members.names() {
                            let slot = Slot {
                                item: json!(true),
                                min: 0,
                                max: MaxOccurs::Bounded(1),
                                required: false,
                                attribute: false,
                            };
                            shape.add_element(member, slot, Merge::Repeat);
                        }
                        shape.open |= members.open;
                        shape.group_refs.push(self.pointer(
                            located.unit,
                            "definitions",
                            &format!("group.{}", name.local),
                        ));
                    }
                    collected
                } else {
                    self.collect_group(located.unit, &located.decl.group, min, max, shape, location, nested)
                };
                self.visited.groups.remove(&name);
                result?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add_element_slot(
        &mut self,
        scope: &SchemaUnit,
        shape: &mut ObjectShape,
        name: String,
        item: Value,
        min: u64,
        max: MaxOccurs,
        location: &str,
    ) {
        let repeated = shape.position(&name).is_some();
        let slot = Slot {
            item,
            min,
            max,
            required: min > 0,
            attribute: false,
        };
        if !shape.add_element(name.clone(), slot, Merge::Repeat) {
            self.diagnose(
                scope,
                location,
                format!("element {name} has the same name as an attribute; element dropped"),
            );
        } else if repeated {
            self.diagnose(
                scope,
                location,
                format!("element {name} occurs more than once in the content model; occurrences merged"),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_group(
        &mut self,
        scope: &'r SchemaUnit,
        group: &ModelGroup,
        min: u64,
        max: MaxOccurs,
        shape: &mut ObjectShape,
        location: &str,
        nested: bool,
    ) -> Result<(), SchemaError> {
        match group.compositor {
            Compositor::Sequence | Compositor::All => {
                for particle in &group.particles {
                    self.collect_particle(scope, particle, min, max, shape, location, nested)?;
                }
                Ok(())
            }
            Compositor::Choice if max.is_repeated() => {
                self.diagnose(
                    scope,
                    location,
                    "repeating choice; members accepted in any combination",
                );
                for particle in &group.particles {
                    self.collect_particle(scope, particle, 0, max, shape, location, nested)?;
                }
                Ok(())
            }
            Compositor::Choice => self.collect_choice(scope, group, min, max, shape, location),
        }
    }

    /// A choice that occurs at most once: `oneOf` over its branches.
    fn collect_choice(
        &mut self,
        scope: &'r SchemaUnit,
        group: &ModelGroup,
        min: u64,
        max: MaxOccurs,
        shape: &mut ObjectShape,
        location: &str,
    ) -> Result<(), SchemaError> {
        let mut branches = Vec::with_capacity(group.particles.len());
        for particle in &group.particles {
            let mut branch = ObjectShape::default();
            self.collect_particle(scope, particle, 1, max, &mut branch, location, true)?;
            branches.push(branch);
        }

        let outside = shape.names();
        let names: Vec<Vec<String>> = branches.iter().map(ObjectShape::names).collect();
        let mut overlapping = false;
        for (i, own) in names.iter().enumerate() {
            for name in own {
                if names[i + 1..].iter().any(|other| other.contains(name)) {
                    overlapping = true;
                }
            }
        }
        if overlapping {
            self.diagnose(
                scope,
                location,
                "choice branches share member names; branches not mutually exclusive",
            );
        }

        let all_names: Vec<String> = names.iter().flatten().cloned().collect();
        let mut emptiable = min == 0;
        let mut alternatives = Vec::with_capacity(branches.len());
        for (i, branch) in branches.into_iter().enumerate() {
            let required: Vec<String> = branch
                .properties
                .iter()
                .filter(|(_, s)| s.required)
                .map(|(n, _)| n.clone())
                .collect();
            let own = &names[i];
            shape.open |= branch.open;

            let mut alternative = Map::new();
            if !required.is_empty() {
                alternative.insert("required".into(), json!(required));
            } else if !own.is_empty() {
                emptiable = true;
                alternative.insert("anyOf".into(), Value::Array(presence(own)));
            } else {
                emptiable = true;
            }
            if !overlapping {
                let others: Vec<String> =
                    all_names.iter().filter(|n| !own.contains(n)).cloned().collect();
                if !others.is_empty() {
                    alternative.insert("not".into(), json!({ "anyOf": presence(&others) }));
                }
            }
            if !branch.choices.is_empty() {
                alternative.insert("allOf".into(), Value::Array(branch.choices));
            }

            for (name, mut slot) in branch.properties {
                slot.required = false;
                if outside.contains(&name) {
                    self.add_element_slot(scope, shape, name, slot.item, 0, slot.max, location);
                } else if !shape.add_element(name.clone(), slot, Merge::Alternative) {
                    self.diagnose(
                        scope,
                        location,
                        format!("element {name} has the same name as an attribute; element dropped"),
                    );
                }
            }
            if !own.is_empty() {
                alternatives.push(Value::Object(alternative));
            }
        }

        if alternatives.is_empty() {
            return Ok(());
        }
        if emptiable {
            alternatives.push(json!({ "not": { "anyOf": presence(&all_names) } }));
        }
        let keyword = if overlapping { "anyOf" } else { "oneOf" };
        let mut choice = Map::new();
        choice.insert(keyword.into(), Value::Array(alternatives));
        shape.choices.push(Value::Object(choice));
        Ok(())
    }

    // ─── Attributes ──────────────────────────────────────────────────

    fn collect_attributes(
        &mut self,
        scope: &'r SchemaUnit,
        uses: &[AttributeUse],
        shape: &mut ObjectShape,
        location: &str,
    ) -> Result<(), SchemaError> {
        for attribute_use in uses {
            match attribute_use {
                AttributeUse::Local { decl, use_kind } => {
                    let name = self.property_name(scope, &decl.name, decl.qualified);
                    if *use_kind == AttributeUseKind::Prohibited {
                        shape.remove_attribute(&name);
                        continue;
                    }
                    let item = self.attribute_schema(scope, decl, None, None)?;
                    self.add_attribute_slot(scope, shape, name, item, *use_kind, location);
                }
                AttributeUse::Ref {
                    name,
                    use_kind,
                    default,
                    fixed,
                } => {
                    let located = self
                        .graph
                        .attribute_decl(scope, name)
                        .ok_or_else(|| self.unresolved(scope, location, name))?;
                    let property =
                        self.property_name(located.unit, &located.decl.name, located.decl.qualified);
                    if *use_kind == AttributeUseKind::Prohibited {
                        shape.remove_attribute(&property);
                        continue;
                    }
                    let item = self.attribute_schema(
                        located.unit,
                        located.decl,
                        default.as_deref(),
                        fixed.as_deref(),
                    )?;
                    self.add_attribute_slot(scope, shape, property, item, *use_kind, location);
                }
                AttributeUse::GroupRef(q) => {
                    let located = self
                        .graph
                        .attribute_group_decl(scope, q)
                        .ok_or_else(|| self.unresolved(scope, location, q))?;
                    let name = located.decl.name.clone();
                    if !self.visited.attribute_groups.insert(name.clone()) {
                        return Err(Self::cycle(scope, &name));
                    }
                    let result =
                        self.collect_attributes(located.unit, &located.decl.attributes, shape, location);
                    self.visited.attribute_groups.remove(&name);
                    result?;
                    if located.decl.any_attribute {
                        shape.open = true;
                    }
                }
            }
        }
        Ok(())
    }

    fn add_attribute_slot(
        &mut self,
        scope: &SchemaUnit,
        shape: &mut ObjectShape,
        name: String,
        item: Value,
        use_kind: AttributeUseKind,
        location: &str,
    ) {
        let required = use_kind == AttributeUseKind::Required;
        if !shape.add_attribute(name.clone(), item, required) {
            self.diagnose(
                scope,
                location,
                format!("attribute {name} has the same name as an element; attribute dropped"),
            );
        }
    }

    /// Schema of an attribute declaration. `default` and `fixed` given at a
    /// reference override the declaration's own.
    fn attribute_schema(
        &mut self,
        scope: &'r SchemaUnit,
        decl: &AttributeDecl,
        default: Option<&str>,
        fixed: Option<&str>,
    ) -> Result<Value, SchemaError> {
        let (base, space) = match &decl.type_ref {
            None => (
                builtins::schema_for("anySimpleType").unwrap_or_else(|| json!({})),
                Some(ValueSpace::AnySimple),
            ),
            Some(base) => {
                let schema = self.simple_base_schema(scope, base, &decl.name.local, true)?;
                let space = match base {
                    SimpleBase::Named(name) => self.named_space(scope, name),
                    SimpleBase::Inline(simple) => self.shape_space(scope, simple),
                };
                (schema, space)
            }
        };
        let space = space.unwrap_or(ValueSpace::String);
        let mut extras = Map::new();
        if let Some(doc) = &decl.documentation {
            extras.insert("description".into(), json!(doc));
        }
        if let Some(fixed) = fixed.or(decl.fixed.as_deref()) {
            extras.insert("const".into(), typed_literal(space, fixed));
        }
        if let Some(default) = default.or(decl.default.as_deref()) {
            extras.insert("default".into(), typed_literal(space, default));
        }
        Ok(with_keywords(base, extras))
    }
}

fn restriction_of(base: &QName, facets: &[Facet]) -> SimpleType {
    SimpleType {
        variety: SimpleVariety::Restriction {
            base: SimpleBase::Named(base.clone()),
            facets: facets.to_vec(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::process_all_schemas;
    use crate::options::{AdditionalProperties, ConversionOptions};

    fn convert_with(types: &str, options: &ConversionOptions) -> crate::BatchResult {
        let raw = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="urn:t" targetNamespace="urn:t">{types}</xs:schema>"#
        );
        process_all_schemas(&[("T.xsd", raw.as_str())], options).expect("batch")
    }

    fn definitions(types: &str) -> Value {
        let result = convert_with(types, &ConversionOptions::default());
        result.get_result("T.xsd").unwrap().json_schema()["definitions"].clone()
    }

    #[test]
    fn test_slot_render_array_bounds() {
        let slot = Slot {
            item: json!({"type": "string"}),
            min: 2,
            max: MaxOccurs::Bounded(5),
            required: true,
            attribute: false,
        };
        assert_eq!(
            slot.render(),
            json!({"type": "array", "items": {"type": "string"}, "minItems": 2, "maxItems": 5})
        );
    }

    #[test]
    fn test_attribute_overrides_attribute_not_element() {
        let mut shape = ObjectShape::default();
        assert!(shape.add_attribute("a".into(), json!({"type": "string"}), false));
        assert!(shape.add_attribute("a".into(), json!({"type": "integer"}), true));
        assert_eq!(shape.properties.len(), 1);
        assert!(shape.properties[0].1.required);
        let element = Slot {
            item: json!({}),
            min: 1,
            max: MaxOccurs::Bounded(1),
            required: true,
            attribute: false,
        };
        assert!(!shape.add_element("a".into(), element, Merge::Repeat));
        shape.remove_attribute("a");
        assert!(shape.properties.is_empty());
    }

    #[test]
    fn test_sequence_occurrence_mapping() {
        let defs = definitions(
            r#"<xs:complexType name="PersonNameType"><xs:sequence>
                 <xs:element name="FirstName" type="xs:string"/>
                 <xs:element name="MiddleName" type="xs:string" minOccurs="0"/>
                 <xs:element name="Nick" type="xs:string" minOccurs="0" maxOccurs="3"/>
                 <xs:element name="LastName" type="xs:string" maxOccurs="unbounded"/>
               </xs:sequence></xs:complexType>"#,
        );
        let t = &defs["PersonNameType"];
        assert_eq!(t["type"], "object");
        assert_eq!(t["required"], json!(["FirstName", "LastName"]));
        assert_eq!(t["additionalProperties"], false);
        assert_eq!(t["properties"]["MiddleName"], json!({"type": "string"}));
        assert_eq!(
            t["properties"]["Nick"],
            json!({"type": "array", "items": {"type": "string"}, "maxItems": 3})
        );
        assert_eq!(
            t["properties"]["LastName"],
            json!({"type": "array", "items": {"type": "string"}, "minItems": 1})
        );
    }

    #[test]
    fn test_nested_sequence_multiplies_bounds() {
        let defs = definitions(
            r#"<xs:complexType name="T"><xs:sequence>
                 <xs:sequence minOccurs="0" maxOccurs="2">
                   <xs:element name="x" type="xs:int" maxOccurs="3"/>
                 </xs:sequence>
               </xs:sequence></xs:complexType>"#,
        );
        let x = &defs["T"]["properties"]["x"];
        assert_eq!(x["maxItems"], 6);
        assert!(x.get("minItems").is_none());
        assert!(defs["T"].get("required").is_none());
    }

    #[test]
    fn test_choice_maps_to_exclusive_one_of() {
        let defs = definitions(
            r#"<xs:complexType name="Contact"><xs:choice>
                 <xs:element name="Email" type="xs:string"/>
                 <xs:element name="Phone" type="xs:string"/>
               </xs:choice></xs:complexType>"#,
        );
        let t = &defs["Contact"];
        assert!(t.get("required").is_none());
        assert_eq!(
            t["oneOf"],
            json!([
                {"required": ["Email"], "not": {"anyOf": [{"required": ["Phone"]}]}},
                {"required": ["Phone"], "not": {"anyOf": [{"required": ["Email"]}]}}
            ])
        );
    }

    #[test]
    fn test_optional_choice_adds_empty_branch() {
        let defs = definitions(
            r#"<xs:complexType name="C"><xs:choice minOccurs="0">
                 <xs:element name="a" type="xs:string"/>
                 <xs:element name="b" type="xs:string"/>
               </xs:choice></xs:complexType>"#,
        );
        let branches = defs["C"]["oneOf"].as_array().unwrap();
        assert_eq!(branches.len(), 3);
        assert_eq!(
            branches[2],
            json!({"not": {"anyOf": [{"required": ["a"]}, {"required": ["b"]}]}})
        );
    }

    #[test]
    fn test_extension_merges_base_content_first() {
        let defs = definitions(
            r#"<xs:complexType name="Base"><xs:sequence><xs:element name="id" type="xs:int"/></xs:sequence>
                 <xs:attribute name="version" type="xs:string"/></xs:complexType>
               <xs:complexType name="Derived"><xs:complexContent><xs:extension base="Base">
                 <xs:sequence><xs:element name="label" type="xs:string"/></xs:sequence>
               </xs:extension></xs:complexContent></xs:complexType>"#,
        );
        let d = &defs["Derived"];
        let keys: Vec<_> = d["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(d["required"], json!(["id", "label"]));
        assert_eq!(d["properties"]["id"]["type"], "integer");
    }

    #[test]
    fn test_restriction_keeps_base_attributes_only() {
        let defs = definitions(
            r#"<xs:complexType name="Base"><xs:sequence><xs:element name="id" type="xs:int"/></xs:sequence>
                 <xs:attribute name="lang" type="xs:language"/>
                 <xs:attribute name="drop" type="xs:string"/></xs:complexType>
               <xs:complexType name="Narrow"><xs:complexContent><xs:restriction base="Base">
                 <xs:sequence><xs:element name="id" type="xs:byte"/></xs:sequence>
                 <xs:attribute name="drop" use="prohibited"/>
               </xs:restriction></xs:complexContent></xs:complexType>"#,
        );
        let n = &defs["Narrow"];
        assert_eq!(n["properties"]["id"]["maximum"], 127);
        assert!(n["properties"].get("lang").is_some());
        assert!(n["properties"].get("drop").is_none());
    }

    #[test]
    fn test_simple_content_text_property() {
        let defs = definitions(
            r#"<xs:complexType name="Amount"><xs:simpleContent><xs:extension base="xs:decimal">
                 <xs:attribute name="currency" type="xs:string" use="required"/>
               </xs:extension></xs:simpleContent></xs:complexType>"#,
        );
        let a = &defs["Amount"];
        assert_eq!(a["properties"]["#text"], json!({"type": "number"}));
        assert_eq!(a["required"], json!(["#text", "currency"]));
    }

    #[test]
    fn test_reused_group_emitted_once_and_referenced() {
        let result = convert_with(
            r#"<xs:group name="Audit"><xs:sequence>
                 <xs:element name="createdBy" type="xs:string"/>
               </xs:sequence></xs:group>
               <xs:complexType name="A"><xs:sequence><xs:group ref="Audit"/></xs:sequence></xs:complexType>
               <xs:complexType name="B"><xs:group ref="Audit"/></xs:complexType>"#,
            &ConversionOptions::default(),
        );
        let defs = &result.get_result("T.xsd").unwrap().json_schema()["definitions"];
        assert_eq!(defs["group.Audit"]["required"], json!(["createdBy"]));
        assert!(defs["group.Audit"].get("additionalProperties").is_none());
        assert_eq!(defs["A"]["properties"]["createdBy"], json!(true));
        assert_eq!(defs["A"]["allOf"], json!([{"$ref": "#/definitions/group.Audit"}]));
        assert_eq!(defs["B"]["allOf"], defs["A"]["allOf"]);
    }

    #[test]
    fn test_any_opens_shape_and_open_policy() {
        let defs = definitions(
            r#"<xs:complexType name="Ext"><xs:sequence><xs:any minOccurs="0"/></xs:sequence></xs:complexType>"#,
        );
        assert!(defs["Ext"].get("additionalProperties").is_none());

        let open = ConversionOptions {
            additional_properties: AdditionalProperties::Open,
            ..ConversionOptions::default()
        };
        let result = convert_with(
            r#"<xs:complexType name="P"><xs:sequence><xs:element name="a" type="xs:string"/></xs:sequence></xs:complexType>"#,
            &open,
        );
        let p = &result.get_result("T.xsd").unwrap().json_schema()["definitions"]["P"];
        assert!(p.get("additionalProperties").is_none());
    }

    #[test]
    fn test_attribute_fixed_and_default_typed() {
        let defs = definitions(
            r#"<xs:complexType name="Flags">
                 <xs:attribute name="on" type="xs:boolean" default="true"/>
                 <xs:attribute name="v" type="xs:int" fixed="2"/>
               </xs:complexType>"#,
        );
        assert_eq!(defs["Flags"]["properties"]["on"]["default"], true);
        assert_eq!(defs["Flags"]["properties"]["v"]["const"], 2);
    }

    #[test]
    fn test_recursive_type_uses_reference() {
        let defs = definitions(
            r#"<xs:complexType name="Node"><xs:sequence>
                 <xs:element name="child" type="Node" minOccurs="0" maxOccurs="unbounded"/>
               </xs:sequence></xs:complexType>"#,
        );
        assert_eq!(
            defs["Node"]["properties"]["child"]["items"],
            json!({"$ref": "#/definitions/Node"})
        );
    }
}
