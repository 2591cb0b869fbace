//! # Effective Facet Sets
//!
//! Restriction chains are flattened, not modelled as inheritance: walking a
//! chain from its built-in root to the derived type, each step's facets are
//! applied to an [`EffectiveFacets`] value. A step may only narrow. When it
//! states a value less restrictive than the one it inherits, the inherited
//! value is kept and a [`FacetIssue::Narrowing`] is reported.
//!
//! ## Patterns
//!
//! Several `xs:pattern` facets in one derivation step are alternatives;
//! patterns of different steps must all match. Each step therefore
//! contributes one anchored expression, `^(?:p1|p2)$`, and the expressions of
//! all steps are conjoined in the output. XSD regular expressions are
//! implicitly anchored and treat `^` and `$` as ordinary characters; the
//! translation escapes them and expands the `\i` and `\c` name-character
//! escapes, which target regex dialects lack.

use serde_json::{json, Map, Number, Value};

use crate::ast::{Facet, FacetKind};
use crate::builtins::{Builtin, ValueSpace};

/// A problem found while applying one derivation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetIssue {
    /// The facet is wider than the inherited value, which is kept.
    Narrowing {
        /// The facet.
        facet: FacetKind,
        /// Inherited value.
        base_value: String,
        /// Stated value.
        value: String,
    },
    /// The facet has no meaning for the value space, or no target keyword.
    NotApplicable {
        /// The facet.
        facet: FacetKind,
    },
    /// The facet value is not a valid lexical form.
    Invalid {
        /// The facet.
        facet: FacetKind,
        /// The offending value.
        value: String,
    },
    /// Part of the facet has no JSON Schema form and is not enforced.
    Partial {
        /// The facet.
        facet: FacetKind,
        /// What is left unenforced.
        detail: String,
    },
    /// A pattern uses a regex feature that cannot be translated.
    Untranslatable {
        /// The XSD pattern.
        value: String,
        /// Which feature.
        reason: String,
    },
}

/// A numeric range bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// Lexical form, as written.
    pub lexical: String,
    /// Parsed value used for comparisons.
    pub value: f64,
    /// `minExclusive`/`maxExclusive`.
    pub exclusive: bool,
}

impl Bound {
    fn parse(lexical: &str, exclusive: bool) -> Option<Self> {
        let value = lexical.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
        Some(Self {
            lexical: lexical.trim().to_string(),
            value,
            exclusive,
        })
    }

    fn describe(&self, lower: bool) -> String {
        let op = match (lower, self.exclusive) {
            (true, false) => ">=",
            (true, true) => ">",
            (false, false) => "<=",
            (false, true) => "<",
        };
        format!("{op} {}", self.lexical)
    }

    /// Whether `self` admits no value below `base`'s lowest.
    fn lower_within(&self, base: &Bound) -> bool {
        self.value > base.value || (self.value == base.value && (self.exclusive || !base.exclusive))
    }

    /// Whether `self` admits no value above `base`'s highest.
    fn upper_within(&self, base: &Bound) -> bool {
        self.value < base.value || (self.value == base.value && (self.exclusive || !base.exclusive))
    }
}

/// The flattened facet set of a restriction chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveFacets {
    /// `minLength`, or `length`.
    pub min_length: Option<u64>,
    /// `maxLength`, or `length`.
    pub max_length: Option<u64>,
    /// One anchored expression per derivation step, all of which must match.
    pub patterns: Vec<String>,
    /// Permitted lexical values of the most derived enumerating step.
    pub enumeration: Option<Vec<String>>,
    /// Lower range bound.
    pub lower: Option<Bound>,
    /// Upper range bound.
    pub upper: Option<Bound>,
    /// `totalDigits`.
    pub total_digits: Option<u32>,
    /// `fractionDigits`.
    pub fraction_digits: Option<u32>,
}

impl EffectiveFacets {
    /// The facet set implied by a built-in type: its lexical pattern and
    /// value-space bounds.
    pub fn for_builtin(builtin: &Builtin) -> Self {
        Self {
            patterns: builtin.pattern.map(str::to_string).into_iter().collect(),
            lower: builtin.min_inclusive.and_then(|v| Bound::parse(v, false)),
            upper: builtin.max_inclusive.and_then(|v| Bound::parse(v, false)),
            ..Self::default()
        }
    }

    /// Apply the facets of one derivation step.
    pub fn apply(&mut self, facets: &[Facet], space: ValueSpace) -> Vec<FacetIssue> {
        let mut issues = Vec::new();
        let mut step_patterns = Vec::new();
        let mut step_enumeration: Vec<String> = Vec::new();
        let mut states_total = false;
        let mut states_fraction = false;

        for facet in facets {
            let applicable = match facet.kind {
                FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength => {
                    space.has_length()
                }
                FacetKind::Pattern => space.has_pattern(),
                FacetKind::MinInclusive
                | FacetKind::MaxInclusive
                | FacetKind::MinExclusive
                | FacetKind::MaxExclusive
                | FacetKind::TotalDigits
                | FacetKind::FractionDigits => space.is_numeric(),
                FacetKind::Enumeration | FacetKind::WhiteSpace => true,
            };
            if !applicable {
                issues.push(FacetIssue::NotApplicable { facet: facet.kind });
                continue;
            }
            match facet.kind {
                FacetKind::Length => match parse_count(&facet.value) {
                    Some(n) => {
                        self.narrow_min_length(n, FacetKind::Length, &mut issues);
                        self.narrow_max_length(n, FacetKind::Length, &mut issues);
                    }
                    None => issues.push(invalid(facet)),
                },
                FacetKind::MinLength => match parse_count(&facet.value) {
                    Some(n) => self.narrow_min_length(n, FacetKind::MinLength, &mut issues),
                    None => issues.push(invalid(facet)),
                },
                FacetKind::MaxLength => match parse_count(&facet.value) {
                    Some(n) => self.narrow_max_length(n, FacetKind::MaxLength, &mut issues),
                    None => issues.push(invalid(facet)),
                },
                FacetKind::Pattern => match translate_pattern(&facet.value) {
                    Ok(p) => step_patterns.push(p),
                    Err(reason) => issues.push(FacetIssue::Untranslatable {
                        value: facet.value.clone(),
                        reason,
                    }),
                },
                FacetKind::Enumeration if space.is_numeric() && number_value(&facet.value).is_none() => {
                    issues.push(FacetIssue::Partial {
                        facet: FacetKind::Enumeration,
                        detail: format!("value '{}' has no JSON number form; dropped", facet.value.trim()),
                    });
                }
                FacetKind::Enumeration => step_enumeration.push(facet.value.clone()),
                FacetKind::MinInclusive | FacetKind::MinExclusive => {
                    let exclusive = facet.kind == FacetKind::MinExclusive;
                    match Bound::parse(&facet.value, exclusive) {
                        Some(b) => self.narrow_lower(b, facet.kind, &mut issues),
                        None => issues.push(invalid(facet)),
                    }
                }
                FacetKind::MaxInclusive | FacetKind::MaxExclusive => {
                    let exclusive = facet.kind == FacetKind::MaxExclusive;
                    match Bound::parse(&facet.value, exclusive) {
                        Some(b) => self.narrow_upper(b, facet.kind, &mut issues),
                        None => issues.push(invalid(facet)),
                    }
                }
                FacetKind::TotalDigits => match parse_count(&facet.value) {
                    Some(n) if n > 0 && n <= u64::from(u32::MAX) => {
                        states_total = true;
                        narrow_digits(&mut self.total_digits, n as u32, facet.kind, &mut issues)
                    }
                    _ => issues.push(invalid(facet)),
                },
                FacetKind::FractionDigits => match parse_count(&facet.value) {
                    Some(n) if n <= u64::from(u32::MAX) => {
                        states_fraction = true;
                        narrow_digits(&mut self.fraction_digits, n as u32, facet.kind, &mut issues)
                    }
                    _ => issues.push(invalid(facet)),
                },
                // JSON strings are validated as given.
                FacetKind::WhiteSpace => {}
            }
        }

        // JSON Schema cannot count digits after the decimal point: `multipleOf`
        // with a fractional divisor is evaluated in binary floating point.
        if space == ValueSpace::Decimal {
            let fraction = self.fraction_digits.unwrap_or(u32::MAX);
            if states_fraction && fraction > 0 {
                issues.push(FacetIssue::Partial {
                    facet: FacetKind::FractionDigits,
                    detail: format!("at most {fraction} digit(s) after the decimal point is not enforced"),
                });
            }
            if states_total && fraction > 0 {
                issues.push(FacetIssue::Partial {
                    facet: FacetKind::TotalDigits,
                    detail: "only the integer part is bounded; fraction digits are not counted".to_string(),
                });
            }
        }

        if !step_patterns.is_empty() {
            self.patterns.push(format!("^(?:{})$", step_patterns.join("|")));
        }
        if !step_enumeration.is_empty() {
            match &self.enumeration {
                Some(base)
                    if step_enumeration
                        .iter()
                        .any(|v| !base.iter().any(|b| same_value(space, b, v))) =>
                {
                    issues.push(FacetIssue::Narrowing {
                        facet: FacetKind::Enumeration,
                        base_value: base.join(" | "),
                        value: step_enumeration.join(" | "),
                    });
                }
                _ => self.enumeration = Some(step_enumeration),
            }
        }
        issues
    }

    fn narrow_min_length(&mut self, n: u64, facet: FacetKind, issues: &mut Vec<FacetIssue>) {
        match self.min_length {
            Some(base) if n < base => issues.push(FacetIssue::Narrowing {
                facet,
                base_value: base.to_string(),
                value: n.to_string(),
            }),
            _ => self.min_length = Some(n),
        }
    }

    fn narrow_max_length(&mut self, n: u64, facet: FacetKind, issues: &mut Vec<FacetIssue>) {
        match self.max_length {
            Some(base) if n > base => issues.push(FacetIssue::Narrowing {
                facet,
                base_value: base.to_string(),
                value: n.to_string(),
            }),
            _ => self.max_length = Some(n),
        }
    }

    fn narrow_lower(&mut self, bound: Bound, facet: FacetKind, issues: &mut Vec<FacetIssue>) {
        match &self.lower {
            Some(base) if !bound.lower_within(base) => issues.push(FacetIssue::Narrowing {
                facet,
                base_value: base.describe(true),
                value: bound.describe(true),
            }),
            _ => self.lower = Some(bound),
        }
    }

    fn narrow_upper(&mut self, bound: Bound, facet: FacetKind, issues: &mut Vec<FacetIssue>) {
        match &self.upper {
            Some(base) if !bound.upper_within(base) => issues.push(FacetIssue::Narrowing {
                facet,
                base_value: base.describe(false),
                value: bound.describe(false),
            }),
            _ => self.upper = Some(bound),
        }
    }

    /// Range bounds implied by `totalDigits`/`fractionDigits`, both exclusive:
    /// `|x| < 10^(total - fraction)`.
    fn digit_bounds(&self, space: ValueSpace) -> Option<(Bound, Bound)> {
        let total = self.total_digits?;
        let magnitude = match space {
            ValueSpace::Integer => total,
            _ => total - self.fraction_digits.unwrap_or(0).min(total),
        };
        // Beyond i64 the bound is looser than any realistic base bound.
        if magnitude > 18 {
            return None;
        }
        let limit = 10i64.pow(magnitude);
        let upper = Bound::parse(&limit.to_string(), true)?;
        let lower = Bound::parse(&(-limit).to_string(), true)?;
        Some((lower, upper))
    }

    /// JSON Schema keywords of the flattened type rooted at `builtin`.
    pub fn render(&self, builtin: &Builtin) -> Map<String, Value> {
        let space = builtin.space;
        let mut out = builtin.keywords();

        if let Some(n) = self.min_length {
            out.insert("minLength".into(), json!(n));
        }
        if let Some(n) = self.max_length {
            out.insert("maxLength".into(), json!(n));
        }

        let mut patterns = self.patterns.iter();
        if let Some(first) = patterns.next() {
            out.insert("pattern".into(), json!(first));
        }
        let rest: Vec<Value> = patterns.map(|p| json!({ "pattern": p })).collect();
        if !rest.is_empty() {
            out.insert("allOf".into(), Value::Array(rest));
        }

        if let Some(values) = &self.enumeration {
            let literals: Vec<Value> = values.iter().map(|v| typed_literal(space, v)).collect();
            out.insert("enum".into(), Value::Array(literals));
        }

        let mut lower = self.lower.clone();
        let mut upper = self.upper.clone();
        if let Some((digit_lower, digit_upper)) = self.digit_bounds(space) {
            if lower.as_ref().map_or(true, |b| digit_lower.lower_within(b)) {
                lower = Some(digit_lower);
            }
            if upper.as_ref().map_or(true, |b| digit_upper.upper_within(b)) {
                upper = Some(digit_upper);
            }
        }
        if let Some(b) = lower {
            if let Some(n) = number_value(&b.lexical) {
                let key = if b.exclusive { "exclusiveMinimum" } else { "minimum" };
                out.insert(key.into(), n);
            }
        }
        if let Some(b) = upper {
            if let Some(n) = number_value(&b.lexical) {
                let key = if b.exclusive { "exclusiveMaximum" } else { "maximum" };
                out.insert(key.into(), n);
            }
        }

        if self.fraction_digits == Some(0) && space == ValueSpace::Decimal {
            out.insert("multipleOf".into(), json!(1));
        }
        out
    }
}

/// Whether two lexical forms denote the same value: `01` and `1` are the
/// same integer.
fn same_value(space: ValueSpace, a: &str, b: &str) -> bool {
    match space {
        ValueSpace::Integer | ValueSpace::Decimal => {
            match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(x), Ok(y)) => x == y,
                _ => a.trim() == b.trim(),
            }
        }
        ValueSpace::Boolean => typed_literal(space, a) == typed_literal(space, b),
        _ => a == b,
    }
}

fn invalid(facet: &Facet) -> FacetIssue {
    FacetIssue::Invalid {
        facet: facet.kind,
        value: facet.value.clone(),
    }
}

fn parse_count(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn narrow_digits(slot: &mut Option<u32>, n: u32, facet: FacetKind, issues: &mut Vec<FacetIssue>) {
    match *slot {
        Some(base) if n > base => issues.push(FacetIssue::Narrowing {
            facet,
            base_value: base.to_string(),
            value: n.to_string(),
        }),
        _ => *slot = Some(n),
    }
}

// ─── Literals ────────────────────────────────────────────────────────

/// A JSON number for an XSD numeric lexical form: an integer when it has
/// no fractional part and fits 64 bits, a float otherwise.
pub fn number_value(lexical: &str) -> Option<Value> {
    let s = lexical.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Value::from(u));
    }
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}

/// An enumeration, `fixed` or `default` literal typed for its value space.
/// Literals that do not parse stay strings.
pub fn typed_literal(space: ValueSpace, lexical: &str) -> Value {
    match space {
        ValueSpace::Boolean => match lexical.trim() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => Value::String(lexical.to_string()),
        },
        ValueSpace::Integer | ValueSpace::Decimal => {
            number_value(lexical).unwrap_or_else(|| Value::String(lexical.to_string()))
        }
        _ => Value::String(lexical.to_string()),
    }
}

// ─── Patterns ────────────────────────────────────────────────────────

const NAME_START: &str = "_:A-Za-z";
const NAME_CHAR: &str = "\\-._:A-Za-z0-9";

/// Translate an XSD regular expression into an unanchored expression the
/// validator's regex engine accepts.
///
/// # Errors
///
/// Returns a description of the first feature without a translation:
/// character class subtraction, Unicode block escapes (`\p{IsBasicLatin}`),
/// and negated name escapes inside a class.
pub fn translate_pattern(xsd: &str) -> Result<String, String> {
    let mut out = String::with_capacity(xsd.len() + 8);
    let mut in_class = false;
    let mut chars = xsd.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(escaped) = chars.next() else {
                    return Err("trailing backslash".to_string());
                };
                match escaped {
                    'i' if in_class => out.push_str(NAME_START),
                    'i' => out.push_str(&format!("[{NAME_START}]")),
                    'c' if in_class => out.push_str(NAME_CHAR),
                    'c' => out.push_str(&format!("[{NAME_CHAR}]")),
                    'I' | 'C' if in_class => {
                        return Err(format!("\\{escaped} inside a character class"))
                    }
                    'I' => out.push_str(&format!("[^{NAME_START}]")),
                    'C' => out.push_str(&format!("[^{NAME_CHAR}]")),
                    'p' | 'P' => {
                        let mut name = String::new();
                        if chars.peek() == Some(&'{') {
                            for n in chars.by_ref() {
                                name.push(n);
                                if n == '}' {
                                    break;
                                }
                            }
                        }
                        if name.starts_with("{Is") {
                            return Err(format!("Unicode block escape \\{escaped}{name}"));
                        }
                        out.push('\\');
                        out.push(escaped);
                        out.push_str(&name);
                    }
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' if in_class => return Err("character class subtraction".to_string()),
            '[' => {
                in_class = true;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '^' | '$' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
