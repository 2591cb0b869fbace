//! # Built-in Datatypes
//!
//! The XML Schema built-in datatypes and the JSON Schema shape each one
//! maps to. Every user-defined simple type bottoms out in one of these; its
//! [`ValueSpace`] decides which facets apply and how literal values
//! (enumerations, `fixed`, `default`) are typed in the output.
//!
//! Date, time and duration types map to strings with a `format` marker.
//! The marker is a hint: the emitted documents are validated with format
//! assertion off, so the lexical form is not checked.

use serde_json::{json, Map, Value};

/// The value space family of a built-in type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSpace {
    /// Character data: strings, tokens, names, URIs.
    String,
    /// Binary data carried as text (`base64Binary`, `hexBinary`).
    Binary,
    /// `boolean`.
    Boolean,
    /// The integer family.
    Integer,
    /// `decimal`, `float`, `double`.
    Decimal,
    /// Dates, times, durations and their partial forms.
    Temporal,
    /// `anySimpleType` and `anyAtomicType`.
    AnySimple,
}

impl ValueSpace {
    /// Whether `length`, `minLength` and `maxLength` apply.
    pub fn has_length(self) -> bool {
        matches!(self, Self::String)
    }

    /// Whether `pattern` can be expressed: JSON Schema patterns only
    /// constrain strings.
    pub fn has_pattern(self) -> bool {
        matches!(self, Self::String | Self::Binary | Self::Temporal)
    }

    /// Whether range facets map to `minimum`/`maximum`.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }
}

/// A built-in datatype and its mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    /// Local name in the XML Schema namespace.
    pub name: &'static str,
    /// Value space family.
    pub space: ValueSpace,
    /// `format` hint.
    pub format: Option<&'static str>,
    /// Lexical pattern, anchored.
    pub pattern: Option<&'static str>,
    /// `contentEncoding`.
    pub content_encoding: Option<&'static str>,
    /// Inclusive lower bound of the value space.
    pub min_inclusive: Option<&'static str>,
    /// Inclusive upper bound of the value space.
    pub max_inclusive: Option<&'static str>,
}

const fn plain(name: &'static str, space: ValueSpace) -> Builtin {
    Builtin {
        name,
        space,
        format: None,
        pattern: None,
        content_encoding: None,
        min_inclusive: None,
        max_inclusive: None,
    }
}

const fn formatted(name: &'static str, format: &'static str) -> Builtin {
    Builtin {
        format: Some(format),
        ..plain(name, ValueSpace::Temporal)
    }
}

const fn patterned(name: &'static str, space: ValueSpace, pattern: &'static str) -> Builtin {
    Builtin {
        pattern: Some(pattern),
        ..plain(name, space)
    }
}

const fn bounded(
    name: &'static str,
    min: Option<&'static str>,
    max: Option<&'static str>,
) -> Builtin {
    Builtin {
        min_inclusive: min,
        max_inclusive: max,
        ..plain(name, ValueSpace::Integer)
    }
}

static BUILTINS: &[Builtin] = &[
    // String family.
    plain("string", ValueSpace::String),
    plain("normalizedString", ValueSpace::String),
    plain("token", ValueSpace::String),
    plain("language", ValueSpace::String),
    plain("Name", ValueSpace::String),
    plain("NCName", ValueSpace::String),
    plain("ID", ValueSpace::String),
    plain("IDREF", ValueSpace::String),
    plain("IDREFS", ValueSpace::String),
    plain("ENTITY", ValueSpace::String),
    plain("ENTITIES", ValueSpace::String),
    plain("NMTOKEN", ValueSpace::String),
    plain("NMTOKENS", ValueSpace::String),
    plain("QName", ValueSpace::String),
    plain("NOTATION", ValueSpace::String),
    Builtin {
        format: Some("uri-reference"),
        ..plain("anyURI", ValueSpace::String)
    },
    // Binary.
    Builtin {
        content_encoding: Some("base64"),
        ..plain("base64Binary", ValueSpace::Binary)
    },
    patterned("hexBinary", ValueSpace::Binary, "^(?:[0-9a-fA-F]{2})*$"),
    // Boolean.
    plain("boolean", ValueSpace::Boolean),
    // Numbers.
    plain("decimal", ValueSpace::Decimal),
    plain("float", ValueSpace::Decimal),
    plain("double", ValueSpace::Decimal),
    plain("precisionDecimal", ValueSpace::Decimal),
    bounded("integer", None, None),
    bounded("nonPositiveInteger", None, Some("0")),
    bounded("negativeInteger", None, Some("-1")),
    bounded("nonNegativeInteger", Some("0"), None),
    bounded("positiveInteger", Some("1"), None),
    bounded("long", Some("-9223372036854775808"), Some("9223372036854775807")),
    bounded("int", Some("-2147483648"), Some("2147483647")),
    bounded("short", Some("-32768"), Some("32767")),
    bounded("byte", Some("-128"), Some("127")),
    bounded("unsignedLong", Some("0"), Some("18446744073709551615")),
    bounded("unsignedInt", Some("0"), Some("4294967295")),
    bounded("unsignedShort", Some("0"), Some("65535")),
    bounded("unsignedByte", Some("0"), Some("255")),
    // Dates, times and durations.
    formatted("dateTime", "date-time"),
    formatted("dateTimeStamp", "date-time"),
    formatted("date", "date"),
    formatted("time", "time"),
    formatted("duration", "duration"),
    formatted("dayTimeDuration", "duration"),
    formatted("yearMonthDuration", "duration"),
    formatted("gYear", "year"),
    formatted("gYearMonth", "year-month"),
    patterned(
        "gMonth",
        ValueSpace::Temporal,
        "^--(?:0[1-9]|1[0-2])(?:Z|[+-](?:0[0-9]|1[0-4]):[0-5][0-9])?$",
    ),
    patterned(
        "gDay",
        ValueSpace::Temporal,
        "^---(?:0[1-9]|[12][0-9]|3[01])(?:Z|[+-](?:0[0-9]|1[0-4]):[0-5][0-9])?$",
    ),
    patterned(
        "gMonthDay",
        ValueSpace::Temporal,
        "^--(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])(?:Z|[+-](?:0[0-9]|1[0-4]):[0-5][0-9])?$",
    ),
    // Ur-types usable as simple bases.
    plain("anySimpleType", ValueSpace::AnySimple),
    plain("anyAtomicType", ValueSpace::AnySimple),
];

/// Look up a built-in datatype by local name. `anyType` is not a simple
/// type and is not listed; see [`is_known`].
pub fn lookup(local: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == local)
}

/// Whether `local` names any built-in type, `anyType` included.
pub fn is_known(local: &str) -> bool {
    local == "anyType" || lookup(local).is_some()
}

impl Builtin {
    /// JSON Schema keywords of the unrestricted type.
    pub fn keywords(&self) -> Map<String, Value> {
        let mut out = Map::new();
        let ty = match self.space {
            ValueSpace::String | ValueSpace::Binary | ValueSpace::Temporal => json!("string"),
            ValueSpace::Boolean => json!("boolean"),
            ValueSpace::Integer => json!("integer"),
            ValueSpace::Decimal => json!("number"),
            ValueSpace::AnySimple => json!(["string", "number", "boolean"]),
        };
        out.insert("type".into(), ty);
        if let Some(format) = self.format {
            out.insert("format".into(), json!(format));
        }
        if let Some(encoding) = self.content_encoding {
            out.insert("contentEncoding".into(), json!(encoding));
        }
        out
    }
}

/// Schema for a built-in type referenced by name: the unrestricted
/// keywords plus its lexical pattern and value-space bounds. `anyType`
/// accepts anything.
pub fn schema_for(local: &str) -> Option<Value> {
    if local == "anyType" {
        return Some(json!({}));
    }
    let builtin = lookup(local)?;
    let mut out = builtin.keywords();
    if let Some(pattern) = builtin.pattern {
        out.insert("pattern".into(), json!(pattern));
    }
    if let Some(min) = builtin.min_inclusive.and_then(crate::facets::number_value) {
        out.insert("minimum".into(), min);
    }
    if let Some(max) = builtin.max_inclusive.and_then(crate::facets::number_value) {
        out.insert("maximum".into(), max);
    }
    Some(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_family() {
        for name in ["string", "token", "NCName", "language"] {
            assert_eq!(schema_for(name).unwrap(), json!({"type": "string"}));
        }
    }

    #[test]
    fn test_integer_bounds() {
        assert_eq!(
            schema_for("unsignedByte").unwrap(),
            json!({"type": "integer", "minimum": 0, "maximum": 255})
        );
        assert_eq!(
            schema_for("positiveInteger").unwrap(),
            json!({"type": "integer", "minimum": 1})
        );
        assert_eq!(
            schema_for("unsignedLong").unwrap()["maximum"],
            json!(18446744073709551615u64)
        );
    }

    #[test]
    fn test_temporal_formats() {
        assert_eq!(
            schema_for("date").unwrap(),
            json!({"type": "string", "format": "date"})
        );
        assert_eq!(schema_for("gYearMonth").unwrap()["format"], "year-month");
        assert_eq!(schema_for("duration").unwrap()["format"], "duration");
        assert!(schema_for("gMonth").unwrap()["pattern"]
            .as_str()
            .unwrap()
            .ends_with("[0-5][0-9])?$"));
    }

    #[test]
    fn test_binary_and_uri() {
        assert_eq!(schema_for("base64Binary").unwrap()["contentEncoding"], "base64");
        assert_eq!(schema_for("anyURI").unwrap()["format"], "uri-reference");
        assert!(schema_for("hexBinary").unwrap()["pattern"].is_string());
    }

    #[test]
    fn test_any_type_and_unknown() {
        assert_eq!(schema_for("anyType").unwrap(), json!({}));
        assert!(is_known("anyType"));
        assert!(lookup("anyType").is_none());
        assert!(!is_known("strin"));
        assert!(schema_for("strin").is_none());
    }

    #[test]
    fn test_value_space_applicability() {
        assert!(ValueSpace::String.has_length());
        assert!(!ValueSpace::Integer.has_length());
        assert!(!ValueSpace::Decimal.has_pattern());
        assert!(ValueSpace::Decimal.is_numeric());
        assert!(!ValueSpace::Temporal.is_numeric());
    }
}
