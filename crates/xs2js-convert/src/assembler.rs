//! # Output Assembler
//!
//! Packages the converted declarations of one unit into a finished
//! draft-07 document and checks, across the whole batch, that every `$ref`
//! lands on a declaration.
//!
//! ## Document Layout
//!
//! ```json
//! {
//!   "$schema": "http://json-schema.org/draft-07/schema#",
//!   "$id": "Example.json",
//!   "title": "JSON Schema generated from Example.xsd",
//!   "type": "object",
//!   "definitions": { "PersonNameType": { ... }, "group.Audit": { ... } },
//!   "properties": {
//!     "Person": { ... },
//!     "PersonNameType": { "$ref": "#/definitions/PersonNameType" }
//!   },
//!   "anyOf": [ { "required": ["Person"] }, { "required": ["PersonNameType"] } ],
//!   "additionalProperties": false
//! }
//! ```
//!
//! The root accepts an object naming one or more of the document's global
//! elements or named types, each validated against its declaration.
//!
//! ## Reference Pointers
//!
//! A pointer into the same document is `#/<section>/<name>`; into another
//! document it is prefixed with that document's `$id`, the percent-encoded
//! identifier (`Base%20Types.json` for `Base Types.xsd`). Pointer segments are
//! escaped per RFC 6901 and then percent-encoded for use as a URI fragment.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use xs2js_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, QName, SchemaError};

use crate::convert::ConvertedUnit;
use crate::options::ConversionOptions;
use crate::registry::SchemaUnit;

/// `$schema` of every emitted document.
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// One emitted JSON Schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDocument {
    identifier: String,
    source_filename: String,
    schema: Value,
}

impl OutputDocument {
    /// The document's identifier: its `$id` and the name other documents
    /// use in cross-document pointers.
    pub fn filename(&self) -> &str {
        &self.identifier
    }

    /// The XSD document this was converted from.
    pub fn source_filename(&self) -> &str {
        &self.source_filename
    }

    /// The schema body.
    pub fn json_schema(&self) -> &Value {
        &self.schema
    }

    /// Consume the document and return the schema body.
    pub fn into_json_schema(self) -> Value {
        self.schema
    }

    /// RFC 8785 canonical bytes of the schema body.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(&self.schema)
    }

    /// SHA-256 digest over the canonical bytes.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&self.canonical_bytes()?))
    }

    /// Indented JSON text.
    pub fn to_pretty_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.schema)
    }
}

/// Build the output document of `unit` from its converted declarations.
pub fn assemble(
    unit: &SchemaUnit,
    converted: ConvertedUnit,
    options: &ConversionOptions,
) -> OutputDocument {
    let mut root = Map::new();
    root.insert("$schema".into(), json!(DRAFT_07));
    root.insert("$id".into(), json!(percent_encode(unit.identifier(), true)));
    root.insert(
        "title".into(),
        json!(format!("JSON Schema generated from {}", unit.filename())),
    );
    if let Some(doc) = unit.document().and_then(|d| d.documentation.as_ref()) {
        root.insert("description".into(), json!(doc));
    }
    root.insert("type".into(), json!("object"));

    let mut properties = Map::new();
    for (name, schema) in converted.elements {
        properties.insert(name, schema);
    }
    for name in converted.types {
        if !properties.contains_key(&name) {
            let pointer = ref_string(None, "definitions", &name);
            properties.insert(name, json!({ "$ref": pointer }));
        }
    }

    if !converted.definitions.is_empty() {
        root.insert("definitions".into(), Value::Object(converted.definitions));
    }
    if !properties.is_empty() {
        let mut names: Vec<&String> = properties.keys().collect();
        names.sort();
        let any_of: Vec<Value> = names.into_iter().map(|n| json!({ "required": [n] })).collect();
        root.insert("properties".into(), Value::Object(properties));
        root.insert("anyOf".into(), Value::Array(any_of));
    }
    if options.closed() {
        root.insert("additionalProperties".into(), json!(false));
    }

    OutputDocument {
        identifier: unit.identifier().to_string(),
        source_filename: unit.filename().to_string(),
        schema: Value::Object(root),
    }
}

// ─── Pointers ────────────────────────────────────────────────────────

/// A `$ref` value for `section/name`, in `document` or, when `None`, in the
/// referencing document itself.
pub(crate) fn ref_string(document: Option<&str>, section: &str, name: &str) -> String {
    format!(
        "{}#/{}/{}",
        document.map(|d| percent_encode(d, true)).unwrap_or_default(),
        escape_segment(section),
        escape_segment(name)
    )
}

/// RFC 6901 escaping followed by percent-encoding.
fn escape_segment(segment: &str) -> String {
    percent_encode(&segment.replace('~', "~0").replace('/', "~1"), false)
}

fn percent_encode(text: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        let unreserved = byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~');
        if unreserved || (keep_slash && byte == b'/') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Inverse of the pointer percent-encoding. `None` on a malformed escape.
pub(crate) fn percent_decode(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = text.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Check every `$ref` of every document against the batch. Returns one
/// error per pointer that does not resolve.
pub fn verify_pointers(outputs: &BTreeMap<String, OutputDocument>) -> Vec<SchemaError> {
    let by_identifier: BTreeMap<&str, &OutputDocument> =
        outputs.values().map(|d| (d.filename(), d)).collect();
    let mut errors = Vec::new();
    for document in outputs.values() {
        let mut refs = Vec::new();
        collect_refs(&document.schema, "", &mut refs);
        for (path, pointer) in refs {
            if !resolves(document, &by_identifier, &pointer) {
                errors.push(SchemaError::UnresolvedTypeReference {
                    filename: document.source_filename.clone(),
                    referencing: format!("$ref at {path}"),
                    missing: QName::new("", pointer),
                });
            }
        }
    }
    errors
}

fn collect_refs(value: &Value, path: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{path}/{key}");
                match (key.as_str(), child) {
                    ("$ref", Value::String(pointer)) => out.push((path.to_string(), pointer.clone())),
                    _ => collect_refs(child, &child_path, out),
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_refs(item, &format!("{path}/{i}"), out);
            }
        }
        _ => {}
    }
}

fn resolves(
    document: &OutputDocument,
    by_identifier: &BTreeMap<&str, &OutputDocument>,
    pointer: &str,
) -> bool {
    let Some((target, fragment)) = pointer.split_once('#') else {
        return false;
    };
    let target = if target.is_empty() {
        Some(document)
    } else {
        percent_decode(target).and_then(|t| by_identifier.get(t.as_str()).copied())
    };
    match (target, percent_decode(fragment)) {
        (Some(target), Some(fragment)) => target.schema.pointer(&fragment).is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(filename: &str) -> SchemaUnit {
        SchemaUnit::new(filename, filename.replace(".xsd", ".json"), "")
    }

    fn document(filename: &str, definitions: Value, elements: Vec<(String, Value)>) -> OutputDocument {
        let converted = ConvertedUnit {
            types: definitions
                .as_object()
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default(),
            definitions: definitions.as_object().cloned().unwrap_or_default(),
            elements,
        };
        assemble(&unit(filename), converted, &ConversionOptions::default())
    }

    #[test]
    fn test_ref_string_forms() {
        assert_eq!(ref_string(None, "definitions", "T"), "#/definitions/T");
        assert_eq!(
            ref_string(Some("BaseTypes.json"), "definitions", "Char_20"),
            "BaseTypes.json#/definitions/Char_20"
        );
        assert_eq!(
            ref_string(None, "definitions", "group.Audit"),
            "#/definitions/group.Audit"
        );
    }

    #[test]
    fn test_escape_segment() {
        assert_eq!(escape_segment("a/b~c"), "a~1b~0c");
        assert_eq!(escape_segment("Größe"), "Gr%C3%B6%C3%9Fe");
        assert_eq!(percent_decode("Gr%C3%B6%C3%9Fe").unwrap(), "Größe");
        assert!(percent_decode("%G1").is_none());
    }

    #[test]
    fn test_assemble_root_layout() {
        let doc = document(
            "Example.xsd",
            json!({"PersonNameType": {"type": "object"}}),
            vec![("Person".into(), json!({"$ref": "#/definitions/PersonNameType"}))],
        );
        let schema = doc.json_schema();
        assert_eq!(doc.filename(), "Example.json");
        assert_eq!(doc.source_filename(), "Example.xsd");
        assert_eq!(schema["$schema"], DRAFT_07);
        assert_eq!(schema["$id"], "Example.json");
        assert_eq!(schema["title"], "JSON Schema generated from Example.xsd");
        assert_eq!(
            schema["properties"]["PersonNameType"],
            json!({"$ref": "#/definitions/PersonNameType"})
        );
        assert_eq!(
            schema["anyOf"],
            json!([{"required": ["Person"]}, {"required": ["PersonNameType"]}])
        );
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn test_element_wins_name_clash() {
        let doc = document(
            "A.xsd",
            json!({"Item": {"type": "object"}}),
            vec![("Item".into(), json!({"type": "string"}))],
        );
        assert_eq!(doc.json_schema()["properties"]["Item"], json!({"type": "string"}));
        assert_eq!(doc.json_schema()["anyOf"], json!([{"required": ["Item"]}]));
    }

    #[test]
    fn test_verify_pointers_across_documents() {
        let a = document("A.xsd", json!({"Code": {"type": "string"}}), vec![]);
        let b = document(
            "B.xsd",
            json!({}),
            vec![
                ("code".into(), json!({"$ref": "A.json#/definitions/Code"})),
                ("bad".into(), json!({"items": {"$ref": "A.json#/definitions/Missing"}})),
                ("gone".into(), json!({"$ref": "C.json#/definitions/Code"})),
            ],
        );
        let mut outputs = BTreeMap::new();
        outputs.insert("A.xsd".to_string(), a);
        outputs.insert("B.xsd".to_string(), b);
        let errors = verify_pointers(&outputs);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.filename() == "B.xsd" && e.is_fatal()));
    }

    #[test]
    fn test_digest_stable_across_clones() {
        let doc = document("A.xsd", json!({"Code": {"type": "string"}}), vec![]);
        let again = doc.clone();
        assert_eq!(doc.digest().unwrap(), again.digest().unwrap());
        assert!(doc.digest().unwrap().to_string().starts_with("sha256:"));
    }
}
