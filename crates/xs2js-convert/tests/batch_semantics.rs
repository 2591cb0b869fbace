//! Integration tests: conversion semantics observed through validation.
//!
//! Each test converts a small batch, loads the emitted documents into a
//! `SchemaSet`, and checks which instances the validator accepts.

use serde_json::{json, Value};
use xs2js_convert::{
    process_all_schemas, AdditionalProperties, BatchResult, ConversionOptions, SchemaError,
    SchemaSet, SchemaTranspiler, SchemaValidationError,
};

fn schema(target: &str, body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="{target}" targetNamespace="{target}">{body}</xs:schema>"#
    )
}

fn convert(files: &[(&str, &str)]) -> BatchResult {
    process_all_schemas(files, &ConversionOptions::default()).expect("batch converts")
}

/// Keywords of every violation, or an empty list when the instance is valid.
fn failing_keywords(set: &SchemaSet, identifier: &str, instance: &Value) -> Vec<String> {
    match set.validate_document(instance, identifier) {
        Ok(()) => Vec::new(),
        Err(SchemaValidationError::ValidationFailed { violations, .. }) => {
            violations.into_inner().into_iter().map(|v| v.keyword).collect()
        }
        Err(other) => panic!("validator could not be built: {other}"),
    }
}

// ─── Occurrence Bounds ───────────────────────────────────────────────

const BOX: &str = r#"
    <xs:complexType name="BoxType"><xs:sequence>
        <xs:element name="label" type="xs:string"/>
        <xs:element name="note" type="xs:string" minOccurs="0"/>
        <xs:element name="item" type="xs:string" maxOccurs="3"/>
        <xs:element name="tag" type="xs:string" minOccurs="2" maxOccurs="unbounded"/>
    </xs:sequence></xs:complexType>
    <xs:element name="Box" type="BoxType"/>"#;

fn box_set() -> SchemaSet {
    SchemaSet::from_result(&convert(&[("Box.xsd", schema("urn:box", BOX).as_str())]))
}

#[test]
fn test_optional_element_may_be_omitted() {
    let set = box_set();
    let instance = json!({"Box": {"label": "a", "item": ["x"], "tag": ["t", "u"]}});
    assert!(failing_keywords(&set, "Box.json", &instance).is_empty());
}

#[test]
fn test_required_element_must_be_present() {
    let set = box_set();
    let instance = json!({"Box": {"item": ["x"], "tag": ["t", "u"]}});
    assert_eq!(failing_keywords(&set, "Box.json", &instance), vec!["required"]);
}

#[test]
fn test_bounded_max_occurs() {
    let set = box_set();
    let three = json!({"Box": {"label": "a", "item": ["1", "2", "3"], "tag": ["t", "u"]}});
    assert!(failing_keywords(&set, "Box.json", &three).is_empty());

    let four = json!({"Box": {"label": "a", "item": ["1", "2", "3", "4"], "tag": ["t", "u"]}});
    assert_eq!(failing_keywords(&set, "Box.json", &four), vec!["maxItems"]);
}

#[test]
fn test_unbounded_max_occurs_honours_min() {
    let set = box_set();
    let many: Vec<String> = (0..50).map(|i| format!("t{i}")).collect();
    let long = json!({"Box": {"label": "a", "item": ["x"], "tag": many}});
    assert!(failing_keywords(&set, "Box.json", &long).is_empty());

    let short = json!({"Box": {"label": "a", "item": ["x"], "tag": ["t"]}});
    assert_eq!(failing_keywords(&set, "Box.json", &short), vec!["minItems"]);
}

// ─── Choice, Recursion, Nillable ─────────────────────────────────────

#[test]
fn test_choice_accepts_exactly_one_branch() {
    let body = r#"
        <xs:complexType name="Contact"><xs:choice>
            <xs:element name="Email" type="xs:string"/>
            <xs:element name="Phone" type="xs:string"/>
        </xs:choice></xs:complexType>"#;
    let set = SchemaSet::from_result(&convert(&[("C.xsd", schema("urn:c", body).as_str())]));

    assert!(failing_keywords(&set, "C.json", &json!({"Contact": {"Email": "a@b"}})).is_empty());
    assert!(failing_keywords(&set, "C.json", &json!({"Contact": {"Phone": "1"}})).is_empty());
    assert_eq!(
        failing_keywords(&set, "C.json", &json!({"Contact": {"Email": "a@b", "Phone": "1"}})),
        vec!["oneOf"]
    );
    assert_eq!(failing_keywords(&set, "C.json", &json!({"Contact": {}})), vec!["oneOf"]);
}

#[test]
fn test_recursive_type_validates_nested_instance() {
    let body = r#"
        <xs:complexType name="Node"><xs:sequence>
            <xs:element name="label" type="xs:string"/>
            <xs:element name="child" type="Node" minOccurs="0" maxOccurs="unbounded"/>
        </xs:sequence></xs:complexType>
        <xs:element name="Tree" type="Node"/>"#;
    let set = SchemaSet::from_result(&convert(&[("Tree.xsd", schema("urn:tree", body).as_str())]));

    let tree = json!({"Tree": {"label": "root", "child": [
        {"label": "a", "child": [{"label": "a1"}]},
        {"label": "b"}
    ]}});
    assert!(failing_keywords(&set, "Tree.json", &tree).is_empty());

    let broken = json!({"Tree": {"label": "root", "child": [{"child": []}]}});
    assert_eq!(failing_keywords(&set, "Tree.json", &broken), vec!["required"]);
}

#[test]
fn test_nillable_element_accepts_null() {
    let body = r#"<xs:element name="Note" type="xs:string" nillable="true"/>
                  <xs:element name="Title" type="xs:string"/>"#;
    let set = SchemaSet::from_result(&convert(&[("N.xsd", schema("urn:n", body).as_str())]));
    assert!(failing_keywords(&set, "N.json", &json!({"Note": null})).is_empty());
    assert!(!failing_keywords(&set, "N.json", &json!({"Title": null})).is_empty());
}

// ─── Cross-Document Reuse ────────────────────────────────────────────

const CODES: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:codes">
    <xs:simpleType name="Code"><xs:restriction base="xs:string">
        <xs:pattern value="[A-Z]{3}"/>
    </xs:restriction></xs:simpleType>
</xs:schema>"#;

const ORDERS: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:c="urn:codes"
    xmlns="urn:orders" targetNamespace="urn:orders">
    <xs:import namespace="urn:codes" schemaLocation="Codes.xsd"/>
    <xs:complexType name="Order"><xs:sequence>
        <xs:element name="currency" type="c:Code"/>
    </xs:sequence></xs:complexType>
    <xs:element name="Order" type="Order"/>
</xs:schema>"#;

#[test]
fn test_cross_document_type_reuse() {
    let result = convert(&[("Orders.xsd", ORDERS), ("Codes.xsd", CODES)]);
    let orders = result.get_result("Orders.xsd").unwrap();
    assert_eq!(
        orders.json_schema()["definitions"]["Order"]["properties"]["currency"],
        json!({"$ref": "Codes.json#/definitions/Code"})
    );

    let set = SchemaSet::from_result(&result);
    assert!(failing_keywords(&set, "Orders.json", &json!({"Order": {"currency": "EUR"}})).is_empty());
    assert_eq!(
        failing_keywords(&set, "Orders.json", &json!({"Order": {"currency": "euro"}})),
        vec!["pattern"]
    );
}

#[test]
fn test_cross_document_reference_to_filename_with_space() {
    let orders = ORDERS.replace("Codes.xsd", "Currency Codes.xsd");
    let result = convert(&[("Orders.xsd", orders.as_str()), ("Currency Codes.xsd", CODES)]);
    assert_eq!(
        result.get_result("Orders.xsd").unwrap().json_schema()["definitions"]["Order"]["properties"]
            ["currency"],
        json!({"$ref": "Currency%20Codes.json#/definitions/Code"})
    );
    assert_eq!(
        result.get_result("Currency Codes.xsd").unwrap().json_schema()["$id"],
        "Currency%20Codes.json"
    );

    let set = SchemaSet::from_result(&result);
    assert!(failing_keywords(&set, "Orders.json", &json!({"Order": {"currency": "EUR"}})).is_empty());
    assert_eq!(
        failing_keywords(&set, "Orders.json", &json!({"Order": {"currency": "euro"}})),
        vec!["pattern"]
    );
    assert!(failing_keywords(&set, "Currency Codes.json", &json!({"Code": "USD"})).is_empty());
}

#[test]
fn test_dependent_document_alone_does_not_validate() {
    let result = convert(&[("Orders.xsd", ORDERS), ("Codes.xsd", CODES)]);
    let set = SchemaSet::from_outputs([result.get_result("Orders.xsd").unwrap()]);
    assert_eq!(set.len(), 1);
    assert!(set
        .validate_document(&json!({"Order": {"currency": "EUR"}}), "Orders.json")
        .is_err());
}

#[test]
fn test_missing_imported_document_fails_batch() {
    let err = process_all_schemas(&[("Orders.xsd", ORDERS)], &ConversionOptions::default())
        .unwrap_err();
    assert!(err.fatal().any(|e| e.code() == "UnresolvedNamespaceError"));
}

// ─── Determinism ─────────────────────────────────────────────────────

#[test]
fn test_conversion_is_idempotent_and_order_independent() {
    let box_xsd = schema("urn:box", BOX);
    let first = convert(&[("Orders.xsd", ORDERS), ("Codes.xsd", CODES), ("Box.xsd", box_xsd.as_str())]);
    let second = convert(&[("Box.xsd", box_xsd.as_str()), ("Codes.xsd", CODES), ("Orders.xsd", ORDERS)]);
    let sequential = process_all_schemas(
        &[("Codes.xsd", CODES), ("Orders.xsd", ORDERS), ("Box.xsd", box_xsd.as_str())],
        &ConversionOptions {
            parallel: false,
            ..ConversionOptions::default()
        },
    )
    .unwrap();

    for filename in ["Box.xsd", "Codes.xsd", "Orders.xsd"] {
        let a = first.get_result(filename).unwrap().canonical_bytes().unwrap();
        let b = second.get_result(filename).unwrap().canonical_bytes().unwrap();
        let c = sequential.get_result(filename).unwrap().canonical_bytes().unwrap();
        assert_eq!(a, b, "{filename} differs between input orders");
        assert_eq!(a, c, "{filename} differs between parallel and sequential runs");
    }
}

// ─── Error Aggregation ───────────────────────────────────────────────

#[test]
fn test_failed_batch_reports_every_error() {
    let broken = schema("urn:x", r#"<xs:element name="x" type="Missing"/>"#);
    let err = process_all_schemas(
        &[
            ("Bad.xsd", "<xs:schema"),
            ("Worse.xsd", "not xml at all"),
            ("Bad.xsd", CODES),
            ("X.xsd", broken.as_str()),
        ],
        &ConversionOptions::default(),
    )
    .unwrap_err();

    let codes: Vec<(&str, &str)> = err.errors().iter().map(|e| (e.filename(), e.code())).collect();
    assert!(codes.contains(&("Bad.xsd", "DuplicateFileError")));
    assert!(codes.contains(&("Bad.xsd", "MalformedSchemaError")));
    assert!(codes.contains(&("Worse.xsd", "MalformedSchemaError")));
    let mut sorted = codes.clone();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    assert_eq!(codes, sorted, "errors are grouped by filename");
}

#[test]
fn test_non_fatal_problems_become_diagnostics() {
    let body = r#"
        <xs:simpleType name="Short"><xs:restriction base="xs:string"><xs:maxLength value="5"/></xs:restriction></xs:simpleType>
        <xs:simpleType name="Wider"><xs:restriction base="Short"><xs:maxLength value="9"/></xs:restriction></xs:simpleType>
        <xs:complexType name="Mixed" mixed="true"><xs:sequence><xs:element name="b" type="xs:string"/></xs:sequence></xs:complexType>"#;
    let result = convert(&[("D.xsd", schema("urn:d", body).as_str())]);
    let codes: Vec<&str> = result.diagnostics().iter().map(SchemaError::code).collect();
    assert!(codes.contains(&"FacetNarrowingViolation"));
    assert!(codes.contains(&"UnsupportedConstructError"));
    assert!(result.get_result("D.xsd").is_ok());
}

#[test]
fn test_results_unavailable_after_failed_batch() {
    let mut transpiler = SchemaTranspiler::new(ConversionOptions::default());
    assert!(matches!(
        transpiler.get_result("Codes.xsd"),
        Err(SchemaError::NotProcessed { .. })
    ));

    transpiler.process_all_schemas(&[("Codes.xsd", CODES)]).unwrap();
    assert!(transpiler.get_result("Codes.xsd").is_ok());
    assert!(transpiler.get_result("Other.xsd").is_err());

    assert!(transpiler.process_all_schemas(&[("Codes.xsd", "<oops")]).is_err());
    assert!(transpiler.get_result("Codes.xsd").is_err());
}

// ─── Unknown Members ─────────────────────────────────────────────────

#[test]
fn test_unknown_members_follow_policy() {
    let box_xsd = schema("urn:box", BOX);
    let instance = json!({"Box": {"label": "a", "item": ["x"], "tag": ["t", "u"], "lable": "typo"}});

    let closed = SchemaSet::from_result(&convert(&[("Box.xsd", box_xsd.as_str())]));
    assert_eq!(
        failing_keywords(&closed, "Box.json", &instance),
        vec!["additionalProperties"]
    );

    let open_options = ConversionOptions {
        additional_properties: AdditionalProperties::Open,
        ..ConversionOptions::default()
    };
    let open = SchemaSet::from_result(
        &process_all_schemas(&[("Box.xsd", box_xsd.as_str())], &open_options).unwrap(),
    );
    assert!(failing_keywords(&open, "Box.json", &instance).is_empty());
}

#[test]
fn test_root_requires_a_declared_member() {
    let set = box_set();
    assert!(!failing_keywords(&set, "Box.json", &json!({})).is_empty());
    let keywords = failing_keywords(&set, "Box.json", &json!({"Unknown": 1}));
    assert!(keywords.contains(&"additionalProperties".to_string()));
}
