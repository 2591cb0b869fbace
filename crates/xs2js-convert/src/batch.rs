//! # Batch Driver
//!
//! [`process_all_schemas`] runs one conversion batch end to end:
//!
//! ```text
//! register ─▶ parse (parallel) ─▶ seal ─▶ link ─▶ convert (parallel) ─▶ assemble ─▶ verify
//! ```
//!
//! Registration completes before any resolution starts: the registry is
//! mutable only until it is sealed, and the sealed registry and the type
//! graph are shared read-only with the conversion workers. Every phase
//! collects all of its problems; the batch stops after the first phase that
//! produced a fatal one and returns everything collected so far.
//!
//! Nothing outlives the call. A failed batch exposes no output documents.

use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info};
use xs2js_core::{BatchError, SchemaError};

use crate::assembler::{assemble, verify_pointers, OutputDocument};
use crate::convert::{ConvertedUnit, Converter};
use crate::graph::TypeGraph;
use crate::options::ConversionOptions;
use crate::parser::{parse, ParseOutcome};
use crate::registry::{NamespaceRegistry, SchemaUnit};

/// The outcome of a successful batch.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    outputs: BTreeMap<String, OutputDocument>,
    diagnostics: Vec<SchemaError>,
}

impl BatchResult {
    /// The output document converted from `filename`.
    ///
    /// The output identifier (`BaseTypes.json`) is accepted as well as the
    /// source filename (`BaseTypes.xsd`).
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotProcessed` if the batch did not cover the
    /// file.
    pub fn get_result(&self, filename: &str) -> Result<&OutputDocument, SchemaError> {
        self.outputs
            .get(filename)
            .or_else(|| self.outputs.values().find(|d| d.filename() == filename))
            .ok_or_else(|| SchemaError::NotProcessed {
                filename: filename.to_string(),
            })
    }

    /// All output documents, ordered by source filename.
    pub fn outputs(&self) -> impl Iterator<Item = &OutputDocument> {
        self.outputs.values()
    }

    /// Source filenames covered by the batch.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Non-fatal problems recorded while converting.
    pub fn diagnostics(&self) -> &[SchemaError] {
        &self.diagnostics
    }

    /// Number of output documents.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Consume the result and return the documents keyed by source filename.
    pub fn into_outputs(self) -> BTreeMap<String, OutputDocument> {
        self.outputs
    }
}

/// Convert a batch of XSD documents, given as (filename, schema text)
/// pairs.
///
/// # Errors
///
/// Returns a [`BatchError`] listing every collected problem when any of
/// them is fatal: a duplicate filename, malformed markup, an unresolved
/// namespace or type reference, a duplicate declaration, a derivation cycle.
pub fn process_all_schemas<N, S>(
    schemas: &[(N, S)],
    options: &ConversionOptions,
) -> Result<BatchResult, BatchError>
where
    N: AsRef<str>,
    S: AsRef<str>,
{
    let mut errors = Vec::new();

    let mut registry = NamespaceRegistry::new();
    for (filename, raw) in schemas {
        let filename = filename.as_ref();
        let identifier = options.output_identifier(filename);
        if let Err(e) = registry.register(SchemaUnit::new(filename, identifier, raw.as_ref())) {
            errors.push(e);
        }
    }

    let parsed: Vec<(String, Result<ParseOutcome, SchemaError>)> = {
        let units: Vec<&SchemaUnit> = registry.units().collect();
        let outcomes = parallel_map(&units, options.parallel, |unit| parse(unit), |unit, message| {
            Err(SchemaError::MalformedSchema {
                filename: unit.filename().to_string(),
                reason: format!("parser panicked: {message}"),
            })
        });
        units
            .iter()
            .map(|u| u.filename().to_string())
            .zip(outcomes)
            .collect()
    };
    for (filename, outcome) in parsed {
        match outcome {
            Ok(ParseOutcome {
                document,
                diagnostics,
            }) => {
                errors.extend(diagnostics);
                registry.attach(&filename, document);
            }
            Err(e) => errors.push(e),
        }
    }
    abort_if_fatal(&mut errors)?;

    let sealed = registry.seal();
    let (graph, link_errors) = TypeGraph::link_all(&sealed, options);
    errors.extend(link_errors);
    abort_if_fatal(&mut errors)?;

    let units: Vec<&SchemaUnit> = sealed.units().collect();
    let converted = parallel_map(
        &units,
        options.parallel,
        |unit| Converter::new(&graph, options, *unit).convert_unit(),
        |unit, message| {
            let error = SchemaError::MalformedSchema {
                filename: unit.filename().to_string(),
                reason: format!("converter panicked: {message}"),
            };
            (ConvertedUnit::default(), vec![error])
        },
    );

    let mut outputs = BTreeMap::new();
    for (unit, (declarations, unit_errors)) in units.iter().zip(converted) {
        errors.extend(unit_errors);
        let document = assemble(unit, declarations, options);
        debug!(
            filename = unit.filename(),
            identifier = document.filename(),
            "assembled output document"
        );
        outputs.insert(unit.filename().to_string(), document);
    }
    abort_if_fatal(&mut errors)?;

    errors.extend(verify_pointers(&outputs));
    abort_if_fatal(&mut errors)?;

    sort_by_filename(&mut errors);
    info!(
        units = outputs.len(),
        types = graph.type_count(),
        diagnostics = errors.len(),
        "schema batch converted"
    );
    Ok(BatchResult {
        outputs,
        diagnostics: errors,
    })
}

fn sort_by_filename(errors: &mut [SchemaError]) {
    errors.sort_by(|a, b| a.filename().cmp(b.filename()));
}

fn abort_if_fatal(errors: &mut Vec<SchemaError>) -> Result<(), BatchError> {
    if !errors.iter().any(SchemaError::is_fatal) {
        return Ok(());
    }
    let mut all = std::mem::take(errors);
    sort_by_filename(&mut all);
    info!(errors = all.len(), "schema batch failed");
    Err(BatchError::new(all))
}

// ─── Stateful Front End ──────────────────────────────────────────────

/// A converter that keeps the result of its last batch.
///
/// Mirrors the two-step use of a conversion library: run a batch, then
/// fetch documents by filename. A failed batch discards the previous
/// result, so documents are only ever served from a batch that succeeded.
#[derive(Debug, Clone, Default)]
pub struct SchemaTranspiler {
    options: ConversionOptions,
    last: Option<BatchResult>,
}

impl SchemaTranspiler {
    /// A transpiler using `options` for every batch.
    pub fn new(options: ConversionOptions) -> Self {
        Self { options, last: None }
    }

    /// The options in use.
    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Run a batch and keep its result.
    ///
    /// # Errors
    ///
    /// See [`process_all_schemas`].
    pub fn process_all_schemas<N, S>(&mut self, schemas: &[(N, S)]) -> Result<&BatchResult, BatchError>
    where
        N: AsRef<str>,
        S: AsRef<str>,
    {
        self.last = None;
        let result = process_all_schemas(schemas, &self.options)?;
        let stored: &BatchResult = self.last.insert(result);
        Ok(stored)
    }

    /// A document of the last successful batch.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotProcessed` before any successful batch, after
    /// a failed one, or for a file the batch did not cover.
    pub fn get_result(&self, filename: &str) -> Result<&OutputDocument, SchemaError> {
        match &self.last {
            Some(result) => result.get_result(filename),
            None => Err(SchemaError::NotProcessed {
                filename: filename.to_string(),
            }),
        }
    }
}

// ─── Workers ─────────────────────────────────────────────────────────

/// Map `work` over `items` on scoped threads, at most one per available
/// core, preserving input order. A panicking item yields `on_panic`'s value.
fn parallel_map<I, T, F>(items: &[I], parallel: bool, work: F, on_panic: fn(&I, String) -> T) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync,
{
    let thread_count = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    if !parallel || thread_count < 2 || items.len() < 2 {
        return items
            .iter()
            .map(|item| {
                panic::catch_unwind(AssertUnwindSafe(|| work(item)))
                    .unwrap_or_else(|e| on_panic(item, panic_message(e)))
            })
            .collect();
    }
    let work = &work;
    let mut results = Vec::with_capacity(items.len());
    std::thread::scope(|s| {
        let mut handles = VecDeque::with_capacity(items.len());
        for item in items {
            handles.push_back((item, s.spawn(move || work(item))));
            if handles.len() >= thread_count {
                if let Some((item, handle)) = handles.pop_front() {
                    results.push(handle.join().unwrap_or_else(|e| on_panic(item, panic_message(e))));
                }
            }
        }
        for (item, handle) in handles {
            results.push(handle.join().unwrap_or_else(|e| on_panic(item, panic_message(e))));
        }
    });
    results
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="urn:base" targetNamespace="urn:base">
        <xs:simpleType name="Code"><xs:restriction base="xs:string"><xs:maxLength value="4"/></xs:restriction></xs:simpleType>
    </xs:schema>"#;

    const USER: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:b="urn:base" xmlns="urn:user" targetNamespace="urn:user">
        <xs:import namespace="urn:base"/>
        <xs:element name="Item"><xs:complexType><xs:sequence>
            <xs:element name="code" type="b:Code"/>
        </xs:sequence></xs:complexType></xs:element>
    </xs:schema>"#;

    #[test]
    fn test_cross_document_pointer() {
        let result =
            process_all_schemas(&[("User.xsd", USER), ("Base.xsd", BASE)], &ConversionOptions::default())
                .unwrap();
        assert_eq!(result.len(), 2);
        let user = result.get_result("User.xsd").unwrap();
        assert_eq!(
            user.json_schema()["properties"]["Item"]["properties"]["code"]["$ref"],
            "Base.json#/definitions/Code"
        );
        assert_eq!(result.get_result("Base.json").unwrap().source_filename(), "Base.xsd");
        assert!(result.diagnostics().is_empty());
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let opts = ConversionOptions::default();
        let a = process_all_schemas(&[("User.xsd", USER), ("Base.xsd", BASE)], &opts).unwrap();
        let b = process_all_schemas(&[("Base.xsd", BASE), ("User.xsd", USER)], &opts).unwrap();
        for doc in a.outputs() {
            let other = b.get_result(doc.source_filename()).unwrap();
            assert_eq!(doc.canonical_bytes().unwrap(), other.canonical_bytes().unwrap());
        }
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let sequential = ConversionOptions {
            parallel: false,
            ..ConversionOptions::default()
        };
        let a = process_all_schemas(&[("User.xsd", USER), ("Base.xsd", BASE)], &sequential).unwrap();
        let b = process_all_schemas(&[("User.xsd", USER), ("Base.xsd", BASE)], &ConversionOptions::default())
            .unwrap();
        assert_eq!(
            a.get_result("User.xsd").unwrap().digest().unwrap(),
            b.get_result("User.xsd").unwrap().digest().unwrap()
        );
    }

    #[test]
    fn test_missing_dependency_fails_batch() {
        let err = process_all_schemas(&[("User.xsd", USER)], &ConversionOptions::default()).unwrap_err();
        assert!(err.fatal().any(|e| e.code() == "UnresolvedNamespaceError"));
    }

    #[test]
    fn test_duplicate_file_and_malformed_reported_together() {
        let err = process_all_schemas(
            &[("Base.xsd", BASE), ("Base.xsd", BASE), ("Bad.xsd", "<xs:schema")],
            &ConversionOptions::default(),
        )
        .unwrap_err();
        let codes: Vec<_> = err.errors().iter().map(SchemaError::code).collect();
        assert_eq!(codes, vec!["MalformedSchemaError", "DuplicateFileError"]);
    }

    #[test]
    fn test_transpiler_failed_batch_clears_results() {
        let mut transpiler = SchemaTranspiler::default();
        assert!(matches!(
            transpiler.get_result("Base.xsd"),
            Err(SchemaError::NotProcessed { .. })
        ));
        transpiler.process_all_schemas(&[("Base.xsd", BASE)]).unwrap();
        assert!(transpiler.get_result("Base.xsd").is_ok());
        assert!(transpiler.get_result("Other.xsd").is_err());

        assert!(transpiler.process_all_schemas(&[("User.xsd", USER)]).is_err());
        assert!(matches!(
            transpiler.get_result("Base.xsd"),
            Err(SchemaError::NotProcessed { .. })
        ));
    }

    #[test]
    fn test_parallel_map_preserves_order_and_catches_panics() {
        let items: Vec<u32> = (0..16).collect();
        let out = parallel_map(&items, true, |n| n * 2, |_, _| u32::MAX);
        assert_eq!(out, items.iter().map(|n| n * 2).collect::<Vec<_>>());

        let out = parallel_map(
            &items,
            true,
            |n| if *n == 3 { panic!("boom") } else { *n },
            |n, message| if message == "boom" { 1000 + n } else { 0 },
        );
        assert_eq!(out[3], 1003);
        assert_eq!(out[4], 4);
    }
}
