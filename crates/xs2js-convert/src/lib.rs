//! # xs2js-convert — XML Schema to JSON Schema Conversion
//!
//! Converts a batch of interdependent XSD documents into one draft-07
//! JSON Schema document each, preserving cross-document type reuse as
//! `$ref` pointers, and validates JSON instances against the result.
//!
//! ## Pipeline
//!
//! ```text
//! (filename, text) ─► registry ─► parser ─► graph ─► convert ─► assembler
//!                     (units)     (ast)     (link)   (schema)   (documents)
//! ```
//!
//! 1. [`registry`] admits each document once and, after parsing, maps
//!    target namespaces to the documents that declare them.
//! 2. [`parser`] reads one document into the [`ast`], independent of every
//!    other document.
//! 3. [`graph`] resolves every qualified name used in the batch to the
//!    document that declares it and rejects derivation cycles.
//! 4. [`convert`] maps simple types ([`convert::constraint`]) and complex
//!    types ([`convert::structure`]) onto JSON Schema keywords.
//! 5. [`assembler`] packages each document and verifies that every `$ref`
//!    of the batch lands on a declaration.
//!
//! [`batch::process_all_schemas`] drives the pipeline; parse and convert
//! run per document on scoped worker threads. Conversion depends only on
//! the set of inputs, never on their order.
//!
//! ## Validation
//!
//! [`validate::SchemaSet`] loads emitted documents into `jsonschema` with
//! cross-document references served from memory.
//!
//! ## Crate Policy
//!
//! - Depends only on `xs2js-core` internally.
//! - No global state: every knob travels in [`ConversionOptions`].
//! - Recoverable problems are diagnostics on the result; anything that
//!   would make an output wrong aborts the batch with a [`BatchError`].

pub mod assembler;
pub mod ast;
pub mod batch;
pub mod builtins;
pub mod convert;
pub mod facets;
pub mod graph;
pub mod options;
pub mod parser;
pub mod registry;
pub mod validate;

pub use assembler::{OutputDocument, DRAFT_07};
pub use batch::{process_all_schemas, BatchResult, SchemaTranspiler};
pub use options::{AdditionalProperties, ConversionOptions, ResolutionMode};
pub use validate::{SchemaSet, SchemaValidationError, ValidationViolations, Violation};
pub use xs2js_core::{BatchError, SchemaError};
