//! # xs2js-core — Foundational Types for the XSD → JSON Schema Transpiler
//!
//! This crate is the leaf of the xs2js workspace. It defines the small set
//! of types every other crate agrees on:
//!
//! 1. **`QName`.** A (namespace URI, local name) pair. Every type, element,
//!    group and attribute declaration in a batch is keyed by one. Ordering is
//!    derived so that `BTreeMap<QName, _>` iteration is deterministic.
//!
//! 2. **`SchemaError`.** The complete error taxonomy of a conversion batch,
//!    with a single `is_fatal()` classification used by the batch driver to
//!    decide between aborting and recording a diagnostic.
//!
//! 3. **`CanonicalBytes`.** RFC 8785 serialization of emitted documents.
//!    Two runs over the same input must produce the same canonical bytes;
//!    tests compare these rather than pretty-printed text.
//!
//! 4. **`ContentDigest`.** SHA-256 over canonical bytes, printed by the CLI
//!    next to each emitted document.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `xs2js-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod qname;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{BatchError, CanonicalizationError, SchemaError};
pub use qname::{QName, XS_NAMESPACE};
