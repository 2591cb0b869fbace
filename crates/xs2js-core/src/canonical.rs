//! # Canonical Serialization — Deterministic Document Bytes
//!
//! This module defines `CanonicalBytes`, the byte form used whenever two
//! emitted schema documents are compared or digested.
//!
//! ## Invariant
//!
//! Converting the same batch twice must yield identical documents. Pretty
//! printing depends on map iteration order and indentation choices, so
//! equality and digests are always computed over RFC 8785 (JSON
//! Canonicalization Scheme) bytes instead: sorted keys, compact separators,
//! shortest round-trip number form.
//!
//! Schema documents legitimately contain non-integer numbers (decimal
//! facet bounds such as `minInclusive="0.5"`, float enumeration values), so
//! floats are accepted and written in their shortest round-trip form.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Object keys are sorted, separators are compact (RFC 8785).
///
/// The inner `Vec<u8>` is private so downstream code cannot hand-build a
/// value that skipped canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let bytes = serialize_canonical(&value)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the canonical bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}
