//! # Qualified Names
//!
//! A `QName` identifies a top-level declaration across every document of a
//! batch. Prefixes are never part of the identity: two references written
//! with different prefixes that map to the same namespace URI name the same
//! declaration.
//!
//! The empty string stands for "no namespace" (a schema without a
//! `targetNamespace`, or an unprefixed reference in a document without a
//! default namespace).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The XML Schema namespace. Built-in datatypes live here.
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// A (namespace URI, local name) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI, empty for no namespace.
    pub namespace: String,
    /// Local part of the name.
    pub local: String,
}

impl QName {
    /// Build a qualified name from its parts.
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// A name in the XML Schema namespace.
    pub fn xs(local: impl Into<String>) -> Self {
        Self::new(XS_NAMESPACE, local)
    }

    /// Whether this names a built-in XML Schema datatype.
    pub fn is_builtin(&self) -> bool {
        self.namespace == XS_NAMESPACE
    }

    /// Whether the name has no namespace.
    pub fn is_unqualified(&self) -> bool {
        self.namespace.is_empty()
    }
}

/// Clark notation: `{namespace}local`, or bare `local` without a namespace.
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}
