//! Identifier types for records and namespaces.
//!
//! # Responsibility
//! - Validate cross-reference identifiers (`xref`) and tree names at the
//!   input boundary.
//! - Convert between bare identifiers and their `@XREF@` pointer form.
//!
//! # Invariants
//! - An `Xref` only ever holds `[A-Za-z0-9_-]{1,20}`.
//! - A `TreeName` only ever holds `[A-Za-z0-9_.-]{1,64}`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static XREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,20}$").expect("valid xref regex"));
static POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@([A-Za-z0-9_-]{1,20})@$").expect("valid pointer regex"));
static TREE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").expect("valid tree name regex"));

/// Identifier parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    InvalidXref(String),
    InvalidTreeName(String),
}

impl Display for IdentifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidXref(value) => write!(f, "invalid record identifier: `{value}`"),
            Self::InvalidTreeName(value) => write!(f, "invalid tree name: `{value}`"),
        }
    }
}

impl Error for IdentifierError {}

/// Cross-reference identifier of one record, unique within its tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Xref(String);

impl Xref {
    /// Parses a bare identifier such as `I12`.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let trimmed = value.trim();
        if !XREF_RE.is_match(trimmed) {
            return Err(IdentifierError::InvalidXref(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parses the pointer form `@I12@` used inside fact values.
    pub fn from_pointer(value: &str) -> Option<Self> {
        POINTER_RE
            .captures(value.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders the pointer form stored in fact values.
    pub fn pointer(&self) -> String {
        format!("@{}@", self.0)
    }
}

impl Display for Xref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Xref {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Xref> for String {
    fn from(value: Xref) -> Self {
        value.0
    }
}

/// Name of one tree (the namespace that owns records and allocates xrefs).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TreeName(String);

impl TreeName {
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let trimmed = value.trim();
        if !TREE_NAME_RE.is_match(trimmed) {
            return Err(IdentifierError::InvalidTreeName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TreeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TreeName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TreeName> for String {
    fn from(value: TreeName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::{IdentifierError, TreeName, Xref};

    #[test]
    fn parses_plain_and_pointer_forms() {
        let xref = Xref::parse(" I12 ").expect("plain xref");
        assert_eq!(xref.as_str(), "I12");
        assert_eq!(xref.pointer(), "@I12@");
        assert_eq!(Xref::from_pointer("@I12@"), Some(xref));
    }

    #[test]
    fn rejects_pointer_syntax_and_oversized_values() {
        assert_eq!(
            Xref::parse("@I1@").expect_err("pointer is not a bare xref"),
            IdentifierError::InvalidXref("@I1@".to_string())
        );
        assert!(Xref::parse(&"X".repeat(21)).is_err());
        assert!(Xref::parse("").is_err());
        assert!(Xref::from_pointer("I1").is_none());
        assert!(Xref::from_pointer("@I 1@").is_none());
    }

    #[test]
    fn tree_names_reject_path_characters() {
        assert!(TreeName::parse("demo.tree").is_ok());
        assert!(TreeName::parse("../etc").is_err());
        assert!(TreeName::parse("a b").is_err());
    }
}
