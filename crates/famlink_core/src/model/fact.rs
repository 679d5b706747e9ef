//! Fact lines: the `(level, tag, value)` triples that make up a record.
//!
//! # Responsibility
//! - Define the typed shape of one hierarchical tagged-text line.
//! - Name the relationship tags used to link individuals and families.
//!
//! # Invariants
//! - Fact levels are `>= 1`; level 0 is reserved for the record header.
//! - Tags are upper-case codes, optionally prefixed with `_` for
//!   application-defined extensions.

use crate::model::xref::Xref;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_?[A-Z][A-Z0-9_]{0,30}$").expect("valid tag regex"));

/// Family-as-spouse link, held by an individual.
pub const TAG_FAMS: &str = "FAMS";
/// Family-as-child link, held by an individual.
pub const TAG_FAMC: &str = "FAMC";
/// Husband role, held by a family.
pub const TAG_HUSB: &str = "HUSB";
/// Wife role, held by a family.
pub const TAG_WIFE: &str = "WIFE";
/// Child role, held by a family.
pub const TAG_CHIL: &str = "CHIL";
pub const TAG_SEX: &str = "SEX";
pub const TAG_NAME: &str = "NAME";
/// Restriction notice; value `locked` blocks edits by non-managers.
pub const TAG_RESN: &str = "RESN";
/// Continuation line for multi-line values.
pub const TAG_CONT: &str = "CONT";
/// Concatenation line; never produced here but rejected as input.
pub const TAG_CONC: &str = "CONC";

/// Highest fact level accepted from callers.
pub const MAX_FACT_LEVEL: u8 = 99;

/// Tag validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTag(pub String);

impl Display for InvalidTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid tag: `{}`", self.0)
    }
}

impl Error for InvalidTag {}

/// Upper-case tag code such as `NAME`, `BIRT` or `_UID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Parses a tag after trimming and upper-casing the input.
    pub fn parse(value: &str) -> Result<Self, InvalidTag> {
        let normalized = value.trim().to_ascii_uppercase();
        if !TAG_RE.is_match(&normalized) {
            return Err(InvalidTag(value.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Wraps one of the tag constants in this module.
    pub(crate) fn known(code: &'static str) -> Self {
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, code: &str) -> bool {
        self.0 == code
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Tag {
    type Error = InvalidTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Tag> for String {
    fn from(value: Tag) -> Self {
        value.0
    }
}

/// One structured fact line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactLine {
    pub level: u8,
    pub tag: Tag,
    pub value: String,
}

impl FactLine {
    pub fn new(level: u8, tag: Tag, value: impl Into<String>) -> Self {
        Self {
            level,
            tag,
            value: value.into(),
        }
    }

    /// Builds a level-1 link line (`1 FAMS @F1@`) for a known relationship tag.
    pub fn link(tag: &'static str, target: &Xref) -> Self {
        Self {
            level: 1,
            tag: Tag::known(tag),
            value: target.pointer(),
        }
    }

    /// Returns the referenced record when the value is a pointer.
    pub fn pointer(&self) -> Option<Xref> {
        Xref::from_pointer(&self.value)
    }

    /// Renders the line as hierarchical tagged text, without a trailing newline.
    pub fn to_line(&self) -> String {
        if self.value.is_empty() {
            format!("{} {}", self.level, self.tag)
        } else {
            format!("{} {} {}", self.level, self.tag, self.value)
        }
    }
}

/// Sex attribute of an individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Unknown,
    Other,
}

impl Sex {
    /// Maps a `SEX` value; anything unrecognised is `Unknown`.
    pub fn from_code(value: &str) -> Self {
        match value.trim() {
            "M" => Self::Male,
            "F" => Self::Female,
            "X" => Self::Other,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "U",
            Self::Other => "X",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FactLine, Sex, Tag, TAG_FAMS};
    use crate::model::xref::Xref;

    #[test]
    fn tag_parse_normalizes_case_and_allows_extensions() {
        assert_eq!(Tag::parse(" name ").expect("name tag").as_str(), "NAME");
        assert_eq!(Tag::parse("_UID").expect("extension tag").as_str(), "_UID");
        assert!(Tag::parse("1BIR").is_err());
        assert!(Tag::parse("NA ME").is_err());
        assert!(Tag::parse("").is_err());
    }

    #[test]
    fn link_lines_render_pointer_values() {
        let family = Xref::parse("F3").expect("xref");
        let line = FactLine::link(TAG_FAMS, &family);
        assert_eq!(line.to_line(), "1 FAMS @F3@");
        assert_eq!(line.pointer(), Some(family));
    }

    #[test]
    fn empty_values_render_without_trailing_space() {
        let line = FactLine::new(1, Tag::parse("BIRT").expect("tag"), "");
        assert_eq!(line.to_line(), "1 BIRT");
    }

    #[test]
    fn sex_codes_map_unknown_values_to_unknown() {
        assert_eq!(Sex::from_code("F"), Sex::Female);
        assert_eq!(Sex::from_code("M"), Sex::Male);
        assert_eq!(Sex::from_code("f"), Sex::Unknown);
        assert_eq!(Sex::from_code(""), Sex::Unknown);
        assert_eq!(Sex::Other.code(), "X");
    }
}
