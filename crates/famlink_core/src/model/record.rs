//! Record domain model.
//!
//! # Responsibility
//! - Define the persisted shape of individual and family records.
//! - Provide read-side helpers (sex, links, display name, text export).
//!
//! # Invariants
//! - `facts` are kept in insertion order; `seq` is strictly increasing.
//! - A record's `xref` never changes after creation.

use crate::model::fact::{FactLine, Sex, TAG_NAME, TAG_SEX};
use crate::model::xref::{TreeName, Xref};
use serde::{Deserialize, Serialize};

/// Record variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Individual,
    Family,
}

impl RecordKind {
    /// Record type tag used on the level-0 header line.
    pub fn header_tag(self) -> &'static str {
        match self {
            Self::Individual => "INDI",
            Self::Family => "FAM",
        }
    }

    pub fn parse_header_tag(value: &str) -> Option<Self> {
        match value {
            "INDI" => Some(Self::Individual),
            "FAM" => Some(Self::Family),
            _ => None,
        }
    }
}

/// One persisted fact with its position inside the owning record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub seq: i64,
    #[serde(flatten)]
    pub line: FactLine,
}

/// Canonical record read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub tree: TreeName,
    pub xref: Xref,
    pub kind: RecordKind,
    pub facts: Vec<Fact>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms of the last change that asked for a change-date update.
    pub updated_at: i64,
}

impl Record {
    pub fn is_individual(&self) -> bool {
        self.kind == RecordKind::Individual
    }

    /// Sex of an individual, read from the first level-1 `SEX` fact.
    pub fn sex(&self) -> Sex {
        self.first_value(TAG_SEX)
            .map(Sex::from_code)
            .unwrap_or(Sex::Unknown)
    }

    /// Value of the first level-1 fact with `tag`.
    pub fn first_value(&self, tag: &str) -> Option<&str> {
        self.top_level()
            .find(|line| line.tag.is(tag))
            .map(|line| line.value.as_str())
    }

    /// Targets of all level-1 pointer facts with `tag`, in order.
    pub fn links(&self, tag: &str) -> Vec<Xref> {
        self.top_level()
            .filter(|line| line.tag.is(tag))
            .filter_map(FactLine::pointer)
            .collect()
    }

    pub fn has_link(&self, tag: &str, target: &Xref) -> bool {
        self.links(tag).iter().any(|xref| xref == target)
    }

    /// First `NAME` value with surname slashes removed and whitespace collapsed.
    pub fn display_name(&self) -> Option<String> {
        let raw = self.first_value(TAG_NAME)?;
        let cleaned = raw
            .replace('/', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    /// Renders the record as hierarchical tagged text, one line per fact.
    pub fn to_gedcom(&self) -> String {
        let mut out = format!("0 {} {}", self.xref.pointer(), self.kind.header_tag());
        for fact in &self.facts {
            out.push('\n');
            out.push_str(&fact.line.to_line());
        }
        out
    }

    fn top_level(&self) -> impl Iterator<Item = &FactLine> {
        self.facts
            .iter()
            .map(|fact| &fact.line)
            .filter(|line| line.level == 1)
    }
}
