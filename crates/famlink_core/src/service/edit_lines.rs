//! Request boundary for fact lines submitted from an edit form.
//!
//! # Responsibility
//! - Turn the three parallel form lists (`ilevels[]`, `itags[]`, `ivalues[]`)
//!   into one ordered sequence of typed `FactLine`s.
//! - Reject malformed input before anything is written.
//!
//! # Invariants
//! - Lists of different lengths are a validation error, never truncated.
//! - Output levels start at 1 and never jump by more than one.
//! - Empty lines survive only when a deeper line beneath them has a value.
//! - Multi-line values become `CONT` lines one level deeper.

use crate::model::fact::{FactLine, Tag, MAX_FACT_LEVEL, TAG_CONC, TAG_CONT};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw parallel-list form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactLineInput {
    pub levels: Vec<String>,
    pub tags: Vec<String>,
    pub values: Vec<String>,
}

impl FactLineInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one row to all three lists.
    pub fn push(
        mut self,
        level: impl Into<String>,
        tag: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.levels.push(level.into());
        self.tags.push(tag.into());
        self.values.push(value.into());
        self
    }

    /// Parses rows written as `LEVEL TAG [VALUE]`, e.g. `1 NAME Ada /Lovelace/`.
    pub fn from_text_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        lines.iter().fold(Self::new(), |input, line| {
            let mut parts = line.as_ref().trim_start().splitn(3, ' ');
            let level = parts.next().unwrap_or_default();
            let tag = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            input.push(level, tag, value)
        })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty() && self.tags.is_empty() && self.values.is_empty()
    }
}

/// Validation errors for submitted fact lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The three parallel lists differ in length.
    LengthMismatch {
        levels: usize,
        tags: usize,
        values: usize,
    },
    /// Level is not an integer in `1..=MAX_FACT_LEVEL`.
    InvalidLevel { index: usize, value: String },
    /// Level is deeper than its predecessor allows.
    LevelJump {
        index: usize,
        previous: u8,
        level: u8,
    },
    /// Tag is not a valid tag code.
    InvalidTag { index: usize, value: String },
    /// Continuation tags are generated, never accepted.
    ReservedTag { index: usize, tag: String },
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LengthMismatch {
                levels,
                tags,
                values,
            } => write!(
                f,
                "fact line lists differ in length: levels={levels} tags={tags} values={values}"
            ),
            Self::InvalidLevel { index, value } => {
                write!(f, "line {index}: invalid level `{value}`")
            }
            Self::LevelJump {
                index,
                previous,
                level,
            } => write!(
                f,
                "line {index}: level {level} cannot follow level {previous}"
            ),
            Self::InvalidTag { index, value } => write!(f, "line {index}: invalid tag `{value}`"),
            Self::ReservedTag { index, tag } => {
                write!(f, "line {index}: tag `{tag}` cannot be submitted directly")
            }
        }
    }
}

impl Error for InputError {}

/// Validates and normalizes form input into ordered fact lines.
pub fn normalize_fact_lines(input: &FactLineInput) -> Result<Vec<FactLine>, InputError> {
    let FactLineInput {
        levels,
        tags,
        values,
    } = input;
    if levels.len() != tags.len() || tags.len() != values.len() {
        return Err(InputError::LengthMismatch {
            levels: levels.len(),
            tags: tags.len(),
            values: values.len(),
        });
    }

    let mut parsed = Vec::with_capacity(levels.len());
    let mut previous = 0u8;
    for (index, ((level, tag), value)) in levels.iter().zip(tags).zip(values).enumerate() {
        let level = parse_level(index, level)?;
        if level > previous + 1 {
            return Err(InputError::LevelJump {
                index,
                previous,
                level,
            });
        }
        previous = level;

        let tag = Tag::parse(tag).map_err(|_| InputError::InvalidTag {
            index,
            value: tag.clone(),
        })?;
        if tag.is(TAG_CONT) || tag.is(TAG_CONC) {
            return Err(InputError::ReservedTag {
                index,
                tag: tag.as_str().to_string(),
            });
        }

        parsed.push(FactLine::new(level, tag, normalize_value(value)));
    }

    let mut lines = Vec::with_capacity(parsed.len());
    for (index, line) in parsed.iter().enumerate() {
        if !line.value.is_empty() || has_valued_descendant(&parsed, index) {
            push_with_continuations(&mut lines, line);
        }
    }
    Ok(lines)
}

fn parse_level(index: usize, raw: &str) -> Result<u8, InputError> {
    let invalid = || InputError::InvalidLevel {
        index,
        value: raw.to_string(),
    };
    let level = raw.trim().parse::<u8>().map_err(|_| invalid())?;
    if level == 0 || level > MAX_FACT_LEVEL {
        return Err(invalid());
    }
    Ok(level)
}

fn normalize_value(value: &str) -> String {
    value
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

fn has_valued_descendant(lines: &[FactLine], index: usize) -> bool {
    let level = lines[index].level;
    lines[index + 1..]
        .iter()
        .take_while(|line| line.level > level)
        .any(|line| !line.value.is_empty())
}

fn push_with_continuations(out: &mut Vec<FactLine>, line: &FactLine) {
    let mut parts = line.value.split('\n');
    let first = parts.next().unwrap_or_default();
    out.push(FactLine::new(line.level, line.tag.clone(), first));
    for part in parts {
        out.push(FactLine::new(line.level + 1, Tag::known(TAG_CONT), part));
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_fact_lines, FactLineInput, InputError};

    fn rendered(input: &FactLineInput) -> Vec<String> {
        normalize_fact_lines(input)
            .expect("input should normalize")
            .iter()
            .map(|line| line.to_line())
            .collect()
    }

    #[test]
    fn length_mismatch_is_rejected_not_truncated() {
        let input = FactLineInput {
            levels: vec!["1".to_string(), "1".to_string()],
            tags: vec!["NAME".to_string(), "SEX".to_string()],
            values: vec!["Ada /Lovelace/".to_string()],
        };
        assert_eq!(
            normalize_fact_lines(&input).expect_err("mismatch must fail"),
            InputError::LengthMismatch {
                levels: 2,
                tags: 2,
                values: 1
            }
        );
    }

    #[test]
    fn keeps_order_and_normalizes_tags() {
        let input = FactLineInput::new()
            .push("1", "name", "Ada /Lovelace/")
            .push(" 1 ", "SEX", "F");
        assert_eq!(rendered(&input), vec!["1 NAME Ada /Lovelace/", "1 SEX F"]);
    }

    #[test]
    fn drops_empty_lines_without_valued_children() {
        let input = FactLineInput::new()
            .push("1", "NAME", "Ada /Lovelace/")
            .push("1", "BIRT", "")
            .push("2", "DATE", "10 DEC 1815")
            .push("2", "PLAC", "")
            .push("1", "DEAT", "")
            .push("2", "DATE", "");
        assert_eq!(
            rendered(&input),
            vec!["1 NAME Ada /Lovelace/", "1 BIRT", "2 DATE 10 DEC 1815"]
        );
    }

    #[test]
    fn multi_line_values_become_continuations() {
        let input = FactLineInput::new().push("1", "NOTE", "first\r\nsecond  \nthird\n");
        assert_eq!(
            rendered(&input),
            vec!["1 NOTE first", "2 CONT second", "2 CONT third"]
        );
    }

    #[test]
    fn rejects_bad_levels_and_jumps() {
        let zero = FactLineInput::new().push("0", "NAME", "x");
        assert!(matches!(
            normalize_fact_lines(&zero),
            Err(InputError::InvalidLevel { index: 0, .. })
        ));

        let text = FactLineInput::new().push("one", "NAME", "x");
        assert!(matches!(
            normalize_fact_lines(&text),
            Err(InputError::InvalidLevel { index: 0, .. })
        ));

        let jump = FactLineInput::new().push("1", "BIRT", "").push("3", "DATE", "1900");
        assert_eq!(
            normalize_fact_lines(&jump).expect_err("jump must fail"),
            InputError::LevelJump {
                index: 1,
                previous: 1,
                level: 3
            }
        );

        let start_deep = FactLineInput::new().push("2", "DATE", "1900");
        assert!(matches!(
            normalize_fact_lines(&start_deep),
            Err(InputError::LevelJump { index: 0, previous: 0, level: 2 })
        ));
    }

    #[test]
    fn rejects_invalid_and_reserved_tags() {
        let bad = FactLineInput::new().push("1", "NA ME", "x");
        assert!(matches!(
            normalize_fact_lines(&bad),
            Err(InputError::InvalidTag { index: 0, .. })
        ));

        let reserved = FactLineInput::new().push("1", "NOTE", "a").push("2", "cont", "b");
        assert_eq!(
            normalize_fact_lines(&reserved).expect_err("CONT must be rejected"),
            InputError::ReservedTag {
                index: 1,
                tag: "CONT".to_string()
            }
        );
    }

    #[test]
    fn empty_input_yields_no_lines() {
        assert!(normalize_fact_lines(&FactLineInput::new())
            .expect("empty input is allowed")
            .is_empty());
    }

    #[test]
    fn parses_text_rows() {
        let input = FactLineInput::from_text_lines(&["1 NAME Ada /Lovelace/", "1 SEX F", "1 BIRT"]);
        assert_eq!(input.len(), 3);
        assert_eq!(input.values[0], "Ada /Lovelace/");
        assert_eq!(input.values[2], "");
    }
}
