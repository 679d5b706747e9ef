//! Spousal role selection for a newly created one-parent family.
//!
//! The role is decided from the sex of the **new child**, not of the existing
//! person who becomes the parent. A daughter makes the parent `WIFE`; a son
//! or a child of unknown sex makes the parent `HUSB`. This is the long-standing
//! behaviour of the add-child action and is kept as the default policy.
//! `LinkPolicy::ParentSex` exists for callers who opt in to deciding from the
//! parent instead.
//! Only the exact `SEX` code `F` counts as female; spelled-out values such as
//! `Female` read as unknown.

use crate::model::fact::{Sex, TAG_HUSB, TAG_WIFE};
use crate::model::record::Record;

/// Role the existing person takes in the new family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpouseRole {
    Husband,
    Wife,
}

impl SpouseRole {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Husband => TAG_HUSB,
            Self::Wife => TAG_WIFE,
        }
    }
}

/// Which record's sex attribute drives the role decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Decide from the new child's sex.
    #[default]
    ChildSex,
    /// Decide from the existing parent's sex.
    ParentSex,
}

impl LinkPolicy {
    pub fn role_for(self, parent: &Record, child: &Record) -> SpouseRole {
        match self {
            Self::ChildSex => resolve_role(child.sex()),
            Self::ParentSex => resolve_role(parent.sex()),
        }
    }
}

/// `WIFE` when `sex` is female, otherwise `HUSB`.
pub fn resolve_role(sex: Sex) -> SpouseRole {
    match sex {
        Sex::Female => SpouseRole::Wife,
        Sex::Male | Sex::Unknown | Sex::Other => SpouseRole::Husband,
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_role, LinkPolicy, SpouseRole};
    use crate::model::fact::{FactLine, Sex, Tag};
    use crate::model::record::{Fact, Record, RecordKind};
    use crate::model::xref::{TreeName, Xref};

    fn individual(xref: &str, sex: &str) -> Record {
        Record {
            tree: TreeName::parse("demo").expect("tree"),
            xref: Xref::parse(xref).expect("xref"),
            kind: RecordKind::Individual,
            facts: vec![Fact {
                seq: 0,
                line: FactLine::new(1, Tag::parse("SEX").expect("tag"), sex),
            }],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn only_female_maps_to_wife() {
        assert_eq!(resolve_role(Sex::Female), SpouseRole::Wife);
        assert_eq!(resolve_role(Sex::Male), SpouseRole::Husband);
        assert_eq!(resolve_role(Sex::Unknown), SpouseRole::Husband);
        assert_eq!(resolve_role(Sex::Other), SpouseRole::Husband);
        assert_eq!(SpouseRole::Wife.tag(), "WIFE");
    }

    #[test]
    fn default_policy_ignores_parent_sex() {
        let mother = individual("I1", "F");
        let son = individual("I2", "M");
        assert_eq!(LinkPolicy::default(), LinkPolicy::ChildSex);
        assert_eq!(
            LinkPolicy::default().role_for(&mother, &son),
            SpouseRole::Husband
        );
        assert_eq!(
            LinkPolicy::ParentSex.role_for(&mother, &son),
            SpouseRole::Wife
        );
    }

    #[test]
    fn spelled_out_sex_is_not_female() {
        let father = individual("I1", "M");
        let daughter = individual("I2", "Female");
        assert_eq!(
            LinkPolicy::ChildSex.role_for(&father, &daughter),
            SpouseRole::Husband
        );
    }
}
