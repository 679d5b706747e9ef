//! Access gate consulted before any record mutation.
//!
//! # Responsibility
//! - Define the authorization seam used by services.
//! - Provide a role-based gate keyed by tree.
//!
//! # Invariants
//! - Callers must run the gate before creating or linking records.
//! - Unknown trees grant `Role::Visitor` only.

use crate::model::fact::TAG_RESN;
use crate::model::record::Record;
use crate::model::xref::{TreeName, Xref};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Member role within one tree, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Visitor,
    Member,
    Editor,
    Manager,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visitor => "visitor",
            Self::Member => "member",
            Self::Editor => "editor",
            Self::Manager => "manager",
        }
    }
}

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// User role is below what the action needs.
    InsufficientRole {
        tree: TreeName,
        xref: Xref,
        required: Role,
        actual: Role,
    },
    /// Record carries `RESN locked` and the user is not a manager.
    RecordLocked { tree: TreeName, xref: Xref },
    /// Record is not an individual.
    NotIndividual { tree: TreeName, xref: Xref },
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientRole {
                tree,
                xref,
                required,
                actual,
            } => write!(
                f,
                "access denied to {tree}/{xref}: requires {} but user is {}",
                required.as_str(),
                actual.as_str()
            ),
            Self::RecordLocked { tree, xref } => {
                write!(f, "access denied to {tree}/{xref}: record is locked")
            }
            Self::NotIndividual { tree, xref } => {
                write!(f, "access denied to {tree}/{xref}: not an individual")
            }
        }
    }
}

impl Error for AccessError {}

/// Authorization seam for individual records.
pub trait AccessGate {
    /// Returns `Ok(())` when the current user may view (or, with
    /// `require_edit`, edit) `individual`.
    fn check_individual_access(
        &self,
        individual: &Record,
        require_edit: bool,
    ) -> Result<(), AccessError>;
}

impl<G: AccessGate + ?Sized> AccessGate for &G {
    fn check_individual_access(
        &self,
        individual: &Record,
        require_edit: bool,
    ) -> Result<(), AccessError> {
        (**self).check_individual_access(individual, require_edit)
    }
}

/// Authenticated user with per-tree roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub user_name: String,
    roles: BTreeMap<TreeName, Role>,
}

impl UserContext {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            roles: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, tree: TreeName, role: Role) -> Self {
        self.roles.insert(tree, role);
        self
    }

    pub fn role_in(&self, tree: &TreeName) -> Role {
        self.roles.get(tree).copied().unwrap_or(Role::Visitor)
    }
}

/// Role-based gate: members may view, editors may edit, managers may also
/// edit locked records.
#[derive(Debug, Clone)]
pub struct RoleAccessGate {
    user: UserContext,
}

impl RoleAccessGate {
    pub fn new(user: UserContext) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }
}

impl AccessGate for RoleAccessGate {
    fn check_individual_access(
        &self,
        individual: &Record,
        require_edit: bool,
    ) -> Result<(), AccessError> {
        let tree = &individual.tree;
        let xref = &individual.xref;
        if !individual.is_individual() {
            return Err(AccessError::NotIndividual {
                tree: tree.clone(),
                xref: xref.clone(),
            });
        }

        let actual = self.user.role_in(tree);
        let required = if require_edit {
            Role::Editor
        } else {
            Role::Member
        };
        if actual < required {
            return Err(AccessError::InsufficientRole {
                tree: tree.clone(),
                xref: xref.clone(),
                required,
                actual,
            });
        }

        if require_edit && is_locked(individual) && actual < Role::Manager {
            return Err(AccessError::RecordLocked {
                tree: tree.clone(),
                xref: xref.clone(),
            });
        }

        Ok(())
    }
}

fn is_locked(record: &Record) -> bool {
    record
        .first_value(TAG_RESN)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("locked"))
}

#[cfg(test)]
mod tests {
    use super::{AccessError, AccessGate, Role, RoleAccessGate, UserContext};
    use crate::model::fact::{FactLine, Tag};
    use crate::model::record::{Fact, Record, RecordKind};
    use crate::model::xref::{TreeName, Xref};

    fn tree() -> TreeName {
        TreeName::parse("demo").expect("tree")
    }

    fn record(kind: RecordKind, lines: &[(&str, &str)]) -> Record {
        Record {
            tree: tree(),
            xref: Xref::parse("I1").expect("xref"),
            kind,
            facts: lines
                .iter()
                .enumerate()
                .map(|(index, (tag, value))| Fact {
                    seq: index as i64,
                    line: FactLine::new(1, Tag::parse(tag).expect("tag"), *value),
                })
                .collect(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn gate(role: Role) -> RoleAccessGate {
        RoleAccessGate::new(UserContext::new("alice").with_role(tree(), role))
    }

    #[test]
    fn edit_requires_editor_role() {
        let person = record(RecordKind::Individual, &[]);
        assert!(gate(Role::Editor).check_individual_access(&person, true).is_ok());
        assert!(gate(Role::Member).check_individual_access(&person, false).is_ok());

        let err = gate(Role::Member)
            .check_individual_access(&person, true)
            .expect_err("member cannot edit");
        assert!(matches!(
            err,
            AccessError::InsufficientRole {
                required: Role::Editor,
                actual: Role::Member,
                ..
            }
        ));
    }

    #[test]
    fn unknown_tree_defaults_to_visitor() {
        let person = record(RecordKind::Individual, &[]);
        let anonymous = RoleAccessGate::new(UserContext::new("guest"));
        assert_eq!(anonymous.user().role_in(&tree()), Role::Visitor);
        assert!(anonymous.check_individual_access(&person, false).is_err());
    }

    #[test]
    fn locked_records_need_manager() {
        let locked = record(RecordKind::Individual, &[("RESN", "locked")]);
        assert!(matches!(
            gate(Role::Editor).check_individual_access(&locked, true),
            Err(AccessError::RecordLocked { .. })
        ));
        assert!(gate(Role::Editor).check_individual_access(&locked, false).is_ok());
        assert!(gate(Role::Manager).check_individual_access(&locked, true).is_ok());
    }

    #[test]
    fn families_are_not_individuals() {
        let family = record(RecordKind::Family, &[]);
        assert!(matches!(
            gate(Role::Manager).check_individual_access(&family, false),
            Err(AccessError::NotIndividual { .. })
        ));
    }
}
