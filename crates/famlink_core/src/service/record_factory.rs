//! Record creation on top of the namespace capability.
//!
//! # Responsibility
//! - Build individual and family records from ordered fact lines.
//! - Delegate identifier allocation to the repository.
//!
//! # Invariants
//! - Each call creates exactly one record and mutates no other record.
//! - Fact order is preserved exactly as given.

use crate::model::fact::{FactLine, TAG_CHIL};
use crate::model::record::{Record, RecordKind};
use crate::model::xref::{TreeName, Xref};
use crate::repo::record_repo::{RecordRepository, RepoResult};
use crate::service::link_resolver::SpouseRole;
use log::{error, info};
use std::time::Instant;

/// Factory for new records in one repository.
pub struct RecordFactory<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> RecordFactory<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an individual record with a freshly allocated xref.
    pub fn create_individual(&self, tree: &TreeName, facts: &[FactLine]) -> RepoResult<Record> {
        self.create(tree, RecordKind::Individual, facts)
    }

    /// Creates a family record with a freshly allocated xref.
    pub fn create_family(&self, tree: &TreeName, facts: &[FactLine]) -> RepoResult<Record> {
        self.create(tree, RecordKind::Family, facts)
    }

    /// Creates a one-parent family: `1 <ROLE> @parent@` then `1 CHIL @child@`.
    pub fn create_single_parent_family(
        &self,
        tree: &TreeName,
        role: SpouseRole,
        parent: &Xref,
        child: &Xref,
    ) -> RepoResult<Record> {
        let facts = [
            FactLine::link(role.tag(), parent),
            FactLine::link(TAG_CHIL, child),
        ];
        self.create_family(tree, &facts)
    }

    fn create(&self, tree: &TreeName, kind: RecordKind, facts: &[FactLine]) -> RepoResult<Record> {
        let started_at = Instant::now();
        match self.repo.create_record(tree, kind, facts) {
            Ok(record) => {
                info!(
                    "event=record_create module=service status=ok tree={} kind={} xref={} facts={} duration_ms={}",
                    tree,
                    kind.header_tag(),
                    record.xref,
                    record.facts.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(record)
            }
            Err(err) => {
                error!(
                    "event=record_create module=service status=error tree={} kind={} duration_ms={} error={}",
                    tree,
                    kind.header_tag(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}
