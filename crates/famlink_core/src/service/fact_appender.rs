//! Appending link facts to existing records.
//!
//! # Invariants
//! - Exactly one fact is added per call, at the end of the sequence.
//! - The record identifier and earlier facts are untouched.

use crate::model::fact::{FactLine, TAG_FAMC, TAG_FAMS};
use crate::model::record::Record;
use crate::repo::record_repo::{RecordRepository, RepoResult};
use log::info;

pub struct FactAppender<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> FactAppender<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends `fact` to the persisted `record` and returns the updated copy.
    pub fn append_fact(
        &self,
        record: &Record,
        fact: &FactLine,
        update_change: bool,
    ) -> RepoResult<Record> {
        let updated = self
            .repo
            .append_fact(&record.tree, &record.xref, fact, update_change)?;
        info!(
            "event=fact_append module=service status=ok tree={} xref={} tag={} update_change={}",
            record.tree, record.xref, fact.tag, update_change
        );
        Ok(updated)
    }

    /// Adds `1 FAMS @family@` to `spouse`, leaving its change date alone.
    pub fn link_spouse_to_family(&self, spouse: &Record, family: &Record) -> RepoResult<Record> {
        self.append_fact(spouse, &FactLine::link(TAG_FAMS, &family.xref), false)
    }

    /// Adds `1 FAMC @family@` to `child`, leaving its change date alone.
    pub fn link_child_to_family(&self, child: &Record, family: &Record) -> RepoResult<Record> {
        self.append_fact(child, &FactLine::link(TAG_FAMC, &family.xref), false)
    }
}
