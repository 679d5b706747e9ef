//! Core domain logic for linking people and families in a tagged-text
//! record store.
//! This crate is the single source of truth for linkage invariants.

pub mod access;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod redirect;
pub mod repo;
pub mod service;

pub use access::{AccessError, AccessGate, Role, RoleAccessGate, UserContext};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::fact::{FactLine, Sex, Tag};
pub use model::record::{Fact, Record, RecordKind};
pub use model::xref::{IdentifierError, TreeName, Xref};
pub use redirect::{canonical_individual_url, is_local_url, resolve_destination, Redirect};
pub use repo::record_repo::{
    RecordRepository, RepoError, RepoResult, SqliteRecordRepository, XrefPrefixes,
};
pub use service::add_child_service::{
    AddChildError, AddChildOutcome, AddChildRequest, AddChildService, AddChildStep,
};
pub use service::edit_lines::{normalize_fact_lines, FactLineInput, InputError};
pub use service::fact_appender::FactAppender;
pub use service::link_resolver::{resolve_role, LinkPolicy, SpouseRole};
pub use service::record_factory::RecordFactory;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
