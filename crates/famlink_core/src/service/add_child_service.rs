//! Add-child use-case: attach a new child to an existing person through a
//! new one-parent family.
//!
//! # Responsibility
//! - Validate request input and authorize before any write.
//! - Create the child and the family, then link both sides.
//! - Resolve the post-action redirect.
//!
//! # Invariants
//! - Validation, lookup and access failures leave the tree untouched.
//! - Steps run in the order of `AddChildStep`; a storage failure in a later
//!   step is reported with that step and earlier writes are kept.
//! - On success the family holds `<ROLE> @parent@` and `CHIL @child@`, the
//!   parent holds `FAMS @family@` and the child holds `FAMC @family@`.

use crate::access::{AccessError, AccessGate};
use crate::model::record::Record;
use crate::model::xref::{IdentifierError, TreeName, Xref};
use crate::redirect::{canonical_individual_url, resolve_destination, Redirect};
use crate::repo::record_repo::{RecordRepository, RepoError};
use crate::service::edit_lines::{normalize_fact_lines, FactLineInput, InputError};
use crate::service::fact_appender::FactAppender;
use crate::service::link_resolver::{LinkPolicy, SpouseRole};
use crate::service::record_factory::RecordFactory;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Request-scoped input for one add-child invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddChildRequest {
    /// Target tree (path parameter).
    pub tree: String,
    /// Existing person who becomes the parent (path parameter).
    pub xref: String,
    /// Child facts from `ilevels[]`, `itags[]`, `ivalues[]`.
    pub facts: FactLineInput,
    /// Optional return URL from the `url` body field.
    pub url: Option<String>,
    /// Site base URL used for same-origin checks and canonical URLs.
    pub base_url: String,
}

/// Records produced by a successful invocation, as persisted after linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddChildOutcome {
    pub parent: Record,
    pub child: Record,
    pub family: Record,
    pub role: SpouseRole,
    pub redirect: Redirect,
}

/// Steps of one invocation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AddChildStep {
    AccessCheck,
    ChildCreate,
    FamilyCreate,
    ParentLink,
    ChildLink,
}

impl AddChildStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessCheck => "access_check",
            Self::ChildCreate => "child_create",
            Self::FamilyCreate => "family_create",
            Self::ParentLink => "parent_link",
            Self::ChildLink => "child_link",
        }
    }
}

/// Errors from the add-child use-case.
#[derive(Debug)]
pub enum AddChildError {
    /// Tree name or xref in the path is malformed.
    InvalidIdentifier(IdentifierError),
    /// Submitted fact lines are malformed.
    Validation(InputError),
    /// Existing person does not exist or is not an individual.
    NotFound { tree: TreeName, xref: Xref },
    /// Access gate refused the edit.
    AccessDenied(AccessError),
    /// Storage failure during `step`.
    Repo {
        step: AddChildStep,
        source: RepoError,
    },
}

impl AddChildError {
    /// Stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) | Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::AccessDenied(_) => "access_denied",
            Self::Repo { .. } => "storage",
        }
    }

    /// Whether nothing can have been written before the failure.
    pub fn is_pre_mutation(&self) -> bool {
        match self {
            Self::Repo { step, .. } => *step <= AddChildStep::ChildCreate,
            _ => true,
        }
    }
}

impl Display for AddChildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { tree, xref } => write!(f, "individual not found: {tree}/{xref}"),
            Self::AccessDenied(err) => write!(f, "{err}"),
            Self::Repo { step, source } => write!(f, "{} failed: {source}", step.as_str()),
        }
    }
}

impl Error for AddChildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidIdentifier(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::AccessDenied(err) => Some(err),
            Self::Repo { source, .. } => Some(source),
        }
    }
}

impl From<IdentifierError> for AddChildError {
    fn from(value: IdentifierError) -> Self {
        Self::InvalidIdentifier(value)
    }
}

impl From<InputError> for AddChildError {
    fn from(value: InputError) -> Self {
        Self::Validation(value)
    }
}

impl From<AccessError> for AddChildError {
    fn from(value: AccessError) -> Self {
        Self::AccessDenied(value)
    }
}

fn at_step(step: AddChildStep) -> impl FnOnce(RepoError) -> AddChildError {
    move |source| AddChildError::Repo { step, source }
}

/// Add-child service facade.
pub struct AddChildService<R: RecordRepository, G: AccessGate> {
    repo: R,
    gate: G,
    policy: LinkPolicy,
}

impl<R: RecordRepository, G: AccessGate> AddChildService<R, G> {
    /// Creates service with the default `LinkPolicy::ChildSex`.
    pub fn new(repo: R, gate: G) -> Self {
        Self {
            repo,
            gate,
            policy: LinkPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs one add-child invocation.
    pub fn add_child(&self, request: &AddChildRequest) -> Result<AddChildOutcome, AddChildError> {
        let op_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!(
            "event=add_child module=service status=start op_id={} tree={} xref={} lines={}",
            op_id,
            request.tree,
            request.xref,
            request.facts.len()
        );

        let result = self.run(request);
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(outcome) => info!(
                "event=add_child module=service status=ok op_id={} tree={} parent={} child={} family={} role={} duration_ms={}",
                op_id,
                request.tree,
                outcome.parent.xref,
                outcome.child.xref,
                outcome.family.xref,
                outcome.role.tag(),
                duration_ms
            ),
            Err(err) if err.is_pre_mutation() => warn!(
                "event=add_child module=service status=rejected op_id={} tree={} xref={} error_code={} duration_ms={} error={}",
                op_id,
                request.tree,
                request.xref,
                err.code(),
                duration_ms,
                err
            ),
            Err(err) => error!(
                "event=add_child module=service status=error op_id={} tree={} xref={} error_code={} duration_ms={} error={}",
                op_id,
                request.tree,
                request.xref,
                err.code(),
                duration_ms,
                err
            ),
        }
        result
    }

    fn run(&self, request: &AddChildRequest) -> Result<AddChildOutcome, AddChildError> {
        let tree = TreeName::parse(&request.tree)?;
        let parent_xref = Xref::parse(&request.xref)?;
        let child_facts = normalize_fact_lines(&request.facts)?;

        let parent = self
            .repo
            .get_record(&tree, &parent_xref)
            .map_err(at_step(AddChildStep::AccessCheck))?
            .filter(Record::is_individual)
            .ok_or_else(|| AddChildError::NotFound {
                tree: tree.clone(),
                xref: parent_xref.clone(),
            })?;
        self.gate.check_individual_access(&parent, true)?;

        let factory = RecordFactory::new(&self.repo);
        let child = factory
            .create_individual(&tree, &child_facts)
            .map_err(at_step(AddChildStep::ChildCreate))?;

        let role = self.policy.role_for(&parent, &child);
        let family = factory
            .create_single_parent_family(&tree, role, &parent.xref, &child.xref)
            .map_err(at_step(AddChildStep::FamilyCreate))?;

        let appender = FactAppender::new(&self.repo);
        let parent = appender
            .link_spouse_to_family(&parent, &family)
            .map_err(at_step(AddChildStep::ParentLink))?;
        let child = appender
            .link_child_to_family(&child, &family)
            .map_err(at_step(AddChildStep::ChildLink))?;

        let fallback = canonical_individual_url(&request.base_url, &tree, &child);
        let location = resolve_destination(request.url.as_deref(), &request.base_url, &fallback);

        Ok(AddChildOutcome {
            parent,
            child,
            family,
            role,
            redirect: Redirect::found(location),
        })
    }
}
