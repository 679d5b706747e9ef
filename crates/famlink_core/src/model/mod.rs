//! Record store domain model.
//!
//! # Responsibility
//! - Define identifiers, fact lines and records used by core business logic.
//!
//! # Invariants
//! - Every record is identified by an `Xref` unique within its `TreeName`.
//! - Facts are append-only in the add-child flow.

pub mod fact;
pub mod record;
pub mod xref;
