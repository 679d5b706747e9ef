//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the namespace capability consumed by services.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `TreeNotFound`) in
//!   addition to DB transport errors.

pub mod record_repo;
