//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep HTTP/CLI layers decoupled from storage details.

pub mod add_child_service;
pub mod edit_lines;
pub mod fact_appender;
pub mod link_resolver;
pub mod record_factory;
