//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into exclusivity use cases.
//! - Keep CLI and transport layers decoupled from storage details.

pub mod exclusivity_service;
pub mod import;
pub mod lookup;
pub mod mutator;
pub mod tabular;
