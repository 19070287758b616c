//! Domain model for the exclusivity matrix.
//!
//! # Responsibility
//! - Define registries, catalog entities and matrix cell shapes used by the
//!   repository and service layers.
//!
//! # Invariants
//! - A cell is addressed by `(entity_table, entity_key, attribute_name)`.
//! - Only `value == 1` means "exclusive"; `0` and `NULL` both mean "not".
//! - Cells are cleared, never deleted.

pub mod catalog;
pub mod cell;
pub mod dimension;
