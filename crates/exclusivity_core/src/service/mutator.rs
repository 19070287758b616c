//! Matrix mutator: guarded set/clear over the cell repository.
//!
//! # Responsibility
//! - Reject unknown attribute names before any write.
//! - Delegate idempotent set and non-destructive clear to `CellRepository`.
//!
//! # Invariants
//! - An attribute that the introspector does not report is a hard error;
//!   it is never created on the fly and never silently skipped.
//! - The mutator emits no audit events. Callers record one per success.

use crate::model::cell::{CellAction, CellTarget, ClearOutcome, ExclusivityCell};
use crate::model::dimension::EntityTable;
use crate::repo::cell_repo::CellRepository;
use crate::repo::schema_repo::SchemaIntrospector;
use crate::repo::{RepoError, RepoResult};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from guarded matrix writes.
#[derive(Debug)]
pub enum MutatorError {
    /// Attribute is not registered for the entity table.
    AttributeUnknown {
        table: EntityTable,
        attribute_name: String,
    },
    Repo(RepoError),
}

impl Display for MutatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AttributeUnknown {
                table,
                attribute_name,
            } => write!(
                f,
                "attribute `{attribute_name}` is not registered on `{}`",
                table.as_str()
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MutatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::AttributeUnknown { .. } => None,
        }
    }
}

impl From<RepoError> for MutatorError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Set/clear entry point guarded by a schema introspector.
pub struct MatrixMutator<S: SchemaIntrospector, R: CellRepository> {
    schema: S,
    cells: R,
}

impl<S: SchemaIntrospector, R: CellRepository> MatrixMutator<S, R> {
    pub fn new(schema: S, cells: R) -> Self {
        Self { schema, cells }
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Sets one cell to exclusive. Second call for the same cell is `Updated`.
    pub fn set_cell(&self, target: &CellTarget) -> Result<CellAction, MutatorError> {
        self.require_attribute(target)?;
        let action = self.cells.set_cell(target)?;
        debug!(
            "event=cell_set module=mutator status=ok table={} attribute={} action={}",
            target.table.as_str(),
            target.attribute_name,
            action.as_str()
        );
        Ok(action)
    }

    /// Clears one cell while keeping its row.
    pub fn clear_cell(&self, target: &CellTarget) -> Result<ClearOutcome, MutatorError> {
        self.require_attribute(target)?;
        Ok(self.cells.clear_cell(target)?)
    }

    pub fn get_cell(
        &self,
        table: EntityTable,
        entity_key: &str,
        attribute_name: &str,
    ) -> RepoResult<Option<ExclusivityCell>> {
        self.cells.get_cell(table, entity_key, attribute_name)
    }

    pub fn list_cells(&self, table: EntityTable, entity_key: &str) -> RepoResult<Vec<ExclusivityCell>> {
        self.cells.list_cells(table, entity_key)
    }

    fn require_attribute(&self, target: &CellTarget) -> Result<(), MutatorError> {
        let known = !target.attribute_name.is_empty()
            && self
                .schema
                .attribute_exists(target.table, &target.attribute_name)?;
        if !known {
            return Err(MutatorError::AttributeUnknown {
                table: target.table,
                attribute_name: target.attribute_name.clone(),
            });
        }
        Ok(())
    }
}
