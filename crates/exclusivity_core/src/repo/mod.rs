//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for registries,
//!   catalogs, the attribute whitelist and matrix cells.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors in addition to DB transport
//!   errors; only `RepoError::Db` is a transport failure.
//! - No repository deletes a cell row.

use crate::db::DbError;
use crate::model::dimension::{DimensionKind, EntityTable};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog_repo;
pub mod cell_repo;
pub mod schema_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every SQLite-backed repository.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A dimension code is not present in its registry.
    UnknownDimension { kind: DimensionKind, code: String },
    /// Encoding a dimension tuple produced no attribute name.
    EmptyAttributeName,
    /// A different dimension pair already owns this attribute name.
    AttributeCollision {
        table: EntityTable,
        attribute_name: String,
    },
    InvalidData(String),
}

impl RepoError {
    /// Whether this error means the store itself failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Db(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownDimension { kind, code } => {
                write!(f, "unknown {} code `{code}`", kind.label())
            }
            Self::EmptyAttributeName => write!(f, "dimension tuple encodes to an empty attribute name"),
            Self::AttributeCollision {
                table,
                attribute_name,
            } => write!(
                f,
                "attribute `{attribute_name}` on `{}` is already registered for another dimension pair",
                table.as_str()
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
