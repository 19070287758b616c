//! Exclusivity matrix engine.
//! Maintains item x (chain, store classification) and store x brand
//! exclusivity cells, with single-cell and bulk mutation paths.

pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod keys;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use audit::{AuditEvent, AuditSink, ChannelAuditRecorder, NoopAuditSink};
pub use config::{ConfigError, EngineConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use keys::KeyEncoder;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::cell::{CellAction, ClearOutcome, DimensionTuple, ExclusivityCell};
pub use model::dimension::{EntityTable, ProductLine};
pub use repo::{RepoError, RepoResult};
pub use service::exclusivity_service::{CellSetResult, ExclusivityError, ExclusivityService};
pub use service::import::{BulkRow, ImportError, ImportReport, RowErrorKind};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
