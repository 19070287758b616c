//! Schema steps for the exclusivity store.
//!
//! Steps run in version order inside one transaction. Each successful step
//! bumps `PRAGMA user_version`, so a failed step leaves the database at the
//! version it had before the open.
//!
//! Steps never add per-dimension columns; a new chain/classification or
//! brand/classification pair is a row in `exclusivity_attributes`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "registries",
        sql: include_str!("0001_registries.sql"),
    },
    SchemaStep {
        version: 2,
        name: "exclusivity_cells",
        sql: include_str!("0002_exclusivity_cells.sql"),
    },
    SchemaStep {
        version: 3,
        name: "audit_log",
        sql: include_str!("0003_audit_log.sql"),
    },
];

/// Highest schema version this build can create.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings the schema up to `latest_version()`.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the file was written by a newer
///   build.
/// - `DbError::Migration` naming the step whose SQL failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let latest = latest_version();
    if found > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        run_step(&tx, step).map_err(|source| DbError::Migration {
            version: step.version,
            name: step.name,
            source,
        })?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;
    Ok(())
}

fn run_step(tx: &Transaction<'_>, step: &SchemaStep) -> rusqlite::Result<()> {
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)
}
