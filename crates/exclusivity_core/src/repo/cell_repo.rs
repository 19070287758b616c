//! Exclusivity cell persistence.
//!
//! # Responsibility
//! - Upsert (`value = 1`) and clear cells in `exclusivity_cells`.
//! - Read cells back for verification.
//!
//! # Invariants
//! - `(entity_table, entity_key, attribute_name)` is unique; setting twice
//!   never creates a second row.
//! - Clearing keeps the row: items clear to `0`, stores clear to `NULL`.
//! - Every write refreshes `updated_at`.
//! - No statement here deletes a cell.

use crate::model::cell::{CellAction, CellTarget, ClearOutcome, ExclusivityCell};
use crate::model::dimension::EntityTable;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const CELL_SELECT_SQL: &str = "SELECT
    entity_table,
    entity_key,
    attribute_name,
    value,
    classification_code,
    updated_at
FROM exclusivity_cells";

/// Repository interface for matrix cell writes and reads.
pub trait CellRepository {
    fn set_cell(&self, target: &CellTarget) -> RepoResult<CellAction>;
    fn clear_cell(&self, target: &CellTarget) -> RepoResult<ClearOutcome>;
    fn get_cell(
        &self,
        table: EntityTable,
        entity_key: &str,
        attribute_name: &str,
    ) -> RepoResult<Option<ExclusivityCell>>;
    fn list_cells(&self, table: EntityTable, entity_key: &str) -> RepoResult<Vec<ExclusivityCell>>;
}

/// SQLite-backed cell repository.
pub struct SqliteCellRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCellRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CellRepository for SqliteCellRepository<'_> {
    fn set_cell(&self, target: &CellTarget) -> RepoResult<CellAction> {
        // Each statement is atomic on its own; a concurrent writer between
        // them only turns our insert into an update (last writer wins).
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO exclusivity_cells (
                entity_table,
                entity_key,
                attribute_name,
                value,
                classification_code
            ) VALUES (?1, ?2, ?3, 1, ?4);",
            params![
                target.table.as_str(),
                target.entity_key.as_str(),
                target.attribute_name.as_str(),
                target.classification_code.as_deref(),
            ],
        )?;
        if inserted == 1 {
            return Ok(CellAction::Inserted);
        }

        let updated = self.conn.execute(
            "UPDATE exclusivity_cells
             SET
                value = 1,
                classification_code = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE entity_table = ?1
               AND entity_key = ?2
               AND attribute_name = ?3;",
            params![
                target.table.as_str(),
                target.entity_key.as_str(),
                target.attribute_name.as_str(),
                target.classification_code.as_deref(),
            ],
        )?;
        if updated == 0 {
            return Err(RepoError::InvalidData(format!(
                "cell `{}`/`{}` neither inserted nor updated",
                target.entity_key, target.attribute_name
            )));
        }
        Ok(CellAction::Updated)
    }

    fn clear_cell(&self, target: &CellTarget) -> RepoResult<ClearOutcome> {
        let sql = match target.table {
            EntityTable::Items => {
                "UPDATE exclusivity_cells
                 SET
                    value = 0,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE entity_table = ?1
                   AND entity_key = ?2
                   AND attribute_name = ?3;"
            }
            EntityTable::Stores => {
                "UPDATE exclusivity_cells
                 SET
                    value = NULL,
                    classification_code = NULL,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE entity_table = ?1
                   AND entity_key = ?2
                   AND attribute_name = ?3;"
            }
        };
        let changed = self.conn.execute(
            sql,
            params![
                target.table.as_str(),
                target.entity_key.as_str(),
                target.attribute_name.as_str(),
            ],
        )?;

        if changed == 0 {
            return Ok(ClearOutcome::NotFound);
        }
        Ok(ClearOutcome::Cleared)
    }

    fn get_cell(
        &self,
        table: EntityTable,
        entity_key: &str,
        attribute_name: &str,
    ) -> RepoResult<Option<ExclusivityCell>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CELL_SELECT_SQL}
             WHERE entity_table = ?1
               AND entity_key = ?2
               AND attribute_name = ?3;"
        ))?;
        let mut rows = stmt.query(params![table.as_str(), entity_key, attribute_name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_cell_row(row)?));
        }
        Ok(None)
    }

    fn list_cells(&self, table: EntityTable, entity_key: &str) -> RepoResult<Vec<ExclusivityCell>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CELL_SELECT_SQL}
             WHERE entity_table = ?1
               AND entity_key = ?2
             ORDER BY attribute_name ASC;"
        ))?;
        let mut rows = stmt.query(params![table.as_str(), entity_key])?;
        let mut cells = Vec::new();
        while let Some(row) = rows.next()? {
            cells.push(parse_cell_row(row)?);
        }
        Ok(cells)
    }
}

fn parse_cell_row(row: &Row<'_>) -> RepoResult<ExclusivityCell> {
    let table_text: String = row.get("entity_table")?;
    let table = EntityTable::parse(&table_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid entity table `{table_text}` in exclusivity_cells.entity_table"
        ))
    })?;

    let value: Option<i64> = row.get("value")?;
    if let Some(other) = value.filter(|value| *value != 0 && *value != 1) {
        return Err(RepoError::InvalidData(format!(
            "invalid cell value `{other}` in exclusivity_cells.value"
        )));
    }

    Ok(ExclusivityCell {
        table,
        entity_key: row.get("entity_key")?,
        attribute_name: row.get("attribute_name")?,
        value,
        classification_code: row.get("classification_code")?,
        updated_at: row.get("updated_at")?,
    })
}
