//! Exclusivity use-case service for both product lines.
//!
//! # Responsibility
//! - Bind key encoding, attribute checks, mutation and import into the four
//!   caller-facing operations: set, clear, bulk rows and tabular import.
//! - Record one audit event per successful single-cell call and one per
//!   processed batch.
//!
//! # Invariants
//! - Every attribute name written is derived from registry codes; callers
//!   never supply a raw name to `set_cell`.
//! - `clear_cell` never deletes a row.
//! - Audit recording is fire-and-forget and cannot fail an operation.

use crate::audit::{
    AuditEvent, AuditSink, EVENT_BULK_IMPORT, EVENT_CELL_CLEARED, EVENT_CELL_SET,
    EVENT_TABULAR_IMPORT,
};
use crate::keys::KeyEncoder;
use crate::model::cell::{CellAction, CellTarget, ClearOutcome, DimensionTuple, ExclusivityCell};
use crate::model::dimension::{DimensionKind, EntityTable, ProductLine};
use crate::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use crate::repo::cell_repo::SqliteCellRepository;
use crate::repo::schema_repo::{ProvisionReport, SchemaIntrospector, SqliteSchemaIntrospector};
use crate::repo::{RepoError, RepoResult};
use crate::service::import::{BulkImporter, BulkRow, ImportError, ImportReport, RawRow};
use crate::service::mutator::{MatrixMutator, MutatorError};
use crate::service::tabular::read_tabular_rows;
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;

/// Service error for single-cell operations.
#[derive(Debug)]
pub enum ExclusivityError {
    /// Entity key or dimension tuple cannot address a cell.
    InvalidTuple(String),
    /// Derived or supplied attribute is not registered.
    AttributeUnknown {
        table: EntityTable,
        attribute_name: String,
    },
    /// Target item or store does not exist.
    EntityNotFound {
        table: EntityTable,
        entity_key: String,
    },
    Repo(RepoError),
}

impl Display for ExclusivityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTuple(message) => write!(f, "invalid dimension tuple: {message}"),
            Self::AttributeUnknown {
                table,
                attribute_name,
            } => write!(
                f,
                "attribute `{attribute_name}` is not registered on `{}`",
                table.as_str()
            ),
            Self::EntityNotFound { table, entity_key } => {
                write!(f, "`{entity_key}` not found in `{}`", table.as_str())
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExclusivityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ExclusivityError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<MutatorError> for ExclusivityError {
    fn from(value: MutatorError) -> Self {
        match value {
            MutatorError::AttributeUnknown {
                table,
                attribute_name,
            } => Self::AttributeUnknown {
                table,
                attribute_name,
            },
            MutatorError::Repo(err) => Self::Repo(err),
        }
    }
}

/// Result of a successful single-cell set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSetResult {
    pub entity_key: String,
    pub attribute_name: String,
    pub action: CellAction,
}

/// Exclusivity service over one request-scoped connection.
pub struct ExclusivityService<'conn, A: AuditSink> {
    conn: &'conn Connection,
    encoder: KeyEncoder,
    audit: A,
    actor: Option<String>,
    csv_delimiter: u8,
}

impl<'conn, A: AuditSink> ExclusivityService<'conn, A> {
    pub fn new(conn: &'conn Connection, encoder: KeyEncoder, audit: A) -> Self {
        Self {
            conn,
            encoder,
            audit,
            actor: None,
            csv_delimiter: b',',
        }
    }

    /// Actor recorded on every audit event from this service.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: u8) -> Self {
        self.csv_delimiter = delimiter;
        self
    }

    pub fn encoder(&self) -> &KeyEncoder {
        &self.encoder
    }

    /// Marks one cell exclusive from registry codes.
    ///
    /// EPC tuples need `chain` and `classification` codes. NBFI tuples need a
    /// `brand` code; `classification` is optional and stored on the cell.
    ///
    /// # Errors
    /// - `InvalidTuple` for blank keys, missing codes or unknown codes.
    /// - `EntityNotFound` when the item or store does not exist.
    /// - `AttributeUnknown` when the derived attribute is not registered.
    pub fn set_cell(
        &self,
        line: ProductLine,
        entity_key: &str,
        tuple: &DimensionTuple,
    ) -> Result<CellSetResult, ExclusivityError> {
        let entity_key = require_text("entityKey", Some(entity_key))?;
        let catalog = SqliteCatalogRepository::new(self.conn);
        let table = line.entity_table();

        let mut classification_code = None;
        let attribute_name = match line {
            ProductLine::Epc => {
                let chain = require_text("chain", tuple.chain.as_deref())?;
                let classification = require_text("classification", tuple.classification.as_deref())?;
                self.encoder.encode_chain_class(chain, classification)
            }
            ProductLine::Nbfi => {
                let brand_code = require_text("brand", tuple.brand.as_deref())?;
                let brand = catalog
                    .get_dimension(DimensionKind::Brand, brand_code)?
                    .ok_or_else(|| {
                        ExclusivityError::InvalidTuple(format!("unknown brand `{brand_code}`"))
                    })?;
                if let Some(code) = optional_text(tuple.classification.as_deref()) {
                    if catalog
                        .get_dimension(DimensionKind::StoreClassification, code)?
                        .is_none()
                    {
                        return Err(ExclusivityError::InvalidTuple(format!(
                            "unknown store classification `{code}`"
                        )));
                    }
                    classification_code = Some(code.to_string());
                }
                self.encoder.encode_brand(&brand.name)
            }
        };
        if attribute_name.is_empty() {
            return Err(ExclusivityError::InvalidTuple(
                "dimension tuple encodes to an empty attribute name".to_string(),
            ));
        }

        if !catalog.entity_exists(table, entity_key)? {
            return Err(ExclusivityError::EntityNotFound {
                table,
                entity_key: entity_key.to_string(),
            });
        }

        let mut target = CellTarget::new(table, entity_key, attribute_name);
        target.classification_code = classification_code;
        let action = self.mutator().set_cell(&target)?;

        self.record(
            EVENT_CELL_SET,
            line,
            json!({
                "entityKey": target.entity_key,
                "attributeName": target.attribute_name,
                "action": action,
                "classificationCode": target.classification_code,
            }),
        );
        info!(
            "event=cell_set module=exclusivity status=ok line={} attribute={} action={}",
            line.as_str(),
            target.attribute_name,
            action.as_str()
        );

        Ok(CellSetResult {
            entity_key: target.entity_key,
            attribute_name: target.attribute_name,
            action,
        })
    }

    /// Clears one cell by attribute name. The row stays in place.
    ///
    /// # Errors
    /// - `InvalidTuple` for blank keys.
    /// - `EntityNotFound` when the item or store does not exist.
    /// - `AttributeUnknown` when the attribute is not registered.
    pub fn clear_cell(
        &self,
        line: ProductLine,
        entity_key: &str,
        attribute_name: &str,
    ) -> Result<ClearOutcome, ExclusivityError> {
        let entity_key = require_text("entityKey", Some(entity_key))?;
        let attribute_name = require_text("attributeName", Some(attribute_name))?;
        let table = line.entity_table();

        let catalog = SqliteCatalogRepository::new(self.conn);
        if !catalog.entity_exists(table, entity_key)? {
            return Err(ExclusivityError::EntityNotFound {
                table,
                entity_key: entity_key.to_string(),
            });
        }

        let target = CellTarget::new(table, entity_key, attribute_name);
        let outcome = self.mutator().clear_cell(&target)?;
        if outcome == ClearOutcome::Cleared {
            self.record(
                EVENT_CELL_CLEARED,
                line,
                json!({
                    "entityKey": target.entity_key,
                    "attributeName": target.attribute_name,
                }),
            );
        }
        info!(
            "event=cell_clear module=exclusivity status=ok line={} attribute={} outcome={:?}",
            line.as_str(),
            target.attribute_name,
            outcome
        );
        Ok(outcome)
    }

    /// Imports JSON bulk rows. An empty row list is a malformed payload.
    pub fn bulk_rows(
        &self,
        line: ProductLine,
        rows: &[BulkRow],
    ) -> Result<ImportReport, ImportError> {
        if rows.is_empty() {
            return Err(ImportError::Malformed("`rows` must not be empty".to_string()));
        }
        let raw_rows = rows.iter().map(|row| RawRow::from_bulk(line, row));
        let report = self.run_import(line, raw_rows)?;
        self.record_batch(EVENT_BULK_IMPORT, line, &report);
        Ok(report)
    }

    /// Imports a delimited spreadsheet export.
    ///
    /// Only delimited text (CSV by default, see `with_csv_delimiter`) is
    /// read. Binary workbooks such as `.xlsx` must be exported to CSV first;
    /// fed in directly they fail with `ImportError::MissingHeaders` or
    /// `ImportError::Csv`.
    pub fn import_tabular<R: Read>(
        &self,
        line: ProductLine,
        reader: R,
    ) -> Result<ImportReport, ImportError> {
        let raw_rows = read_tabular_rows(line, reader, self.csv_delimiter)?;
        let report = self.run_import(line, raw_rows)?;
        self.record_batch(EVENT_TABULAR_IMPORT, line, &report);
        Ok(report)
    }

    /// Lists registered attributes, optionally filtered by a `LIKE` pattern.
    pub fn list_attributes(
        &self,
        line: ProductLine,
        pattern: Option<&str>,
    ) -> RepoResult<Vec<String>> {
        SqliteSchemaIntrospector::new(self.conn).list_attributes(line.entity_table(), pattern)
    }

    pub fn get_cell(
        &self,
        line: ProductLine,
        entity_key: &str,
        attribute_name: &str,
    ) -> RepoResult<Option<ExclusivityCell>> {
        self.mutator()
            .get_cell(line.entity_table(), entity_key.trim(), attribute_name.trim())
    }

    /// Registers every attribute derivable from the current registries.
    pub fn provision_attributes(&self) -> RepoResult<ProvisionReport> {
        SqliteSchemaIntrospector::new(self.conn).provision_all(&self.encoder)
    }

    fn mutator(&self) -> MatrixMutator<SqliteSchemaIntrospector<'conn>, SqliteCellRepository<'conn>> {
        MatrixMutator::new(
            SqliteSchemaIntrospector::new(self.conn),
            SqliteCellRepository::new(self.conn),
        )
    }

    fn run_import<I>(&self, line: ProductLine, rows: I) -> Result<ImportReport, ImportError>
    where
        I: IntoIterator<Item = RawRow>,
    {
        let catalog = SqliteCatalogRepository::new(self.conn);
        let mutator = self.mutator();
        let importer = BulkImporter::new(line, &catalog, &mutator, &self.encoder)?;
        importer.run(rows)
    }

    fn record_batch(&self, event_type: &str, line: ProductLine, report: &ImportReport) {
        self.record(
            event_type,
            line,
            json!({
                "total": report.summary.total,
                "success": report.summary.success,
                "failed": report.summary.failed,
                "results": report.results,
            }),
        );
    }

    fn record(&self, event_type: &str, line: ProductLine, payload: serde_json::Value) {
        let event = AuditEvent::new(event_type, Some(line), payload).with_actor(self.actor.clone());
        self.audit.record(event);
    }
}

fn require_text<'v>(field: &str, value: Option<&'v str>) -> Result<&'v str, ExclusivityError> {
    optional_text(value)
        .ok_or_else(|| ExclusivityError::InvalidTuple(format!("`{field}` is required")))
}

fn optional_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
