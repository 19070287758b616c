//! Bulk import pipeline for exclusivity cells.
//!
//! # Responsibility
//! - Drive each row through extract, validate, resolve, existence check,
//!   attribute derivation, attribute check and mutation.
//! - Aggregate per-row outcomes into one report.
//!
//! # Invariants
//! - Rows run sequentially and independently; a rejected row never stops
//!   the next one.
//! - `summary.success + summary.failed == summary.total` for every report.
//! - Only transport (database) errors abort a batch.
//! - The pipeline records no audit events; callers record one per batch.

use crate::keys::KeyEncoder;
use crate::model::cell::{CellAction, CellTarget, DimensionTuple};
use crate::model::dimension::{DimensionKind, EntityTable, ProductLine};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::cell_repo::CellRepository;
use crate::repo::schema_repo::SchemaIntrospector;
use crate::repo::RepoError;
use crate::service::lookup::DimensionLookups;
use crate::service::mutator::{MatrixMutator, MutatorError};
use log::{debug, error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

static ITEM_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid item code regex"));

/// Row-level failure categories. Transport failures are never row-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    /// Missing, blank or malformed field.
    Validation,
    /// Human-readable name not found in its registry.
    Resolution,
    /// Referenced item or store does not exist.
    NotFound,
    /// Derived attribute is not registered.
    Schema,
}

/// Unvalidated row as extracted from a tabular file or JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// Spreadsheet row number (header is row 1), when the source has one.
    pub row: Option<usize>,
    pub entity_key: Option<String>,
    pub chain: Option<String>,
    /// Category for EPC rows, brand for NBFI rows.
    pub group: Option<String>,
    pub classification: Option<String>,
    /// Set when the source row could not be decoded at all.
    pub unreadable: Option<String>,
}

impl RawRow {
    pub fn from_bulk(line: ProductLine, bulk: &BulkRow) -> Self {
        let tuple = &bulk.dimension_tuple;
        let group = match line {
            ProductLine::Epc => tuple.category.clone(),
            ProductLine::Nbfi => tuple.brand.clone(),
        };
        Self {
            row: None,
            entity_key: bulk.entity_key.clone(),
            chain: tuple.chain.clone(),
            group,
            classification: tuple.classification.clone(),
            unreadable: None,
        }
    }
}

/// JSON bulk row: `{ "entityKey": ..., "dimensionTuple": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRow {
    #[serde(default)]
    pub entity_key: Option<String>,
    #[serde(default)]
    pub dimension_tuple: DimensionTuple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub entity_key: String,
    pub attribute: String,
    pub action: CellAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_key: Option<String>,
    pub kind: RowErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResults {
    pub success: Vec<SuccessEntry>,
    pub failed: Vec<FailureEntry>,
}

/// Batch outcome, in input order within each list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub results: ImportResults,
}

impl ImportReport {
    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }

    fn push_success(&mut self, entry: SuccessEntry) {
        self.summary.total += 1;
        self.summary.success += 1;
        self.results.success.push(entry);
    }

    fn push_failure(&mut self, entry: FailureEntry) {
        self.summary.total += 1;
        self.summary.failed += 1;
        self.results.failed.push(entry);
    }
}

/// Batch-level import failures.
#[derive(Debug)]
pub enum ImportError {
    /// Payload cannot be processed at all.
    Malformed(String),
    /// Tabular source lacks required header columns.
    MissingHeaders(Vec<&'static str>),
    Csv(csv::Error),
    /// Database failure; the batch was aborted.
    Transport(RepoError),
}

impl ImportError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "malformed import payload: {message}"),
            Self::MissingHeaders(headers) => {
                write!(f, "missing required columns: {}", headers.join(", "))
            }
            Self::Csv(err) => write!(f, "unreadable tabular file: {err}"),
            Self::Transport(err) => write!(f, "import aborted: {err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::Malformed(_) | Self::MissingHeaders(_) => None,
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// Column labels in extraction order: entity, chain, group, classification.
pub fn field_labels(line: ProductLine) -> [&'static str; 4] {
    match line {
        ProductLine::Epc => ["item", "chain", "category", "store classification"],
        ProductLine::Nbfi => ["store", "chain", "brand", "store classification"],
    }
}

enum RowError {
    Rejected { kind: RowErrorKind, reason: String },
    Transport(RepoError),
}

impl From<RepoError> for RowError {
    fn from(value: RepoError) -> Self {
        Self::Transport(value)
    }
}

fn reject(kind: RowErrorKind, reason: String) -> RowError {
    RowError::Rejected { kind, reason }
}

struct ValidRow<'r> {
    entity_key: &'r str,
    chain: &'r str,
    group: &'r str,
    classification: &'r str,
}

struct ResolvedRow {
    chain_code: String,
    group_code: String,
    classification_code: String,
}

/// Sequential per-row import over one product line.
pub struct BulkImporter<'a, C, S, R>
where
    C: CatalogRepository,
    S: SchemaIntrospector,
    R: CellRepository,
{
    line: ProductLine,
    catalog: &'a C,
    mutator: &'a MatrixMutator<S, R>,
    encoder: &'a KeyEncoder,
    lookups: DimensionLookups,
}

impl<'a, C, S, R> BulkImporter<'a, C, S, R>
where
    C: CatalogRepository,
    S: SchemaIntrospector,
    R: CellRepository,
{
    /// Creates an importer and reads the registries for this batch.
    pub fn new(
        line: ProductLine,
        catalog: &'a C,
        mutator: &'a MatrixMutator<S, R>,
        encoder: &'a KeyEncoder,
    ) -> Result<Self, ImportError> {
        let lookups = DimensionLookups::load(catalog).map_err(ImportError::Transport)?;
        Ok(Self {
            line,
            catalog,
            mutator,
            encoder,
            lookups,
        })
    }

    /// Processes every row and returns the aggregated report.
    ///
    /// # Errors
    /// - `ImportError::Transport` when the database fails mid-batch. Rows
    ///   already written stay written.
    pub fn run<I>(&self, rows: I) -> Result<ImportReport, ImportError>
    where
        I: IntoIterator<Item = RawRow>,
    {
        let started_at = Instant::now();
        info!(
            "event=import_run module=import status=start line={}",
            self.line.as_str()
        );

        let mut report = ImportReport::default();
        for raw in rows {
            match self.process_row(&raw) {
                Ok(entry) => report.push_success(entry),
                Err(RowError::Rejected { kind, reason }) => {
                    debug!(
                        "event=import_row module=import status=rejected line={} row={:?} kind={:?} reason={}",
                        self.line.as_str(),
                        raw.row,
                        kind,
                        reason
                    );
                    report.push_failure(FailureEntry {
                        row: raw.row,
                        entity_key: raw
                            .entity_key
                            .as_deref()
                            .map(str::trim)
                            .filter(|key| !key.is_empty())
                            .map(str::to_string),
                        kind,
                        reason,
                    });
                }
                Err(RowError::Transport(err)) => {
                    error!(
                        "event=import_run module=import status=error line={} processed={} duration_ms={} error_code=transport error={}",
                        self.line.as_str(),
                        report.summary.total,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(ImportError::Transport(err));
                }
            }
        }

        info!(
            "event=import_run module=import status=ok line={} total={} success={} failed={} duration_ms={}",
            self.line.as_str(),
            report.summary.total,
            report.summary.success,
            report.summary.failed,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn process_row(&self, raw: &RawRow) -> Result<SuccessEntry, RowError> {
        let row = self.validate_fields(raw)?;
        let resolved = self.resolve(&row)?;
        self.check_entity(&row, &resolved)?;
        let attribute = self.derive_attribute(&resolved)?;
        self.check_attribute(&attribute, &resolved)?;

        let mut target = CellTarget::new(self.line.entity_table(), row.entity_key, attribute);
        if self.line == ProductLine::Nbfi {
            target = target.with_classification(resolved.classification_code.as_str());
        }
        let action = match self.mutator.set_cell(&target) {
            Ok(action) => action,
            Err(MutatorError::AttributeUnknown { attribute_name, .. }) => {
                return Err(reject(
                    RowErrorKind::Schema,
                    format!("attribute `{attribute_name}` is no longer registered"),
                ));
            }
            Err(MutatorError::Repo(err)) => return Err(RowError::Transport(err)),
        };

        Ok(SuccessEntry {
            row: raw.row,
            entity_key: target.entity_key,
            attribute: target.attribute_name,
            action,
        })
    }

    fn validate_fields<'r>(&self, raw: &'r RawRow) -> Result<ValidRow<'r>, RowError> {
        if let Some(reason) = &raw.unreadable {
            return Err(reject(RowErrorKind::Validation, reason.clone()));
        }

        let labels = field_labels(self.line);
        let values = [
            raw.entity_key.as_deref(),
            raw.chain.as_deref(),
            raw.group.as_deref(),
            raw.classification.as_deref(),
        ];

        let mut trimmed = [""; 4];
        for (index, (label, value)) in labels.iter().zip(values).enumerate() {
            let value = match value {
                Some(value) if !value.is_empty() => value,
                _ => {
                    return Err(reject(
                        RowErrorKind::Validation,
                        format!("missing required field `{label}`"),
                    ))
                }
            };
            let value = value.trim();
            if value.is_empty() {
                return Err(reject(
                    RowErrorKind::Validation,
                    format!("field `{label}` contains only whitespace"),
                ));
            }
            trimmed[index] = value;
        }

        let [entity_key, chain, group, classification] = trimmed;
        if self.line == ProductLine::Epc && !ITEM_CODE_RE.is_match(entity_key) {
            return Err(reject(
                RowErrorKind::Validation,
                format!("item code `{entity_key}` may only contain letters, digits, `-` and `_`"),
            ));
        }

        Ok(ValidRow {
            entity_key,
            chain,
            group,
            classification,
        })
    }

    fn resolve(&self, row: &ValidRow<'_>) -> Result<ResolvedRow, RowError> {
        let group_kind = match self.line {
            ProductLine::Epc => DimensionKind::Category,
            ProductLine::Nbfi => DimensionKind::Brand,
        };
        Ok(ResolvedRow {
            chain_code: self.resolve_one(DimensionKind::Chain, row.chain)?,
            group_code: self.resolve_one(group_kind, row.group)?,
            classification_code: self
                .resolve_one(DimensionKind::StoreClassification, row.classification)?,
        })
    }

    fn resolve_one(&self, kind: DimensionKind, value: &str) -> Result<String, RowError> {
        self.lookups
            .map(kind)
            .resolve(value)
            .map(str::to_string)
            .ok_or_else(|| {
                reject(
                    RowErrorKind::Resolution,
                    format!("unknown {} `{value}`", kind.label()),
                )
            })
    }

    fn check_entity(&self, row: &ValidRow<'_>, resolved: &ResolvedRow) -> Result<(), RowError> {
        match self.line {
            ProductLine::Epc => {
                let item = self.catalog.get_item(row.entity_key)?.ok_or_else(|| {
                    reject(
                        RowErrorKind::NotFound,
                        format!("item `{}` does not exist", row.entity_key),
                    )
                })?;
                if item.category_code.as_deref() != Some(resolved.group_code.as_str()) {
                    return Err(reject(
                        RowErrorKind::Validation,
                        format!(
                            "item `{}` is not in category `{}`",
                            row.entity_key, resolved.group_code
                        ),
                    ));
                }
            }
            ProductLine::Nbfi => {
                let store = self.catalog.get_store(row.entity_key)?.ok_or_else(|| {
                    reject(
                        RowErrorKind::NotFound,
                        format!("store `{}` does not exist", row.entity_key),
                    )
                })?;
                if store.chain_code != resolved.chain_code {
                    return Err(reject(
                        RowErrorKind::Validation,
                        format!(
                            "store `{}` belongs to chain `{}`, not `{}`",
                            row.entity_key, store.chain_code, resolved.chain_code
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn derive_attribute(&self, resolved: &ResolvedRow) -> Result<String, RowError> {
        let attribute = match self.line {
            ProductLine::Epc => self
                .encoder
                .encode_chain_class(&resolved.chain_code, &resolved.classification_code),
            ProductLine::Nbfi => {
                let brand_name = self
                    .lookups
                    .brand_name(&resolved.group_code)
                    .unwrap_or(resolved.group_code.as_str());
                self.encoder.encode_brand(brand_name)
            }
        };
        if attribute.is_empty() {
            return Err(reject(RowErrorKind::Schema, self.invalid_combination(resolved)));
        }
        Ok(attribute)
    }

    fn check_attribute(&self, attribute: &str, resolved: &ResolvedRow) -> Result<(), RowError> {
        let table: EntityTable = self.line.entity_table();
        if self.mutator.schema().attribute_exists(table, attribute)? {
            return Ok(());
        }
        Err(reject(
            RowErrorKind::Schema,
            format!(
                "{} (attribute `{attribute}` is not registered)",
                self.invalid_combination(resolved)
            ),
        ))
    }

    fn invalid_combination(&self, resolved: &ResolvedRow) -> String {
        match self.line {
            ProductLine::Epc => format!(
                "invalid chain/classification combination `{}`/`{}`",
                resolved.chain_code, resolved.classification_code
            ),
            ProductLine::Nbfi => format!("invalid brand `{}`", resolved.group_code),
        }
    }
}
