//! Attribute discovery over the exclusivity attribute registry.
//!
//! # Responsibility
//! - Answer "does this attribute exist on this entity table" at call time.
//! - Register attribute names derived from registered dimension codes.
//!
//! # Invariants
//! - Lookups always hit the registry table; nothing is cached, because
//!   attributes can be provisioned between requests.
//! - Registered names are always produced by `KeyEncoder` from codes that
//!   exist in their registries. Raw names are never accepted.
//! - One attribute name maps to exactly one dimension pair per table.

use crate::keys::KeyEncoder;
use crate::model::dimension::{Dimension, DimensionKind, EntityTable};
use crate::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Runtime whitelist of attribute names per entity table.
pub trait SchemaIntrospector {
    fn attribute_exists(&self, table: EntityTable, attribute_name: &str) -> RepoResult<bool>;
    /// Lists attribute names, optionally filtered by a SQL `LIKE` pattern.
    fn list_attributes(
        &self,
        table: EntityTable,
        pattern: Option<&str>,
    ) -> RepoResult<Vec<String>>;
}

/// Outcome of registering one dimension pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterOutcome {
    Registered,
    AlreadyRegistered,
}

/// Summary of a full provisioning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub registered: usize,
    pub already_registered: usize,
    /// Attribute names skipped because another pair already owns them.
    pub collisions: Vec<String>,
}

/// SQLite-backed introspector reading `exclusivity_attributes`.
#[derive(Clone, Copy)]
pub struct SqliteSchemaIntrospector<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSchemaIntrospector<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Registers the item attribute for one chain x classification pair.
    pub fn register_chain_class_attribute(
        &self,
        encoder: &KeyEncoder,
        chain_code: &str,
        classification_code: &str,
    ) -> RepoResult<RegisterOutcome> {
        let catalog = SqliteCatalogRepository::new(self.conn);
        require_dimension(&catalog, DimensionKind::Chain, chain_code)?;
        require_dimension(&catalog, DimensionKind::StoreClassification, classification_code)?;

        let attribute_name = encoder.encode_chain_class(chain_code, classification_code);
        self.insert_registration(&Registration {
            table: EntityTable::Items,
            attribute_name,
            chain_code: Some(chain_code.trim()),
            classification_code: Some(classification_code.trim()),
            brand_code: None,
        })
    }

    /// Registers the store attribute for one brand.
    pub fn register_brand_attribute(
        &self,
        encoder: &KeyEncoder,
        brand_code: &str,
    ) -> RepoResult<RegisterOutcome> {
        let catalog = SqliteCatalogRepository::new(self.conn);
        let brand = require_dimension(&catalog, DimensionKind::Brand, brand_code)?;

        let attribute_name = encoder.encode_brand(&brand.name);
        self.insert_registration(&Registration {
            table: EntityTable::Stores,
            attribute_name,
            chain_code: None,
            classification_code: None,
            brand_code: Some(brand.code.as_str()),
        })
    }

    /// Registers every chain x classification pair and every brand.
    ///
    /// Colliding names are reported and skipped rather than aborting.
    pub fn provision_all(&self, encoder: &KeyEncoder) -> RepoResult<ProvisionReport> {
        let catalog = SqliteCatalogRepository::new(self.conn);
        let chains = catalog.list_dimensions(DimensionKind::Chain)?;
        let classifications = catalog.list_dimensions(DimensionKind::StoreClassification)?;
        let brands = catalog.list_dimensions(DimensionKind::Brand)?;

        let mut report = ProvisionReport::default();
        for chain in &chains {
            for classification in &classifications {
                let outcome =
                    self.register_chain_class_attribute(encoder, &chain.code, &classification.code);
                tally(&mut report, outcome)?;
            }
        }
        for brand in &brands {
            tally(&mut report, self.register_brand_attribute(encoder, &brand.code))?;
        }

        info!(
            "event=attributes_provision module=schema status=ok registered={} already_registered={} collisions={}",
            report.registered,
            report.already_registered,
            report.collisions.len()
        );
        Ok(report)
    }

    fn insert_registration(&self, registration: &Registration<'_>) -> RepoResult<RegisterOutcome> {
        if registration.attribute_name.is_empty() {
            return Err(RepoError::EmptyAttributeName);
        }

        let existing = self
            .conn
            .query_row(
                "SELECT chain_code, classification_code, brand_code
                 FROM exclusivity_attributes
                 WHERE entity_table = ?1 AND attribute_name = ?2;",
                params![
                    registration.table.as_str(),
                    registration.attribute_name.as_str()
                ],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        if let Some((chain, classification, brand)) = existing {
            let same_pair = chain.as_deref() == registration.chain_code
                && classification.as_deref() == registration.classification_code
                && brand.as_deref() == registration.brand_code;
            if same_pair {
                return Ok(RegisterOutcome::AlreadyRegistered);
            }
            warn!(
                "event=attribute_register module=schema status=error error_code=attribute_collision table={} attribute={}",
                registration.table.as_str(),
                registration.attribute_name
            );
            return Err(RepoError::AttributeCollision {
                table: registration.table,
                attribute_name: registration.attribute_name.clone(),
            });
        }

        self.conn.execute(
            "INSERT INTO exclusivity_attributes (
                entity_table,
                attribute_name,
                chain_code,
                classification_code,
                brand_code
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                registration.table.as_str(),
                registration.attribute_name.as_str(),
                registration.chain_code,
                registration.classification_code,
                registration.brand_code,
            ],
        )?;
        Ok(RegisterOutcome::Registered)
    }
}

impl SchemaIntrospector for SqliteSchemaIntrospector<'_> {
    fn attribute_exists(&self, table: EntityTable, attribute_name: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM exclusivity_attributes
                WHERE entity_table = ?1 AND attribute_name = ?2
            );",
            params![table.as_str(), attribute_name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_attributes(
        &self,
        table: EntityTable,
        pattern: Option<&str>,
    ) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT attribute_name
             FROM exclusivity_attributes
             WHERE entity_table = ?1
               AND (?2 IS NULL OR attribute_name LIKE ?2)
             ORDER BY attribute_name ASC;",
        )?;
        let mut rows = stmt.query(params![table.as_str(), pattern])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }
}

struct Registration<'a> {
    table: EntityTable,
    attribute_name: String,
    chain_code: Option<&'a str>,
    classification_code: Option<&'a str>,
    brand_code: Option<&'a str>,
}

fn require_dimension(
    catalog: &SqliteCatalogRepository<'_>,
    kind: DimensionKind,
    code: &str,
) -> RepoResult<Dimension> {
    catalog
        .get_dimension(kind, code.trim())?
        .ok_or_else(|| RepoError::UnknownDimension {
            kind,
            code: code.to_string(),
        })
}

fn tally(report: &mut ProvisionReport, outcome: RepoResult<RegisterOutcome>) -> RepoResult<()> {
    match outcome {
        Ok(RegisterOutcome::Registered) => report.registered += 1,
        Ok(RegisterOutcome::AlreadyRegistered) => report.already_registered += 1,
        Err(RepoError::AttributeCollision { attribute_name, .. }) => {
            report.collisions.push(attribute_name)
        }
        Err(RepoError::EmptyAttributeName) => {}
        Err(err) => return Err(err),
    }
    Ok(())
}
