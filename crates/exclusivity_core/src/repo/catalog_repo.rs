//! Dimension registry and entity catalog repository.
//!
//! # Responsibility
//! - Read registries (chains, categories, brands, store classifications).
//! - Read items and stores for existence/ownership checks.
//! - Provide provisioning writes used by administrative setup.
//!
//! # Invariants
//! - Provisioning writes are upserts keyed by code; they never touch cells.

use crate::model::catalog::{Item, Store};
use crate::model::dimension::{Dimension, DimensionKind, EntityTable};
use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for registry and catalog reads/provisioning.
pub trait CatalogRepository {
    /// Lists one registry ordered by code.
    fn list_dimensions(&self, kind: DimensionKind) -> RepoResult<Vec<Dimension>>;
    fn get_dimension(&self, kind: DimensionKind, code: &str) -> RepoResult<Option<Dimension>>;
    fn get_item(&self, item_code: &str) -> RepoResult<Option<Item>>;
    fn get_store(&self, store_code: &str) -> RepoResult<Option<Store>>;
    /// Whether the entity row a cell would hang off exists.
    fn entity_exists(&self, table: EntityTable, entity_key: &str) -> RepoResult<bool>;
    fn upsert_dimension(&self, kind: DimensionKind, dimension: &Dimension) -> RepoResult<()>;
    fn upsert_item(&self, item: &Item) -> RepoResult<()>;
    fn upsert_store(&self, store: &Store) -> RepoResult<()>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn list_dimensions(&self, kind: DimensionKind) -> RepoResult<Vec<Dimension>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT code, name FROM {} ORDER BY code ASC;",
            kind.table()
        ))?;
        let mut rows = stmt.query([])?;
        let mut dimensions = Vec::new();
        while let Some(row) = rows.next()? {
            dimensions.push(Dimension {
                code: row.get("code")?,
                name: row.get("name")?,
            });
        }
        Ok(dimensions)
    }

    fn get_dimension(&self, kind: DimensionKind, code: &str) -> RepoResult<Option<Dimension>> {
        let dimension = self
            .conn
            .query_row(
                &format!("SELECT code, name FROM {} WHERE code = ?1;", kind.table()),
                [code],
                |row| {
                    Ok(Dimension {
                        code: row.get("code")?,
                        name: row.get("name")?,
                    })
                },
            )
            .optional()?;
        Ok(dimension)
    }

    fn get_item(&self, item_code: &str) -> RepoResult<Option<Item>> {
        let item = self
            .conn
            .query_row(
                "SELECT item_code, description, category_code, brand_code
                 FROM items
                 WHERE item_code = ?1;",
                [item_code],
                |row| {
                    Ok(Item {
                        item_code: row.get("item_code")?,
                        description: row.get("description")?,
                        category_code: row.get("category_code")?,
                        brand_code: row.get("brand_code")?,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    fn get_store(&self, store_code: &str) -> RepoResult<Option<Store>> {
        let store = self
            .conn
            .query_row(
                "SELECT store_code, store_name, chain_code
                 FROM stores
                 WHERE store_code = ?1;",
                [store_code],
                |row| {
                    Ok(Store {
                        store_code: row.get("store_code")?,
                        store_name: row.get("store_name")?,
                        chain_code: row.get("chain_code")?,
                    })
                },
            )
            .optional()?;
        Ok(store)
    }

    fn entity_exists(&self, table: EntityTable, entity_key: &str) -> RepoResult<bool> {
        let sql = match table {
            EntityTable::Items => "SELECT EXISTS(SELECT 1 FROM items WHERE item_code = ?1);",
            EntityTable::Stores => "SELECT EXISTS(SELECT 1 FROM stores WHERE store_code = ?1);",
        };
        let exists: i64 = self.conn.query_row(sql, [entity_key], |row| row.get(0))?;
        Ok(exists == 1)
    }

    fn upsert_dimension(&self, kind: DimensionKind, dimension: &Dimension) -> RepoResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (code, name) VALUES (?1, ?2)
                 ON CONFLICT(code) DO UPDATE SET name = excluded.name;",
                kind.table()
            ),
            params![dimension.code.trim(), dimension.name.trim()],
        )?;
        Ok(())
    }

    fn upsert_item(&self, item: &Item) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO items (item_code, description, category_code, brand_code)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(item_code) DO UPDATE SET
                description = excluded.description,
                category_code = excluded.category_code,
                brand_code = excluded.brand_code;",
            params![
                item.item_code.trim(),
                item.description.as_str(),
                item.category_code.as_deref(),
                item.brand_code.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn upsert_store(&self, store: &Store) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO stores (store_code, store_name, chain_code)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(store_code) DO UPDATE SET
                store_name = excluded.store_name,
                chain_code = excluded.chain_code;",
            params![
                store.store_code.trim(),
                store.store_name.as_str(),
                store.chain_code.as_str(),
            ],
        )?;
        Ok(())
    }
}
