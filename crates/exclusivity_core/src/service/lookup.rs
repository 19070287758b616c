//! Name-to-code resolution for bulk imports.
//!
//! # Responsibility
//! - Build case-insensitive maps from human-readable names to codes.
//! - Accept the raw code as well, so either form is valid input.
//!
//! # Invariants
//! - Keys are trimmed and lowercased; values are canonical codes.
//! - When a code string equals another row's name, the name wins.
//! - Registries are read once per batch; resolution itself does no I/O.

use crate::model::dimension::{Dimension, DimensionKind};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::RepoResult;
use std::collections::HashMap;

/// Case-insensitive name/code lookup for one registry.
#[derive(Debug, Clone, Default)]
pub struct LookupMap {
    entries: HashMap<String, String>,
}

impl LookupMap {
    /// Builds a map from `rows`, reading name and code through accessors.
    pub fn build<T>(
        rows: &[T],
        name_of: impl Fn(&T) -> &str,
        code_of: impl Fn(&T) -> &str,
    ) -> Self {
        let mut entries = HashMap::with_capacity(rows.len() * 2);
        for row in rows {
            let code = code_of(row).trim();
            let name = normalize_key(name_of(row));
            if code.is_empty() || name.is_empty() {
                continue;
            }
            entries.insert(name, code.to_string());
        }
        for row in rows {
            let code = code_of(row).trim();
            if code.is_empty() {
                continue;
            }
            entries
                .entry(normalize_key(code))
                .or_insert_with(|| code.to_string());
        }
        Self { entries }
    }

    pub fn from_dimensions(dimensions: &[Dimension]) -> Self {
        Self::build(dimensions, |d| d.name.as_str(), |d| d.code.as_str())
    }

    /// Resolves a name or code to its canonical code.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        self.entries.get(&normalize_key(input)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All registry lookups needed by one import batch.
#[derive(Debug, Clone, Default)]
pub struct DimensionLookups {
    pub chains: LookupMap,
    pub categories: LookupMap,
    pub brands: LookupMap,
    pub classifications: LookupMap,
    brand_names: HashMap<String, String>,
}

impl DimensionLookups {
    /// Reads every registry once.
    pub fn load<C: CatalogRepository>(catalog: &C) -> RepoResult<Self> {
        let chains = catalog.list_dimensions(DimensionKind::Chain)?;
        let categories = catalog.list_dimensions(DimensionKind::Category)?;
        let brands = catalog.list_dimensions(DimensionKind::Brand)?;
        let classifications = catalog.list_dimensions(DimensionKind::StoreClassification)?;

        Ok(Self {
            chains: LookupMap::from_dimensions(&chains),
            categories: LookupMap::from_dimensions(&categories),
            brands: LookupMap::from_dimensions(&brands),
            classifications: LookupMap::from_dimensions(&classifications),
            brand_names: brands
                .into_iter()
                .map(|brand| (brand.code, brand.name))
                .collect(),
        })
    }

    pub fn map(&self, kind: DimensionKind) -> &LookupMap {
        match kind {
            DimensionKind::Chain => &self.chains,
            DimensionKind::Category => &self.categories,
            DimensionKind::Brand => &self.brands,
            DimensionKind::StoreClassification => &self.classifications,
        }
    }

    /// Registered display name for a resolved brand code.
    pub fn brand_name(&self, brand_code: &str) -> Option<&str> {
        self.brand_names.get(brand_code).map(String::as_str)
    }
}

fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::LookupMap;
    use crate::model::dimension::Dimension;

    fn classifications() -> Vec<Dimension> {
        vec![
            Dimension::new("AHIGH", "A Stores"),
            Dimension::new("BMID", "B Stores"),
        ]
    }

    #[test]
    fn resolves_names_case_insensitively() {
        let map = LookupMap::from_dimensions(&classifications());
        assert_eq!(map.resolve("a stores"), Some("AHIGH"));
        assert_eq!(map.resolve("  B STORES "), Some("BMID"));
        assert_eq!(map.resolve("Z Stores"), None);
    }

    #[test]
    fn accepts_raw_codes() {
        let map = LookupMap::from_dimensions(&classifications());
        assert_eq!(map.resolve("AHIGH"), Some("AHIGH"));
        assert_eq!(map.resolve("bmid"), Some("BMID"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn name_wins_over_colliding_code() {
        let rows = vec![Dimension::new("X1", "Y2"), Dimension::new("Y2", "Other")];
        let map = LookupMap::from_dimensions(&rows);
        assert_eq!(map.resolve("y2"), Some("X1"));
        assert_eq!(map.resolve("other"), Some("Y2"));
    }
}
