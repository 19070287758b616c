//! Item and store catalog records.
//!
//! Catalog maintenance is owned by a separate flow; the engine only reads
//! these rows to check existence and ownership before mutating cells.

use serde::{Deserialize, Serialize};

/// Merchandise item (EPC line entity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_code: String,
    pub description: String,
    pub category_code: Option<String>,
    pub brand_code: Option<String>,
}

impl Item {
    pub fn new(item_code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            item_code: item_code.into(),
            description: description.into(),
            category_code: None,
            brand_code: None,
        }
    }

    pub fn in_category(mut self, category_code: impl Into<String>) -> Self {
        self.category_code = Some(category_code.into());
        self
    }

    pub fn with_brand(mut self, brand_code: impl Into<String>) -> Self {
        self.brand_code = Some(brand_code.into());
        self
    }
}

/// Retail store (NBFI line entity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub store_code: String,
    pub store_name: String,
    pub chain_code: String,
}

impl Store {
    pub fn new(
        store_code: impl Into<String>,
        store_name: impl Into<String>,
        chain_code: impl Into<String>,
    ) -> Self {
        Self {
            store_code: store_code.into(),
            store_name: store_name.into(),
            chain_code: chain_code.into(),
        }
    }
}
