//! Dimension registries: chains, categories, brands, store classifications.

use serde::{Deserialize, Serialize};

/// Product line a matrix operation belongs to.
///
/// `Epc` rows live on items and are keyed by chain x store classification
/// within a category. `Nbfi` rows live on stores and are keyed by brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductLine {
    Epc,
    Nbfi,
}

impl ProductLine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Epc => "epc",
            Self::Nbfi => "nbfi",
        }
    }

    /// Entity table whose rows carry this line's cells.
    pub fn entity_table(self) -> EntityTable {
        match self {
            Self::Epc => EntityTable::Items,
            Self::Nbfi => EntityTable::Stores,
        }
    }

    /// Case-insensitive `epc` / `nbfi`, surrounding whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "epc" => Some(Self::Epc),
            "nbfi" => Some(Self::Nbfi),
            _ => None,
        }
    }
}

/// Entity tables that own exclusivity cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Items,
    Stores,
}

impl EntityTable {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Stores => "stores",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "items" => Some(Self::Items),
            "stores" => Some(Self::Stores),
            _ => None,
        }
    }
}

/// Registry kinds, used for table routing and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    Chain,
    Category,
    Brand,
    StoreClassification,
}

impl DimensionKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Chain => "chains",
            Self::Category => "categories",
            Self::Brand => "brands",
            Self::StoreClassification => "store_classifications",
        }
    }

    /// Human-readable label used in row failure reasons.
    pub fn label(self) -> &'static str {
        match self {
            Self::Chain => "chain",
            Self::Category => "category",
            Self::Brand => "brand",
            Self::StoreClassification => "store classification",
        }
    }
}

/// One `{code, name}` registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub code: String,
    pub name: String,
}

impl Dimension {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}
