//! Exclusivity cell addressing and mutation outcomes.

use crate::model::dimension::EntityTable;
use serde::{Deserialize, Serialize};

/// Address of one cell: entity row plus registered attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTarget {
    pub table: EntityTable,
    pub entity_key: String,
    pub attribute_name: String,
    /// Store classification carried by brand-keyed store cells.
    pub classification_code: Option<String>,
}

impl CellTarget {
    pub fn new(
        table: EntityTable,
        entity_key: impl Into<String>,
        attribute_name: impl Into<String>,
    ) -> Self {
        Self {
            table,
            entity_key: entity_key.into(),
            attribute_name: attribute_name.into(),
            classification_code: None,
        }
    }

    pub fn with_classification(mut self, classification_code: impl Into<String>) -> Self {
        self.classification_code = Some(classification_code.into());
        self
    }
}

/// Result of an idempotent set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellAction {
    Inserted,
    Updated,
}

impl CellAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
        }
    }
}

/// Result of a clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearOutcome {
    Cleared,
    NotFound,
}

/// Persisted cell read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusivityCell {
    pub table: EntityTable,
    pub entity_key: String,
    pub attribute_name: String,
    /// `Some(1)` exclusive, `Some(0)` cleared, `None` cleared/unset.
    pub value: Option<i64>,
    pub classification_code: Option<String>,
    /// Epoch ms.
    pub updated_at: i64,
}

impl ExclusivityCell {
    pub fn is_exclusive(&self) -> bool {
        self.value == Some(1)
    }
}

/// Caller-supplied dimension values for one cell.
///
/// Values may be human-readable names (bulk paths) or codes (single-cell
/// path). `category` is read by the EPC line, `brand` by the NBFI line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionTuple {
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default, alias = "storeClassification")]
    pub classification: Option<String>,
}
