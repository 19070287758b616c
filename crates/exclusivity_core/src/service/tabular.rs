//! Tabular (spreadsheet export) reader for bulk imports.
//!
//! # Responsibility
//! - Locate the four required columns through case-insensitive aliases.
//! - Turn each record into a `RawRow` tagged with its spreadsheet row.
//!
//! # Invariants
//! - Header row is row 1; the first data row is row 2. Rows are counted by
//!   record, so quoted multi-line cells do not shift later row numbers.
//! - Fully blank records are skipped and do not count toward totals.
//! - A record that is not valid UTF-8 fails on its own row; the rest of the
//!   file is still read.
//! - Missing required headers reject the whole file.

use crate::model::dimension::ProductLine;
use crate::service::import::{field_labels, ImportError, RawRow};
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use std::io::Read;

const UNREADABLE_ROW: &str = "row is not valid UTF-8";

const ITEM_ALIASES: &[&str] = &["item", "item code", "itemcode", "item id", "item number", "sku"];
const STORE_ALIASES: &[&str] = &["store", "store code", "storecode", "store id", "store number"];
const CHAIN_ALIASES: &[&str] = &["chain", "chain name", "chain code", "sales chain"];
const CATEGORY_ALIASES: &[&str] = &[
    "category",
    "category name",
    "category code",
    "product category",
    "epc category",
];
const BRAND_ALIASES: &[&str] = &["brand", "brand name", "brand code", "nbfi brand"];
const CLASSIFICATION_ALIASES: &[&str] = &[
    "store classification",
    "store classification name",
    "store classification code",
    "classification",
    "classification code",
    "store class",
    "class",
];

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    entity_key: usize,
    chain: usize,
    group: usize,
    classification: usize,
}

/// Reads all data rows of a delimited file for one product line.
///
/// # Errors
/// - `ImportError::MissingHeaders` naming every absent column.
/// - `ImportError::Csv` when the file cannot be decoded.
pub fn read_tabular_rows<R: Read>(
    line: ProductLine,
    reader: R,
    delimiter: u8,
) -> Result<Vec<RawRow>, ImportError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = locate_columns(line, &headers)?;

    let mut rows = Vec::new();
    for (index, record) in csv_reader.byte_records().enumerate() {
        let record = record?;
        if record
            .iter()
            .all(|field| field.iter().all(u8::is_ascii_whitespace))
        {
            continue;
        }
        // The header is record 0, so record N sits on spreadsheet row N + 1.
        let row = record
            .position()
            .and_then(|position| usize::try_from(position.record()).ok())
            .map_or(index + 2, |record_index| record_index + 1);
        rows.push(decode_row(&record, row, columns));
    }
    Ok(rows)
}

fn decode_row(record: &ByteRecord, row: usize, columns: ColumnMap) -> RawRow {
    let mut raw = RawRow {
        row: Some(row),
        ..RawRow::default()
    };
    let mut readable = true;
    let mut decode = |index: usize| match record.get(index).map(std::str::from_utf8) {
        Some(Ok(value)) => Some(value.to_string()),
        Some(Err(_)) => {
            readable = false;
            None
        }
        None => None,
    };
    raw.entity_key = decode(columns.entity_key);
    raw.chain = decode(columns.chain);
    raw.group = decode(columns.group);
    raw.classification = decode(columns.classification);
    if !readable {
        raw.unreadable = Some(UNREADABLE_ROW.to_string());
    }
    raw
}

fn locate_columns(line: ProductLine, headers: &StringRecord) -> Result<ColumnMap, ImportError> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
    let find = |aliases: &[&str]| {
        normalized
            .iter()
            .position(|header| aliases.iter().any(|alias| *alias == header.as_str()))
    };

    let (entity_aliases, group_aliases) = match line {
        ProductLine::Epc => (ITEM_ALIASES, CATEGORY_ALIASES),
        ProductLine::Nbfi => (STORE_ALIASES, BRAND_ALIASES),
    };
    let found = [
        find(entity_aliases),
        find(CHAIN_ALIASES),
        find(group_aliases),
        find(CLASSIFICATION_ALIASES),
    ];

    let missing: Vec<&'static str> = field_labels(line)
        .into_iter()
        .zip(found)
        .filter(|(_, index)| index.is_none())
        .map(|(label, _)| label)
        .collect();
    match found {
        [Some(entity_key), Some(chain), Some(group), Some(classification)] => Ok(ColumnMap {
            entity_key,
            chain,
            group,
            classification,
        }),
        _ => Err(ImportError::MissingHeaders(missing)),
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace(['_', '-', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{normalize_header, read_tabular_rows};
    use crate::model::dimension::ProductLine;
    use crate::service::import::ImportError;

    #[test]
    fn header_normalization_folds_case_and_separators() {
        assert_eq!(normalize_header("\u{feff}Item_Code"), "item code");
        assert_eq!(normalize_header("  Store-Classification "), "store classification");
    }

    #[test]
    fn aliases_locate_columns_in_any_order() {
        let data = "Store Class,CHAIN NAME,sku,Category\nA Stores,ACME,IT001,LAMPS\n";
        let rows = read_tabular_rows(ProductLine::Epc, data.as_bytes(), b',').unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, Some(2));
        assert_eq!(rows[0].entity_key.as_deref(), Some("IT001"));
        assert_eq!(rows[0].chain.as_deref(), Some("ACME"));
        assert_eq!(rows[0].group.as_deref(), Some("LAMPS"));
        assert_eq!(rows[0].classification.as_deref(), Some("A Stores"));
    }

    #[test]
    fn missing_headers_are_all_reported() {
        let data = "item,chain\nIT001,ACME\n";
        let err = read_tabular_rows(ProductLine::Epc, data.as_bytes(), b',').unwrap_err();
        match err {
            ImportError::MissingHeaders(missing) => {
                assert_eq!(missing, vec!["category", "store classification"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_records_are_skipped_and_short_records_keep_row_numbers() {
        let data = "store;chain;brand;classification\n;;;\nS001;ACME\n";
        let rows = read_tabular_rows(ProductLine::Nbfi, data.as_bytes(), b';').unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, Some(3));
        assert_eq!(rows[0].group, None);
    }

    #[test]
    fn undecodable_record_is_flagged_without_aborting_the_file() {
        let data = b"item,chain,category,classification\nIT0\xff2,ACME,LAMPS,A Stores\nIT001,ACME,LAMPS,A Stores\n";
        let rows = read_tabular_rows(ProductLine::Epc, &data[..], b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, Some(2));
        assert_eq!(rows[0].unreadable.as_deref(), Some("row is not valid UTF-8"));
        assert_eq!(rows[0].entity_key, None);
        assert_eq!(rows[0].chain.as_deref(), Some("ACME"));
        assert_eq!(rows[1].unreadable, None);
        assert_eq!(rows[1].row, Some(3));
    }
}
