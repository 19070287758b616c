mod common;

use common::{provisioned_db, service, RecordingSink};
use exclusivity_core::audit::EVENT_TABULAR_IMPORT;
use exclusivity_core::{CellAction, ImportError, ProductLine, RowErrorKind};

#[test]
fn failures_carry_spreadsheet_row_numbers() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let csv = "Item Code,Chain,Category,Store Classification\n\
               IT001,ACME,LAMPS,A Stores\n\
               IT001,ACME,LAMPS,Z Stores\n\
               ,,,\n\
               IT404,VChain,Lamps,B Stores\n";

    let report = service
        .import_tabular(ProductLine::Epc, csv.as_bytes())
        .unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.success, 1);
    assert_eq!(report.results.success[0].row, Some(2));
    assert_eq!(report.results.success[0].action, CellAction::Inserted);

    let failed = &report.results.failed;
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].row, Some(3));
    assert_eq!(failed[0].kind, RowErrorKind::Resolution);
    assert_eq!(failed[1].row, Some(5));
    assert_eq!(failed[1].kind, RowErrorKind::NotFound);

    assert_eq!(sink.event_types(), vec![EVENT_TABULAR_IMPORT]);
}

#[test]
fn nbfi_sheet_with_alias_headers_imports() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let csv = "\u{feff}Store Number,Sales Chain,NBFI Brand,Store Class\n\
               S001,Acme Retail,Jumping Beans,A Stores\n\
               S002,VChain,Happy Feet,ASEH\n";

    let report = service
        .import_tabular(ProductLine::Nbfi, csv.as_bytes())
        .unwrap();

    assert!(report.all_succeeded());
    let attributes: Vec<&str> = report
        .results
        .success
        .iter()
        .map(|entry| entry.attribute.as_str())
        .collect();
    assert_eq!(attributes, vec!["brand_jumpingbeans", "brand_happy_feet"]);
}

#[test]
fn missing_headers_reject_the_file() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let csv = "Store,Chain\nS001,ACME\n";

    let err = service
        .import_tabular(ProductLine::Nbfi, csv.as_bytes())
        .unwrap_err();

    match err {
        ImportError::MissingHeaders(missing) => {
            assert_eq!(missing, vec!["brand", "store classification"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(sink.events().is_empty());
}

#[test]
fn binary_workbook_is_rejected_as_a_whole() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let workbook: &[u8] =
        b"PK\x03\x04\x14\x00\x06\x00\x08\x00\x00\x00!\x00\xb5U0#\xf4\x00[Content_Types].xml";

    let err = service
        .import_tabular(ProductLine::Epc, workbook)
        .unwrap_err();

    assert!(
        matches!(err, ImportError::Csv(_) | ImportError::MissingHeaders(_)),
        "unexpected error: {err}"
    );
    assert!(sink.events().is_empty());
}

#[test]
fn configured_delimiter_is_honoured() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink).with_csv_delimiter(b';');
    let csv = "item;chain;category;classification\nIT002;VChain;Toys;A Stores Extra\n";

    let report = service
        .import_tabular(ProductLine::Epc, csv.as_bytes())
        .unwrap();

    assert_eq!(report.summary.success, 1);
    assert_eq!(report.results.success[0].attribute, "VChainASEH");
}

#[test]
fn header_only_file_yields_an_empty_report() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);

    let report = service
        .import_tabular(ProductLine::Epc, "item,chain,category,class\n".as_bytes())
        .unwrap();

    assert_eq!(report.summary.total, 0);
    assert!(report.all_succeeded());
}

#[test]
fn undecodable_row_fails_alone() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let mut bytes = b"Item Code,Chain,Category,Store Classification\n".to_vec();
    bytes.extend_from_slice(b"IT001,ACME,LAMPS,A Stores\n");
    bytes.extend_from_slice(b"IT002,ACME,TOYS,B \xe9Stores\n");
    bytes.extend_from_slice(b"IT666,ACME,LAMPS,B Stores\n");

    let report = service
        .import_tabular(ProductLine::Epc, &bytes[..])
        .unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.success, 2);
    let failed = &report.results.failed;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].row, Some(3));
    assert_eq!(failed[0].kind, RowErrorKind::Validation);
    assert_eq!(failed[0].reason, "row is not valid UTF-8");
    assert_eq!(failed[0].entity_key.as_deref(), Some("IT002"));
}

#[test]
fn multi_line_cells_do_not_shift_row_numbers() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let csv = "Item Code,Chain,Category,Store Classification,Note\n\
               IT001,ACME,LAMPS,A Stores,\"first line\nsecond line\"\n\
               IT404,ACME,LAMPS,A Stores,plain\n";

    let report = service
        .import_tabular(ProductLine::Epc, csv.as_bytes())
        .unwrap();

    assert_eq!(report.results.success[0].row, Some(2));
    let failed = &report.results.failed;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].row, Some(3));
    assert_eq!(failed[0].kind, RowErrorKind::NotFound);
}
