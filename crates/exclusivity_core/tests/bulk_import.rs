mod common;

use common::{count_cells, provisioned_db, service, RecordingSink};
use exclusivity_core::audit::EVENT_BULK_IMPORT;
use exclusivity_core::keys::KeyEncoder;
use exclusivity_core::open_db_in_memory;
use exclusivity_core::repo::schema_repo::SqliteSchemaIntrospector;
use exclusivity_core::{BulkRow, CellAction, DimensionTuple, ImportError, ProductLine, RowErrorKind};

fn epc_row(item: &str, chain: &str, category: &str, classification: &str) -> BulkRow {
    BulkRow {
        entity_key: Some(item.to_string()),
        dimension_tuple: DimensionTuple {
            chain: Some(chain.to_string()),
            category: Some(category.to_string()),
            brand: None,
            classification: Some(classification.to_string()),
        },
    }
}

fn nbfi_row(store: &str, chain: &str, brand: &str, classification: &str) -> BulkRow {
    BulkRow {
        entity_key: Some(store.to_string()),
        dimension_tuple: DimensionTuple {
            chain: Some(chain.to_string()),
            category: None,
            brand: Some(brand.to_string()),
            classification: Some(classification.to_string()),
        },
    }
}

#[test]
fn named_row_is_inserted_then_updated() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let rows = [epc_row("IT001", "ACME", "LAMPS", "A Stores")];

    let first = service.bulk_rows(ProductLine::Epc, &rows).unwrap();
    assert_eq!(first.summary.total, 1);
    assert_eq!(first.summary.success, 1);
    assert_eq!(first.results.success[0].attribute, "ACMEAHIGH");
    assert_eq!(first.results.success[0].action, CellAction::Inserted);

    let second = service.bulk_rows(ProductLine::Epc, &rows).unwrap();
    assert_eq!(second.results.success[0].action, CellAction::Updated);
    assert_eq!(count_cells(&conn, "IT001", "ACMEAHIGH"), 1);
}

#[test]
fn names_and_codes_resolve_case_insensitively() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let rows = [
        epc_row("IT001", "acme retail", "lamps", "a stores extra"),
        epc_row("IT001", "vchain", "Lamps", "BLOW"),
    ];

    let report = service.bulk_rows(ProductLine::Epc, &rows).unwrap();

    assert!(report.all_succeeded());
    let attributes: Vec<&str> = report
        .results
        .success
        .iter()
        .map(|entry| entry.attribute.as_str())
        .collect();
    assert_eq!(attributes, vec!["ACMEASEH", "VChainBLOW"]);
}

#[test]
fn unknown_classification_fails_only_its_row() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let rows = [
        epc_row("IT001", "ACME", "LAMPS", "Z Stores"),
        epc_row("IT001", "ACME", "LAMPS", "A Stores"),
    ];

    let report = service.bulk_rows(ProductLine::Epc, &rows).unwrap();

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.success, 1);
    assert_eq!(report.summary.failed, 1);
    let failure = &report.results.failed[0];
    assert_eq!(failure.kind, RowErrorKind::Resolution);
    assert_eq!(failure.entity_key.as_deref(), Some("IT001"));
    assert!(failure.reason.contains("store classification"));
    assert!(failure.reason.contains("Z Stores"));
}

#[test]
fn every_row_is_accounted_for() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let missing_chain = BulkRow {
        entity_key: Some("IT001".to_string()),
        dimension_tuple: DimensionTuple {
            chain: None,
            category: Some("LAMPS".to_string()),
            brand: None,
            classification: Some("AHIGH".to_string()),
        },
    };
    let rows = vec![
        epc_row("IT001", "ACME", "LAMPS", "AHIGH"),
        missing_chain,
        epc_row("IT001", "   ", "LAMPS", "AHIGH"),
        epc_row("IT 001", "ACME", "LAMPS", "AHIGH"),
        epc_row("IT404", "ACME", "LAMPS", "AHIGH"),
        epc_row("IT002", "ACME", "LAMPS", "AHIGH"),
        epc_row("IT002", "ACME", "TOYS", "BLOW"),
        BulkRow::default(),
    ];

    let report = service.bulk_rows(ProductLine::Epc, &rows).unwrap();

    assert_eq!(report.summary.total, rows.len());
    assert_eq!(
        report.summary.success + report.summary.failed,
        report.summary.total
    );
    assert_eq!(report.summary.success, 2);

    let kinds: Vec<RowErrorKind> = report.results.failed.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RowErrorKind::Validation,
            RowErrorKind::Validation,
            RowErrorKind::Validation,
            RowErrorKind::NotFound,
            RowErrorKind::Validation,
            RowErrorKind::Validation,
        ]
    );
    let reasons: Vec<&str> = report
        .results
        .failed
        .iter()
        .map(|f| f.reason.as_str())
        .collect();
    assert_eq!(reasons[0], "missing required field `chain`");
    assert_eq!(reasons[1], "field `chain` contains only whitespace");
    assert!(reasons[2].contains("IT 001"));
    assert_eq!(reasons[3], "item `IT404` does not exist");
    assert_eq!(reasons[4], "item `IT002` is not in category `LAMPS`");
    assert_eq!(reasons[5], "missing required field `item`");
    assert_eq!(report.results.failed[5].entity_key, None);
}

#[test]
fn nbfi_rows_use_brand_attributes_and_store_chains() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let rows = [
        nbfi_row("S001", "ACME", "Jumping Beans", "A Stores"),
        nbfi_row("S002", "Value Chain", "HF", "B Stores"),
        nbfi_row("S002", "ACME", "HF", "B Stores"),
        nbfi_row("S999", "ACME", "HF", "B Stores"),
        nbfi_row("S001", "ACME", "Little Tikes", "A Stores"),
    ];

    let report = service.bulk_rows(ProductLine::Nbfi, &rows).unwrap();

    assert_eq!(report.summary.success, 2);
    assert_eq!(report.results.success[0].attribute, "brand_jumpingbeans");
    assert_eq!(report.results.success[1].attribute, "brand_happy_feet");
    let stored = service
        .get_cell(ProductLine::Nbfi, "S001", "brand_jumpingbeans")
        .unwrap()
        .unwrap();
    assert_eq!(stored.classification_code.as_deref(), Some("AHIGH"));

    let failed = &report.results.failed;
    assert_eq!(failed[0].kind, RowErrorKind::Validation);
    assert_eq!(
        failed[0].reason,
        "store `S002` belongs to chain `VChain`, not `ACME`"
    );
    assert_eq!(failed[1].kind, RowErrorKind::NotFound);
    assert_eq!(failed[2].kind, RowErrorKind::Resolution);
    assert_eq!(failed[2].reason, "unknown brand `Little Tikes`");
}

#[test]
fn unregistered_combination_is_a_schema_failure() {
    let conn = open_db_in_memory().unwrap();
    common::seed_registries(&conn);
    SqliteSchemaIntrospector::new(&conn)
        .register_chain_class_attribute(&KeyEncoder::default(), "ACME", "AHIGH")
        .unwrap();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let rows = [
        epc_row("IT001", "ACME", "LAMPS", "AHIGH"),
        epc_row("IT001", "VChain", "LAMPS", "ASEH"),
    ];

    let report = service.bulk_rows(ProductLine::Epc, &rows).unwrap();

    assert_eq!(report.summary.success, 1);
    let failure = &report.results.failed[0];
    assert_eq!(failure.kind, RowErrorKind::Schema);
    assert!(failure.reason.contains("VChain"));
    assert!(failure.reason.contains("ASEH"));
}

#[test]
fn empty_rows_are_a_malformed_payload() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);

    let err = service.bulk_rows(ProductLine::Epc, &[]).unwrap_err();

    assert!(matches!(err, ImportError::Malformed(_)));
    assert!(sink.events().is_empty());
}

#[test]
fn one_audit_event_per_batch_carries_summary_and_results() {
    let conn = provisioned_db();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink).with_actor("merch-ops");
    let rows = [
        epc_row("IT001", "ACME", "LAMPS", "AHIGH"),
        epc_row("IT001", "ACME", "LAMPS", "Z Stores"),
        epc_row("IT001", "ACME", "LAMPS", "BLOW"),
    ];

    service.bulk_rows(ProductLine::Epc, &rows).unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EVENT_BULK_IMPORT);
    assert_eq!(events[0].product_line, Some(ProductLine::Epc));
    assert_eq!(events[0].actor.as_deref(), Some("merch-ops"));
    assert_eq!(events[0].payload["total"], 3);
    assert_eq!(events[0].payload["success"], 2);
    assert_eq!(events[0].payload["failed"], 1);

    let results = &events[0].payload["results"];
    let succeeded = results["success"].as_array().unwrap();
    let failed = results["failed"].as_array().unwrap();
    assert_eq!(succeeded.len(), 2);
    assert_eq!(failed.len(), 1);
    assert_eq!(succeeded[0]["attribute"], "ACMEAHIGH");
    assert_eq!(succeeded[1]["attribute"], "ACMEBLOW");
    assert_eq!(failed[0]["kind"], "resolution");
    assert!(failed[0]["reason"].as_str().unwrap().contains("Z Stores"));
}

#[test]
fn database_failure_aborts_the_batch_and_keeps_earlier_rows() {
    let conn = provisioned_db();
    conn.execute_batch(
        "CREATE TRIGGER reject_it666 BEFORE INSERT ON exclusivity_cells
         WHEN NEW.entity_key = 'IT666'
         BEGIN
             SELECT RAISE(ABORT, 'storage unavailable');
         END;",
    )
    .unwrap();
    let sink = RecordingSink::default();
    let service = service(&conn, &sink);
    let rows = [
        epc_row("IT001", "ACME", "LAMPS", "AHIGH"),
        epc_row("IT666", "ACME", "LAMPS", "AHIGH"),
        epc_row("IT001", "ACME", "LAMPS", "BLOW"),
    ];

    let err = service.bulk_rows(ProductLine::Epc, &rows).unwrap_err();

    assert!(err.is_transport());
    assert_eq!(count_cells(&conn, "IT001", "ACMEAHIGH"), 1);
    assert_eq!(count_cells(&conn, "IT001", "ACMEBLOW"), 0);
    assert!(sink.events().is_empty());
}
