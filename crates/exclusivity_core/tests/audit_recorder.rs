mod common;

use exclusivity_core::audit::{AuditEvent, AuditSink, EVENT_CELL_CLEARED, EVENT_CELL_SET};
use exclusivity_core::keys::KeyEncoder;
use exclusivity_core::repo::schema_repo::SqliteSchemaIntrospector;
use exclusivity_core::{open_db, ChannelAuditRecorder, DimensionTuple, ExclusivityService, ProductLine};
use rusqlite::Connection;
use serde_json::json;

fn audit_rows(conn: &Connection) -> Vec<(String, Option<String>, Option<String>, String)> {
    let mut stmt = conn
        .prepare(
            "SELECT event_type, product_line, actor, payload
             FROM audit_log
             ORDER BY id ASC;",
        )
        .unwrap();
    stmt.query_map([], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    })
    .unwrap()
    .collect::<Result<Vec<_>, _>>()
    .unwrap()
}

#[test]
fn shutdown_drains_every_queued_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.db");
    let recorder = ChannelAuditRecorder::spawn(&path, 16).unwrap();

    for index in 0..5 {
        recorder.record(AuditEvent::new(
            "exclusivity.test",
            Some(ProductLine::Nbfi),
            json!({ "index": index }),
        ));
    }
    let stats = recorder.shutdown().unwrap();

    assert_eq!(stats.written, 5);
    assert_eq!(stats.failed, 0);
    let conn = open_db(&path).unwrap();
    let rows = audit_rows(&conn);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].1.as_deref(), Some("nbfi"));
    assert_eq!(rows[4].3, r#"{"index":4}"#);
}

#[test]
fn service_mutations_reach_the_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exclusivity.db");
    let conn = open_db(&path).unwrap();
    common::seed_registries(&conn);
    SqliteSchemaIntrospector::new(&conn)
        .provision_all(&KeyEncoder::default())
        .unwrap();

    let recorder = ChannelAuditRecorder::spawn(&path, 8).unwrap();
    {
        let service = ExclusivityService::new(&conn, KeyEncoder::default(), &recorder)
            .with_actor("planner@example.com");
        let tuple = DimensionTuple {
            chain: Some("ACME".to_string()),
            classification: Some("AHIGH".to_string()),
            ..DimensionTuple::default()
        };
        service.set_cell(ProductLine::Epc, "IT001", &tuple).unwrap();
        service
            .clear_cell(ProductLine::Epc, "IT001", "ACMEAHIGH")
            .unwrap();
    }
    let stats = recorder.shutdown().unwrap();
    assert_eq!(stats.written, 2);

    let rows = audit_rows(&conn);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0, EVENT_CELL_SET);
    assert_eq!(rows[1].0, EVENT_CELL_CLEARED);
    assert_eq!(rows[0].2.as_deref(), Some("planner@example.com"));

    let payload: serde_json::Value = serde_json::from_str(&rows[0].3).unwrap();
    assert_eq!(payload["attributeName"], "ACMEAHIGH");
    assert_eq!(payload["action"], "inserted");
}

#[test]
fn in_memory_writer_accepts_events_within_capacity() {
    let conn = exclusivity_core::open_db_in_memory().unwrap();
    let recorder = ChannelAuditRecorder::with_connection(conn, 1).unwrap();

    recorder.record(AuditEvent::new("exclusivity.test", None, json!({})));
    assert_eq!(recorder.dropped(), 0);

    let stats = recorder.shutdown().unwrap();
    assert_eq!(stats.written, 1);
}
