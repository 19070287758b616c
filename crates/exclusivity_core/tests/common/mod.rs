#![allow(dead_code)]

use exclusivity_core::audit::{AuditEvent, AuditSink};
use exclusivity_core::keys::KeyEncoder;
use exclusivity_core::model::catalog::{Item, Store};
use exclusivity_core::model::dimension::{Dimension, DimensionKind};
use exclusivity_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use exclusivity_core::repo::schema_repo::SqliteSchemaIntrospector;
use exclusivity_core::{open_db_in_memory, ExclusivityService};
use rusqlite::Connection;
use std::cell::RefCell;

/// Sink keeping every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: RefCell<Vec<AuditEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.borrow().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, event: AuditEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Registries:
/// - chains `ACME`, `VChain`
/// - categories `LAMPS`, `TOYS`
/// - classifications `AHIGH` ("A Stores"), `ASEH` ("A Stores Extra"), `BLOW` ("B Stores")
/// - brands `JB` ("Jumping Beans"), `HF` ("Happy Feet")
///
/// Catalog: items `IT001` (LAMPS), `IT002` (TOYS), `IT666` (LAMPS);
/// stores `S001` (ACME), `S002` (VChain).
pub fn seed_registries(conn: &Connection) {
    let catalog = SqliteCatalogRepository::new(conn);
    let dimensions = [
        (DimensionKind::Chain, "ACME", "Acme Retail"),
        (DimensionKind::Chain, "VChain", "Value Chain"),
        (DimensionKind::Category, "LAMPS", "Lamps"),
        (DimensionKind::Category, "TOYS", "Toys"),
        (DimensionKind::StoreClassification, "AHIGH", "A Stores"),
        (DimensionKind::StoreClassification, "ASEH", "A Stores Extra"),
        (DimensionKind::StoreClassification, "BLOW", "B Stores"),
        (DimensionKind::Brand, "JB", "Jumping Beans"),
        (DimensionKind::Brand, "HF", "Happy Feet"),
    ];
    for (kind, code, name) in dimensions {
        catalog
            .upsert_dimension(kind, &Dimension::new(code, name))
            .unwrap();
    }

    catalog
        .upsert_item(&Item::new("IT001", "Desk lamp").in_category("LAMPS"))
        .unwrap();
    catalog
        .upsert_item(&Item::new("IT002", "Spinning top").in_category("TOYS").with_brand("JB"))
        .unwrap();
    catalog
        .upsert_item(&Item::new("IT666", "Floor lamp").in_category("LAMPS"))
        .unwrap();
    catalog
        .upsert_store(&Store::new("S001", "Acme Downtown", "ACME"))
        .unwrap();
    catalog
        .upsert_store(&Store::new("S002", "Value Mall", "VChain"))
        .unwrap();
}

/// In-memory database with seeded registries and every attribute provisioned.
pub fn provisioned_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    seed_registries(&conn);
    SqliteSchemaIntrospector::new(&conn)
        .provision_all(&KeyEncoder::default())
        .unwrap();
    conn
}

pub fn service<'conn>(
    conn: &'conn Connection,
    sink: &'conn RecordingSink,
) -> ExclusivityService<'conn, &'conn RecordingSink> {
    ExclusivityService::new(conn, KeyEncoder::default(), sink)
}

pub fn count_cells(conn: &Connection, entity_key: &str, attribute_name: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM exclusivity_cells WHERE entity_key = ?1 AND attribute_name = ?2;",
        [entity_key, attribute_name],
        |row| row.get(0),
    )
    .unwrap()
}
