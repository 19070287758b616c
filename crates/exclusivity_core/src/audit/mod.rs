//! Audit events and sinks.
//!
//! # Responsibility
//! - Define the structured event recorded after successful mutations.
//! - Provide the fire-and-forget sink contract used by services.
//!
//! # Invariants
//! - `AuditSink::record` never blocks the caller on storage and never fails
//!   the mutation that triggered it.
//! - One event per successful single-cell call; one event per processed
//!   batch.

use crate::model::dimension::ProductLine;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

mod recorder;

pub use recorder::{AuditError, AuditWriterStats, ChannelAuditRecorder};

pub const EVENT_CELL_SET: &str = "exclusivity.cell_set";
pub const EVENT_CELL_CLEARED: &str = "exclusivity.cell_cleared";
pub const EVENT_BULK_IMPORT: &str = "exclusivity.bulk_import";
pub const EVENT_TABULAR_IMPORT: &str = "exclusivity.tabular_import";

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub product_line: Option<ProductLine>,
    pub actor: Option<String>,
    /// Epoch milliseconds.
    pub occurred_at: i64,
    pub payload: serde_json::Value,
}

impl AuditEvent {
    pub fn new(
        event_type: impl Into<String>,
        product_line: Option<ProductLine>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            product_line,
            actor: None,
            occurred_at: now_epoch_ms(),
            payload,
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }
}

/// Best-effort destination for audit events.
pub trait AuditSink {
    fn record(&self, event: AuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for &T {
    fn record(&self, event: AuditEvent) {
        (**self).record(event);
    }
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, event: AuditEvent) {
        (**self).record(event);
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
