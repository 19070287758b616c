//! Channel-backed audit recorder with a dedicated SQLite writer thread.
//!
//! # Invariants
//! - The queue is bounded; a full queue drops the event with a warning
//!   instead of blocking the caller.
//! - The writer thread owns its own connection; it never shares the
//!   request connection.
//! - `shutdown` drains every queued event before returning.

use super::{AuditEvent, AuditSink};
use crate::db::{open_db, DbError};
use log::{error, info, warn};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const WRITER_THREAD_NAME: &str = "exclusivity-audit-writer";

/// Counters reported by the writer thread on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditWriterStats {
    pub written: u64,
    pub failed: u64,
}

#[derive(Debug)]
pub enum AuditError {
    Db(DbError),
    Spawn(std::io::Error),
    WriterPanicked,
}

impl Display for AuditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "audit store unavailable: {err}"),
            Self::Spawn(err) => write!(f, "failed to start audit writer: {err}"),
            Self::WriterPanicked => write!(f, "audit writer thread panicked"),
        }
    }
}

impl Error for AuditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Spawn(err) => Some(err),
            Self::WriterPanicked => None,
        }
    }
}

impl From<DbError> for AuditError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Fire-and-forget recorder persisting events into `audit_log`.
pub struct ChannelAuditRecorder {
    sender: Option<SyncSender<AuditEvent>>,
    handle: Option<JoinHandle<AuditWriterStats>>,
    dropped: Arc<AtomicU64>,
}

impl ChannelAuditRecorder {
    /// Opens the audit database and starts the writer thread.
    pub fn spawn(db_path: impl AsRef<Path>, capacity: usize) -> Result<Self, AuditError> {
        let conn = open_db(db_path)?;
        Self::with_connection(conn, capacity)
    }

    /// Starts the writer thread over an already migrated connection.
    pub fn with_connection(conn: Connection, capacity: usize) -> Result<Self, AuditError> {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || writer_loop(conn, receiver))
            .map_err(AuditError::Spawn)?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of events dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Closes the queue, waits for the writer to drain it, and returns its
    /// counters.
    pub fn shutdown(mut self) -> Result<AuditWriterStats, AuditError> {
        drop(self.sender.take());
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| AuditError::WriterPanicked),
            None => Ok(AuditWriterStats::default()),
        }
    }
}

impl AuditSink for ChannelAuditRecorder {
    fn record(&self, event: AuditEvent) {
        let Some(sender) = self.sender.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "event=audit_record module=audit status=dropped reason=queue_full event_type={} event_id={}",
                    event.event_type, event.event_id
                );
            }
            Err(TrySendError::Disconnected(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "event=audit_record module=audit status=dropped reason=writer_gone event_type={} event_id={}",
                    event.event_type, event.event_id
                );
            }
        }
    }
}

impl Drop for ChannelAuditRecorder {
    fn drop(&mut self) {
        // Closing the sender lets the writer drain and exit on its own.
        drop(self.sender.take());
    }
}

fn writer_loop(conn: Connection, receiver: Receiver<AuditEvent>) -> AuditWriterStats {
    let mut stats = AuditWriterStats::default();
    for event in receiver {
        match insert_event(&conn, &event) {
            Ok(()) => stats.written += 1,
            Err(err) => {
                stats.failed += 1;
                error!(
                    "event=audit_write module=audit status=error event_type={} event_id={} error={}",
                    event.event_type, event.event_id, err
                );
            }
        }
    }
    info!(
        "event=audit_writer_stop module=audit status=ok written={} failed={}",
        stats.written, stats.failed
    );
    stats
}

fn insert_event(conn: &Connection, event: &AuditEvent) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO audit_log (
            event_id,
            event_type,
            product_line,
            actor,
            payload,
            occurred_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            event.event_id.to_string(),
            event.event_type.as_str(),
            event.product_line.map(|line| line.as_str()),
            event.actor.as_deref(),
            event.payload.to_string(),
            event.occurred_at,
        ],
    )?;
    Ok(())
}
