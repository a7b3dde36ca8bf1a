//! Persistence collaborator for the decision pipeline
//!
//! The pipeline writes one durable row per produced artifact so the full
//! decision trail can be reconstructed by mission. Writes are best-effort:
//! a failing store must never abort a decision-producing operation. The
//! [`Archive`] wrapper enforces that contract and keeps the failure count
//! observable so operators can detect silent audit gaps.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::StoreError;

/// Durable table names, one per artifact kind
pub mod tables {
    pub const SIGNALS: &str = "signals";
    pub const STRATEGIES: &str = "strategies";
    pub const PROPOSALS: &str = "strategy_proposals";
    pub const SIMULATIONS: &str = "simulation_results";
    pub const EVALUATIONS: &str = "governance_evaluations";
    pub const VETOES: &str = "veto_records";
    pub const AUDIT: &str = "audit_entries";
    pub const CONSENSUS: &str = "consensus_results";
    pub const DISAGREEMENTS: &str = "disagreements";
}

/// Contract for the external persistence store.
///
/// The pipeline only needs a named-table insert of a flat record and a
/// by-mission fetch; it does not depend on read-after-write consistency.
pub trait DecisionStore: Send + Sync {
    /// Insert one record into the named table
    fn insert(&self, table: &str, record: serde_json::Value) -> Result<(), StoreError>;

    /// Fetch rows tagged with the given mission id, newest first
    fn fetch_by_mission(&self, table: &str, mission_id: &str) -> Vec<serde_json::Value>;
}

/// In-memory store, used by tests and the CLI when no backend is wired
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<serde_json::Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all tables
    pub fn row_count(&self) -> usize {
        self.tables.read().values().map(|rows| rows.len()).sum()
    }

    /// All rows of a table, in insertion order
    pub fn rows(&self, table: &str) -> Vec<serde_json::Value> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }
}

impl DecisionStore for InMemoryStore {
    fn insert(&self, table: &str, record: serde_json::Value) -> Result<(), StoreError> {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    fn fetch_by_mission(&self, table: &str, mission_id: &str) -> Vec<serde_json::Value> {
        let tables = self.tables.read();
        let Some(rows) = tables.get(table) else {
            return Vec::new();
        };
        rows.iter()
            .rev()
            .filter(|row| {
                row.get("mission_id")
                    .and_then(|m| m.as_str())
                    .map(|m| m == mission_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

/// Store that drops everything. Useful when the pipeline runs without a
/// persistence backend at all.
#[derive(Debug, Default)]
pub struct NullStore;

impl DecisionStore for NullStore {
    fn insert(&self, _table: &str, _record: serde_json::Value) -> Result<(), StoreError> {
        Ok(())
    }

    fn fetch_by_mission(&self, _table: &str, _mission_id: &str) -> Vec<serde_json::Value> {
        Vec::new()
    }
}

/// Best-effort archival writer shared by all pipeline components.
///
/// Failed writes are logged and counted, never propagated.
pub struct Archive {
    store: Arc<dyn DecisionStore>,
    failed_writes: AtomicU64,
    last_error: RwLock<Option<String>>,
}

impl Archive {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self {
            store,
            failed_writes: AtomicU64::new(0),
            last_error: RwLock::new(None),
        }
    }

    /// Serialize and insert one artifact. Any failure is swallowed after
    /// logging and counting it.
    pub fn record<T: Serialize>(&self, table: &str, artifact: &T) {
        let value = match serde_json::to_value(artifact) {
            Ok(value) => value,
            Err(e) => {
                self.note_failure(table, e.to_string());
                return;
            }
        };
        if let Err(e) = self.store.insert(table, value) {
            self.note_failure(table, e.to_string());
        }
    }

    /// Number of writes lost since process start
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// Description of the most recent lost write, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Fetch rows for a mission from the underlying store
    pub fn fetch_by_mission(&self, table: &str, mission_id: &str) -> Vec<serde_json::Value> {
        self.store.fetch_by_mission(table, mission_id)
    }

    fn note_failure(&self, table: &str, reason: String) {
        self.failed_writes.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("archival write to '{}' lost: {}", table, reason);
        *self.last_error.write() = Some(format!("{}: {}", table, reason));
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("failed_writes", &self.failed_writes())
            .finish()
    }
}
