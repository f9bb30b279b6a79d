//! Catalog-level events recorded in the store's event log.
//!
//! Per-item generation is not logged here; these are the operations an
//! operator would want an audit trail for.

use crate::types::{ContainerType, Tick};
use serde::{Deserialize, Serialize};

/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LootEvent {
    CatalogBuilt {
        tables: usize,
        active_tables: usize,
        groups: usize,
        repairs: usize,
    },
    TablesDerived {
        container_types: Vec<ContainerType>,
    },
    RepopulationCompleted {
        tick: Tick,
        populated: usize,
        skipped: usize,
    },
    BlacklistChanged {
        item: String,
        blacklisted: bool,
    },
    RemoteCatalogImported {
        catalog_id: String,
        tables: usize,
        groups: Option<usize>,
    },
    RemoteCatalogFailed {
        catalog_id: String,
        reason: String,
        restored: bool,
    },
    BackupCreated {
        file: String,
    },
    BackupRestored {
        file: String,
    },
}

impl LootEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LootEvent::CatalogBuilt { .. } => "catalog_built",
            LootEvent::TablesDerived { .. } => "tables_derived",
            LootEvent::RepopulationCompleted { .. } => "repopulation_completed",
            LootEvent::BlacklistChanged { .. } => "blacklist_changed",
            LootEvent::RemoteCatalogImported { .. } => "remote_catalog_imported",
            LootEvent::RemoteCatalogFailed { .. } => "remote_catalog_failed",
            LootEvent::BackupCreated { .. } => "backup_created",
            LootEvent::BackupRestored { .. } => "backup_restored",
        }
    }
}

/// A persisted event log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub event_type: String,
    pub payload: String, // JSON-serialized LootEvent
    pub created_at: String,
}

impl EventLogEntry {
    pub fn decode(&self) -> serde_json::Result<LootEvent> {
        serde_json::from_str(&self.payload)
    }
}
