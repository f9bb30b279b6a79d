use crate::{
    item::LootItem,
    populator::FillReport,
    remote::ImportReport,
    store::{BackupOutcome, RestoreOutcome},
};
use serde::{Deserialize, Serialize};

/// Operator commands accepted by the engine.
/// Variants are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum LootCommand {
    /// Fill a fresh container of the given type and report its contents.
    Populate { container_type: String },
    /// Queue a refill of every live container for the next tick.
    RepopulateAll,
    BlacklistAdd { item: String },
    BlacklistRemove { item: String },
    BlacklistList,
    ImportRemote { catalog_id: String },
    BackupTables,
    RestoreTables,
    TableEnabled { container_type: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistOutcome {
    Added,
    Removed,
    AlreadyListed,
    NotListed,
    NotAnItem,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Populated {
        report: FillReport,
        items: Vec<LootItem>,
    },
    Scheduled {
        queued: bool,
    },
    Blacklist {
        item: String,
        result: BlacklistOutcome,
    },
    BlacklistItems {
        items: Vec<String>,
    },
    Imported {
        report: ImportReport,
    },
    Backup {
        result: BackupOutcome,
    },
    Restore {
        result: RestoreOutcome,
    },
    TableEnabled {
        container_type: String,
        enabled: bool,
    },
}
